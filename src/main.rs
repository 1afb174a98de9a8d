use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use marketplace_indexer::chain::HttpChain;
use marketplace_indexer::content::HttpContentStore;
use marketplace_indexer::events::ContractAddresses;
use marketplace_indexer::handlers::ProcessContext;
use marketplace_indexer::push::HttpPushTransport;
use marketplace_indexer::store::PgStore;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// RPC URL of the chain the marketplace is deployed on
    #[arg(short, long)]
    rpc: String,

    /// Address of the marketplace contract
    #[arg(short, long)]
    marketplace: String,

    /// Address of the marketplace data contract
    #[arg(short = 'd', long)]
    marketplace_data: String,

    /// Start indexing from this block instead of the stored cursor
    #[arg(short, long)]
    start_block: Option<i64>,

    /// Size of the block range processed per iteration
    #[arg(long, default_value = "500")]
    range_size: u64,

    /// Base URL of the gateway serving content-addressed payloads
    #[arg(short, long)]
    content_gateway: String,

    /// Push delivery endpoint, notifications are not delivered when unset
    #[arg(long)]
    push_endpoint: Option<String>,

    /// Backfill marketplace configuration from contract state for
    /// Initialized events up to and including this block
    #[arg(long)]
    config_backfill_until: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let mut filter = EnvFilter::new("info");
    if let Ok(var) = std::env::var("RUST_LOG") {
        filter = filter.add_directive(
            var.parse()
                .context("Failed to parse the RUST_LOG value set in environment")?,
        );
    }
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::INFO)
        .with_env_filter(filter)
        .init();

    let args = Args::parse();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let contracts = ContractAddresses {
        marketplace: args
            .marketplace
            .parse()
            .context("Failed to parse marketplace into ethereum address")?,
        marketplace_data: args
            .marketplace_data
            .parse()
            .context("Failed to parse marketplace data into ethereum address")?,
    };

    let chain = HttpChain::new(
        args.rpc.parse().context("Failed to parse provided RPC URL")?,
        contracts,
    )?;

    let content = HttpContentStore::new(
        args.content_gateway
            .parse()
            .context("Failed to parse provided content gateway URL")?,
    )?;

    let push = match args.push_endpoint {
        Some(endpoint) => {
            let auth_token = std::env::var("PUSH_AUTH_TOKEN")
                .context("PUSH_AUTH_TOKEN must be set when a push endpoint is provided")?;
            Some(HttpPushTransport::new(
                endpoint
                    .parse()
                    .context("Failed to parse provided push endpoint URL")?,
                auth_token,
            )?)
        }
        None => None,
    };

    let store = PgStore::new(&database_url)
        .await
        .context("Failed to initialize the store from the provided DB URL")?;

    info!("Applying pending migrations");
    store
        .apply_migrations()
        .await
        .context("Failed to apply pending migrations to the DB")?;
    info!("Migrations applied");

    info!(
        rpc = %args.rpc,
        marketplace = %args.marketplace,
        marketplace_data = %args.marketplace_data,
        start_block = ?args.start_block,
        range_size = args.range_size,
        push_enabled = push.is_some(),
        "Starting marketplace indexer"
    );

    let ctx = ProcessContext {
        contracts,
        content,
        chain,
        config_backfill_until: args.config_backfill_until,
    };

    marketplace_indexer::run(store, ctx, push, args.start_block, args.range_size)
        .await
        .context("Indexer run error")
}

pub mod job;
pub mod marketplace;
pub mod users;

use alloy::rpc::types::Log;
use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::cache::Batch;
use crate::chain::ChainProvider;
use crate::content::ContentStore;
use crate::entities::log_row_id;
use crate::events::{decode_log, ContractAddresses, DecodedEvent};
use crate::store::Store;

/// Everything event processing needs besides the store: the contract pair
/// being indexed, the chain for direct reads and the content gateway.
pub struct ProcessContext<C, P> {
    pub contracts: ContractAddresses,
    pub content: C,
    pub chain: P,
    pub config_backfill_until: Option<u64>,
}

/// Routes one log to its handler. Logs from unknown addresses or with
/// unknown topics are skipped; decoding failures on known topics poison the
/// whole batch.
#[instrument(level = "info", skip_all, parent = None, fields(
    block = log.block_number,
    idx = log.log_index,
    tx = ?log.transaction_hash,
))]
pub async fn handle_log<S, C, P>(
    ctx: &ProcessContext<C, P>,
    batch: &mut Batch<'_, S>,
    log: &Log,
    block_timestamp: u64,
) -> Result<()>
where
    S: Store,
    C: ContentStore,
    P: ChainProvider,
{
    info!(?log, "processing");

    let Some(event) = decode_log(&ctx.contracts, log)? else {
        warn!("ignoring unknown log type");
        return Ok(());
    };

    let block_number = log.block_number.context("log without a block number")?;

    match event {
        DecodedEvent::Config(event) => {
            marketplace::apply(
                batch,
                &ctx.chain,
                ctx.config_backfill_until,
                ctx.contracts.marketplace,
                block_number,
                event,
            )
            .await
        }
        DecodedEvent::User(event) => {
            users::apply(batch, ctx.contracts.marketplace, event, block_timestamp).await
        }
        DecodedEvent::Job(envelope) => {
            let event_id = log_row_id(
                block_number,
                &log.transaction_hash
                    .context("log without a transaction hash")?,
                log.log_index.context("log without a log index")?,
            );
            job::apply(
                batch,
                &ctx.content,
                ctx.contracts.marketplace,
                &event_id,
                &envelope,
            )
            .await
        }
    }
}

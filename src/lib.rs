pub mod cache;
pub mod chain;
pub mod content;
pub mod entities;
pub mod events;
pub mod handlers;
pub mod notify;
pub mod push;
pub mod store;
#[cfg(test)]
mod test_utils;

use std::cmp::min;
use std::collections::BTreeMap;
use std::time::Duration;

use alloy::rpc::types::eth::Log;
use anyhow::{anyhow, Context, Result};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use cache::Batch;
use chain::ChainProvider;
use content::ContentStore;
use handlers::{handle_log, ProcessContext};
use push::PushTransport;
use store::Store;

/// Tails the chain forever: resume from the stored cursor, fetch a capped
/// range of logs, process it into one transactional commit, repeat. Returns
/// only on a broken invariant; transient RPC trouble is retried inside the
/// provider.
#[instrument(level = "info", skip_all, parent = None)]
pub async fn run<S, C, P, T>(
    store: S,
    ctx: ProcessContext<C, P>,
    push: Option<T>,
    start_block: Option<i64>,
    range_size: u64,
) -> Result<()>
where
    S: Store + Sync,
    C: ContentStore,
    P: ChainProvider,
    T: PushTransport + Sync,
{
    if range_size == 0 {
        return Err(anyhow!("Range size must not be zero"));
    }

    let mut last_processed = store
        .last_processed_block()
        .await
        .context("failed to fetch last updated block")?;

    if let Some(block) = start_block {
        if store
            .advance_start_block(block - 1)
            .await
            .context("failed to set start block")?
        {
            last_processed = block - 1;
            info!(block, "starting from the requested block");
        } else {
            warn!(
                "Provided start block {} is behind the last processed block {}, starting from the later!",
                block, last_processed
            );
        }
    }

    info!(block = last_processed, "last updated");

    loop {
        let latest_block = ctx.chain.latest_block().await?;

        info!(block = latest_block, "latest block");

        // effectively means the rpc was rolled back
        if (latest_block as i64) < last_processed {
            return Err(anyhow!(
                "rpc is behind the db, should never happen unless the rpc was rolled back"
            ));
        }

        if latest_block as i64 == last_processed {
            // we are up to date, simply sleep for a bit
            debug!("up to date with the rpc, sleeping 5s");
            sleep(Duration::from_secs(5)).await;
            continue;
        }

        // start from the next block to what has already been processed,
        // capped by range_size
        let start_block = (last_processed + 1) as u64;
        let end_block = min(start_block + range_size - 1, latest_block);
        let live = end_block == latest_block;

        info!(start_block, end_block, "fetching range");

        let block_logs = ctx.chain.logs_grouped_by_block(start_block, end_block).await?;

        info!(start_block, end_block, "processing range");

        process_range(&store, &ctx, push.as_ref(), block_logs, end_block, live).await?;

        last_processed = end_block as i64;
    }
}

/// Processes one fetched range into a single transactional commit. The
/// accumulated notifications only fan out for ranges that reached the chain
/// head, so a resync never replays pushes.
async fn process_range<S, C, P, T>(
    store: &S,
    ctx: &ProcessContext<C, P>,
    push: Option<&T>,
    block_logs: BTreeMap<u64, Vec<Log>>,
    end_block: u64,
    live: bool,
) -> Result<()>
where
    S: Store + Sync,
    C: ContentStore,
    P: ChainProvider,
    T: PushTransport + Sync,
{
    let mut batch = Batch::new(store);

    for (block_number, logs) in &block_logs {
        // Job events carry their own clock; profile events are stamped with
        // the block time. Prefer the timestamp already on the log, fall back
        // to one header fetch per block.
        let block_timestamp = match logs.iter().find_map(|log| log.block_timestamp) {
            Some(timestamp) => timestamp,
            None => ctx.chain.block_timestamp(*block_number).await?,
        };

        for log in logs {
            handle_log(ctx, &mut batch, log, block_timestamp)
                .await
                .context("failed to handle log")?;
        }
    }

    let data = batch.into_data();
    let notifications = data.notifications.clone();
    store.commit(data, end_block as i64).await?;

    if live {
        if let Some(push) = push {
            push::deliver(store, push, &notifications).await;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use alloy::primitives::Address;

    use super::*;
    use crate::entities::PushSubscription;
    use crate::events::JobEventKind;
    use crate::test_utils::{
        contracts, created_job_data, job_event_log, user_registered_log, MemChain, MemContent,
        MemPush, MemStore, ADDR_1, ADDR_3,
    };

    fn test_ctx(chain: MemChain) -> ProcessContext<MemContent, MemChain> {
        ProcessContext {
            contracts: contracts(),
            content: MemContent::default(),
            chain,
            config_backfill_until: None,
        }
    }

    fn created_log(block: u64, arbitrator: Address) -> Log {
        let mut log = job_event_log(
            1,
            JobEventKind::Created,
            Some(ADDR_1),
            created_job_data(arbitrator, 100),
            1000,
        );
        log.block_number = Some(block);
        log
    }

    #[tokio::test]
    async fn a_range_lands_in_one_commit_and_advances_the_cursor() {
        let store = MemStore::default();
        let chain = MemChain::default();
        chain.add_log(created_log(5, Address::ZERO)).await;
        let ctx = test_ctx(chain);

        let block_logs = ctx.chain.logs_grouped_by_block(1, 10).await.unwrap();
        process_range(&store, &ctx, None::<&MemPush>, block_logs, 10, false)
            .await
            .unwrap();

        assert_eq!(store.commits().await, 1);
        assert_eq!(store.last_processed_block().await.unwrap(), 10);
        let job = store.job(1).await.unwrap().unwrap();
        assert_eq!(job.roles.creator, ADDR_1);
    }

    #[tokio::test]
    async fn only_live_ranges_deliver_notifications() {
        let store = MemStore::default();
        store
            .seed_subscription(PushSubscription {
                endpoint: "https://push/arb".into(),
                address: ADDR_3,
                keys: serde_json::json!({"auth": "k"}),
            })
            .await;

        // Created with an arbitrator set notifies that arbitrator.
        let chain = MemChain::default();
        chain.add_log(created_log(5, ADDR_3)).await;
        let ctx = test_ctx(chain);
        let push = MemPush::always(reqwest::StatusCode::OK);

        let block_logs = ctx.chain.logs_grouped_by_block(1, 10).await.unwrap();
        process_range(&store, &ctx, Some(&push), block_logs.clone(), 10, false)
            .await
            .unwrap();
        assert_eq!(push.attempts().await, 0);

        process_range(&store, &ctx, Some(&push), block_logs, 10, true)
            .await
            .unwrap();
        assert_eq!(push.attempts().await, 1);
    }

    #[tokio::test]
    async fn profile_events_take_the_block_timestamp() {
        let store = MemStore::default();
        let chain = MemChain::default();
        let mut log = user_registered_log(ADDR_1, "alice");
        log.block_number = Some(7);
        chain.add_log(log).await;
        chain.set_timestamp(7, 4321).await;
        let ctx = test_ctx(chain);

        let block_logs = ctx.chain.logs_grouped_by_block(1, 10).await.unwrap();
        process_range(&store, &ctx, None::<&MemPush>, block_logs, 10, false)
            .await
            .unwrap();

        assert_eq!(ctx.chain.timestamp_calls().await, 1);
        let user = store.user(ADDR_1).await.unwrap().unwrap();
        assert_eq!(user.timestamp, 4321);
    }

    #[tokio::test]
    async fn log_timestamps_skip_the_header_fetch() {
        let store = MemStore::default();
        let chain = MemChain::default();
        let mut log = user_registered_log(ADDR_1, "alice");
        log.block_number = Some(7);
        log.block_timestamp = Some(999);
        chain.add_log(log).await;
        let ctx = test_ctx(chain);

        let block_logs = ctx.chain.logs_grouped_by_block(1, 10).await.unwrap();
        process_range(&store, &ctx, None::<&MemPush>, block_logs, 10, false)
            .await
            .unwrap();

        assert_eq!(ctx.chain.timestamp_calls().await, 0);
        let user = store.user(ADDR_1).await.unwrap().unwrap();
        assert_eq!(user.timestamp, 999);
    }

    #[tokio::test]
    async fn an_ordering_violation_poisons_the_whole_range() {
        let store = MemStore::default();
        let chain = MemChain::default();

        // An event for a job that was never created, followed by a valid
        // creation in a later block.
        let mut orphan = job_event_log(9, JobEventKind::Closed, None, vec![], 600);
        orphan.block_number = Some(5);
        chain.add_log(orphan).await;
        chain.add_log(created_log(6, Address::ZERO)).await;
        let ctx = test_ctx(chain);

        let block_logs = ctx.chain.logs_grouped_by_block(1, 10).await.unwrap();
        let result = process_range(&store, &ctx, None::<&MemPush>, block_logs, 10, false).await;

        assert!(result.is_err());
        assert_eq!(store.commits().await, 0);
        assert_eq!(store.last_processed_block().await.unwrap(), 0);
    }
}

use alloy::primitives::Address;
use anyhow::Result;
use tracing::info;

use crate::cache::Batch;
use crate::chain::ChainProvider;
use crate::entities::Marketplace;
use crate::events::ConfigEvent;
use crate::store::Store;

/// Applies a configuration event to the marketplace row, materializing the
/// row on first contact. Each event sets exactly the field it names.
pub async fn apply<S, P>(
    batch: &mut Batch<'_, S>,
    chain: &P,
    config_backfill_until: Option<u64>,
    marketplace: Address,
    block_number: u64,
    event: ConfigEvent,
) -> Result<()>
where
    S: Store,
    P: ChainProvider,
{
    let mut row = batch.marketplace(marketplace).await?;

    match event {
        ConfigEvent::Initialized { version } => {
            row.version = u64::from(version);
            if config_backfill_until.is_some_and(|until| block_number <= until) {
                backfill(chain, &mut row).await?;
            }
        }
        ConfigEvent::OwnershipTransferred { new_owner } => row.owner = new_owner,
        ConfigEvent::Paused => row.paused = true,
        ConfigEvent::Unpaused => row.paused = false,
        ConfigEvent::MarketplaceDataAddressChanged(address) => {
            row.marketplace_data_address = address
        }
        ConfigEvent::TreasuryAddressChanged(address) => row.treasury_address = address,
        ConfigEvent::UnicrowAddressChanged(address) => row.unicrow_address = address,
        ConfigEvent::UnicrowDisputeAddressChanged(address) => row.unicrow_dispute_address = address,
        ConfigEvent::UnicrowArbitratorAddressChanged(address) => {
            row.unicrow_arbitrator_address = address
        }
        ConfigEvent::UnicrowMarketplaceFeeChanged(fee) => row.unicrow_marketplace_fee = fee,
        ConfigEvent::VersionChanged(version) => row.version = version,
    }

    batch.put_marketplace(row);

    Ok(())
}

/// Rebuilds the row from direct contract reads. Deployments from before the
/// configuration events were emitted on initialization would otherwise keep
/// zeroed rows, so old ranges can opt in to this via the CLI.
async fn backfill<P: ChainProvider>(chain: &P, row: &mut Marketplace) -> Result<()> {
    let config = chain.marketplace_config().await?;

    row.owner = config.owner;
    row.paused = config.paused;
    row.version = config.version;
    row.marketplace_data_address = config.marketplace_data_address;
    row.treasury_address = config.treasury_address;
    row.unicrow_address = config.unicrow_address;
    row.unicrow_dispute_address = config.unicrow_dispute_address;
    row.unicrow_arbitrator_address = config.unicrow_arbitrator_address;
    row.unicrow_marketplace_fee = config.unicrow_marketplace_fee;

    info!(address = %row.address, "backfilled marketplace configuration from contract state");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MarketplaceConfig;
    use crate::test_utils::{MemChain, MemStore, ADDR_1, MARKETPLACE};

    async fn drive(events: Vec<(u64, ConfigEvent)>, backfill_until: Option<u64>) -> Marketplace {
        let store = MemStore::default();
        let chain = MemChain::default();
        let mut batch = Batch::new(&store);
        for (block, event) in events {
            apply(&mut batch, &chain, backfill_until, MARKETPLACE, block, event)
                .await
                .unwrap();
        }
        let mut data = batch.into_data();
        data.marketplaces.remove(0)
    }

    #[tokio::test]
    async fn each_event_sets_its_field() {
        let row = drive(
            vec![
                (10, ConfigEvent::Initialized { version: 1 }),
                (11, ConfigEvent::OwnershipTransferred { new_owner: ADDR_1 }),
                (12, ConfigEvent::TreasuryAddressChanged(ADDR_1)),
                (13, ConfigEvent::UnicrowMarketplaceFeeChanged(500)),
                (14, ConfigEvent::VersionChanged(3)),
            ],
            None,
        )
        .await;

        assert_eq!(row.address, MARKETPLACE);
        assert_eq!(row.owner, ADDR_1);
        assert_eq!(row.treasury_address, ADDR_1);
        assert_eq!(row.unicrow_marketplace_fee, 500);
        assert_eq!(row.version, 3);
    }

    #[tokio::test]
    async fn pausing_toggles_and_nothing_else() {
        let row = drive(
            vec![(10, ConfigEvent::Paused), (11, ConfigEvent::Unpaused)],
            None,
        )
        .await;

        assert!(!row.paused);
        assert_eq!(row.owner, Address::ZERO);
        assert_eq!(row.job_count, 0);
    }

    #[tokio::test]
    async fn initialization_backfills_only_inside_the_requested_range() {
        let store = MemStore::default();
        let chain = MemChain::default();
        chain
            .set_config(MarketplaceConfig {
                owner: ADDR_1,
                paused: true,
                version: 2,
                marketplace_data_address: ADDR_1,
                treasury_address: ADDR_1,
                unicrow_address: ADDR_1,
                unicrow_dispute_address: ADDR_1,
                unicrow_arbitrator_address: ADDR_1,
                unicrow_marketplace_fee: 250,
            })
            .await;

        let mut batch = Batch::new(&store);
        apply(
            &mut batch,
            &chain,
            Some(100),
            MARKETPLACE,
            100,
            ConfigEvent::Initialized { version: 1 },
        )
        .await
        .unwrap();

        assert_eq!(chain.config_calls().await, 1);
        let row = batch.into_data().marketplaces.remove(0);
        assert_eq!(row.owner, ADDR_1);
        assert!(row.paused);
        assert_eq!(row.version, 2);
        assert_eq!(row.unicrow_marketplace_fee, 250);

        // Past the bound the event is a plain field setter again.
        let mut batch = Batch::new(&store);
        apply(
            &mut batch,
            &chain,
            Some(100),
            MARKETPLACE,
            101,
            ConfigEvent::Initialized { version: 1 },
        )
        .await
        .unwrap();
        assert_eq!(chain.config_calls().await, 1);

        // And without the flag it never fires at all.
        let mut batch = Batch::new(&store);
        apply(
            &mut batch,
            &chain,
            None,
            MARKETPLACE,
            5,
            ConfigEvent::Initialized { version: 1 },
        )
        .await
        .unwrap();
        assert_eq!(chain.config_calls().await, 1);
    }
}

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::network::Ethereum;
use alloy::primitives::Address;
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::eth::Log;
use alloy::rpc::types::Filter;
use alloy::transports::http::reqwest::{Client, Url};
use alloy::transports::http::Http;
use anyhow::{Context, Result};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::warn;

use crate::events::{ContractAddresses, Marketplace};

/// Configuration snapshot read straight off the contract, used to backfill
/// rows indexed from before the configuration events existed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketplaceConfig {
    pub owner: Address,
    pub paused: bool,
    pub version: u64,
    pub marketplace_data_address: Address,
    pub treasury_address: Address,
    pub unicrow_address: Address,
    pub unicrow_dispute_address: Address,
    pub unicrow_arbitrator_address: Address,
    pub unicrow_marketplace_fee: u16,
}

/// Chain access needed by the event loop and the handlers.
pub trait ChainProvider {
    fn latest_block(&self) -> impl Future<Output = Result<u64>> + Send;

    fn logs_grouped_by_block(
        &self,
        start_block: u64,
        end_block: u64,
    ) -> impl Future<Output = Result<BTreeMap<u64, Vec<Log>>>> + Send;

    fn block_timestamp(&self, number: u64) -> impl Future<Output = Result<u64>> + Send;

    fn marketplace_config(&self) -> impl Future<Output = Result<MarketplaceConfig>> + Send;
}

#[derive(Clone)]
pub struct HttpChain {
    provider: Arc<RootProvider<Ethereum>>,
    contracts: ContractAddresses,
}

impl HttpChain {
    pub fn new(rpc_url: Url, contracts: ContractAddresses) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(8))
            .build()
            .context("Failed to initialize client for sending rpc requests")?;

        let transport = Http::with_client(client, rpc_url);
        let provider = RootProvider::<Ethereum>::new(RpcClient::new(transport, false));

        Ok(Self {
            provider: Arc::new(provider),
            contracts,
        })
    }
}

impl ChainProvider for HttpChain {
    async fn latest_block(&self) -> Result<u64> {
        let provider = self.provider.clone();
        let block_number = Retry::spawn(
            ExponentialBackoff::from_millis(500)
                .max_delay(Duration::from_secs(10))
                .take(5)
                .map(jitter),
            || async { provider.get_block_number().await },
        )
        .await
        .context("Failed to fetch latest block number from the RPC")?;

        Ok(block_number)
    }

    async fn logs_grouped_by_block(
        &self,
        start_block: u64,
        end_block: u64,
    ) -> Result<BTreeMap<u64, Vec<Log>>> {
        let provider = self.provider.clone();
        let logs = Retry::spawn(
            ExponentialBackoff::from_millis(500)
                .max_delay(Duration::from_secs(10))
                .take(5)
                .map(jitter),
            || async {
                provider
                    .get_logs(
                        &Filter::new()
                            .from_block(start_block)
                            .to_block(end_block)
                            .address(vec![
                                self.contracts.marketplace,
                                self.contracts.marketplace_data,
                            ]),
                    )
                    .await
                    .inspect_err(|err| {
                        warn!(
                            start_block,
                            end_block,
                            error = ?err,
                            "Retrying get_logs RPC call"
                        );
                    })
            },
        )
        .await
        .context(format!(
            "Failed to fetch logs for block range ({}, {}) from the RPC",
            start_block, end_block
        ))?;

        let mut block_logs: BTreeMap<u64, Vec<Log>> = BTreeMap::new();
        for log in logs {
            if let Some(block_number) = log.block_number {
                block_logs.entry(block_number).or_default().push(log);
            }
        }

        Ok(block_logs)
    }

    async fn block_timestamp(&self, number: u64) -> Result<u64> {
        let provider = self.provider.clone();
        let block = Retry::spawn(
            ExponentialBackoff::from_millis(500)
                .max_delay(Duration::from_secs(10))
                .take(3)
                .map(jitter),
            || async { provider.get_block_by_number(number.into()).await },
        )
        .await
        .context(format!("Failed to fetch block {} from the RPC", number))?
        .with_context(|| format!("block {} is missing on the RPC", number))?;

        Ok(block.header.timestamp)
    }

    async fn marketplace_config(&self) -> Result<MarketplaceConfig> {
        let provider = self.provider.clone();
        let market = Marketplace::new(self.contracts.marketplace, &provider);

        let config = Retry::spawn(
            ExponentialBackoff::from_millis(500)
                .max_delay(Duration::from_secs(10))
                .take(3)
                .map(jitter),
            || async {
                Ok::<_, alloy::contract::Error>(MarketplaceConfig {
                    owner: market.owner().call().await?,
                    paused: market.paused().call().await?,
                    version: market.version().call().await?.saturating_to::<u64>(),
                    marketplace_data_address: market.marketplaceData().call().await?,
                    treasury_address: market.treasuryAddress().call().await?,
                    unicrow_address: market.unicrowAddress().call().await?,
                    unicrow_dispute_address: market.unicrowDisputeAddress().call().await?,
                    unicrow_arbitrator_address: market.unicrowArbitratorAddress().call().await?,
                    unicrow_marketplace_fee: market.unicrowMarketplaceFee().call().await?,
                })
            },
        )
        .await
        .context("Failed to fetch marketplace configuration from the RPC")?;

        Ok(config)
    }
}

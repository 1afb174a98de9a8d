//! In-memory fakes for the seams the indexer talks through, plus builders
//! for the raw logs the decoder consumes.

use std::collections::{BTreeMap, HashMap, VecDeque};

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::rpc::types::eth::Log;
use alloy::sol_types::{SolEvent, SolValue};
use anyhow::{anyhow, Context, Result};
use reqwest::StatusCode;
use tokio::sync::Mutex;

use crate::chain::{ChainProvider, MarketplaceConfig};
use crate::content::ContentStore;
use crate::entities::{
    Arbitrator, Job, JobEventRow, Marketplace, Notification, PushSubscription, Review, User,
};
use crate::events::{ContractAddresses, JobEventKind, MarketplaceData};
use crate::push::{PushPayload, PushTransport};
use crate::store::{BatchData, Store};

pub const ADDR_1: Address = Address::repeat_byte(0x01);
pub const ADDR_2: Address = Address::repeat_byte(0x02);
pub const ADDR_3: Address = Address::repeat_byte(0x03);
pub const MARKETPLACE: Address = Address::repeat_byte(0xfe);
pub const MARKETPLACE_DATA: Address = Address::repeat_byte(0xfd);

pub fn contracts() -> ContractAddresses {
    ContractAddresses {
        marketplace: MARKETPLACE,
        marketplace_data: MARKETPLACE_DATA,
    }
}

fn wrap(address: Address, data: alloy::primitives::LogData) -> Log {
    Log {
        inner: alloy::primitives::Log { address, data },
        block_hash: None,
        block_number: Some(1),
        block_timestamp: None,
        transaction_hash: Some(B256::repeat_byte(0xbb)),
        transaction_index: None,
        log_index: Some(0),
        removed: false,
    }
}

/// A `JobEvent` log with an arbitrary kind code and raw actor bytes, for
/// exercising the decoder's rejection paths.
pub fn raw_job_event_log(
    job_id: u64,
    code: u8,
    actor_bytes: Vec<u8>,
    data: Vec<u8>,
    timestamp: u64,
) -> Log {
    let event = MarketplaceData::JobEvent {
        jobId: U256::from(job_id),
        eventData: MarketplaceData::JobEventData {
            type_: code,
            address_: Bytes::from(actor_bytes),
            data_: Bytes::from(data),
            timestamp_: timestamp as u32,
        },
    };
    wrap(MARKETPLACE_DATA, event.encode_log_data())
}

pub fn job_event_log(
    job_id: u64,
    kind: JobEventKind,
    actor: Option<Address>,
    data: Vec<u8>,
    timestamp: u64,
) -> Log {
    let actor_bytes = actor.map(|address| address.to_vec()).unwrap_or_default();
    raw_job_event_log(job_id, kind.code(), actor_bytes, data, timestamp)
}

pub fn config_log<E: SolEvent>(event: E) -> Log {
    wrap(MARKETPLACE, event.encode_log_data())
}

pub fn user_registered_log(address: Address, name: &str) -> Log {
    let event = MarketplaceData::UserRegistered {
        addr: address,
        pubkey: Bytes::from(vec![4, 7]),
        name: name.into(),
        bio: "writes rust".into(),
        avatar: "ar://avatar".into(),
    };
    wrap(MARKETPLACE_DATA, event.encode_log_data())
}

/// ABI payload of a `Created` job event with everything but the arbitrator
/// and amount fixed.
pub fn created_job_data(arbitrator: Address, amount: u64) -> Vec<u8> {
    (
        "job".to_string(),
        B256::ZERO,
        false,
        Vec::<String>::new(),
        Address::ZERO,
        U256::from(amount),
        3600u32,
        "ipfs".to_string(),
        arbitrator,
        false,
    )
        .abi_encode_sequence()
}

#[derive(Default)]
struct StoreState {
    marketplaces: HashMap<Address, Marketplace>,
    users: HashMap<Address, User>,
    arbitrators: HashMap<Address, Arbitrator>,
    jobs: HashMap<u64, Job>,
    events: Vec<JobEventRow>,
    reviews: Vec<Review>,
    notifications: Vec<Notification>,
    subscriptions: Vec<PushSubscription>,
    cursor: i64,
    job_reads: u64,
    commits: u64,
}

/// `Store` over plain maps, counting reads and commits so tests can assert
/// how the cache and the range loop talk to it.
#[derive(Default)]
pub struct MemStore {
    state: Mutex<StoreState>,
}

impl MemStore {
    pub async fn seed_job(&self, job: Job) {
        self.state.lock().await.jobs.insert(job.id, job);
    }

    pub async fn seed_user(&self, user: User) {
        self.state.lock().await.users.insert(user.address, user);
    }

    pub async fn seed_arbitrator(&self, arbitrator: Arbitrator) {
        self.state
            .lock()
            .await
            .arbitrators
            .insert(arbitrator.address, arbitrator);
    }

    pub async fn seed_subscription(&self, subscription: PushSubscription) {
        self.state.lock().await.subscriptions.push(subscription);
    }

    pub async fn job_reads(&self) -> u64 {
        self.state.lock().await.job_reads
    }

    pub async fn commits(&self) -> u64 {
        self.state.lock().await.commits
    }
}

impl Store for MemStore {
    async fn marketplace(&self, address: Address) -> Result<Option<Marketplace>> {
        Ok(self.state.lock().await.marketplaces.get(&address).cloned())
    }

    async fn user(&self, address: Address) -> Result<Option<User>> {
        Ok(self.state.lock().await.users.get(&address).cloned())
    }

    async fn arbitrator(&self, address: Address) -> Result<Option<Arbitrator>> {
        Ok(self.state.lock().await.arbitrators.get(&address).cloned())
    }

    async fn job(&self, id: u64) -> Result<Option<Job>> {
        let mut state = self.state.lock().await;
        state.job_reads += 1;
        Ok(state.jobs.get(&id).cloned())
    }

    async fn push_subscriptions(&self, address: Address) -> Result<Vec<PushSubscription>> {
        Ok(self
            .state
            .lock()
            .await
            .subscriptions
            .iter()
            .filter(|subscription| subscription.address == address)
            .cloned()
            .collect())
    }

    async fn delete_push_subscription(&self, endpoint: &str) -> Result<()> {
        self.state
            .lock()
            .await
            .subscriptions
            .retain(|subscription| subscription.endpoint != endpoint);
        Ok(())
    }

    async fn last_processed_block(&self) -> Result<i64> {
        Ok(self.state.lock().await.cursor)
    }

    async fn advance_start_block(&self, block: i64) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.cursor < block {
            state.cursor = block;
            return Ok(true);
        }
        Ok(false)
    }

    async fn commit(&self, batch: BatchData, end_block: i64) -> Result<()> {
        let mut state = self.state.lock().await;
        for marketplace in batch.marketplaces {
            state.marketplaces.insert(marketplace.address, marketplace);
        }
        for user in batch.users {
            state.users.insert(user.address, user);
        }
        for arbitrator in batch.arbitrators {
            state.arbitrators.insert(arbitrator.address, arbitrator);
        }
        for job in batch.jobs {
            state.jobs.insert(job.id, job);
        }
        state.events.extend(batch.events);
        state.reviews.extend(batch.reviews);
        state.notifications.extend(batch.notifications);
        state.cursor = end_block;
        state.commits += 1;
        Ok(())
    }
}

#[derive(Default)]
struct ContentState {
    bodies: HashMap<B256, String>,
    fetches: u64,
}

/// `ContentStore` over a map. Unseeded hashes fetch as errors, which the
/// handlers are expected to swallow.
#[derive(Default)]
pub struct MemContent {
    state: Mutex<ContentState>,
}

impl MemContent {
    pub async fn seed(&self, hash: B256, body: &str) {
        self.state.lock().await.bodies.insert(hash, body.into());
    }

    pub async fn fetches(&self) -> u64 {
        self.state.lock().await.fetches
    }
}

impl ContentStore for MemContent {
    async fn fetch(&self, hash: B256) -> Result<String> {
        let mut state = self.state.lock().await;
        state.fetches += 1;
        state
            .bodies
            .get(&hash)
            .cloned()
            .with_context(|| format!("no content behind {hash}"))
    }
}

struct PushState {
    script: VecDeque<Result<StatusCode>>,
    fallback: Option<StatusCode>,
    attempts: u64,
}

/// `PushTransport` answering from a script, or with one fixed status when
/// built with [`MemPush::always`].
pub struct MemPush {
    state: Mutex<PushState>,
}

impl MemPush {
    pub fn scripted(script: Vec<Result<StatusCode>>) -> Self {
        MemPush {
            state: Mutex::new(PushState {
                script: script.into(),
                fallback: None,
                attempts: 0,
            }),
        }
    }

    pub fn always(status: StatusCode) -> Self {
        MemPush {
            state: Mutex::new(PushState {
                script: VecDeque::new(),
                fallback: Some(status),
                attempts: 0,
            }),
        }
    }

    pub async fn attempts(&self) -> u64 {
        self.state.lock().await.attempts
    }
}

impl PushTransport for MemPush {
    async fn push(
        &self,
        _subscription: &PushSubscription,
        _payload: &PushPayload,
    ) -> Result<StatusCode> {
        let mut state = self.state.lock().await;
        state.attempts += 1;
        if let Some(result) = state.script.pop_front() {
            return result;
        }
        match state.fallback {
            Some(status) => Ok(status),
            None => Err(anyhow!("the push script ran out of responses")),
        }
    }
}

#[derive(Default)]
struct ChainState {
    logs: BTreeMap<u64, Vec<Log>>,
    timestamps: HashMap<u64, u64>,
    config: Option<MarketplaceConfig>,
    timestamp_calls: u64,
    config_calls: u64,
}

/// `ChainProvider` over scripted logs. Block timestamps default to zero so
/// tests only seed the ones they assert on.
#[derive(Default)]
pub struct MemChain {
    state: Mutex<ChainState>,
}

impl MemChain {
    pub async fn add_log(&self, log: Log) {
        let block = log.block_number.unwrap_or_default();
        self.state.lock().await.logs.entry(block).or_default().push(log);
    }

    pub async fn set_timestamp(&self, block: u64, timestamp: u64) {
        self.state.lock().await.timestamps.insert(block, timestamp);
    }

    pub async fn set_config(&self, config: MarketplaceConfig) {
        self.state.lock().await.config = Some(config);
    }

    pub async fn timestamp_calls(&self) -> u64 {
        self.state.lock().await.timestamp_calls
    }

    pub async fn config_calls(&self) -> u64 {
        self.state.lock().await.config_calls
    }
}

impl ChainProvider for MemChain {
    async fn latest_block(&self) -> Result<u64> {
        Ok(self
            .state
            .lock()
            .await
            .logs
            .keys()
            .max()
            .copied()
            .unwrap_or_default())
    }

    async fn logs_grouped_by_block(
        &self,
        start_block: u64,
        end_block: u64,
    ) -> Result<BTreeMap<u64, Vec<Log>>> {
        Ok(self
            .state
            .lock()
            .await
            .logs
            .range(start_block..=end_block)
            .map(|(block, logs)| (*block, logs.clone()))
            .collect())
    }

    async fn block_timestamp(&self, number: u64) -> Result<u64> {
        let mut state = self.state.lock().await;
        state.timestamp_calls += 1;
        Ok(state.timestamps.get(&number).copied().unwrap_or_default())
    }

    async fn marketplace_config(&self) -> Result<MarketplaceConfig> {
        let mut state = self.state.lock().await;
        state.config_calls += 1;
        state
            .config
            .clone()
            .context("no marketplace configuration scripted")
    }
}

use alloy::hex::ToHexExt;
use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::events::{JobCreatedDetails, JobEventKind};

/// Ratings are stored as fixed-point with four decimal places, so a 5-star
/// average is 50000.
pub const RATING_SCALE: u64 = 10_000;

/// Window after a job's `timestamp` during which amount reductions and
/// cancellations still accrue refundable collateral.
pub const COLLATERAL_GRACE_SECS: u64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Open,
    Taken,
    Closed,
}

impl JobState {
    pub const fn as_db_str(self) -> &'static str {
        match self {
            JobState::Open => "Open",
            JobState::Taken => "Taken",
            JobState::Closed => "Closed",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "Open" => Some(JobState::Open),
            "Taken" => Some(JobState::Taken),
            "Closed" => Some(JobState::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRoles {
    pub creator: Address,
    pub worker: Address,
    pub arbitrator: Address,
}

/// Per-job timestamps, all epoch seconds with 0 meaning "never".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobTimes {
    pub created_at: u64,
    pub opened_at: u64,
    pub assigned_at: u64,
    pub disputed_at: u64,
    pub arbitrated_at: u64,
    pub closed_at: u64,
    pub updated_at: u64,
    pub last_event_at: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marketplace {
    pub address: Address,
    pub marketplace_data_address: Address,
    pub owner: Address,
    pub paused: bool,
    pub treasury_address: Address,
    pub unicrow_address: Address,
    pub unicrow_dispute_address: Address,
    pub unicrow_arbitrator_address: Address,
    pub unicrow_marketplace_fee: u16,
    pub version: u64,
    pub job_count: u64,
    pub user_count: u64,
    pub arbitrator_count: u64,
}

impl Marketplace {
    pub fn new(address: Address) -> Self {
        Marketplace {
            address,
            marketplace_data_address: Address::ZERO,
            owner: Address::ZERO,
            paused: false,
            treasury_address: Address::ZERO,
            unicrow_address: Address::ZERO,
            unicrow_dispute_address: Address::ZERO,
            unicrow_arbitrator_address: Address::ZERO,
            unicrow_marketplace_fee: 0,
            version: 0,
            job_count: 0,
            user_count: 0,
            arbitrator_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub address: Address,
    pub public_key: String,
    pub name: String,
    pub bio: String,
    pub avatar: String,
    pub reputation_up: u64,
    pub reputation_down: u64,
    pub average_rating: u64,
    pub number_of_reviews: u64,
    pub timestamp: u64,
}

impl User {
    pub fn new(address: Address, timestamp: u64) -> Self {
        User {
            address,
            public_key: String::new(),
            name: String::new(),
            bio: String::new(),
            avatar: String::new(),
            reputation_up: 0,
            reputation_down: 0,
            average_rating: 0,
            number_of_reviews: 0,
            timestamp,
        }
    }

    /// Folds a new 1-5 star rating into the running fixed-point average,
    /// flooring like the on-chain accounting does.
    pub fn record_rating(&mut self, rating: u8) {
        let total = self.average_rating as u128 * self.number_of_reviews as u128
            + rating as u128 * RATING_SCALE as u128;
        self.number_of_reviews += 1;
        self.average_rating = (total / self.number_of_reviews as u128) as u64;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arbitrator {
    pub address: Address,
    pub public_key: String,
    pub name: String,
    pub bio: String,
    pub avatar: String,
    pub fee: u16,
    pub settled_count: u64,
    pub refused_count: u64,
    pub timestamp: u64,
}

impl Arbitrator {
    pub fn new(address: Address, timestamp: u64) -> Self {
        Arbitrator {
            address,
            public_key: String::new(),
            name: String::new(),
            bio: String::new(),
            avatar: String::new(),
            fee: 0,
            settled_count: 0,
            refused_count: 0,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: u64,
    pub state: JobState,
    pub roles: JobRoles,
    pub title: String,
    pub tags: Vec<String>,
    pub content_hash: B256,
    pub content: String,
    pub multiple_applicants: bool,
    pub whitelist_workers: bool,
    pub allowed_workers: Vec<Address>,
    pub amount: U256,
    pub token: Address,
    /// Grace-window clock: set at creation, reset when the job is reopened.
    pub timestamp: u64,
    pub max_time: u32,
    pub delivery_method: String,
    pub collateral_owed: U256,
    pub escrow_id: U256,
    pub result_hash: B256,
    pub rating: u8,
    pub disputed: bool,
    pub event_count: u64,
    pub last_event_id: Option<String>,
    pub times: JobTimes,
}

impl Job {
    pub fn from_created(
        id: u64,
        details: &JobCreatedDetails,
        creator: Address,
        timestamp: u64,
    ) -> Self {
        Job {
            id,
            state: JobState::Open,
            roles: JobRoles {
                creator,
                worker: Address::ZERO,
                arbitrator: details.arbitrator,
            },
            title: details.title.clone(),
            tags: details.tags.clone(),
            content_hash: details.content_hash,
            content: String::new(),
            multiple_applicants: details.multiple_applicants,
            whitelist_workers: details.whitelist_workers,
            allowed_workers: Vec::new(),
            amount: details.amount,
            token: details.token,
            timestamp,
            max_time: details.max_time,
            delivery_method: details.delivery_method.clone(),
            collateral_owed: U256::ZERO,
            escrow_id: U256::ZERO,
            result_hash: B256::ZERO,
            rating: 0,
            disputed: false,
            event_count: 0,
            last_event_id: None,
            times: JobTimes {
                created_at: timestamp,
                opened_at: timestamp,
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobEventRow {
    pub id: String,
    pub job_id: u64,
    pub kind: JobEventKind,
    pub actor: Option<Address>,
    pub data: Bytes,
    pub timestamp: u64,
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub id: String,
    pub job_id: u64,
    pub target: Address,
    pub reviewer: Address,
    pub rating: u8,
    pub text: String,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: String,
    pub address: Address,
    pub job_id: u64,
    pub kind: JobEventKind,
    pub actor: Option<Address>,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub endpoint: String,
    pub address: Address,
    pub keys: serde_json::Value,
}

/// Stable event row id derived purely from the log position, so replaying
/// the same range regenerates identical ids.
pub fn log_row_id(block_number: u64, tx_hash: &B256, log_index: u64) -> String {
    format!(
        "{:012}-{}-{:06}",
        block_number,
        &tx_hash.encode_hex()[..8],
        log_index
    )
}

pub fn notification_id(event_id: &str, recipient: Address) -> String {
    format!("{event_id}-{recipient}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_average_floors_like_the_onchain_accounting() {
        let mut user = User::new(Address::repeat_byte(1), 0);

        user.record_rating(5);
        assert_eq!(user.average_rating, 50_000);
        assert_eq!(user.number_of_reviews, 1);

        user.record_rating(3);
        assert_eq!(user.average_rating, 40_000);
        assert_eq!(user.number_of_reviews, 2);

        // (40000 * 2 + 40000) / 3 = 40000
        user.record_rating(4);
        assert_eq!(user.average_rating, 40_000);
        assert_eq!(user.number_of_reviews, 3);
    }

    #[test]
    fn rating_average_truncates_remainders() {
        let mut user = User::new(Address::repeat_byte(1), 0);
        user.record_rating(5);
        user.record_rating(4);
        // (50000 + 40000) / 2 = 45000
        assert_eq!(user.average_rating, 45_000);
        user.record_rating(4);
        // (90000 + 40000) / 3 = 43333.33 floored
        assert_eq!(user.average_rating, 43_333);
    }

    #[test]
    fn log_row_ids_are_stable_and_ordered() {
        let tx = B256::repeat_byte(0xab);
        let id = log_row_id(1234, &tx, 7);
        assert_eq!(id, "000000001234-abababab-000007");
        assert_eq!(id, log_row_id(1234, &tx, 7));

        // lexicographic order follows (block, index) order
        assert!(log_row_id(1234, &tx, 8) > id);
        assert!(log_row_id(1235, &tx, 0) > id);
    }

    #[test]
    fn notification_ids_embed_the_recipient() {
        let recipient = Address::repeat_byte(2);
        let id = notification_id("000000000001-aaaaaaaa-000000", recipient);
        assert!(id.starts_with("000000000001-aaaaaaaa-000000-0x"));
    }
}

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::rpc::types::eth::Log;
use alloy::sol;
use alloy::sol_types::{sol_data, SolEvent, SolType, SolValue};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

sol!(
    #[sol(rpc)]
    contract Marketplace {
        event Initialized(uint8 version);
        event OwnershipTransferred(address indexed previousOwner, address indexed newOwner);
        event Paused(address account);
        event Unpaused(address account);
        event MarketplaceDataAddressChanged(address marketplaceDataAddress);
        event TreasuryAddressChanged(address treasuryAddress);
        event UnicrowAddressChanged(address unicrowAddress);
        event UnicrowDisputeAddressChanged(address unicrowDisputeAddress);
        event UnicrowArbitratorAddressChanged(address unicrowArbitratorAddress);
        event UnicrowMarketplaceFeeChanged(uint16 unicrowMarketplaceFee);
        event VersionChanged(uint256 version);

        function owner() external view returns (address);
        function paused() external view returns (bool);
        function version() external view returns (uint256);
        function marketplaceData() external view returns (address);
        function treasuryAddress() external view returns (address);
        function unicrowAddress() external view returns (address);
        function unicrowDisputeAddress() external view returns (address);
        function unicrowArbitratorAddress() external view returns (address);
        function unicrowMarketplaceFee() external view returns (uint16);
    }
);

sol!(
    contract MarketplaceData {
        struct JobEventData {
            uint8 type_;
            bytes address_;
            bytes data_;
            uint32 timestamp_;
        }

        event JobEvent(uint256 indexed jobId, JobEventData eventData);
        event UserRegistered(address indexed addr, bytes pubkey, string name, string bio, string avatar);
        event UserUpdated(address indexed addr, string name, string bio, string avatar);
        event ArbitratorRegistered(address indexed addr, bytes pubkey, string name, string bio, string avatar, uint16 fee);
        event ArbitratorUpdated(address indexed addr, string name, string bio, string avatar);
    }
);

/// The two contract addresses the indexer follows. Logs from any other
/// address are skipped before decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractAddresses {
    pub marketplace: Address,
    pub marketplace_data: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobEventKind {
    Created,
    Taken,
    Paid,
    Updated,
    Signed,
    Completed,
    Delivered,
    Closed,
    Reopened,
    Rated,
    Refunded,
    Disputed,
    Arbitrated,
    ArbitrationRefused,
    WhitelistedWorkerAdded,
    WhitelistedWorkerRemoved,
    CollateralWithdrawn,
    OwnerMessage,
    WorkerMessage,
}

impl JobEventKind {
    /// Maps the on-chain `type_` integer to a kind. Unknown codes map to
    /// `None` so newer contract versions do not break older indexers.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(JobEventKind::Created),
            1 => Some(JobEventKind::Taken),
            2 => Some(JobEventKind::Paid),
            3 => Some(JobEventKind::Updated),
            4 => Some(JobEventKind::Signed),
            5 => Some(JobEventKind::Completed),
            6 => Some(JobEventKind::Delivered),
            7 => Some(JobEventKind::Closed),
            8 => Some(JobEventKind::Reopened),
            9 => Some(JobEventKind::Rated),
            10 => Some(JobEventKind::Refunded),
            11 => Some(JobEventKind::Disputed),
            12 => Some(JobEventKind::Arbitrated),
            13 => Some(JobEventKind::ArbitrationRefused),
            14 => Some(JobEventKind::WhitelistedWorkerAdded),
            15 => Some(JobEventKind::WhitelistedWorkerRemoved),
            16 => Some(JobEventKind::CollateralWithdrawn),
            17 => Some(JobEventKind::OwnerMessage),
            18 => Some(JobEventKind::WorkerMessage),
            _ => None,
        }
    }

    pub const fn code(self) -> u8 {
        match self {
            JobEventKind::Created => 0,
            JobEventKind::Taken => 1,
            JobEventKind::Paid => 2,
            JobEventKind::Updated => 3,
            JobEventKind::Signed => 4,
            JobEventKind::Completed => 5,
            JobEventKind::Delivered => 6,
            JobEventKind::Closed => 7,
            JobEventKind::Reopened => 8,
            JobEventKind::Rated => 9,
            JobEventKind::Refunded => 10,
            JobEventKind::Disputed => 11,
            JobEventKind::Arbitrated => 12,
            JobEventKind::ArbitrationRefused => 13,
            JobEventKind::WhitelistedWorkerAdded => 14,
            JobEventKind::WhitelistedWorkerRemoved => 15,
            JobEventKind::CollateralWithdrawn => 16,
            JobEventKind::OwnerMessage => 17,
            JobEventKind::WorkerMessage => 18,
        }
    }

    pub const fn as_db_str(self) -> &'static str {
        match self {
            JobEventKind::Created => "Created",
            JobEventKind::Taken => "Taken",
            JobEventKind::Paid => "Paid",
            JobEventKind::Updated => "Updated",
            JobEventKind::Signed => "Signed",
            JobEventKind::Completed => "Completed",
            JobEventKind::Delivered => "Delivered",
            JobEventKind::Closed => "Closed",
            JobEventKind::Reopened => "Reopened",
            JobEventKind::Rated => "Rated",
            JobEventKind::Refunded => "Refunded",
            JobEventKind::Disputed => "Disputed",
            JobEventKind::Arbitrated => "Arbitrated",
            JobEventKind::ArbitrationRefused => "ArbitrationRefused",
            JobEventKind::WhitelistedWorkerAdded => "WhitelistedWorkerAdded",
            JobEventKind::WhitelistedWorkerRemoved => "WhitelistedWorkerRemoved",
            JobEventKind::CollateralWithdrawn => "CollateralWithdrawn",
            JobEventKind::OwnerMessage => "OwnerMessage",
            JobEventKind::WorkerMessage => "WorkerMessage",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "Created" => Some(JobEventKind::Created),
            "Taken" => Some(JobEventKind::Taken),
            "Paid" => Some(JobEventKind::Paid),
            "Updated" => Some(JobEventKind::Updated),
            "Signed" => Some(JobEventKind::Signed),
            "Completed" => Some(JobEventKind::Completed),
            "Delivered" => Some(JobEventKind::Delivered),
            "Closed" => Some(JobEventKind::Closed),
            "Reopened" => Some(JobEventKind::Reopened),
            "Rated" => Some(JobEventKind::Rated),
            "Refunded" => Some(JobEventKind::Refunded),
            "Disputed" => Some(JobEventKind::Disputed),
            "Arbitrated" => Some(JobEventKind::Arbitrated),
            "ArbitrationRefused" => Some(JobEventKind::ArbitrationRefused),
            "WhitelistedWorkerAdded" => Some(JobEventKind::WhitelistedWorkerAdded),
            "WhitelistedWorkerRemoved" => Some(JobEventKind::WhitelistedWorkerRemoved),
            "CollateralWithdrawn" => Some(JobEventKind::CollateralWithdrawn),
            "OwnerMessage" => Some(JobEventKind::OwnerMessage),
            "WorkerMessage" => Some(JobEventKind::WorkerMessage),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCreatedDetails {
    pub title: String,
    pub content_hash: B256,
    pub multiple_applicants: bool,
    pub tags: Vec<String>,
    pub token: Address,
    pub amount: U256,
    pub max_time: u32,
    pub delivery_method: String,
    pub arbitrator: Address,
    pub whitelist_workers: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobUpdatedDetails {
    pub title: String,
    pub content_hash: B256,
    pub tags: Vec<String>,
    pub amount: U256,
    pub max_time: u32,
    pub arbitrator: Address,
    pub whitelist_workers: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSignedDetails {
    pub revision: u16,
    pub signature: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRatedDetails {
    pub rating: u8,
    pub review: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDisputedDetails {
    // Encrypted for the arbitrator, opaque to the indexer.
    pub session_key: Bytes,
    pub content: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobArbitratedDetails {
    pub creator_share: u16,
    pub creator_amount: U256,
    pub worker_share: u16,
    pub worker_amount: U256,
    pub reason_hash: B256,
    pub worker_address: Address,
    pub arbitrator_amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMessageDetails {
    pub content_hash: B256,
    pub recipient: Address,
}

/// Typed payload per job event kind, decoded from the packed `data_` bytes.
/// The state machine matches on this exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEventPayload {
    Created(JobCreatedDetails),
    Taken { escrow_id: U256 },
    Paid { escrow_id: U256 },
    Updated(JobUpdatedDetails),
    Signed(JobSignedDetails),
    Completed,
    Delivered { result_hash: B256 },
    Closed,
    Reopened,
    Rated(JobRatedDetails),
    Refunded,
    Disputed(JobDisputedDetails),
    Arbitrated(JobArbitratedDetails),
    ArbitrationRefused,
    WhitelistedWorkerAdded,
    WhitelistedWorkerRemoved,
    CollateralWithdrawn,
    OwnerMessage(JobMessageDetails),
    WorkerMessage(JobMessageDetails),
}

impl JobEventPayload {
    pub fn kind(&self) -> JobEventKind {
        match self {
            JobEventPayload::Created(_) => JobEventKind::Created,
            JobEventPayload::Taken { .. } => JobEventKind::Taken,
            JobEventPayload::Paid { .. } => JobEventKind::Paid,
            JobEventPayload::Updated(_) => JobEventKind::Updated,
            JobEventPayload::Signed(_) => JobEventKind::Signed,
            JobEventPayload::Completed => JobEventKind::Completed,
            JobEventPayload::Delivered { .. } => JobEventKind::Delivered,
            JobEventPayload::Closed => JobEventKind::Closed,
            JobEventPayload::Reopened => JobEventKind::Reopened,
            JobEventPayload::Rated(_) => JobEventKind::Rated,
            JobEventPayload::Refunded => JobEventKind::Refunded,
            JobEventPayload::Disputed(_) => JobEventKind::Disputed,
            JobEventPayload::Arbitrated(_) => JobEventKind::Arbitrated,
            JobEventPayload::ArbitrationRefused => JobEventKind::ArbitrationRefused,
            JobEventPayload::WhitelistedWorkerAdded => JobEventKind::WhitelistedWorkerAdded,
            JobEventPayload::WhitelistedWorkerRemoved => JobEventKind::WhitelistedWorkerRemoved,
            JobEventPayload::CollateralWithdrawn => JobEventKind::CollateralWithdrawn,
            JobEventPayload::OwnerMessage(_) => JobEventKind::OwnerMessage,
            JobEventPayload::WorkerMessage(_) => JobEventKind::WorkerMessage,
        }
    }

    /// Decoded details persisted alongside the event row, only for kinds
    /// that carry a structured payload.
    pub fn details_json(&self) -> Result<Option<serde_json::Value>> {
        let details = match self {
            JobEventPayload::Created(details) => Some(serde_json::to_value(details)),
            JobEventPayload::Updated(details) => Some(serde_json::to_value(details)),
            JobEventPayload::Signed(details) => Some(serde_json::to_value(details)),
            JobEventPayload::Rated(details) => Some(serde_json::to_value(details)),
            JobEventPayload::Disputed(details) => Some(serde_json::to_value(details)),
            JobEventPayload::Arbitrated(details) => Some(serde_json::to_value(details)),
            JobEventPayload::OwnerMessage(details) | JobEventPayload::WorkerMessage(details) => {
                Some(serde_json::to_value(details))
            }
            _ => None,
        };
        details
            .transpose()
            .context("failed to JSON serialize job event details")
    }
}

/// One fully decoded job event, carrying both the raw row fields and the
/// typed payload.
#[derive(Debug, Clone, PartialEq)]
pub struct JobEnvelope {
    pub job_id: u64,
    pub kind: JobEventKind,
    pub actor: Option<Address>,
    pub data: Bytes,
    pub timestamp: u64,
    pub payload: JobEventPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigEvent {
    Initialized { version: u8 },
    OwnershipTransferred { new_owner: Address },
    Paused,
    Unpaused,
    MarketplaceDataAddressChanged(Address),
    TreasuryAddressChanged(Address),
    UnicrowAddressChanged(Address),
    UnicrowDisputeAddressChanged(Address),
    UnicrowArbitratorAddressChanged(Address),
    UnicrowMarketplaceFeeChanged(u16),
    VersionChanged(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserEvent {
    UserRegistered {
        address: Address,
        public_key: Bytes,
        name: String,
        bio: String,
        avatar: String,
    },
    UserUpdated {
        address: Address,
        name: String,
        bio: String,
        avatar: String,
    },
    ArbitratorRegistered {
        address: Address,
        public_key: Bytes,
        name: String,
        bio: String,
        avatar: String,
        fee: u16,
    },
    ArbitratorUpdated {
        address: Address,
        name: String,
        bio: String,
        avatar: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodedEvent {
    Config(ConfigEvent),
    User(UserEvent),
    Job(JobEnvelope),
}

/// Decodes a raw log into a typed event. Returns `Ok(None)` for logs from
/// unknown addresses, unknown topics and unknown job event kind codes;
/// a known event that fails ABI decoding is an error (corrupt feed).
pub fn decode_log(contracts: &ContractAddresses, log: &Log) -> Result<Option<DecodedEvent>> {
    if log.address() == contracts.marketplace {
        return decode_marketplace_log(log);
    }
    if log.address() == contracts.marketplace_data {
        return decode_marketplace_data_log(log);
    }
    Ok(None)
}

fn decode_marketplace_log(log: &Log) -> Result<Option<DecodedEvent>> {
    let event = match log.topic0() {
        Some(&Marketplace::Initialized::SIGNATURE_HASH) => {
            let decoded = Marketplace::Initialized::decode_log(&log.inner)
                .context("failed to ABI decode Initialized event")?
                .data;
            ConfigEvent::Initialized {
                version: decoded.version,
            }
        }
        Some(&Marketplace::OwnershipTransferred::SIGNATURE_HASH) => {
            let decoded = Marketplace::OwnershipTransferred::decode_log(&log.inner)
                .context("failed to ABI decode OwnershipTransferred event")?
                .data;
            ConfigEvent::OwnershipTransferred {
                new_owner: decoded.newOwner,
            }
        }
        Some(&Marketplace::Paused::SIGNATURE_HASH) => ConfigEvent::Paused,
        Some(&Marketplace::Unpaused::SIGNATURE_HASH) => ConfigEvent::Unpaused,
        Some(&Marketplace::MarketplaceDataAddressChanged::SIGNATURE_HASH) => {
            let decoded = Marketplace::MarketplaceDataAddressChanged::decode_log(&log.inner)
                .context("failed to ABI decode MarketplaceDataAddressChanged event")?
                .data;
            ConfigEvent::MarketplaceDataAddressChanged(decoded.marketplaceDataAddress)
        }
        Some(&Marketplace::TreasuryAddressChanged::SIGNATURE_HASH) => {
            let decoded = Marketplace::TreasuryAddressChanged::decode_log(&log.inner)
                .context("failed to ABI decode TreasuryAddressChanged event")?
                .data;
            ConfigEvent::TreasuryAddressChanged(decoded.treasuryAddress)
        }
        Some(&Marketplace::UnicrowAddressChanged::SIGNATURE_HASH) => {
            let decoded = Marketplace::UnicrowAddressChanged::decode_log(&log.inner)
                .context("failed to ABI decode UnicrowAddressChanged event")?
                .data;
            ConfigEvent::UnicrowAddressChanged(decoded.unicrowAddress)
        }
        Some(&Marketplace::UnicrowDisputeAddressChanged::SIGNATURE_HASH) => {
            let decoded = Marketplace::UnicrowDisputeAddressChanged::decode_log(&log.inner)
                .context("failed to ABI decode UnicrowDisputeAddressChanged event")?
                .data;
            ConfigEvent::UnicrowDisputeAddressChanged(decoded.unicrowDisputeAddress)
        }
        Some(&Marketplace::UnicrowArbitratorAddressChanged::SIGNATURE_HASH) => {
            let decoded = Marketplace::UnicrowArbitratorAddressChanged::decode_log(&log.inner)
                .context("failed to ABI decode UnicrowArbitratorAddressChanged event")?
                .data;
            ConfigEvent::UnicrowArbitratorAddressChanged(decoded.unicrowArbitratorAddress)
        }
        Some(&Marketplace::UnicrowMarketplaceFeeChanged::SIGNATURE_HASH) => {
            let decoded = Marketplace::UnicrowMarketplaceFeeChanged::decode_log(&log.inner)
                .context("failed to ABI decode UnicrowMarketplaceFeeChanged event")?
                .data;
            ConfigEvent::UnicrowMarketplaceFeeChanged(decoded.unicrowMarketplaceFee)
        }
        Some(&Marketplace::VersionChanged::SIGNATURE_HASH) => {
            let decoded = Marketplace::VersionChanged::decode_log(&log.inner)
                .context("failed to ABI decode VersionChanged event")?
                .data;
            ConfigEvent::VersionChanged(decoded.version.saturating_to())
        }
        _ => return Ok(None),
    };

    Ok(Some(DecodedEvent::Config(event)))
}

fn decode_marketplace_data_log(log: &Log) -> Result<Option<DecodedEvent>> {
    match log.topic0() {
        Some(&MarketplaceData::JobEvent::SIGNATURE_HASH) => {
            let decoded = MarketplaceData::JobEvent::decode_log(&log.inner)
                .context("failed to ABI decode JobEvent")?
                .data;

            let Some(kind) = JobEventKind::from_code(decoded.eventData.type_) else {
                warn!(
                    code = decoded.eventData.type_,
                    "unknown job event kind, skipping"
                );
                return Ok(None);
            };

            let actor = decode_actor(&decoded.eventData.address_)?;
            let payload = decode_job_payload(kind, &decoded.eventData.data_)?;

            Ok(Some(DecodedEvent::Job(JobEnvelope {
                job_id: decoded.jobId.saturating_to(),
                kind,
                actor,
                data: decoded.eventData.data_,
                timestamp: decoded.eventData.timestamp_ as u64,
                payload,
            })))
        }
        Some(&MarketplaceData::UserRegistered::SIGNATURE_HASH) => {
            let decoded = MarketplaceData::UserRegistered::decode_log(&log.inner)
                .context("failed to ABI decode UserRegistered event")?
                .data;
            Ok(Some(DecodedEvent::User(UserEvent::UserRegistered {
                address: decoded.addr,
                public_key: decoded.pubkey,
                name: decoded.name,
                bio: decoded.bio,
                avatar: decoded.avatar,
            })))
        }
        Some(&MarketplaceData::UserUpdated::SIGNATURE_HASH) => {
            let decoded = MarketplaceData::UserUpdated::decode_log(&log.inner)
                .context("failed to ABI decode UserUpdated event")?
                .data;
            Ok(Some(DecodedEvent::User(UserEvent::UserUpdated {
                address: decoded.addr,
                name: decoded.name,
                bio: decoded.bio,
                avatar: decoded.avatar,
            })))
        }
        Some(&MarketplaceData::ArbitratorRegistered::SIGNATURE_HASH) => {
            let decoded = MarketplaceData::ArbitratorRegistered::decode_log(&log.inner)
                .context("failed to ABI decode ArbitratorRegistered event")?
                .data;
            Ok(Some(DecodedEvent::User(UserEvent::ArbitratorRegistered {
                address: decoded.addr,
                public_key: decoded.pubkey,
                name: decoded.name,
                bio: decoded.bio,
                avatar: decoded.avatar,
                fee: decoded.fee,
            })))
        }
        Some(&MarketplaceData::ArbitratorUpdated::SIGNATURE_HASH) => {
            let decoded = MarketplaceData::ArbitratorUpdated::decode_log(&log.inner)
                .context("failed to ABI decode ArbitratorUpdated event")?
                .data;
            Ok(Some(DecodedEvent::User(UserEvent::ArbitratorUpdated {
                address: decoded.addr,
                name: decoded.name,
                bio: decoded.bio,
                avatar: decoded.avatar,
            })))
        }
        _ => Ok(None),
    }
}

fn decode_actor(raw: &[u8]) -> Result<Option<Address>> {
    match raw.len() {
        0 => Ok(None),
        20 => Ok(Some(Address::from_slice(raw))),
        n => bail!("malformed actor address of {n} bytes"),
    }
}

fn decode_job_payload(kind: JobEventKind, data: &[u8]) -> Result<JobEventPayload> {
    let payload = match kind {
        JobEventKind::Created => {
            let (
                title,
                content_hash,
                multiple_applicants,
                tags,
                token,
                amount,
                max_time,
                delivery_method,
                arbitrator,
                whitelist_workers,
            ) = <(
                String,
                B256,
                bool,
                Vec<String>,
                Address,
                U256,
                u32,
                String,
                Address,
                bool,
            )>::abi_decode_sequence(data)
            .context("failed to ABI decode job creation payload")?;

            JobEventPayload::Created(JobCreatedDetails {
                title,
                content_hash,
                multiple_applicants,
                tags,
                token,
                amount,
                max_time,
                delivery_method,
                arbitrator,
                whitelist_workers,
            })
        }
        JobEventKind::Taken => JobEventPayload::Taken {
            escrow_id: U256::abi_decode(data).context("failed to ABI decode escrow id")?,
        },
        JobEventKind::Paid => JobEventPayload::Paid {
            escrow_id: U256::abi_decode(data).context("failed to ABI decode escrow id")?,
        },
        JobEventKind::Updated => {
            let (title, content_hash, tags, amount, max_time, arbitrator, whitelist_workers) =
                <(String, B256, Vec<String>, U256, u32, Address, bool)>::abi_decode_sequence(data)
                    .context("failed to ABI decode job update payload")?;

            JobEventPayload::Updated(JobUpdatedDetails {
                title,
                content_hash,
                tags,
                amount,
                max_time,
                arbitrator,
                whitelist_workers,
            })
        }
        JobEventKind::Signed => {
            let (revision, signature) = <(u16, Bytes)>::abi_decode_sequence(data)
                .context("failed to ABI decode job signature payload")?;
            JobEventPayload::Signed(JobSignedDetails {
                revision,
                signature,
            })
        }
        JobEventKind::Completed => JobEventPayload::Completed,
        JobEventKind::Delivered => JobEventPayload::Delivered {
            result_hash: B256::abi_decode(data).context("failed to ABI decode result hash")?,
        },
        JobEventKind::Closed => JobEventPayload::Closed,
        JobEventKind::Reopened => JobEventPayload::Reopened,
        JobEventKind::Rated => {
            // u8 has no SolValue mapping (it would collide with bytes), so
            // this one goes through the sol_data types directly.
            let (rating, review) =
                <(sol_data::Uint<8>, sol_data::String) as SolType>::abi_decode_sequence(data)
                    .context("failed to ABI decode rating payload")?;
            JobEventPayload::Rated(JobRatedDetails { rating, review })
        }
        JobEventKind::Refunded => JobEventPayload::Refunded,
        JobEventKind::Disputed => {
            let (session_key, content) = <(Bytes, Bytes)>::abi_decode_sequence(data)
                .context("failed to ABI decode dispute payload")?;
            JobEventPayload::Disputed(JobDisputedDetails {
                session_key,
                content,
            })
        }
        JobEventKind::Arbitrated => {
            let (
                creator_share,
                creator_amount,
                worker_share,
                worker_amount,
                reason_hash,
                worker_address,
                arbitrator_amount,
            ) = <(u16, U256, u16, U256, B256, Address, U256)>::abi_decode_sequence(data)
                .context("failed to ABI decode arbitration payload")?;

            JobEventPayload::Arbitrated(JobArbitratedDetails {
                creator_share,
                creator_amount,
                worker_share,
                worker_amount,
                reason_hash,
                worker_address,
                arbitrator_amount,
            })
        }
        JobEventKind::ArbitrationRefused => JobEventPayload::ArbitrationRefused,
        JobEventKind::WhitelistedWorkerAdded => JobEventPayload::WhitelistedWorkerAdded,
        JobEventKind::WhitelistedWorkerRemoved => JobEventPayload::WhitelistedWorkerRemoved,
        JobEventKind::CollateralWithdrawn => JobEventPayload::CollateralWithdrawn,
        JobEventKind::OwnerMessage => {
            let (content_hash, recipient) = <(B256, Address)>::abi_decode_sequence(data)
                .context("failed to ABI decode message payload")?;
            JobEventPayload::OwnerMessage(JobMessageDetails {
                content_hash,
                recipient,
            })
        }
        JobEventKind::WorkerMessage => {
            let (content_hash, recipient) = <(B256, Address)>::abi_decode_sequence(data)
                .context("failed to ABI decode message payload")?;
            JobEventPayload::WorkerMessage(JobMessageDetails {
                content_hash,
                recipient,
            })
        }
    };

    Ok(payload)
}

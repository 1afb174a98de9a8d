use std::future::Future;
use std::path::Path;
use std::str::FromStr;

use alloy::hex::ToHexExt;
use alloy::primitives::{Address, B256, U256};
use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::entities::{
    Arbitrator, Job, JobEventRow, JobRoles, Marketplace, Notification, PushSubscription, Review,
    User,
};

const MIGRATION_PATH: &str = "./migrations";

/// Marker stored in place of an actor address for events that carry none.
const NO_ACTOR: &str = "0x";

/// Everything one processed block range produced, flushed in a fixed order
/// so later tables never reference rows that have not landed yet.
#[derive(Debug, Clone, Default)]
pub struct BatchData {
    pub marketplaces: Vec<Marketplace>,
    pub users: Vec<User>,
    pub arbitrators: Vec<Arbitrator>,
    pub jobs: Vec<Job>,
    pub events: Vec<JobEventRow>,
    pub reviews: Vec<Review>,
    pub notifications: Vec<Notification>,
}

/// Persistence seam. Entities upsert by id (replay-safe); the append-only
/// tables insert with conflict-ignore so re-processing a range is a no-op.
pub trait Store {
    fn marketplace(
        &self,
        address: Address,
    ) -> impl Future<Output = Result<Option<Marketplace>>> + Send;

    fn user(&self, address: Address) -> impl Future<Output = Result<Option<User>>> + Send;

    fn arbitrator(
        &self,
        address: Address,
    ) -> impl Future<Output = Result<Option<Arbitrator>>> + Send;

    fn job(&self, id: u64) -> impl Future<Output = Result<Option<Job>>> + Send;

    fn push_subscriptions(
        &self,
        address: Address,
    ) -> impl Future<Output = Result<Vec<PushSubscription>>> + Send;

    fn delete_push_subscription(
        &self,
        endpoint: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    fn last_processed_block(&self) -> impl Future<Output = Result<i64>> + Send;

    /// Moves the cursor forward to `block` if it is currently behind it.
    /// Returns whether anything changed.
    fn advance_start_block(&self, block: i64) -> impl Future<Output = Result<bool>> + Send;

    /// Flushes a batch and advances the cursor inside one transaction, in
    /// the order marketplaces, users, arbitrators, jobs, events, reviews,
    /// notifications.
    fn commit(
        &self,
        batch: BatchData,
        end_block: i64,
    ) -> impl Future<Output = Result<()>> + Send;
}

#[derive(Clone, Debug)]
pub struct PgStore {
    pub pool: PgPool,
}

impl PgStore {
    pub async fn new(db_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
            .context("Failed to connect to the DATABASE_URL")?;

        Ok(Self { pool })
    }

    pub async fn apply_migrations(&self) -> Result<()> {
        let migrator = Migrator::new(Path::new(MIGRATION_PATH))
            .await
            .context("Failed to initialize the migrator")?;
        migrator
            .run(&self.pool)
            .await
            .context("Failed to apply migrations to the database")
    }

    async fn upsert_marketplaces(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        marketplaces: &[Marketplace],
    ) -> Result<()> {
        for marketplace in marketplaces {
            sqlx::query(
                r#"
                INSERT INTO marketplaces (
                    address, marketplace_data_address, owner, paused, treasury_address,
                    unicrow_address, unicrow_dispute_address, unicrow_arbitrator_address,
                    unicrow_marketplace_fee, version, job_count, user_count, arbitrator_count
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                ON CONFLICT (address) DO UPDATE SET
                    marketplace_data_address = EXCLUDED.marketplace_data_address,
                    owner = EXCLUDED.owner,
                    paused = EXCLUDED.paused,
                    treasury_address = EXCLUDED.treasury_address,
                    unicrow_address = EXCLUDED.unicrow_address,
                    unicrow_dispute_address = EXCLUDED.unicrow_dispute_address,
                    unicrow_arbitrator_address = EXCLUDED.unicrow_arbitrator_address,
                    unicrow_marketplace_fee = EXCLUDED.unicrow_marketplace_fee,
                    version = EXCLUDED.version,
                    job_count = EXCLUDED.job_count,
                    user_count = EXCLUDED.user_count,
                    arbitrator_count = EXCLUDED.arbitrator_count
                "#,
            )
            .bind(addr_string(marketplace.address))
            .bind(addr_string(marketplace.marketplace_data_address))
            .bind(addr_string(marketplace.owner))
            .bind(marketplace.paused)
            .bind(addr_string(marketplace.treasury_address))
            .bind(addr_string(marketplace.unicrow_address))
            .bind(addr_string(marketplace.unicrow_dispute_address))
            .bind(addr_string(marketplace.unicrow_arbitrator_address))
            .bind(marketplace.unicrow_marketplace_fee as i32)
            .bind(marketplace.version as i64)
            .bind(marketplace.job_count as i64)
            .bind(marketplace.user_count as i64)
            .bind(marketplace.arbitrator_count as i64)
            .execute(&mut **tx)
            .await
            .context("Failed to upsert marketplace")?;
        }

        Ok(())
    }

    async fn upsert_users(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        users: &[User],
    ) -> Result<()> {
        for user in users {
            sqlx::query(
                r#"
                INSERT INTO users (
                    address, public_key, name, bio, avatar, reputation_up,
                    reputation_down, average_rating, number_of_reviews, timestamp
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (address) DO UPDATE SET
                    public_key = EXCLUDED.public_key,
                    name = EXCLUDED.name,
                    bio = EXCLUDED.bio,
                    avatar = EXCLUDED.avatar,
                    reputation_up = EXCLUDED.reputation_up,
                    reputation_down = EXCLUDED.reputation_down,
                    average_rating = EXCLUDED.average_rating,
                    number_of_reviews = EXCLUDED.number_of_reviews,
                    timestamp = EXCLUDED.timestamp
                "#,
            )
            .bind(addr_string(user.address))
            .bind(&user.public_key)
            .bind(&user.name)
            .bind(&user.bio)
            .bind(&user.avatar)
            .bind(user.reputation_up as i64)
            .bind(user.reputation_down as i64)
            .bind(user.average_rating as i64)
            .bind(user.number_of_reviews as i64)
            .bind(user.timestamp as i64)
            .execute(&mut **tx)
            .await
            .context("Failed to upsert user")?;
        }

        Ok(())
    }

    async fn upsert_arbitrators(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        arbitrators: &[Arbitrator],
    ) -> Result<()> {
        for arbitrator in arbitrators {
            sqlx::query(
                r#"
                INSERT INTO arbitrators (
                    address, public_key, name, bio, avatar, fee,
                    settled_count, refused_count, timestamp
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (address) DO UPDATE SET
                    public_key = EXCLUDED.public_key,
                    name = EXCLUDED.name,
                    bio = EXCLUDED.bio,
                    avatar = EXCLUDED.avatar,
                    fee = EXCLUDED.fee,
                    settled_count = EXCLUDED.settled_count,
                    refused_count = EXCLUDED.refused_count,
                    timestamp = EXCLUDED.timestamp
                "#,
            )
            .bind(addr_string(arbitrator.address))
            .bind(&arbitrator.public_key)
            .bind(&arbitrator.name)
            .bind(&arbitrator.bio)
            .bind(&arbitrator.avatar)
            .bind(arbitrator.fee as i32)
            .bind(arbitrator.settled_count as i64)
            .bind(arbitrator.refused_count as i64)
            .bind(arbitrator.timestamp as i64)
            .execute(&mut **tx)
            .await
            .context("Failed to upsert arbitrator")?;
        }

        Ok(())
    }

    async fn upsert_jobs(&self, tx: &mut Transaction<'_, Postgres>, jobs: &[Job]) -> Result<()> {
        for job in jobs {
            sqlx::query(
                r#"
                INSERT INTO jobs (
                    id, state, creator, worker, arbitrator, title, tags, content_hash,
                    content, multiple_applicants, whitelist_workers, allowed_workers,
                    amount, token, timestamp, max_time, delivery_method, collateral_owed,
                    escrow_id, result_hash, rating, disputed, event_count, last_event_id,
                    times
                )
                VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20, $21, $22, $23, $24, $25
                )
                ON CONFLICT (id) DO UPDATE SET
                    state = EXCLUDED.state,
                    creator = EXCLUDED.creator,
                    worker = EXCLUDED.worker,
                    arbitrator = EXCLUDED.arbitrator,
                    title = EXCLUDED.title,
                    tags = EXCLUDED.tags,
                    content_hash = EXCLUDED.content_hash,
                    content = EXCLUDED.content,
                    multiple_applicants = EXCLUDED.multiple_applicants,
                    whitelist_workers = EXCLUDED.whitelist_workers,
                    allowed_workers = EXCLUDED.allowed_workers,
                    amount = EXCLUDED.amount,
                    token = EXCLUDED.token,
                    timestamp = EXCLUDED.timestamp,
                    max_time = EXCLUDED.max_time,
                    delivery_method = EXCLUDED.delivery_method,
                    collateral_owed = EXCLUDED.collateral_owed,
                    escrow_id = EXCLUDED.escrow_id,
                    result_hash = EXCLUDED.result_hash,
                    rating = EXCLUDED.rating,
                    disputed = EXCLUDED.disputed,
                    event_count = EXCLUDED.event_count,
                    last_event_id = EXCLUDED.last_event_id,
                    times = EXCLUDED.times
                "#,
            )
            .bind(job.id as i64)
            .bind(job.state.as_db_str())
            .bind(addr_string(job.roles.creator))
            .bind(addr_string(job.roles.worker))
            .bind(addr_string(job.roles.arbitrator))
            .bind(&job.title)
            .bind(jsonb(&job.tags)?)
            .bind(job.content_hash.encode_hex_with_prefix())
            .bind(&job.content)
            .bind(job.multiple_applicants)
            .bind(job.whitelist_workers)
            .bind(jsonb(&job.allowed_workers)?)
            .bind(numeric(job.amount)?)
            .bind(addr_string(job.token))
            .bind(job.timestamp as i64)
            .bind(job.max_time as i64)
            .bind(&job.delivery_method)
            .bind(numeric(job.collateral_owed)?)
            .bind(numeric(job.escrow_id)?)
            .bind(job.result_hash.encode_hex_with_prefix())
            .bind(job.rating as i16)
            .bind(job.disputed)
            .bind(job.event_count as i64)
            .bind(&job.last_event_id)
            .bind(jsonb(&job.times)?)
            .execute(&mut **tx)
            .await
            .context("Failed to upsert job")?;
        }

        Ok(())
    }

    async fn insert_events(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        events: &[JobEventRow],
    ) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let mut ids = Vec::with_capacity(events.len());
        let mut job_ids = Vec::with_capacity(events.len());
        let mut kinds = Vec::with_capacity(events.len());
        let mut actors = Vec::with_capacity(events.len());
        let mut datas = Vec::with_capacity(events.len());
        let mut timestamps = Vec::with_capacity(events.len());
        let mut details = Vec::with_capacity(events.len());

        for event in events {
            ids.push(event.id.clone());
            job_ids.push(event.job_id as i64);
            kinds.push(event.kind.as_db_str());
            actors.push(actor_string(event.actor));
            datas.push(event.data.encode_hex_with_prefix());
            timestamps.push(event.timestamp as i64);
            details.push(event.details.clone());
        }

        sqlx::query(
            r#"
            INSERT INTO job_events (id, job_id, kind, actor, data, timestamp, details)
            SELECT * FROM UNNEST(
                $1::VARCHAR[], $2::BIGINT[], $3::VARCHAR[], $4::TEXT[],
                $5::TEXT[], $6::BIGINT[], $7::JSONB[]
            )
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&ids)
        .bind(&job_ids)
        .bind(&kinds)
        .bind(&actors)
        .bind(&datas)
        .bind(&timestamps)
        .bind(&details)
        .execute(&mut **tx)
        .await
        .context("Failed to batch insert job events")?;

        Ok(())
    }

    async fn insert_reviews(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        reviews: &[Review],
    ) -> Result<()> {
        if reviews.is_empty() {
            return Ok(());
        }

        let mut ids = Vec::with_capacity(reviews.len());
        let mut job_ids = Vec::with_capacity(reviews.len());
        let mut targets = Vec::with_capacity(reviews.len());
        let mut reviewers = Vec::with_capacity(reviews.len());
        let mut ratings = Vec::with_capacity(reviews.len());
        let mut texts = Vec::with_capacity(reviews.len());
        let mut timestamps = Vec::with_capacity(reviews.len());

        for review in reviews {
            ids.push(review.id.clone());
            job_ids.push(review.job_id as i64);
            targets.push(addr_string(review.target));
            reviewers.push(addr_string(review.reviewer));
            ratings.push(review.rating as i16);
            texts.push(review.text.clone());
            timestamps.push(review.timestamp as i64);
        }

        sqlx::query(
            r#"
            INSERT INTO reviews (id, job_id, target, reviewer, rating, text, timestamp)
            SELECT * FROM UNNEST(
                $1::VARCHAR[], $2::BIGINT[], $3::CHAR(42)[], $4::CHAR(42)[],
                $5::SMALLINT[], $6::TEXT[], $7::BIGINT[]
            )
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&ids)
        .bind(&job_ids)
        .bind(&targets)
        .bind(&reviewers)
        .bind(&ratings)
        .bind(&texts)
        .bind(&timestamps)
        .execute(&mut **tx)
        .await
        .context("Failed to batch insert reviews")?;

        Ok(())
    }

    async fn insert_notifications(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        notifications: &[Notification],
    ) -> Result<()> {
        if notifications.is_empty() {
            return Ok(());
        }

        let mut ids = Vec::with_capacity(notifications.len());
        let mut addresses = Vec::with_capacity(notifications.len());
        let mut job_ids = Vec::with_capacity(notifications.len());
        let mut kinds = Vec::with_capacity(notifications.len());
        let mut actors = Vec::with_capacity(notifications.len());
        let mut timestamps = Vec::with_capacity(notifications.len());

        for notification in notifications {
            ids.push(notification.id.clone());
            addresses.push(addr_string(notification.address));
            job_ids.push(notification.job_id as i64);
            kinds.push(notification.kind.as_db_str());
            actors.push(actor_string(notification.actor));
            timestamps.push(notification.timestamp as i64);
        }

        sqlx::query(
            r#"
            INSERT INTO notifications (id, address, job_id, kind, actor, timestamp)
            SELECT * FROM UNNEST(
                $1::VARCHAR[], $2::CHAR(42)[], $3::BIGINT[], $4::VARCHAR[],
                $5::TEXT[], $6::BIGINT[]
            )
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&ids)
        .bind(&addresses)
        .bind(&job_ids)
        .bind(&kinds)
        .bind(&actors)
        .bind(&timestamps)
        .execute(&mut **tx)
        .await
        .context("Failed to batch insert notifications")?;

        Ok(())
    }

    async fn update_state(&self, tx: &mut Transaction<'_, Postgres>, block: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE indexer_state
            SET last_processed_block = $1, updated_at = now()
            WHERE id = 1
            "#,
        )
        .bind(block)
        .execute(&mut **tx)
        .await
        .context("Failed to update indexer state")?;

        Ok(())
    }
}

impl Store for PgStore {
    async fn marketplace(&self, address: Address) -> Result<Option<Marketplace>> {
        sqlx::query("SELECT * FROM marketplaces WHERE address = $1")
            .bind(addr_string(address))
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch marketplace")?
            .map(|row| marketplace_from_row(&row))
            .transpose()
    }

    async fn user(&self, address: Address) -> Result<Option<User>> {
        sqlx::query("SELECT * FROM users WHERE address = $1")
            .bind(addr_string(address))
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user")?
            .map(|row| user_from_row(&row))
            .transpose()
    }

    async fn arbitrator(&self, address: Address) -> Result<Option<Arbitrator>> {
        sqlx::query("SELECT * FROM arbitrators WHERE address = $1")
            .bind(addr_string(address))
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch arbitrator")?
            .map(|row| arbitrator_from_row(&row))
            .transpose()
    }

    async fn job(&self, id: u64) -> Result<Option<Job>> {
        sqlx::query("SELECT * FROM jobs WHERE id = $1")
            .bind(id as i64)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch job")?
            .map(|row| job_from_row(&row))
            .transpose()
    }

    async fn push_subscriptions(&self, address: Address) -> Result<Vec<PushSubscription>> {
        sqlx::query("SELECT endpoint, address, keys FROM push_subscriptions WHERE address = $1")
            .bind(addr_string(address))
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch push subscriptions")?
            .iter()
            .map(subscription_from_row)
            .collect()
    }

    async fn delete_push_subscription(&self, endpoint: &str) -> Result<()> {
        sqlx::query("DELETE FROM push_subscriptions WHERE endpoint = $1")
            .bind(endpoint)
            .execute(&self.pool)
            .await
            .context("Failed to delete push subscription")?;

        Ok(())
    }

    async fn last_processed_block(&self) -> Result<i64> {
        let row = sqlx::query("SELECT last_processed_block FROM indexer_state WHERE id = 1")
            .fetch_one(&self.pool)
            .await
            .context("Failed to fetch 'last_processed_block'")?;
        Ok(row.get::<i64, _>("last_processed_block"))
    }

    async fn advance_start_block(&self, block: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE indexer_state
            SET last_processed_block = $1, updated_at = now()
            WHERE id = 1 AND last_processed_block < $1
            "#,
        )
        .bind(block)
        .execute(&self.pool)
        .await
        .context("Failed to advance the start block")?;

        Ok(result.rows_affected() > 0)
    }

    async fn commit(&self, batch: BatchData, end_block: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        self.upsert_marketplaces(&mut tx, &batch.marketplaces)
            .await?;
        self.upsert_users(&mut tx, &batch.users).await?;
        self.upsert_arbitrators(&mut tx, &batch.arbitrators).await?;
        self.upsert_jobs(&mut tx, &batch.jobs).await?;
        self.insert_events(&mut tx, &batch.events).await?;
        self.insert_reviews(&mut tx, &batch.reviews).await?;
        self.insert_notifications(&mut tx, &batch.notifications)
            .await?;
        self.update_state(&mut tx, end_block).await?;

        tx.commit()
            .await
            .context("Failed to commit the batch transaction")
    }
}

fn marketplace_from_row(row: &PgRow) -> Result<Marketplace> {
    Ok(Marketplace {
        address: addr_from_str(&row.try_get::<String, _>("address")?)?,
        marketplace_data_address: addr_from_str(
            &row.try_get::<String, _>("marketplace_data_address")?,
        )?,
        owner: addr_from_str(&row.try_get::<String, _>("owner")?)?,
        paused: row.try_get("paused")?,
        treasury_address: addr_from_str(&row.try_get::<String, _>("treasury_address")?)?,
        unicrow_address: addr_from_str(&row.try_get::<String, _>("unicrow_address")?)?,
        unicrow_dispute_address: addr_from_str(
            &row.try_get::<String, _>("unicrow_dispute_address")?,
        )?,
        unicrow_arbitrator_address: addr_from_str(
            &row.try_get::<String, _>("unicrow_arbitrator_address")?,
        )?,
        unicrow_marketplace_fee: row.try_get::<i32, _>("unicrow_marketplace_fee")? as u16,
        version: row.try_get::<i64, _>("version")? as u64,
        job_count: row.try_get::<i64, _>("job_count")? as u64,
        user_count: row.try_get::<i64, _>("user_count")? as u64,
        arbitrator_count: row.try_get::<i64, _>("arbitrator_count")? as u64,
    })
}

fn user_from_row(row: &PgRow) -> Result<User> {
    Ok(User {
        address: addr_from_str(&row.try_get::<String, _>("address")?)?,
        public_key: row.try_get("public_key")?,
        name: row.try_get("name")?,
        bio: row.try_get("bio")?,
        avatar: row.try_get("avatar")?,
        reputation_up: row.try_get::<i64, _>("reputation_up")? as u64,
        reputation_down: row.try_get::<i64, _>("reputation_down")? as u64,
        average_rating: row.try_get::<i64, _>("average_rating")? as u64,
        number_of_reviews: row.try_get::<i64, _>("number_of_reviews")? as u64,
        timestamp: row.try_get::<i64, _>("timestamp")? as u64,
    })
}

fn arbitrator_from_row(row: &PgRow) -> Result<Arbitrator> {
    Ok(Arbitrator {
        address: addr_from_str(&row.try_get::<String, _>("address")?)?,
        public_key: row.try_get("public_key")?,
        name: row.try_get("name")?,
        bio: row.try_get("bio")?,
        avatar: row.try_get("avatar")?,
        fee: row.try_get::<i32, _>("fee")? as u16,
        settled_count: row.try_get::<i64, _>("settled_count")? as u64,
        refused_count: row.try_get::<i64, _>("refused_count")? as u64,
        timestamp: row.try_get::<i64, _>("timestamp")? as u64,
    })
}

fn job_from_row(row: &PgRow) -> Result<Job> {
    let state = row.try_get::<String, _>("state")?;

    Ok(Job {
        id: row.try_get::<i64, _>("id")? as u64,
        state: crate::entities::JobState::from_db_str(&state)
            .with_context(|| format!("unknown job state value: {state}"))?,
        roles: JobRoles {
            creator: addr_from_str(&row.try_get::<String, _>("creator")?)?,
            worker: addr_from_str(&row.try_get::<String, _>("worker")?)?,
            arbitrator: addr_from_str(&row.try_get::<String, _>("arbitrator")?)?,
        },
        title: row.try_get("title")?,
        tags: serde_json::from_value(row.try_get("tags")?)
            .context("failed to decode job tags")?,
        content_hash: hash_from_str(&row.try_get::<String, _>("content_hash")?)?,
        content: row.try_get("content")?,
        multiple_applicants: row.try_get("multiple_applicants")?,
        whitelist_workers: row.try_get("whitelist_workers")?,
        allowed_workers: serde_json::from_value(row.try_get("allowed_workers")?)
            .context("failed to decode job allowed workers")?,
        amount: u256_from_numeric(&row.try_get::<BigDecimal, _>("amount")?)?,
        token: addr_from_str(&row.try_get::<String, _>("token")?)?,
        timestamp: row.try_get::<i64, _>("timestamp")? as u64,
        max_time: row.try_get::<i64, _>("max_time")? as u32,
        delivery_method: row.try_get("delivery_method")?,
        collateral_owed: u256_from_numeric(&row.try_get::<BigDecimal, _>("collateral_owed")?)?,
        escrow_id: u256_from_numeric(&row.try_get::<BigDecimal, _>("escrow_id")?)?,
        result_hash: hash_from_str(&row.try_get::<String, _>("result_hash")?)?,
        rating: row.try_get::<i16, _>("rating")? as u8,
        disputed: row.try_get("disputed")?,
        event_count: row.try_get::<i64, _>("event_count")? as u64,
        last_event_id: row.try_get("last_event_id")?,
        times: serde_json::from_value(row.try_get("times")?)
            .context("failed to decode job times")?,
    })
}

fn subscription_from_row(row: &PgRow) -> Result<PushSubscription> {
    Ok(PushSubscription {
        endpoint: row.try_get("endpoint")?,
        address: addr_from_str(&row.try_get::<String, _>("address")?)?,
        keys: row.try_get("keys")?,
    })
}

fn addr_string(address: Address) -> String {
    address.to_checksum(None)
}

fn addr_from_str(value: &str) -> Result<Address> {
    value
        .trim()
        .parse()
        .with_context(|| format!("invalid address value: {value}"))
}

fn hash_from_str(value: &str) -> Result<B256> {
    value
        .trim()
        .parse()
        .with_context(|| format!("invalid hash value: {value}"))
}

fn actor_string(actor: Option<Address>) -> String {
    match actor {
        Some(address) => address.to_checksum(None),
        None => NO_ACTOR.to_string(),
    }
}

fn numeric(value: U256) -> Result<BigDecimal> {
    BigDecimal::from_str(&value.to_string()).context("failed to convert amount to NUMERIC")
}

fn u256_from_numeric(value: &BigDecimal) -> Result<U256> {
    U256::from_str(&value.to_string())
        .with_context(|| format!("NUMERIC value out of range: {value}"))
}

fn jsonb<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).context("failed to JSON encode column value")
}

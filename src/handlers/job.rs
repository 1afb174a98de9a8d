use alloy::primitives::{Address, B256, U256};
use anyhow::Result;
use thiserror::Error;
use tracing::{info, warn};

use crate::cache::Batch;
use crate::content::ContentStore;
use crate::entities::{
    Arbitrator, Job, JobEventRow, JobState, Review, User, COLLATERAL_GRACE_SECS,
};
use crate::events::{JobEnvelope, JobEventKind, JobEventPayload};
use crate::notify;
use crate::store::Store;

/// Failures that invalidate the whole batch. These are never retried: the
/// log stream is strictly ordered, so hitting one means the database view
/// and the chain have diverged and a human has to look.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexerError {
    #[error("job {0} does not exist for a {1:?} event, the log stream is out of order")]
    MissingJob(u64, JobEventKind),
    #[error("{1:?} event for job {0} carries no actor address")]
    MissingActor(u64, JobEventKind),
}

/// Applies one job event: advances the job, refreshes off-chain content,
/// settles counterparty entities, then records the event row and its
/// notifications. The transition itself is pure; everything with IO happens
/// around it.
pub async fn apply<S, C>(
    batch: &mut Batch<'_, S>,
    content: &C,
    marketplace: Address,
    event_id: &str,
    envelope: &JobEnvelope,
) -> Result<()>
where
    S: Store,
    C: ContentStore,
{
    let previous = batch.job(envelope.job_id).await?;

    let mut job = advance(previous.as_ref(), envelope)?;
    refresh_content(content, previous.as_ref(), &mut job, envelope).await;
    settle_counterparties(batch, marketplace, previous.as_ref(), &job, envelope, event_id).await?;

    job.event_count += 1;
    job.last_event_id = Some(event_id.to_string());
    job.times.last_event_at = envelope.timestamp;

    batch
        .notifications
        .extend(notify::fan_out(event_id, previous.as_ref(), &job, envelope));
    batch.events.push(JobEventRow {
        id: event_id.to_string(),
        job_id: envelope.job_id,
        kind: envelope.kind,
        actor: envelope.actor,
        data: envelope.data.clone(),
        timestamp: envelope.timestamp,
        details: envelope.payload.details_json()?,
    });
    batch.put_job(job);

    info!(job = envelope.job_id, kind = ?envelope.kind, "processed job event");

    Ok(())
}

/// The pure state transition. Only `Created` starts from nothing; every
/// other kind demands an existing job.
fn advance(previous: Option<&Job>, envelope: &JobEnvelope) -> Result<Job, IndexerError> {
    let ts = envelope.timestamp;

    if let JobEventPayload::Created(details) = &envelope.payload {
        // A replayed creation rebuilds the job from scratch, which lands on
        // the same row either way.
        let creator = require_actor(envelope)?;
        return Ok(Job::from_created(envelope.job_id, details, creator, ts));
    }

    let Some(previous) = previous else {
        return Err(IndexerError::MissingJob(envelope.job_id, envelope.kind));
    };
    let mut job = previous.clone();

    match &envelope.payload {
        // Handled above; the arm stays so new kinds cannot slip through.
        JobEventPayload::Created(_) => {}
        JobEventPayload::Taken { escrow_id } | JobEventPayload::Paid { escrow_id } => {
            // The contract lets a second assignment land without the first
            // being released; mirrored as-is, last write wins.
            job.roles.worker = require_actor(envelope)?;
            job.state = JobState::Taken;
            job.escrow_id = *escrow_id;
            job.times.assigned_at = ts;
        }
        JobEventPayload::Updated(details) => {
            job.title = details.title.clone();
            job.content_hash = details.content_hash;
            job.tags = details.tags.clone();
            job.max_time = details.max_time;
            job.roles.arbitrator = details.arbitrator;
            job.whitelist_workers = details.whitelist_workers;
            job.times.updated_at = ts;

            let old = job.amount;
            let new = details.amount;
            if new > old {
                job.collateral_owed = U256::ZERO;
            } else if old - new > U256::ZERO {
                if ts >= job.timestamp + COLLATERAL_GRACE_SECS {
                    job.collateral_owed = U256::ZERO;
                } else {
                    job.collateral_owed += old - new;
                }
            }
            job.amount = new;
        }
        JobEventPayload::Signed(_) => {}
        JobEventPayload::Completed => {
            job.state = JobState::Closed;
            job.times.closed_at = ts;
        }
        JobEventPayload::Delivered { result_hash } => {
            job.result_hash = *result_hash;
        }
        JobEventPayload::Closed => {
            job.state = JobState::Closed;
            job.times.closed_at = ts;
            if ts >= job.timestamp + COLLATERAL_GRACE_SECS {
                job.collateral_owed = U256::ZERO;
            } else {
                job.collateral_owed += job.amount;
            }
        }
        JobEventPayload::Reopened => {
            job.state = JobState::Open;
            job.result_hash = B256::ZERO;
            // The grace clock restarts from the reopen.
            job.timestamp = ts;
            job.times.opened_at = ts;
            if job.collateral_owed < job.amount {
                job.collateral_owed = U256::ZERO;
            } else {
                job.collateral_owed -= job.amount;
            }
        }
        JobEventPayload::Rated(details) => {
            job.rating = details.rating;
        }
        JobEventPayload::Refunded => {
            if envelope.actor == Some(job.roles.worker) {
                let worker = job.roles.worker;
                job.allowed_workers.retain(|allowed| *allowed != worker);
            }
            job.roles.worker = Address::ZERO;
            job.state = JobState::Open;
            job.escrow_id = U256::ZERO;
            job.disputed = false;
            job.times.opened_at = ts;
        }
        JobEventPayload::Disputed(_) => {
            job.disputed = true;
            job.times.disputed_at = ts;
        }
        JobEventPayload::Arbitrated(details) => {
            job.state = JobState::Closed;
            job.collateral_owed += details.creator_amount;
            job.disputed = false;
            job.times.arbitrated_at = ts;
            job.times.closed_at = ts;
        }
        JobEventPayload::ArbitrationRefused => {
            job.roles.arbitrator = Address::ZERO;
        }
        JobEventPayload::WhitelistedWorkerAdded => {
            let worker = require_actor(envelope)?;
            if !job.allowed_workers.contains(&worker) {
                job.allowed_workers.push(worker);
            }
        }
        JobEventPayload::WhitelistedWorkerRemoved => {
            let worker = require_actor(envelope)?;
            job.allowed_workers.retain(|allowed| *allowed != worker);
        }
        JobEventPayload::CollateralWithdrawn => {
            job.collateral_owed = U256::ZERO;
        }
        JobEventPayload::OwnerMessage(_) | JobEventPayload::WorkerMessage(_) => {}
    }

    Ok(job)
}

fn require_actor(envelope: &JobEnvelope) -> Result<Address, IndexerError> {
    envelope
        .actor
        .ok_or(IndexerError::MissingActor(envelope.job_id, envelope.kind))
}

/// Job bodies live off chain, keyed by content hash. A fetch failure
/// degrades to an empty body instead of stalling indexing.
async fn refresh_content<C: ContentStore>(
    content: &C,
    previous: Option<&Job>,
    job: &mut Job,
    envelope: &JobEnvelope,
) {
    let hash = match &envelope.payload {
        JobEventPayload::Created(details) => details.content_hash,
        JobEventPayload::Updated(details)
            if previous.map(|job| job.content_hash) != Some(details.content_hash) =>
        {
            details.content_hash
        }
        _ => return,
    };

    job.content = fetch_content(content, hash).await;
}

async fn fetch_content<C: ContentStore>(content: &C, hash: B256) -> String {
    if hash == B256::ZERO {
        return String::new();
    }
    match content.fetch(hash).await {
        Ok(body) => body,
        Err(err) => {
            warn!(%hash, error = ?err, "failed to fetch job content");
            String::new()
        }
    }
}

/// Entity updates beyond the job itself: marketplace counters, worker
/// reputation, arbitrator tallies, review rows. Registration is not
/// guaranteed to precede job activity, so an unknown counterparty is a
/// warning, not an error.
async fn settle_counterparties<S: Store>(
    batch: &mut Batch<'_, S>,
    marketplace: Address,
    previous: Option<&Job>,
    job: &Job,
    envelope: &JobEnvelope,
    event_id: &str,
) -> Result<()> {
    match &envelope.payload {
        JobEventPayload::Created(_) => {
            let mut marketplace = batch.marketplace(marketplace).await?;
            marketplace.job_count += 1;
            batch.put_marketplace(marketplace);
        }
        JobEventPayload::Delivered { .. } => {
            update_user(batch, job.roles.worker, envelope, |user: &mut User| {
                user.reputation_up += 1
            })
            .await?;
        }
        JobEventPayload::Refunded => {
            if let Some(previous) = previous {
                if envelope.actor == Some(previous.roles.worker) {
                    update_user(batch, previous.roles.worker, envelope, |user: &mut User| {
                        user.reputation_down += 1
                    })
                    .await?;
                }
            }
        }
        JobEventPayload::Rated(details) => {
            update_user(batch, job.roles.worker, envelope, |user: &mut User| {
                user.record_rating(details.rating)
            })
            .await?;
            batch.reviews.push(Review {
                id: event_id.to_string(),
                job_id: job.id,
                target: job.roles.worker,
                reviewer: require_actor(envelope)?,
                rating: details.rating,
                text: details.review.clone(),
                timestamp: envelope.timestamp,
            });
        }
        JobEventPayload::Arbitrated(_) => {
            if let Some(previous) = previous {
                update_arbitrator(batch, previous.roles.arbitrator, envelope, |arbitrator| {
                    arbitrator.settled_count += 1
                })
                .await?;
            }
        }
        JobEventPayload::ArbitrationRefused => {
            // The transition already cleared the role, go by the snapshot.
            if let Some(previous) = previous {
                update_arbitrator(batch, previous.roles.arbitrator, envelope, |arbitrator| {
                    arbitrator.refused_count += 1
                })
                .await?;
            }
        }
        _ => {}
    }

    Ok(())
}

async fn update_user<S, F>(
    batch: &mut Batch<'_, S>,
    address: Address,
    envelope: &JobEnvelope,
    update: F,
) -> Result<()>
where
    S: Store,
    F: FnOnce(&mut User),
{
    if address == Address::ZERO {
        return Ok(());
    }
    match batch.user(address).await? {
        Some(mut user) => {
            update(&mut user);
            batch.put_user(user);
        }
        None => warn!(
            job = envelope.job_id,
            %address,
            kind = ?envelope.kind,
            "reputation update for an unregistered user, skipping"
        ),
    }
    Ok(())
}

async fn update_arbitrator<S, F>(
    batch: &mut Batch<'_, S>,
    address: Address,
    envelope: &JobEnvelope,
    update: F,
) -> Result<()>
where
    S: Store,
    F: FnOnce(&mut Arbitrator),
{
    if address == Address::ZERO {
        return Ok(());
    }
    match batch.arbitrator(address).await? {
        Some(mut arbitrator) => {
            update(&mut arbitrator);
            batch.put_arbitrator(arbitrator);
        }
        None => warn!(
            job = envelope.job_id,
            %address,
            kind = ?envelope.kind,
            "tally update for an unregistered arbitrator, skipping"
        ),
    }
    Ok(())
}

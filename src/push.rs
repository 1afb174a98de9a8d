use std::future::Future;
use std::time::Duration;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use futures::future::join_all;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::entities::{Notification, PushSubscription};
use crate::events::JobEventKind;
use crate::store::Store;

/// Attempts per subscription before a notification is abandoned.
const MAX_DELIVERY_ATTEMPTS: u32 = 5;
const RETRY_BASE_DELAY_MS: u64 = 1000;
const RETRY_BACKOFF_FACTOR: f64 = 1.5;

/// Statuses worth retrying; everything else is terminal for the attempt.
const RETRYABLE_STATUS: [u16; 4] = [100, 102, 429, 503];
/// Statuses that prove the subscription is dead or unusable.
const PRUNE_STATUS: [u16; 5] = [400, 401, 403, 404, 410];

/// Trimmed notification body sent to the push relay. Deliberately excludes
/// anything not already public on chain.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    pub id: String,
    pub job_id: u64,
    #[serde(rename = "type")]
    pub kind: JobEventKind,
    pub actor: Option<Address>,
    pub timestamp: u64,
}

impl PushPayload {
    pub fn from_notification(notification: &Notification) -> Self {
        PushPayload {
            id: notification.id.clone(),
            job_id: notification.job_id,
            kind: notification.kind,
            actor: notification.actor,
            timestamp: notification.timestamp,
        }
    }
}

/// One push attempt against a single subscription endpoint.
pub trait PushTransport {
    fn push(
        &self,
        subscription: &PushSubscription,
        payload: &PushPayload,
    ) -> impl Future<Output = Result<StatusCode>> + Send;
}

/// Relays payloads to a web push service over authenticated POSTs.
#[derive(Clone)]
pub struct HttpPushTransport {
    client: Client,
    endpoint: Url,
    auth_token: String,
}

impl HttpPushTransport {
    pub fn new(endpoint: Url, auth_token: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(8))
            .build()
            .context("Failed to initialize client for push delivery")?;

        Ok(Self {
            client,
            endpoint,
            auth_token,
        })
    }
}

impl PushTransport for HttpPushTransport {
    async fn push(
        &self,
        subscription: &PushSubscription,
        payload: &PushPayload,
    ) -> Result<StatusCode> {
        let body = serde_json::json!({
            "subscription": {
                "endpoint": subscription.endpoint,
                "keys": subscription.keys,
            },
            "payload": payload,
        });

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.auth_token)
            .json(&body)
            .send()
            .await
            .context("failed to reach the push relay")?;

        Ok(response.status())
    }
}

/// Fans a batch of notifications out to every live subscription of each
/// recipient. Failures are logged, never propagated; indexing must not stall
/// on a flaky push service.
pub async fn deliver<S, T>(store: &S, transport: &T, notifications: &[Notification])
where
    S: Store + Sync,
    T: PushTransport + Sync,
{
    let mut deliveries = Vec::new();
    for notification in notifications {
        let subscriptions = match store.push_subscriptions(notification.address).await {
            Ok(subscriptions) => subscriptions,
            Err(err) => {
                warn!(
                    recipient = %notification.address,
                    error = ?err,
                    "failed to load push subscriptions"
                );
                continue;
            }
        };

        let payload = PushPayload::from_notification(notification);
        for subscription in subscriptions {
            deliveries.push(deliver_to_subscription(
                store,
                transport,
                subscription,
                payload.clone(),
            ));
        }
    }

    join_all(deliveries).await;
}

/// Pushes one payload to one subscription, retrying transient statuses with
/// exponential backoff and pruning subscriptions the relay reports as dead.
async fn deliver_to_subscription<S, T>(
    store: &S,
    transport: &T,
    subscription: PushSubscription,
    payload: PushPayload,
) where
    S: Store,
    T: PushTransport,
{
    let mut delay = RETRY_BASE_DELAY_MS as f64;
    for attempt in 0..MAX_DELIVERY_ATTEMPTS {
        match transport.push(&subscription, &payload).await {
            Ok(status) if status.is_success() => {
                info!(
                    endpoint = subscription.endpoint,
                    notification = payload.id,
                    "push delivered"
                );
                return;
            }
            Ok(status) if PRUNE_STATUS.contains(&status.as_u16()) => {
                info!(
                    endpoint = subscription.endpoint,
                    %status,
                    "pruning dead push subscription"
                );
                if let Err(err) = store.delete_push_subscription(&subscription.endpoint).await {
                    warn!(
                        endpoint = subscription.endpoint,
                        error = ?err,
                        "failed to prune push subscription"
                    );
                }
                return;
            }
            Ok(status) if RETRYABLE_STATUS.contains(&status.as_u16()) => {
                warn!(
                    endpoint = subscription.endpoint,
                    %status,
                    attempt,
                    "push attempt failed"
                );
            }
            Ok(status) => {
                warn!(
                    endpoint = subscription.endpoint,
                    %status,
                    "push rejected, keeping subscription"
                );
                return;
            }
            Err(err) => {
                warn!(
                    endpoint = subscription.endpoint,
                    error = ?err,
                    attempt,
                    "push attempt failed"
                );
            }
        }

        if attempt + 1 < MAX_DELIVERY_ATTEMPTS {
            sleep(Duration::from_millis(delay as u64)).await;
            delay *= RETRY_BACKOFF_FACTOR;
        }
    }

    warn!(
        endpoint = subscription.endpoint,
        notification = payload.id,
        "push abandoned after repeated failures"
    );
}

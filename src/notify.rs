use alloy::primitives::Address;

use crate::entities::{notification_id, Job, Notification};
use crate::events::{JobEnvelope, JobEventKind, JobEventPayload};

/// Resolves who should hear about a job event, from the job snapshots around
/// the transition and the envelope itself. Pure, so the table is testable
/// without a store. The zero address is never notified and duplicates
/// collapse to one entry.
pub fn recipients(previous: Option<&Job>, current: &Job, envelope: &JobEnvelope) -> Vec<Address> {
    let mut out: Vec<Address> = Vec::new();
    let mut push = |address: Address| {
        if address != Address::ZERO && !out.contains(&address) {
            out.push(address);
        }
    };

    match envelope.kind {
        JobEventKind::Created => push(current.roles.arbitrator),
        JobEventKind::Taken
        | JobEventKind::Paid
        | JobEventKind::Signed
        | JobEventKind::Delivered
        | JobEventKind::Refunded => push(current.roles.creator),
        JobEventKind::Updated => {
            push(current.roles.worker);
            // An arbitrator swap concerns both the outgoing and the incoming one.
            if let Some(previous) = previous {
                if previous.roles.arbitrator != current.roles.arbitrator {
                    push(previous.roles.arbitrator);
                    push(current.roles.arbitrator);
                }
            }
        }
        JobEventKind::Completed | JobEventKind::Closed | JobEventKind::Rated => {
            push(current.roles.worker)
        }
        JobEventKind::Disputed => {
            if envelope.actor == Some(current.roles.creator) {
                push(current.roles.worker);
            } else {
                push(current.roles.creator);
            }
            push(current.roles.arbitrator);
        }
        JobEventKind::Arbitrated | JobEventKind::ArbitrationRefused => {
            push(current.roles.creator);
            push(current.roles.worker);
        }
        JobEventKind::WhitelistedWorkerAdded | JobEventKind::WhitelistedWorkerRemoved => {
            if let Some(actor) = envelope.actor {
                push(actor);
            }
        }
        JobEventKind::Reopened | JobEventKind::CollateralWithdrawn => {}
        JobEventKind::OwnerMessage | JobEventKind::WorkerMessage => {
            if let Some(recipient) = message_recipient(envelope) {
                push(recipient);
            }
        }
    }

    out
}

fn message_recipient(envelope: &JobEnvelope) -> Option<Address> {
    match &envelope.payload {
        JobEventPayload::OwnerMessage(details) | JobEventPayload::WorkerMessage(details) => {
            Some(details.recipient)
        }
        _ => None,
    }
}

/// Builds the pending notification rows for one processed event. Row ids are
/// derived from the event id and recipient, so replays land on the same keys.
pub fn fan_out(
    event_id: &str,
    previous: Option<&Job>,
    current: &Job,
    envelope: &JobEnvelope,
) -> Vec<Notification> {
    recipients(previous, current, envelope)
        .into_iter()
        .map(|address| Notification {
            id: notification_id(event_id, address),
            address,
            job_id: envelope.job_id,
            kind: envelope.kind,
            actor: envelope.actor,
            timestamp: envelope.timestamp,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Bytes, B256, U256};

    use super::*;
    use crate::events::{
        JobCreatedDetails, JobDisputedDetails, JobMessageDetails, JobUpdatedDetails,
    };

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn created_details(arbitrator: Address) -> JobCreatedDetails {
        JobCreatedDetails {
            title: "job".into(),
            content_hash: B256::ZERO,
            multiple_applicants: false,
            tags: vec![],
            token: Address::ZERO,
            amount: U256::from(10),
            max_time: 100,
            delivery_method: "ipfs".into(),
            arbitrator,
            whitelist_workers: false,
        }
    }

    fn job(creator: Address, worker: Address, arbitrator: Address) -> Job {
        let mut job = Job::from_created(7, &created_details(arbitrator), creator, 1000);
        job.roles.worker = worker;
        job
    }

    fn envelope(payload: JobEventPayload, actor: Option<Address>) -> JobEnvelope {
        JobEnvelope {
            job_id: 7,
            kind: payload.kind(),
            actor,
            data: Bytes::new(),
            timestamp: 1234,
            payload,
        }
    }

    fn updated_payload(arbitrator: Address) -> JobEventPayload {
        JobEventPayload::Updated(JobUpdatedDetails {
            title: "job".into(),
            content_hash: B256::ZERO,
            tags: vec![],
            amount: U256::from(10),
            max_time: 100,
            arbitrator,
            whitelist_workers: false,
        })
    }

    fn disputed_payload() -> JobEventPayload {
        JobEventPayload::Disputed(JobDisputedDetails {
            session_key: Bytes::new(),
            content: Bytes::new(),
        })
    }

    #[test]
    fn created_notifies_the_arbitrator_when_one_is_set() {
        let envelope = envelope(
            JobEventPayload::Created(created_details(addr(3))),
            Some(addr(1)),
        );

        let current = job(addr(1), Address::ZERO, addr(3));
        assert_eq!(recipients(None, &current, &envelope), vec![addr(3)]);

        let without = job(addr(1), Address::ZERO, Address::ZERO);
        assert!(recipients(None, &without, &envelope).is_empty());
    }

    #[test]
    fn taken_notifies_the_creator() {
        let previous = job(addr(1), Address::ZERO, Address::ZERO);
        let current = job(addr(1), addr(2), Address::ZERO);
        let envelope = envelope(
            JobEventPayload::Taken {
                escrow_id: U256::from(9),
            },
            Some(addr(2)),
        );

        assert_eq!(
            recipients(Some(&previous), &current, &envelope),
            vec![addr(1)]
        );
    }

    #[test]
    fn updated_notifies_both_arbitrators_on_a_swap() {
        let previous = job(addr(1), addr(2), addr(3));
        let current = job(addr(1), addr(2), addr(4));
        let envelope = envelope(updated_payload(addr(4)), Some(addr(1)));

        assert_eq!(
            recipients(Some(&previous), &current, &envelope),
            vec![addr(2), addr(3), addr(4)]
        );
    }

    #[test]
    fn updated_without_an_arbitrator_change_notifies_only_the_worker() {
        let previous = job(addr(1), addr(2), addr(3));
        let current = job(addr(1), addr(2), addr(3));
        let envelope = envelope(updated_payload(addr(3)), Some(addr(1)));

        assert_eq!(
            recipients(Some(&previous), &current, &envelope),
            vec![addr(2)]
        );
    }

    #[test]
    fn disputed_notifies_the_other_party_and_the_arbitrator() {
        let current = job(addr(1), addr(2), addr(3));

        let by_creator = envelope(disputed_payload(), Some(addr(1)));
        assert_eq!(
            recipients(Some(&current), &current, &by_creator),
            vec![addr(2), addr(3)]
        );

        let by_worker = envelope(disputed_payload(), Some(addr(2)));
        assert_eq!(
            recipients(Some(&current), &current, &by_worker),
            vec![addr(1), addr(3)]
        );
    }

    #[test]
    fn arbitration_outcomes_notify_creator_and_worker() {
        let current = job(addr(1), addr(2), addr(3));
        let envelope = envelope(JobEventPayload::ArbitrationRefused, Some(addr(3)));

        assert_eq!(
            recipients(Some(&current), &current, &envelope),
            vec![addr(1), addr(2)]
        );
    }

    #[test]
    fn messages_notify_the_declared_recipient() {
        let current = job(addr(1), addr(2), Address::ZERO);
        let envelope = envelope(
            JobEventPayload::WorkerMessage(JobMessageDetails {
                content_hash: B256::ZERO,
                recipient: addr(1),
            }),
            Some(addr(2)),
        );

        assert_eq!(
            recipients(Some(&current), &current, &envelope),
            vec![addr(1)]
        );
    }

    #[test]
    fn zero_addresses_and_duplicates_are_dropped() {
        // Worker unset, nothing to notify.
        let open = job(addr(1), Address::ZERO, Address::ZERO);
        let completed = envelope(JobEventPayload::Completed, Some(addr(1)));
        assert!(recipients(Some(&open), &open, &completed).is_empty());

        // Arbitrator doubles as the non-initiating party.
        let current = job(addr(1), addr(2), addr(2));
        let disputed = envelope(disputed_payload(), Some(addr(1)));
        assert_eq!(
            recipients(Some(&current), &current, &disputed),
            vec![addr(2)]
        );
    }

    #[test]
    fn fan_out_builds_replay_stable_rows() {
        let previous = job(addr(1), Address::ZERO, Address::ZERO);
        let current = job(addr(1), addr(2), Address::ZERO);
        let envelope = envelope(
            JobEventPayload::Taken {
                escrow_id: U256::from(9),
            },
            Some(addr(2)),
        );

        let rows = fan_out(
            "000000000042-deadbeef-000001",
            Some(&previous),
            &current,
            &envelope,
        );

        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].id,
            format!("000000000042-deadbeef-000001-{}", addr(1))
        );
        assert_eq!(rows[0].address, addr(1));
        assert_eq!(rows[0].job_id, 7);
        assert_eq!(rows[0].kind, JobEventKind::Taken);
        assert_eq!(rows[0].actor, Some(addr(2)));
        assert_eq!(rows[0].timestamp, 1234);
    }
}

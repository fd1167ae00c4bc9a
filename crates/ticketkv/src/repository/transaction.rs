//! Transaction repository.
//!
//! A live transaction holds the compound claim `user_<p>:event_<e>`, so a
//! participant can hold at most one non-cancelled ticket per event.
//! Cancelling releases the claim and the participant may buy again.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use ticketkv_core::{
    validate_status_transition, validate_transaction, Event, PaymentStatus, RecordId, Transaction,
    User, ValidationError,
};
use ticketkv_store::KvBackend;

use super::{find_record, Store};
use crate::clock::Clock;
use crate::error::Result;

/// A transaction with its participant, event and the event's creator.
///
/// Relations that no longer resolve are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionDetails {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub participant: Option<User>,
    pub event: Option<Event>,
    pub creator: Option<User>,
}

#[derive(Clone)]
pub struct TransactionRepository {
    store: Store<Transaction>,
    events: Store<Event>,
    users: Store<User>,
    clock: Arc<dyn Clock>,
    enforce_transitions: bool,
}

impl TransactionRepository {
    pub fn new(backend: Arc<dyn KvBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Store::new(backend.clone()),
            events: Store::new(backend.clone()),
            users: Store::new(backend),
            clock,
            enforce_transitions: true,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.store = self.store.with_timeout(timeout);
        self.events = self.events.with_timeout(timeout);
        self.users = self.users.with_timeout(timeout);
        self
    }

    /// Turn payment status checks on updates on or off.
    pub fn with_status_transitions(mut self, enforce: bool) -> Self {
        self.enforce_transitions = enforce;
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Record a purchase. The status always starts at `Pending`.
    pub async fn create(&self, mut trx: Transaction) -> Result<Transaction> {
        trx.status = Some(PaymentStatus::Pending);
        validate_transaction(&trx)?;

        let created = self.store.create(trx, self.clock.now()).await?;
        tracing::debug!(
            id = %created.id,
            participant = %created.participant_id,
            event = %created.event_id,
            "created transaction"
        );
        Ok(created)
    }

    /// Merge `partial` over the stored transaction.
    ///
    /// A changed participant or event moves the compound claim; a
    /// cancellation status releases it.
    pub async fn update(&self, partial: Transaction) -> Result<Transaction> {
        let previous = self.store.load_previous(partial.id).await?;
        let merged = self.store.merge(partial, &previous, self.clock.now())?;

        if self.enforce_transitions {
            if let (Some(from), Some(to)) = (previous.status, merged.status) {
                validate_status_transition(from, to)?;
            }
        }
        validate_transaction(&merged)?;

        Ok(self.store.commit_update(merged, &previous).await?)
    }

    /// Cancel a transaction, freeing the participant to buy again.
    pub async fn cancel(&self, id: RecordId) -> Result<Transaction> {
        self.set_status(id, PaymentStatus::Cancelled).await
    }

    /// Refund and cancel a transaction.
    pub async fn refund(&self, id: RecordId) -> Result<Transaction> {
        self.set_status(id, PaymentStatus::RefundCancelled).await
    }

    /// Soft-delete. A live compound claim is released.
    pub async fn delete(&self, id: RecordId) -> Result<Transaction> {
        Ok(self.store.soft_delete(id, self.clock.now()).await?)
    }

    async fn set_status(&self, id: RecordId, status: PaymentStatus) -> Result<Transaction> {
        if id.is_zero() {
            return Err(ValidationError::MissingId.into());
        }
        self.update(Transaction {
            id,
            status: Some(status),
            ..Transaction::default()
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn get(&self, id: RecordId) -> Result<Option<Transaction>> {
        Ok(self.store.get(id).await?)
    }

    /// Find by `transaction_<id>` or by `user_<p>:event_<e>`. The compound
    /// form only matches a transaction that is not cancelled.
    pub async fn find(&self, key_or_value: &str) -> Result<Option<Transaction>> {
        find_record(&self.store, key_or_value).await
    }

    pub async fn find_with_relations(&self, key_or_value: &str) -> Result<Option<TransactionDetails>> {
        let Some(transaction) = self.find(key_or_value).await? else {
            return Ok(None);
        };

        let participant = self.users.get(transaction.participant_id).await?;
        let event = self.events.get(transaction.event_id).await?;
        let creator_id = event
            .as_ref()
            .map(|e| e.creator_id)
            .filter(|id| !id.is_zero())
            .unwrap_or(transaction.creator_id);
        let creator = self.users.get(creator_id).await?;

        Ok(Some(TransactionDetails {
            transaction,
            participant,
            event,
            creator,
        }))
    }

    pub async fn list(&self) -> Result<Vec<Transaction>> {
        Ok(self.store.list().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::TicketingError;
    use ticketkv_core::{Role, Timestamp};
    use ticketkv_store::MemoryBackend;

    fn repo() -> TransactionRepository {
        TransactionRepository::new(
            Arc::new(MemoryBackend::new()),
            Arc::new(FixedClock::new(Timestamp::from_nanos(1))),
        )
    }

    fn ticket(participant: u64, event: u64) -> Transaction {
        Transaction {
            participant_id: RecordId::new(participant),
            event_id: RecordId::new(event),
            amount: 25.0,
            ..Transaction::default()
        }
    }

    #[tokio::test]
    async fn test_create_forces_pending() {
        let repo = repo();
        let trx = repo
            .create(Transaction {
                status: Some(PaymentStatus::Completed),
                ..ticket(1, 2)
            })
            .await
            .unwrap();
        assert_eq!(trx.status, Some(PaymentStatus::Pending));
        assert_eq!(repo.find("user_1:event_2").await.unwrap().map(|t| t.id), Some(trx.id));
    }

    #[tokio::test]
    async fn test_missing_references_rejected() {
        let repo = repo();
        let err = repo.create(ticket(0, 2)).await.unwrap_err();
        assert!(matches!(
            err,
            TicketingError::Validation(ValidationError::MissingReference("participant"))
        ));
        let err = repo.create(ticket(1, 0)).await.unwrap_err();
        assert!(matches!(
            err,
            TicketingError::Validation(ValidationError::MissingReference("event"))
        ));
    }

    #[tokio::test]
    async fn test_wide_reference_writes_nothing() {
        let repo = repo();
        let wide = Transaction {
            participant_id: RecordId::new(u64::MAX),
            event_id: RecordId::new(1),
            amount: 5.0,
            ..Transaction::default()
        };

        for _ in 0..2 {
            let err = repo.create(wide.clone()).await.unwrap_err();
            assert!(matches!(
                err,
                TicketingError::Validation(ValidationError::ReferenceOutOfRange("participant"))
            ));
        }
        assert!(repo.list().await.unwrap().is_empty());
        assert!(repo.get(RecordId::new(1)).await.unwrap().is_none());

        let first = repo.create(ticket(1, 1)).await.unwrap();
        assert_eq!(first.id, RecordId::new(1));
    }

    #[tokio::test]
    async fn test_update_cannot_widen_reference() {
        let repo = repo();
        let trx = repo.create(ticket(1, 2)).await.unwrap();
        let err = repo
            .update(Transaction {
                id: trx.id,
                event_id: RecordId::new(u64::MAX),
                ..Transaction::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TicketingError::Validation(_)));
        assert_eq!(repo.get(trx.id).await.unwrap(), Some(trx));
    }

    #[tokio::test]
    async fn test_one_live_ticket_per_pair() {
        let repo = repo();
        let first = repo.create(ticket(1, 2)).await.unwrap();

        let err = repo.create(ticket(1, 2)).await.unwrap_err();
        assert!(matches!(err, TicketingError::Conflict { field: "participant_event", .. }));

        // Another participant or event is fine.
        repo.create(ticket(3, 2)).await.unwrap();
        repo.create(ticket(1, 4)).await.unwrap();

        let cancelled = repo.cancel(first.id).await.unwrap();
        assert_eq!(cancelled.status, Some(PaymentStatus::Cancelled));
        assert!(repo.find("user_1:event_2").await.unwrap().is_none());

        let again = repo.create(ticket(1, 2)).await.unwrap();
        assert_eq!(repo.find("user_1:event_2").await.unwrap().map(|t| t.id), Some(again.id));
    }

    #[tokio::test]
    async fn test_status_update_keeps_other_fields() {
        let repo = repo();
        let trx = repo.create(ticket(1, 2)).await.unwrap();

        let done = repo
            .update(Transaction {
                id: trx.id,
                status: Some(PaymentStatus::Completed),
                ..Transaction::default()
            })
            .await
            .unwrap();
        assert_eq!(done.participant_id, RecordId::new(1));
        assert_eq!(done.event_id, RecordId::new(2));
        assert_eq!(done.amount, 25.0);
        assert_eq!(done.status, Some(PaymentStatus::Completed));
    }

    #[tokio::test]
    async fn test_transition_rules() {
        let repo = repo();
        let trx = repo.create(ticket(1, 2)).await.unwrap();
        repo.refund(trx.id).await.unwrap();

        let err = repo
            .update(Transaction {
                id: trx.id,
                status: Some(PaymentStatus::Pending),
                ..Transaction::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TicketingError::Validation(ValidationError::StatusTransition { .. })
        ));

        let lax = repo.clone().with_status_transitions(false);
        let revived = lax
            .update(Transaction {
                id: trx.id,
                status: Some(PaymentStatus::Pending),
                ..Transaction::default()
            })
            .await
            .unwrap();
        assert_eq!(revived.status, Some(PaymentStatus::Pending));
        assert_eq!(repo.find("user_1:event_2").await.unwrap().map(|t| t.id), Some(trx.id));
    }

    #[tokio::test]
    async fn test_moving_event_moves_claim() {
        let repo = repo();
        let trx = repo.create(ticket(1, 2)).await.unwrap();
        repo.create(ticket(1, 5)).await.unwrap();

        let err = repo
            .update(Transaction {
                id: trx.id,
                event_id: RecordId::new(5),
                ..Transaction::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TicketingError::Conflict { .. }));

        repo.update(Transaction {
            id: trx.id,
            event_id: RecordId::new(3),
            ..Transaction::default()
        })
        .await
        .unwrap();
        assert!(repo.find("user_1:event_2").await.unwrap().is_none());
        assert!(repo.find("user_1:event_3").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_find_with_relations() {
        let backend: Arc<dyn KvBackend> = Arc::new(MemoryBackend::new());
        let clock = Arc::new(FixedClock::new(Timestamp::from_nanos(1)));
        let repo = TransactionRepository::new(backend.clone(), clock);
        let users: Store<User> = Store::new(backend.clone());
        let events: Store<Event> = Store::new(backend);
        let now = Timestamp::from_nanos(1);

        let creator = users
            .create(
                User {
                    username: "creator1".into(),
                    role: Some(Role::Creator),
                    ..User::default()
                },
                now,
            )
            .await
            .unwrap();
        let buyer = users
            .create(
                User {
                    username: "buyer1".into(),
                    role: Some(Role::Participant),
                    ..User::default()
                },
                now,
            )
            .await
            .unwrap();
        let event = events
            .create(
                Event {
                    title: "Go Meetup".into(),
                    creator_id: creator.id,
                    ..Event::default()
                },
                now,
            )
            .await
            .unwrap();

        repo.create(ticket(buyer.id.get(), event.id.get())).await.unwrap();

        let details = repo
            .find_with_relations(&format!("user_{}:event_{}", buyer.id, event.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(details.participant.map(|u| u.username), Some("buyer1".to_string()));
        assert_eq!(details.event.map(|e| e.title), Some("Go Meetup".to_string()));
        assert_eq!(details.creator.map(|u| u.username), Some("creator1".to_string()));
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found() {
        let repo = repo();
        let err = repo.cancel(RecordId::new(9)).await.unwrap_err();
        assert!(matches!(err, TicketingError::NotFound(key) if key == "transaction_9"));
    }
}

//! End-to-end scenarios over the public API.
//!
//! Each scenario runs against a fresh in-memory backend unless it says
//! otherwise; the SQLite scenarios use a temporary database file.

use std::sync::Arc;

use ticketkv::store::{KvBackend, MemoryBackend, SqliteBackend};
use ticketkv::{
    Argon2Hasher, BackendConfig, Event, EventStatus, EventType, FixedClock, PaymentStatus,
    RecordId, Role, Ticketing, TicketingConfig, TicketingError, Timestamp, Transaction, User,
};

fn ticketing_over(backend: Arc<dyn KvBackend>, config: TicketingConfig) -> Ticketing {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Ticketing::with_collaborators(
        backend,
        &config,
        Arc::new(Argon2Hasher::insecure_fast().unwrap()),
        Arc::new(FixedClock::new(Timestamp::from_nanos(1_700_000_000_000_000_000))),
    )
    .unwrap()
}

fn ticketing() -> Ticketing {
    ticketing_over(Arc::new(MemoryBackend::new()), TicketingConfig::default())
}

fn user(username: &str, email: &str) -> User {
    User {
        username: username.into(),
        fullname: "Test User".into(),
        email: email.into(),
        password: "secret1".into(),
        role: Some(Role::Participant),
        ..User::default()
    }
}

fn purchase(participant: RecordId, event: RecordId) -> Transaction {
    Transaction {
        participant_id: participant,
        event_id: event,
        amount: 10.0,
        ..Transaction::default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_username_conflicts() {
    let t = ticketing();
    let first = t.users().create(user("alice1", "a@x.com")).await.unwrap();
    assert_eq!(first.id, RecordId::new(1));

    let err = t.users().create(user("alice1", "b@x.com")).await.unwrap_err();
    assert!(matches!(err, TicketingError::Conflict { field: "username", .. }));

    let err = t.users().create(user("alice2", "a@x.com")).await.unwrap_err();
    assert!(matches!(err, TicketingError::Conflict { field: "email", .. }));

    // Pre-checked duplicates do not consume ids.
    let second = t.users().create(user("bobby1", "b@x.com")).await.unwrap();
    assert_eq!(second.id, RecordId::new(2));
}

#[tokio::test]
async fn ids_are_monotonic_per_collection() {
    let t = ticketing();
    for i in 1..=3u64 {
        let u = t
            .users()
            .create(user(&format!("user{}x", i), &format!("u{}@x.com", i)))
            .await
            .unwrap();
        assert_eq!(u.id, RecordId::new(i));
    }

    let e = t
        .events()
        .create(Event {
            title: "First".into(),
            ..Event::default()
        })
        .await
        .unwrap();
    assert_eq!(e.id, RecordId::new(1));
}

#[tokio::test]
async fn soft_delete_hides_and_frees_values() {
    let t = ticketing();
    let alice = t.users().create(user("alice1", "a@x.com")).await.unwrap();

    let deleted = t.users().delete(alice.id).await.unwrap();
    assert!(deleted.deleted_at.is_set());

    assert!(t.users().get(alice.id).await.unwrap().is_none());
    assert!(t.users().find("user_1").await.unwrap().is_none());
    assert!(t.users().list().await.unwrap().is_empty());

    let err = t.users().delete(alice.id).await.unwrap_err();
    assert!(matches!(err, TicketingError::NotFound(_)));

    t.users().create(user("alice1", "a@x.com")).await.unwrap();
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn event_link_is_derived() {
    let t = ticketing();
    let event = t
        .events()
        .create(Event {
            title: "Go Meetup".into(),
            ..Event::default()
        })
        .await
        .unwrap();

    assert_eq!(event.link, "https://get.event.id/event/go-meetup");
    assert_eq!(event.status, Some(EventStatus::Draft));
    assert_eq!(event.event_type, Some(EventType::Online));
    assert_eq!(
        t.events().find(&event.link).await.unwrap().map(|e| e.id),
        Some(event.id)
    );
}

#[tokio::test]
async fn configured_link_base_is_used() {
    let config = TicketingConfig {
        link_base_url: "/e/".into(),
        ..TicketingConfig::default()
    };
    let t = ticketing_over(Arc::new(MemoryBackend::new()), config);
    let event = t
        .events()
        .create(Event {
            title: "Rust & Friends".into(),
            ..Event::default()
        })
        .await
        .unwrap();
    assert_eq!(event.link, "/e/rust-friends");
}

#[tokio::test]
async fn event_creator_is_joined_at_read_time() {
    let t = ticketing();
    let creator = t
        .users()
        .create(User {
            role: Some(Role::Creator),
            ..user("creator1", "c@x.com")
        })
        .await
        .unwrap();
    t.events()
        .create(Event {
            title: "Go Meetup".into(),
            creator_id: creator.id,
            ..Event::default()
        })
        .await
        .unwrap();

    let joined = t.events().find_with_creator("Go Meetup").await.unwrap().unwrap();
    assert_eq!(joined.creator.as_ref().map(|u| u.id), Some(creator.id));

    t.users().delete(creator.id).await.unwrap();
    let joined = t.events().find_with_creator("Go Meetup").await.unwrap().unwrap();
    assert!(joined.creator.is_none());
}

// ─────────────────────────────────────────────────────────────────────────────
// Transactions
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ticket_pair_claim_cancel_and_repurchase() {
    let t = ticketing();
    let p = RecordId::new(1);
    let e = RecordId::new(2);

    let first = t.transactions().create(purchase(p, e)).await.unwrap();
    assert_eq!(first.status, Some(PaymentStatus::Pending));

    let err = t.transactions().create(purchase(p, e)).await.unwrap_err();
    assert!(matches!(err, TicketingError::Conflict { .. }));

    t.transactions()
        .update(Transaction {
            id: first.id,
            status: Some(PaymentStatus::Cancelled),
            ..Transaction::default()
        })
        .await
        .unwrap();

    let second = t.transactions().create(purchase(p, e)).await.unwrap();
    assert_ne!(second.id, first.id);
    assert_eq!(
        t.transactions().find("user_1:event_2").await.unwrap().map(|trx| trx.id),
        Some(second.id)
    );

    // The cancelled one is still readable by key.
    let old = t
        .transactions()
        .find(&format!("transaction_{}", first.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(old.status, Some(PaymentStatus::Cancelled));
}

#[tokio::test]
async fn status_update_is_a_merge() {
    let t = ticketing();
    let trx = t
        .transactions()
        .create(purchase(RecordId::new(1), RecordId::new(2)))
        .await
        .unwrap();

    let done = t
        .transactions()
        .update(Transaction {
            id: trx.id,
            status: Some(PaymentStatus::Completed),
            ..Transaction::default()
        })
        .await
        .unwrap();

    assert_eq!(done.participant_id, RecordId::new(1));
    assert_eq!(done.event_id, RecordId::new(2));
    assert_eq!(done.amount, 10.0);
    assert_eq!(done.created_at, trx.created_at);
    assert_eq!(done.status, Some(PaymentStatus::Completed));
}

#[tokio::test]
async fn terminal_status_cannot_be_left() {
    let t = ticketing();
    let trx = t
        .transactions()
        .create(purchase(RecordId::new(1), RecordId::new(2)))
        .await
        .unwrap();
    t.transactions().cancel(trx.id).await.unwrap();

    let err = t
        .transactions()
        .update(Transaction {
            id: trx.id,
            status: Some(PaymentStatus::Completed),
            ..Transaction::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, TicketingError::Validation(_)));

    // Re-asserting the current status is fine.
    t.transactions().cancel(trx.id).await.unwrap();
}

#[tokio::test]
async fn transitions_unchecked_when_disabled() {
    let config = TicketingConfig {
        enforce_status_transitions: false,
        ..TicketingConfig::default()
    };
    let t = ticketing_over(Arc::new(MemoryBackend::new()), config);
    let trx = t
        .transactions()
        .create(purchase(RecordId::new(1), RecordId::new(2)))
        .await
        .unwrap();
    t.transactions().refund(trx.id).await.unwrap();

    let back = t
        .transactions()
        .update(Transaction {
            id: trx.id,
            status: Some(PaymentStatus::Processing),
            ..Transaction::default()
        })
        .await
        .unwrap();
    assert_eq!(back.status, Some(PaymentStatus::Processing));
}

#[tokio::test]
async fn concurrent_purchases_have_one_winner() {
    let t = ticketing();
    let mut handles = Vec::new();
    for _ in 0..16 {
        let t = t.clone();
        handles.push(tokio::spawn(async move {
            t.transactions()
                .create(purchase(RecordId::new(7), RecordId::new(8)))
                .await
        }));
    }

    let mut wins = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => wins += 1,
            Err(TicketingError::Conflict { .. }) => {}
            Err(other) => panic!("unexpected error: {}", other),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(t.transactions().list().await.unwrap().len(), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Persistence
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sqlite_backend_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ticketkv.db");

    {
        let t = ticketing_over(
            Arc::new(SqliteBackend::open(&path).unwrap()),
            TicketingConfig::default(),
        );
        t.users().create(user("alice1", "a@x.com")).await.unwrap();
        t.transactions()
            .create(purchase(RecordId::new(1), RecordId::new(1)))
            .await
            .unwrap();
    }

    let t = ticketing_over(
        Arc::new(SqliteBackend::open(&path).unwrap()),
        TicketingConfig::default(),
    );
    let alice = t.users().find("a@x.com").await.unwrap().unwrap();
    assert_eq!(alice.username, "alice1");
    assert!(t
        .users()
        .verify_credential("alice1", "secret1")
        .await
        .unwrap()
        .is_some());

    let err = t.users().create(user("alice1", "z@x.com")).await.unwrap_err();
    assert!(matches!(err, TicketingError::Conflict { .. }));

    let next = t.users().create(user("bobby1", "b@x.com")).await.unwrap();
    assert_eq!(next.id, RecordId::new(2));

    let err = t
        .transactions()
        .create(purchase(RecordId::new(1), RecordId::new(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, TicketingError::Conflict { .. }));
}

#[tokio::test]
async fn open_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = TicketingConfig {
        backend: BackendConfig::Sqlite {
            path: dir.path().join("from-config.db"),
        },
        ..TicketingConfig::default()
    };

    let t = Ticketing::open(config).await.unwrap();
    let event = t
        .events()
        .create(Event {
            title: "Config Event".into(),
            ..Event::default()
        })
        .await
        .unwrap();
    assert_eq!(event.link, "https://get.event.id/event/config-event");
}

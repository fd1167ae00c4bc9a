//! Test fixtures and sample records.
//!
//! Common setup code for integration tests.

use std::sync::Arc;
use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;

use ticketkv::{
    Argon2Hasher, EventRepository, FixedClock, Ticketing, TicketingConfig, TransactionRepository,
    UserRepository,
};
use ticketkv_core::{Event, RecordId, Role, Timestamp, Transaction, User};
use ticketkv_store::{KvBackend, MemoryBackend};

/// Start time of every fixture clock: 2023-11-14T22:13:20Z.
pub const FIXTURE_EPOCH: Timestamp = Timestamp::from_nanos(1_700_000_000_000_000_000);

/// Plaintext password given to every sample user.
pub const SAMPLE_PASSWORD: &str = "secret1";

/// A memory backend, a fixed clock and the repositories over them.
pub struct TestFixture {
    pub backend: Arc<MemoryBackend>,
    pub clock: Arc<FixedClock>,
    pub ticketing: Ticketing,
}

impl TestFixture {
    /// Create a fixture with the default configuration.
    pub fn new() -> Self {
        Self::with_config(TicketingConfig::default())
    }

    pub fn with_config(config: TicketingConfig) -> Self {
        let backend = Arc::new(MemoryBackend::new());
        let clock = Arc::new(FixedClock::new(FIXTURE_EPOCH));
        let hasher = Argon2Hasher::insecure_fast().expect("minimum argon2 params are valid");
        let shared: Arc<dyn KvBackend> = backend.clone();
        let ticketing =
            Ticketing::with_collaborators(shared, &config, Arc::new(hasher), clock.clone())
                .expect("fixture config is valid");

        Self {
            backend,
            clock,
            ticketing,
        }
    }

    pub fn users(&self) -> &UserRepository {
        self.ticketing.users()
    }

    pub fn events(&self) -> &EventRepository {
        self.ticketing.events()
    }

    pub fn transactions(&self) -> &TransactionRepository {
        self.ticketing.transactions()
    }

    /// Move the fixture clock forward.
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// Register a participant named `username`.
    pub async fn participant(&self, username: &str) -> User {
        self.users()
            .create(sample_user(username))
            .await
            .expect("create participant")
    }

    /// Register a creator named `username`.
    pub async fn creator(&self, username: &str) -> User {
        self.users()
            .create(User {
                role: Some(Role::Creator),
                ..sample_user(username)
            })
            .await
            .expect("create creator")
    }

    /// Create an event owned by `creator`.
    pub async fn event(&self, creator: &User, title: &str) -> Event {
        self.events()
            .create(Event {
                creator_id: creator.id,
                ..sample_event(title)
            })
            .await
            .expect("create event")
    }

    /// Buy a ticket for `event` as `participant`.
    pub async fn purchase(&self, participant: &User, event: &Event) -> Transaction {
        self.transactions()
            .create(Transaction {
                creator_id: event.creator_id,
                ..sample_transaction(participant.id, event.id, event.price)
            })
            .await
            .expect("create transaction")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A valid participant; the email is derived from the username.
pub fn sample_user(username: &str) -> User {
    User {
        username: username.to_string(),
        fullname: format!("{} Tester", username),
        email: format!("{}@example.com", username),
        password: SAMPLE_PASSWORD.to_string(),
        role: Some(Role::Participant),
        ..User::default()
    }
}

/// A valid event without a link, so one is derived on create.
pub fn sample_event(title: &str) -> Event {
    Event {
        title: title.to_string(),
        description: format!("All about {}", title),
        price: 15.0,
        quantity: 100,
        ..Event::default()
    }
}

pub fn sample_transaction(participant: RecordId, event: RecordId, amount: f64) -> Transaction {
    Transaction {
        participant_id: participant,
        event_id: event,
        amount,
        ..Transaction::default()
    }
}

/// A username that passes validation and is unlikely to repeat.
pub fn random_username() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("user_{}", suffix.to_lowercase())
}

/// Serialize a record the way it is exposed to callers.
pub fn public_json<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).expect("records always serialize")
}

//! The Ticketing handle: one backend shared by the three repositories.

use std::sync::Arc;

use ticketkv_store::{KvBackend, MemoryBackend, RedisBackend, SqliteBackend};

use crate::clock::{Clock, SystemClock};
use crate::config::{BackendConfig, TicketingConfig};
use crate::error::Result;
use crate::hasher::{Argon2Hasher, PasswordHasher};
use crate::repository::{EventRepository, TransactionRepository, UserRepository};

/// Users, events and transactions over a single key-value backend.
///
/// Cloning is cheap; clones share the backend. The backend is closed when
/// the last clone is dropped.
#[derive(Clone)]
pub struct Ticketing {
    backend: Arc<dyn KvBackend>,
    users: UserRepository,
    events: EventRepository,
    transactions: TransactionRepository,
}

impl Ticketing {
    /// Open the configured backend with the default hasher and the system
    /// clock.
    pub async fn open(config: TicketingConfig) -> Result<Self> {
        config.validate()?;

        let backend: Arc<dyn KvBackend> = match &config.backend {
            BackendConfig::Memory => Arc::new(MemoryBackend::new()),
            BackendConfig::Sqlite { path } => Arc::new(SqliteBackend::open(path)?),
            BackendConfig::Redis { url } => Arc::new(RedisBackend::connect(url).await?),
        };
        tracing::info!(backend = ?config.backend, "opened ticketing backend");

        Self::with_collaborators(
            backend,
            &config,
            Arc::new(Argon2Hasher::default()),
            Arc::new(SystemClock),
        )
    }

    /// Build the repositories over an already opened backend.
    pub fn with_collaborators(
        backend: Arc<dyn KvBackend>,
        config: &TicketingConfig,
        hasher: Arc<dyn PasswordHasher>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let timeout = config.operation_timeout();

        let users = UserRepository::new(backend.clone(), hasher, clock.clone()).with_timeout(timeout);
        let events = EventRepository::new(backend.clone(), clock.clone())
            .with_timeout(timeout)
            .with_link_base_url(config.link_base_url.clone());
        let transactions = TransactionRepository::new(backend.clone(), clock)
            .with_timeout(timeout)
            .with_status_transitions(config.enforce_status_transitions);

        Ok(Self {
            backend,
            users,
            events,
            transactions,
        })
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    pub fn events(&self) -> &EventRepository {
        &self.events
    }

    pub fn transactions(&self) -> &TransactionRepository {
        &self.transactions
    }

    /// The shared backend.
    pub fn backend(&self) -> &Arc<dyn KvBackend> {
        &self.backend
    }
}

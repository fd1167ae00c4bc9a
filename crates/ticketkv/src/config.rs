//! Configuration for the ticketing repositories.
//!
//! Loads from `TICKETKV_*` environment variables over sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TicketingError};

/// Base of the links derived for events created without one.
pub const DEFAULT_LINK_BASE_URL: &str = "https://get.event.id/event/";

/// Which key-value backend to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Volatile, process-local storage.
    Memory,
    /// SQLite database file.
    Sqlite { path: PathBuf },
    /// Redis server, e.g. `redis://127.0.0.1:6379`.
    Redis { url: String },
}

/// Configuration for [`crate::Ticketing`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketingConfig {
    /// Prefix for derived event links. The slugified title is appended.
    pub link_base_url: String,
    /// Deadline for every backend call, in milliseconds.
    pub operation_timeout_ms: u64,
    /// Reject payment status changes the state machine does not allow.
    pub enforce_status_transitions: bool,
    pub backend: BackendConfig,
}

impl Default for TicketingConfig {
    fn default() -> Self {
        Self {
            link_base_url: DEFAULT_LINK_BASE_URL.to_string(),
            operation_timeout_ms: 5_000,
            enforce_status_transitions: true,
            backend: BackendConfig::Memory,
        }
    }
}

impl TicketingConfig {
    /// Read the configuration from the process environment.
    ///
    /// | variable                               | default                        |
    /// |----------------------------------------|--------------------------------|
    /// | `TICKETKV_BACKEND`                     | `memory` (`sqlite`, `redis`)   |
    /// | `TICKETKV_SQLITE_PATH`                 | `ticketkv.db`                  |
    /// | `TICKETKV_REDIS_URL`                   | `redis://127.0.0.1:6379`       |
    /// | `TICKETKV_LINK_BASE_URL`               | `https://get.event.id/event/`  |
    /// | `TICKETKV_OPERATION_TIMEOUT_MS`        | `5000`                         |
    /// | `TICKETKV_ENFORCE_STATUS_TRANSITIONS`  | `true`                         |
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let backend = match lookup("TICKETKV_BACKEND").as_deref() {
            None | Some("memory") => BackendConfig::Memory,
            Some("sqlite") => BackendConfig::Sqlite {
                path: lookup("TICKETKV_SQLITE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("ticketkv.db")),
            },
            Some("redis") => BackendConfig::Redis {
                url: lookup("TICKETKV_REDIS_URL")
                    .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
            },
            Some(other) => {
                return Err(TicketingError::Config(format!(
                    "TICKETKV_BACKEND must be memory, sqlite or redis, got {:?}",
                    other
                )))
            }
        };

        let operation_timeout_ms = match lookup("TICKETKV_OPERATION_TIMEOUT_MS") {
            None => defaults.operation_timeout_ms,
            Some(raw) => raw.parse().map_err(|_| {
                TicketingError::Config(format!(
                    "TICKETKV_OPERATION_TIMEOUT_MS is not a number: {:?}",
                    raw
                ))
            })?,
        };

        let enforce_status_transitions = match lookup("TICKETKV_ENFORCE_STATUS_TRANSITIONS") {
            None => defaults.enforce_status_transitions,
            Some(raw) => raw.parse().map_err(|_| {
                TicketingError::Config(format!(
                    "TICKETKV_ENFORCE_STATUS_TRANSITIONS must be true or false: {:?}",
                    raw
                ))
            })?,
        };

        let config = Self {
            link_base_url: lookup("TICKETKV_LINK_BASE_URL").unwrap_or(defaults.link_base_url),
            operation_timeout_ms,
            enforce_status_transitions,
            backend,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no repository can work with.
    pub fn validate(&self) -> Result<()> {
        if self.operation_timeout_ms == 0 {
            return Err(TicketingError::Config(
                "operation_timeout_ms must be positive".into(),
            ));
        }
        if !ticketkv_core::validation::is_valid_link(&self.link_base_url) {
            return Err(TicketingError::Config(format!(
                "link_base_url is not a valid link: {:?}",
                self.link_base_url
            )));
        }
        Ok(())
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

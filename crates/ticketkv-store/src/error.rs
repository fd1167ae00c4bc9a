//! Error types for the store module.

use thiserror::Error;
use ticketkv_core::{Collection, CoreError, ValidationError};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Error from the Redis client.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Backend failure that is neither SQLite nor Redis (poisoned lock,
    /// blocking task that never finished).
    #[error("backend error: {0}")]
    Backend(String),

    /// A backend call did not finish before its deadline.
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout {
        operation: &'static str,
        after_ms: u64,
    },

    /// A stored record could not be decoded.
    #[error(transparent)]
    Decode(#[from] CoreError),

    /// A unique value is already held by another record.
    #[error("{collection}.{field} {value:?} is already taken")]
    Conflict {
        collection: Collection,
        field: &'static str,
        value: String,
    },

    /// Record not found (missing or tombstoned).
    #[error("record not found: {0}")]
    NotFound(String),

    /// The record breaks a business rule.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),
}

impl StoreError {
    /// Whether retrying the same call later might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Backend(_) => true,
            Self::Redis(e) => e.is_io_error() || e.is_timeout() || e.is_connection_dropped(),
            Self::Database(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

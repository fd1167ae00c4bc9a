//! Error types for the repositories.

use thiserror::Error;
use ticketkv_core::{Collection, ValidationError};
use ticketkv_store::StoreError;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum TicketingError {
    /// The record breaks a business rule. Nothing was written.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A unique value is already held by another live record.
    #[error("{collection}.{field} {value:?} is already taken")]
    Conflict {
        collection: Collection,
        field: &'static str,
        value: String,
    },

    /// The record an update or delete targets does not exist.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[source] StoreError),

    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    Hashing(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl TicketingError {
    /// Whether retrying the same call later might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_transient())
    }
}

impl From<StoreError> for TicketingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(e) => Self::Validation(e),
            StoreError::Conflict {
                collection,
                field,
                value,
            } => Self::Conflict {
                collection,
                field,
                value,
            },
            StoreError::NotFound(key) => Self::NotFound(key),
            other => Self::Store(other),
        }
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, TicketingError>;

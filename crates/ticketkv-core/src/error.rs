//! Error types for ticketkv core.

use thiserror::Error;

/// Errors raised while turning stored hashes back into typed records.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("cannot decode field {field} of {key}: {reason}")]
    Decode {
        key: String,
        field: &'static str,
        reason: String,
    },

    #[error("unknown {kind} value: {value:?}")]
    UnknownVariant { kind: &'static str, value: String },
}

/// Business-rule violations. The record is never written when one of these
/// is returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("username must be longer than 4 characters")]
    Username,

    #[error("email address is not valid")]
    Email,

    #[error("fullname requires at least 3 characters")]
    Fullname,

    #[error("password requires at least 6 characters")]
    Password,

    #[error("role must be one of admin, creator, participant")]
    Role,

    #[error("event title is required")]
    Title,

    #[error("link is not valid: {0:?}")]
    Link(String),

    #[error("{0} must be a finite, non-negative number")]
    Amount(&'static str),

    #[error("{0} reference is required")]
    MissingReference(&'static str),

    #[error("{0} reference is out of range")]
    ReferenceOutOfRange(&'static str),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("record id is required for update")]
    MissingId,

    #[error("payment status cannot move from {from} to {to}")]
    StatusTransition { from: String, to: String },
}

//! # ticketkv Core
//!
//! Pure primitives for ticketkv: typed records, their field tables, the
//! flat-map codec and business validation.
//!
//! This crate contains no I/O, no storage, no networking. It describes what a
//! record looks like and how it is flattened into a string-keyed hash; the
//! `ticketkv-store` crate decides where that hash lives.
//!
//! ## Key Types
//!
//! - [`Record`] - A typed entity with a compile-time [`FieldDef`] table
//! - [`User`], [`Event`], [`Transaction`] - The three collections
//! - [`RecordId`] / [`Timestamp`] - Identifier and nanosecond timestamp newtypes
//! - [`Collection`] - Collection names and the persisted key layout
//!
//! ## Codec
//!
//! Zero-valued fields are omitted on write, and a partial record merges over
//! the stored one on update. See the [`codec`] module.

pub mod codec;
pub mod error;
pub mod event;
pub mod field;
pub mod keys;
pub mod transaction;
pub mod types;
pub mod user;
pub mod validation;

pub use codec::{decode, encode, ensure_decodable, merge, tombstone};
pub use error::{CoreError, ValidationError};
pub use event::{Event, EventStatus, EventType};
pub use field::{FieldDef, FieldKind, FieldValue, Record, UniqueClaim};
pub use keys::Collection;
pub use transaction::{PaymentStatus, Transaction};
pub use types::{RecordId, Timestamp};
pub use user::{Role, User};
pub use validation::{
    derive_link, slugify, validate_event, validate_status_transition, validate_transaction,
    validate_user,
};

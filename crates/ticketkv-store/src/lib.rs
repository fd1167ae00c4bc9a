//! # ticketkv Store
//!
//! Storage layer for ticketkv: a relational-ish record store emulated on a
//! flat key-value backend.
//!
//! ## Overview
//!
//! Everything persistent goes through the [`KvBackend`] trait, a small
//! Redis-shaped surface (hashes, sets, counters, strings). On top of it:
//!
//! - [`IdAllocator`] - per-collection auto-increment ids
//! - [`UniqueIndex`] - exact per-value unique keys with conditional claims
//! - [`RecordStore`] - create / get / merge-update / list / soft-delete
//!
//! Backends:
//!
//! - [`SqliteBackend`] - SQLite-based persistent storage
//! - [`RedisBackend`] - Redis via a reconnecting connection manager
//! - [`MemoryBackend`] - In-memory storage for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ticketkv_core::{Role, Timestamp, User};
//! use ticketkv_store::{RecordStore, SqliteBackend};
//!
//! async fn example() -> ticketkv_store::Result<()> {
//!     let backend = Arc::new(SqliteBackend::open("ticketkv.db")?);
//!     let users: RecordStore<User, SqliteBackend> = RecordStore::new(backend);
//!
//!     let user = User {
//!         username: "alice1".into(),
//!         email: "a@x.com".into(),
//!         role: Some(Role::Participant),
//!         ..User::default()
//!     };
//!     let stored = users.create(user, Timestamp::from_nanos(1)).await?;
//!     assert_eq!(stored.id.get(), 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Atomic steps only**: id allocation and unique claims are single atomic
//!   backend calls; a create or update as a whole is not a transaction.
//! - **Soft deletion**: deleted records keep their hash with `deleted_at` set
//!   and are invisible to every read.
//! - **Deadlines**: every backend call is bounded by a timeout.

pub mod allocator;
pub mod deadline;
pub mod error;
pub mod memory;
pub mod migration;
pub mod record;
pub mod redis;
pub mod sqlite;
pub mod traits;
pub mod unique;

pub use crate::redis::RedisBackend;
pub use allocator::IdAllocator;
pub use deadline::DEFAULT_TIMEOUT;
pub use error::{Result, StoreError};
pub use memory::MemoryBackend;
pub use record::RecordStore;
pub use sqlite::SqliteBackend;
pub use traits::KvBackend;
pub use unique::{LedgerEntry, UniqueIndex};

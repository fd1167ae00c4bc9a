//! KvBackend trait: the flat key-value surface every layer above is built on.
//!
//! The surface is a small subset of Redis: hashes, sets, integer counters and
//! plain strings, all addressed by string keys. Implementations include
//! SQLite (persistent), Redis and in-memory (for tests).

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;

/// Async key-value backend shared by all repositories.
///
/// Each method is a single backend round trip. Only [`incr`](Self::incr),
/// [`set_nx`](Self::set_nx) and [`del_if_eq`](Self::del_if_eq) are required
/// to be atomic; nothing spans more than one call.
#[async_trait]
pub trait KvBackend: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Hashes
    // ─────────────────────────────────────────────────────────────────────────

    /// Set every `(field, value)` pair on the hash at `key`, creating it if
    /// needed. Fields not listed keep their current value.
    async fn hset_all(&self, key: &str, fields: &[(String, String)]) -> Result<()>;

    /// All fields of the hash at `key`. Empty when the key does not exist.
    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Keys of all hashes whose name starts with `prefix`, in no particular
    /// order.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Sets
    // ─────────────────────────────────────────────────────────────────────────

    /// Add `member` to the set. Returns `true` if it was not present.
    async fn sadd(&self, key: &str, member: &str) -> Result<bool>;

    /// Remove `member` from the set. Returns `true` if it was present.
    async fn srem(&self, key: &str, member: &str) -> Result<bool>;

    async fn smembers(&self, key: &str) -> Result<Vec<String>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Counters
    // ─────────────────────────────────────────────────────────────────────────

    /// Atomically add one to the counter (created at 0) and return the new
    /// value.
    async fn incr(&self, key: &str) -> Result<i64>;

    async fn get_int(&self, key: &str) -> Result<Option<i64>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Strings
    // ─────────────────────────────────────────────────────────────────────────

    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set `key` to `value` only if it does not exist. Returns `true` when
    /// the value was written.
    async fn set_nx(&self, key: &str, value: &str) -> Result<bool>;

    /// Delete `key` only if it currently holds `expected`. Returns `true`
    /// when it was deleted.
    async fn del_if_eq(&self, key: &str, expected: &str) -> Result<bool>;

    /// Delete `key` whatever it holds. Returns `true` if it existed.
    async fn del(&self, key: &str) -> Result<bool>;
}

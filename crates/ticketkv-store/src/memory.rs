//! In-memory implementation of the KvBackend trait.
//!
//! This is primarily for testing. It has the same semantics as the SQLite
//! and Redis backends but keeps everything in memory with no persistence.

use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Result, StoreError};
use crate::traits::KvBackend;

/// In-memory backend.
///
/// All data is lost when the backend is dropped. Thread-safe via RwLock.
pub struct MemoryBackend {
    inner: RwLock<MemoryBackendInner>,
    /// Artificial delay before every call, for exercising deadlines.
    latency: RwLock<Option<Duration>>,
    /// Operation that fails instead of running, for exercising error paths.
    failing: RwLock<Option<&'static str>>,
}

#[derive(Default)]
struct MemoryBackendInner {
    hashes: HashMap<String, HashMap<String, String>>,
    sets: HashMap<String, BTreeSet<String>>,
    counters: HashMap<String, i64>,
    strings: HashMap<String, String>,
}

impl MemoryBackend {
    /// Create a new empty in-memory backend.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryBackendInner::default()),
            latency: RwLock::new(None),
            failing: RwLock::new(None),
        }
    }

    /// Delay every subsequent call by `latency`. `None` removes the delay.
    pub fn set_latency(&self, latency: Option<Duration>) {
        if let Ok(mut slot) = self.latency.write() {
            *slot = latency;
        }
    }

    /// Make every call to `operation` (e.g. `"hset_all"`) fail with a
    /// backend error. `None` clears it.
    pub fn fail_on(&self, operation: Option<&'static str>) {
        if let Ok(mut slot) = self.failing.write() {
            *slot = operation;
        }
    }

    async fn enter(&self, operation: &'static str) -> Result<()> {
        let latency = self.latency.read().ok().and_then(|slot| *slot);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let failing = self.failing.read().ok().and_then(|slot| *slot);
        if failing == Some(operation) {
            return Err(StoreError::Backend(format!("injected failure in {}", operation)));
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryBackendInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryBackendInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {}", e)))
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn hset_all(&self, key: &str, fields: &[(String, String)]) -> Result<()> {
        self.enter("hset_all").await?;
        let mut inner = self.write()?;
        let hash = inner.hashes.entry(key.to_string()).or_default();
        hash.extend(fields.iter().cloned());
        Ok(())
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>> {
        self.enter("hget_all").await?;
        let inner = self.read()?;
        Ok(inner.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.enter("scan_prefix").await?;
        let inner = self.read()?;
        Ok(inner
            .hashes
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool> {
        self.enter("sadd").await?;
        let mut inner = self.write()?;
        Ok(inner
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string()))
    }

    async fn srem(&self, key: &str, member: &str) -> Result<bool> {
        self.enter("srem").await?;
        let mut inner = self.write()?;
        let Some(set) = inner.sets.get_mut(key) else {
            return Ok(false);
        };
        let removed = set.remove(member);
        if set.is_empty() {
            inner.sets.remove(key);
        }
        Ok(removed)
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        self.enter("smembers").await?;
        let inner = self.read()?;
        Ok(inner
            .sets
            .get(key)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        self.enter("incr").await?;
        let mut inner = self.write()?;
        let counter = inner.counters.entry(key.to_string()).or_insert(0);
        *counter = counter
            .checked_add(1)
            .ok_or_else(|| StoreError::InvalidData(format!("counter {} overflowed", key)))?;
        Ok(*counter)
    }

    async fn get_int(&self, key: &str) -> Result<Option<i64>> {
        self.enter("get_int").await?;
        let inner = self.read()?;
        Ok(inner.counters.get(key).copied())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.enter("get").await?;
        let inner = self.read()?;
        Ok(inner.strings.get(key).cloned())
    }

    async fn set_nx(&self, key: &str, value: &str) -> Result<bool> {
        self.enter("set_nx").await?;
        let mut inner = self.write()?;
        if inner.strings.contains_key(key) {
            return Ok(false);
        }
        inner.strings.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    async fn del_if_eq(&self, key: &str, expected: &str) -> Result<bool> {
        self.enter("del_if_eq").await?;
        let mut inner = self.write()?;
        if inner.strings.get(key).map(String::as_str) != Some(expected) {
            return Ok(false);
        }
        inner.strings.remove(key);
        Ok(true)
    }

    async fn del(&self, key: &str) -> Result<bool> {
        self.enter("del").await?;
        let mut inner = self.write()?;
        let mut existed = inner.hashes.remove(key).is_some();
        existed |= inner.sets.remove(key).is_some();
        existed |= inner.counters.remove(key).is_some();
        existed |= inner.strings.remove(key).is_some();
        Ok(existed)
    }
}

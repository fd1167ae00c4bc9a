//! SQLite implementation of the KvBackend trait.
//!
//! The persistent backend. It uses rusqlite with bundled SQLite, wrapped in
//! async via tokio::spawn_blocking. Every call runs under one connection
//! mutex, which is what makes `incr`, `set_nx` and `del_if_eq` atomic.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::KvBackend;

/// SQLite-based backend.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
#[derive(Clone)]
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        tracing::info!(path = %path.display(), "opened sqlite backend");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Backend(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("spawn_blocking failed: {}", e)))?
    }
}

#[async_trait]
impl KvBackend for SqliteBackend {
    async fn hset_all(&self, key: &str, fields: &[(String, String)]) -> Result<()> {
        let key = key.to_string();
        let fields = fields.to_vec();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO kv_hash (key, field, value) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key, field) DO UPDATE SET value = excluded.value",
                )?;
                for (field, value) in &fields {
                    stmt.execute(params![key, field, value])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>> {
        let key = key.to_string();

        self.blocking(move |conn| {
            let mut stmt = conn.prepare("SELECT field, value FROM kv_hash WHERE key = ?1")?;
            let fields = stmt
                .query_map(params![key], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<rusqlite::Result<HashMap<String, String>>>()?;
            Ok(fields)
        })
        .await
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = prefix.to_string();

        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT key FROM kv_hash WHERE substr(key, 1, length(?1)) = ?1",
            )?;
            let keys = stmt
                .query_map(params![prefix], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(keys)
        })
        .await
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool> {
        let key = key.to_string();
        let member = member.to_string();

        self.blocking(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO kv_set (key, member) VALUES (?1, ?2)",
                params![key, member],
            )?;
            Ok(changed == 1)
        })
        .await
    }

    async fn srem(&self, key: &str, member: &str) -> Result<bool> {
        let key = key.to_string();
        let member = member.to_string();

        self.blocking(move |conn| {
            let changed = conn.execute(
                "DELETE FROM kv_set WHERE key = ?1 AND member = ?2",
                params![key, member],
            )?;
            Ok(changed == 1)
        })
        .await
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        let key = key.to_string();

        self.blocking(move |conn| {
            let mut stmt =
                conn.prepare("SELECT member FROM kv_set WHERE key = ?1 ORDER BY member")?;
            let members = stmt
                .query_map(params![key], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(members)
        })
        .await
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let key = key.to_string();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO kv_counter (key, value) VALUES (?1, 1)
                 ON CONFLICT(key) DO UPDATE SET value = value + 1",
                params![key],
            )?;
            let value: i64 = tx.query_row(
                "SELECT value FROM kv_counter WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )?;
            tx.commit()?;
            Ok(value)
        })
        .await
    }

    async fn get_int(&self, key: &str) -> Result<Option<i64>> {
        let key = key.to_string();

        self.blocking(move |conn| {
            conn.query_row(
                "SELECT value FROM kv_counter WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();

        self.blocking(move |conn| {
            conn.query_row(
                "SELECT value FROM kv_string WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn set_nx(&self, key: &str, value: &str) -> Result<bool> {
        let key = key.to_string();
        let value = value.to_string();

        self.blocking(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO kv_string (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
            Ok(changed == 1)
        })
        .await
    }

    async fn del_if_eq(&self, key: &str, expected: &str) -> Result<bool> {
        let key = key.to_string();
        let expected = expected.to_string();

        self.blocking(move |conn| {
            let changed = conn.execute(
                "DELETE FROM kv_string WHERE key = ?1 AND value = ?2",
                params![key, expected],
            )?;
            Ok(changed == 1)
        })
        .await
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let key = key.to_string();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let mut removed = 0;
            for table in ["kv_hash", "kv_set", "kv_counter", "kv_string"] {
                removed += tx.execute(
                    &format!("DELETE FROM {} WHERE key = ?1", table),
                    params![key],
                )?;
            }
            tx.commit()?;
            Ok(removed > 0)
        })
        .await
    }
}

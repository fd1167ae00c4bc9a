//! Redis implementation of the KvBackend trait.
//!
//! Each trait method maps onto one Redis command, except
//! [`del_if_eq`](KvBackend::del_if_eq) which runs a small Lua script so the
//! compare and the delete happen in one server-side step.

use std::collections::HashMap;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::error::Result;
use crate::traits::KvBackend;

const COMPARE_AND_DELETE: &str = r#"
    if redis.call('GET', KEYS[1]) == ARGV[1] then
        return redis.call('DEL', KEYS[1])
    end
    return 0
"#;

/// Keys fetched per SCAN round trip.
const SCAN_BATCH: usize = 200;

/// Redis-based backend.
///
/// Cheap to clone; clones share the same `ConnectionManager`, which
/// reconnects on its own after a dropped connection.
#[derive(Clone)]
pub struct RedisBackend {
    conn_manager: ConnectionManager,
}

impl RedisBackend {
    /// Connect to the server at `redis_url` (e.g. `redis://127.0.0.1:6379`).
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        let conn_manager = ConnectionManager::new(client).await?;

        tracing::info!(url = %redis_url, "connected redis backend");

        Ok(Self { conn_manager })
    }
}

#[async_trait]
impl KvBackend for RedisBackend {
    async fn hset_all(&self, key: &str, fields: &[(String, String)]) -> Result<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn_manager.clone();
        let _: () = conn.hset_multiple(key, fields).await?;
        Ok(())
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>> {
        let mut conn = self.conn_manager.clone();
        let fields: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(fields)
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut conn = self.conn_manager.clone();
        let pattern = format!("{}*", prefix);
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .arg("TYPE")
                .arg("hash")
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may return a key more than once across rounds.
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<bool> {
        let mut conn = self.conn_manager.clone();
        let added: i64 = conn.sadd(key, member).await?;
        Ok(added > 0)
    }

    async fn srem(&self, key: &str, member: &str) -> Result<bool> {
        let mut conn = self.conn_manager.clone();
        let removed: i64 = conn.srem(key, member).await?;
        Ok(removed > 0)
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.conn_manager.clone();
        let members: Vec<String> = conn.smembers(key).await?;
        Ok(members)
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn_manager.clone();
        let value: i64 = conn.incr(key, 1).await?;
        Ok(value)
    }

    async fn get_int(&self, key: &str) -> Result<Option<i64>> {
        let mut conn = self.conn_manager.clone();
        let value: Option<i64> = conn.get(key).await?;
        Ok(value)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn_manager.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_nx(&self, key: &str, value: &str) -> Result<bool> {
        let mut conn = self.conn_manager.clone();
        let written: bool = conn.set_nx(key, value).await?;
        Ok(written)
    }

    async fn del_if_eq(&self, key: &str, expected: &str) -> Result<bool> {
        let mut conn = self.conn_manager.clone();
        let script = redis::Script::new(COMPARE_AND_DELETE);
        let deleted: i64 = script
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await?;
        Ok(deleted > 0)
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn_manager.clone();
        let deleted: i64 = conn.del(key).await?;
        Ok(deleted > 0)
    }
}

//! Redis cache backend
//!
//! ```text
//! get            GET key
//! set            SET key value EX ttl
//! remove         DEL key
//! remove_prefix  SCAN cursor MATCH prefix* COUNT n  →  DEL batch
//! ```
//!
//! Every failure (connection, timeout, protocol) maps to
//! `CacheError::Unavailable`; the gateway treats it as a miss.

use async_trait::async_trait;
use std::time::Duration;

use super::{keys, CacheBackend, CacheError};
use crate::redis::{RedisClient, RedisClientError};

/// Keys requested per SCAN round trip
const SCAN_COUNT: u64 = 200;

impl From<RedisClientError> for CacheError {
    fn from(err: RedisClientError) -> Self {
        CacheError::Unavailable(err.to_string())
    }
}

/// Cache backend storing JSON strings in Redis
#[derive(Clone)]
pub struct RedisCache {
    client: RedisClient,
    namespace: String,
}

impl RedisCache {
    /// Creates a backend; every key is stored as `"{namespace}{key}"`
    pub fn new(client: RedisClient, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }
}

/// Escapes glob metacharacters so a prefix matches literally in SCAN MATCH
fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let value: Option<String> = self
            .client
            .query(redis::cmd("GET").arg(self.full_key(key)))
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let seconds = ttl.min(keys::MAX_TTL).as_secs().max(1);
        let _: () = self
            .client
            .query(
                redis::cmd("SET")
                    .arg(self.full_key(key))
                    .arg(value)
                    .arg("EX")
                    .arg(seconds),
            )
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let _: u64 = self
            .client
            .query(redis::cmd("DEL").arg(self.full_key(key)))
            .await?;
        Ok(())
    }

    async fn remove_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let pattern = format!("{}*", escape_glob(&self.full_key(prefix)));
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = self
                .client
                .query(
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(&pattern)
                        .arg("COUNT")
                        .arg(SCAN_COUNT),
                )
                .await?;

            if !keys.is_empty() {
                let deleted: u64 = self.client.query(redis::cmd("DEL").arg(&keys)).await?;
                removed += deleted;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(removed)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

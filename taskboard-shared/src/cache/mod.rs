/// Read-through, write-invalidate cache
///
/// # Modules
///
/// - [`keys`]: the key namespace and TTL policy
/// - [`memory`]: in-process backend (single instance, tests)
/// - [`redis`]: shared Redis backend
///
/// # Lifecycle of a key
///
/// ```text
///            set                 store write          remove / remove_prefix
/// Absent ─────────▶ Cached ─────────────────▶ Stale ──────────────────────▶ Absent
///                                               │
///                                               └── TTL elapses ──────────▶ Absent (expiry)
/// ```
///
/// Backend failures never reach callers: reads degrade to a miss (the caller
/// loads from the store) and writes/removals are logged and dropped, leaving
/// TTL as the staleness backstop.

pub mod gateway;
pub mod keys;
pub mod memory;
pub mod redis;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

pub use gateway::CacheGateway;

/// Cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend could not be reached or did not answer in time
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// A cached value could not be encoded or decoded
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Storage behind [`CacheGateway`]
///
/// Values are opaque JSON strings; typing happens in the gateway.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn remove(&self, key: &str) -> Result<(), CacheError>;

    /// Removes every key starting with `prefix`, returning how many were removed
    async fn remove_prefix(&self, prefix: &str) -> Result<u64, CacheError>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

/// Which backend the gateway runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    Memory,
    Redis,
}

impl CacheBackendKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Some(CacheBackendKind::Memory),
            "redis" => Some(CacheBackendKind::Redis),
            _ => None,
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,

    /// TTL for mutable entities (companies, boards, columns, tasks)
    pub mutable_ttl_secs: u64,

    /// TTL for reference data (task types, user profiles, role permissions)
    pub reference_ttl_secs: u64,

    /// Prefix prepended to every Redis key
    pub namespace: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Memory,
            mutable_ttl_secs: keys::MUTABLE_TTL.as_secs(),
            reference_ttl_secs: keys::REFERENCE_TTL.as_secs(),
            namespace: "taskboard:".to_string(),
        }
    }
}

impl CacheConfig {
    /// Loads cache settings from the environment
    ///
    /// # Environment Variables
    ///
    /// - `CACHE_BACKEND`: `memory` or `redis` (default: memory)
    /// - `CACHE_MUTABLE_TTL_SECS`: default 600
    /// - `CACHE_REFERENCE_TTL_SECS`: default 2592000
    /// - `CACHE_NAMESPACE`: default `taskboard:`
    pub fn from_env() -> Result<Self, CacheError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let backend = match env::var("CACHE_BACKEND") {
            Ok(raw) => CacheBackendKind::parse(&raw).ok_or_else(|| {
                CacheError::Unavailable(format!("Unknown CACHE_BACKEND: {}", raw))
            })?,
            Err(_) => defaults.backend,
        };

        let mutable_ttl_secs = env::var("CACHE_MUTABLE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.mutable_ttl_secs);

        let reference_ttl_secs = env::var("CACHE_REFERENCE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.reference_ttl_secs);

        let namespace = env::var("CACHE_NAMESPACE").unwrap_or(defaults.namespace);

        Ok(Self {
            backend,
            mutable_ttl_secs,
            reference_ttl_secs,
            namespace,
        })
    }

    /// Mutable TTL, capped at [`keys::MAX_TTL`]
    pub fn mutable_ttl(&self) -> Duration {
        Duration::from_secs(self.mutable_ttl_secs).min(keys::MAX_TTL)
    }

    /// Reference TTL, capped at [`keys::MAX_TTL`]
    pub fn reference_ttl(&self) -> Duration {
        Duration::from_secs(self.reference_ttl_secs).min(keys::MAX_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!(CacheBackendKind::parse("memory"), Some(CacheBackendKind::Memory));
        assert_eq!(CacheBackendKind::parse("Redis"), Some(CacheBackendKind::Redis));
        assert_eq!(CacheBackendKind::parse("memcached"), None);
    }

    #[test]
    fn test_config_defaults_follow_ttl_policy() {
        let config = CacheConfig::default();
        assert_eq!(config.backend, CacheBackendKind::Memory);
        assert_eq!(config.mutable_ttl(), keys::MUTABLE_TTL);
        assert_eq!(config.reference_ttl(), keys::REFERENCE_TTL);
    }

    #[test]
    fn test_oversized_ttls_are_capped() {
        let config = CacheConfig {
            mutable_ttl_secs: u64::MAX,
            reference_ttl_secs: u64::MAX,
            ..CacheConfig::default()
        };
        assert_eq!(config.mutable_ttl(), keys::MAX_TTL);
        assert_eq!(config.reference_ttl(), keys::MAX_TTL);
    }
}

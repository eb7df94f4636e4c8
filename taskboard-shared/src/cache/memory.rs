//! In-process cache backend
//!
//! Entries expire on read once their TTL has elapsed. Expiry uses
//! `tokio::time::Instant`, so tests can drive it with `tokio::time::pause`.
//! When the cache is full, expired entries are purged first, then the entries
//! closest to expiry are evicted.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::{keys, CacheBackend, CacheError};

/// Default maximum number of entries
pub const DEFAULT_MAX_ENTRIES: usize = 50_000;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
}

/// In-process TTL cache
#[derive(Debug)]
pub struct MemoryCache {
    max_entries: usize,
    entries: RwLock<HashMap<String, Entry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub async fn stats(&self) -> MemoryCacheStats {
        MemoryCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.entries.read().await.len(),
        }
    }

    /// Drops every expired entry, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    fn make_room(&self, entries: &mut HashMap<String, Entry>, now: Instant) {
        if entries.len() < self.max_entries {
            return;
        }

        entries.retain(|_, entry| !entry.is_expired(now));

        while entries.len() >= self.max_entries {
            let soonest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(key, _)| key.clone());

            match soonest {
                Some(key) => {
                    entries.remove(&key);
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
                None => break,
            }
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();

        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => {}
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return Ok(None);
                }
            }
        }

        // Expired: drop it unless a writer replaced it meanwhile
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        if !entries.contains_key(key) {
            self.make_room(&mut entries, now);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl.min(keys::MAX_TTL),
            },
        );

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn remove_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok((before - entries.len()) as u64)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = MemoryCache::new();
        cache.set("board:1", "v".to_string(), Duration::from_secs(60)).await.unwrap();

        assert_eq!(cache.get("board:1").await.unwrap(), Some("v".to_string()));
        assert_eq!(cache.get("board:2").await.unwrap(), None);

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = MemoryCache::new();
        cache.set("board:1", "v".to_string(), Duration::from_secs(600)).await.unwrap();

        tokio::time::advance(Duration::from_secs(599)).await;
        assert!(cache.get("board:1").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get("board:1").await.unwrap().is_none());
        assert_eq!(cache.stats().await.size, 0);
    }

    #[tokio::test]
    async fn test_remove_prefix() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);
        cache.set("board:1", "a".to_string(), ttl).await.unwrap();
        cache.set("board:2", "b".to_string(), ttl).await.unwrap();
        cache.set("boards-by-company:1", "c".to_string(), ttl).await.unwrap();

        let removed = cache.remove_prefix("board:").await.unwrap();

        assert_eq!(removed, 2);
        assert!(cache.get("board:1").await.unwrap().is_none());
        assert!(cache.get("boards-by-company:1").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_evicts_expired_then_soonest() {
        let cache = MemoryCache::with_capacity(2);
        cache.set("a", "1".to_string(), Duration::from_secs(10)).await.unwrap();
        cache.set("b", "2".to_string(), Duration::from_secs(100)).await.unwrap();

        cache.set("c", "3".to_string(), Duration::from_secs(100)).await.unwrap();
        assert!(cache.get("a").await.unwrap().is_none());
        assert!(cache.get("b").await.unwrap().is_some());
        assert!(cache.get("c").await.unwrap().is_some());
        assert_eq!(cache.stats().await.evictions, 1);

        tokio::time::advance(Duration::from_secs(200)).await;
        cache.set("d", "4".to_string(), Duration::from_secs(100)).await.unwrap();
        assert_eq!(cache.stats().await.evictions, 1);
        assert_eq!(cache.stats().await.size, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = MemoryCache::new();
        cache.set("a", "1".to_string(), Duration::from_secs(1)).await.unwrap();
        cache.set("b", "2".to_string(), Duration::from_secs(60)).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.stats().await.size, 1);
    }

    #[tokio::test]
    async fn test_huge_ttl_is_capped_instead_of_overflowing() {
        let cache = MemoryCache::new();
        cache.set("task-types-by-company:1", "v".to_string(), Duration::MAX).await.unwrap();

        assert_eq!(
            cache.get("task-types-by-company:1").await.unwrap(),
            Some("v".to_string())
        );
    }
}

/// Typed cache façade
///
/// `CacheGateway` serializes values as JSON on top of any [`CacheBackend`]
/// and absorbs backend failures:
///
/// - `get` on a failing backend logs a warning and returns `None`
/// - `set`, `remove` and `remove_prefix` log and carry on
/// - an undecodable entry is treated as a miss and removed
///
/// Writers must commit to the store first and invalidate afterwards.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskboard_shared::cache::{keys, memory::MemoryCache, CacheGateway};
/// use uuid::Uuid;
///
/// # async fn example() {
/// let cache = CacheGateway::new(Arc::new(MemoryCache::new()));
/// let key = keys::board(Uuid::new_v4());
///
/// cache.set(&key, &"Roadmap".to_string(), keys::MUTABLE_TTL).await;
/// let name: Option<String> = cache.get(&key).await;
/// assert_eq!(name.as_deref(), Some("Roadmap"));
///
/// cache.remove(&key).await;
/// # }
/// ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::{keys, CacheBackend, CacheConfig, CacheError};

/// Typed, failure-tolerant access to the cache backend
#[derive(Clone)]
pub struct CacheGateway {
    backend: Arc<dyn CacheBackend>,
    mutable_ttl: Duration,
    reference_ttl: Duration,
}

impl CacheGateway {
    /// Creates a gateway with the default TTL policy
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            mutable_ttl: keys::MUTABLE_TTL,
            reference_ttl: keys::REFERENCE_TTL,
        }
    }

    /// Creates a gateway with the TTLs from `config`
    pub fn with_config(backend: Arc<dyn CacheBackend>, config: &CacheConfig) -> Self {
        Self {
            backend,
            mutable_ttl: config.mutable_ttl(),
            reference_ttl: config.reference_ttl(),
        }
    }

    pub fn mutable_ttl(&self) -> Duration {
        self.mutable_ttl
    }

    pub fn reference_ttl(&self) -> Duration {
        self.reference_ttl
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Reads a cached value; `None` on miss, decode failure or backend failure
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key).await {
            Ok(raw) => raw?,
            Err(err) => {
                tracing::warn!(key, backend = self.backend.name(), error = %err, "Cache read failed, falling back to store");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                tracing::trace!(key, "Cache hit");
                Some(value)
            }
            Err(err) => {
                tracing::warn!(key, error = %err, "Discarding undecodable cache entry");
                self.remove(key).await;
                None
            }
        }
    }

    /// Stores a value under `key` for `ttl`
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::warn!(key, error = %CacheError::from(err), "Not caching unserializable value");
                return;
            }
        };

        if let Err(err) = self.backend.set(key, encoded, ttl).await {
            tracing::warn!(key, backend = self.backend.name(), error = %err, "Cache write failed");
        }
    }

    /// Invalidates one key
    pub async fn remove(&self, key: &str) {
        if let Err(err) = self.backend.remove(key).await {
            tracing::warn!(
                key,
                backend = self.backend.name(),
                error = %err,
                "Cache invalidation failed, entry stays until TTL"
            );
        }
    }

    /// Invalidates every key starting with `prefix`
    pub async fn remove_prefix(&self, prefix: &str) {
        match self.backend.remove_prefix(prefix).await {
            Ok(removed) => tracing::trace!(prefix, removed, "Cache prefix invalidated"),
            Err(err) => tracing::warn!(
                prefix,
                backend = self.backend.name(),
                error = %err,
                "Cache prefix invalidation failed, entries stay until TTL"
            ),
        }
    }

    /// Invalidates a set of keys after a write
    pub async fn invalidate<I, K>(&self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        futures::future::join_all(
            keys.into_iter()
                .map(|key| async move { self.remove(key.as_ref()).await }),
        )
        .await;
    }

    /// Read-through: returns the cached value or loads, caches and returns it
    ///
    /// Loader errors are returned unchanged and nothing is cached.
    pub async fn get_or_load<T, E, F, Fut>(&self, key: &str, ttl: Duration, load: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get(key).await {
            return Ok(cached);
        }

        let value = load().await?;
        self.set(key, &value, ttl).await;

        Ok(value)
    }

    /// Read-through for lookups that may find nothing
    ///
    /// Only `Some` results are cached, so a later insert is visible without
    /// an invalidation.
    pub async fn get_or_load_optional<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        load: F,
    ) -> Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        if let Some(cached) = self.get(key).await {
            return Ok(Some(cached));
        }

        let value = load().await?;
        if let Some(ref value) = value {
            self.set(key, value, ttl).await;
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::MemoryCache;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend that fails every call
    struct DownBackend;

    #[async_trait]
    impl CacheBackend for DownBackend {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }

        async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }

        async fn remove(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }

        async fn remove_prefix(&self, _prefix: &str) -> Result<u64, CacheError> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }

        fn name(&self) -> &'static str {
            "down"
        }
    }

    fn memory_gateway() -> CacheGateway {
        CacheGateway::new(Arc::new(MemoryCache::new()))
    }

    #[tokio::test]
    async fn test_set_then_get_returns_value() {
        let cache = memory_gateway();
        cache.set("board:1", &vec![1, 2, 3], Duration::from_secs(600)).await;

        let value: Option<Vec<i32>> = cache.get("board:1").await;
        assert_eq!(value, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_remove_then_get_never_returns_old_value() {
        let cache = memory_gateway();
        cache.set("board:1", &"old", Duration::from_secs(600)).await;

        cache.remove("board:1").await;

        let value: Option<String> = cache.get("board:1").await;
        assert_eq!(value, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_value_served_until_ttl_then_fresh() {
        let cache = memory_gateway();
        let ttl = Duration::from_secs(600);
        let mut store_value = "v1".to_string();

        let first: String = cache
            .get_or_load("board:1", ttl, || async { Ok::<_, CacheError>(store_value.clone()) })
            .await
            .unwrap();
        assert_eq!(first, "v1");

        // Store changes without an invalidation
        store_value = "v2".to_string();

        tokio::time::advance(Duration::from_secs(300)).await;
        let stale: String = cache
            .get_or_load("board:1", ttl, || async { Ok::<_, CacheError>(store_value.clone()) })
            .await
            .unwrap();
        assert_eq!(stale, "v1");

        tokio::time::advance(Duration::from_secs(300)).await;
        let fresh: String = cache
            .get_or_load("board:1", ttl, || async { Ok::<_, CacheError>(store_value.clone()) })
            .await
            .unwrap();
        assert_eq!(fresh, "v2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_value_absent_after_ttl_without_access() {
        let cache = memory_gateway();
        cache.set("board:1", &"v", Duration::from_secs(600)).await;

        let value: Option<String> = cache.get("board:1").await;
        assert_eq!(value.as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(600)).await;
        let value: Option<String> = cache.get("board:1").await;
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_read_through_loads_once() {
        let cache = memory_gateway();
        let loads = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: u32 = cache
                .get_or_load("tasks-by-board:1", Duration::from_secs(60), || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, CacheError>(7)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_optional_read_through_does_not_cache_absence() {
        let cache = memory_gateway();

        let missing: Option<String> = cache
            .get_or_load_optional("board:1", Duration::from_secs(60), || async {
                Ok::<_, CacheError>(None)
            })
            .await
            .unwrap();
        assert_eq!(missing, None);

        let found: Option<String> = cache
            .get_or_load_optional("board:1", Duration::from_secs(60), || async {
                Ok::<_, CacheError>(Some("created".to_string()))
            })
            .await
            .unwrap();
        assert_eq!(found.as_deref(), Some("created"));
    }

    #[tokio::test]
    async fn test_loader_error_is_returned_and_not_cached() {
        let cache = memory_gateway();

        let result: Result<u32, &str> = cache
            .get_or_load("board:1", Duration::from_secs(60), || async { Err("db down") })
            .await;
        assert_eq!(result, Err("db down"));

        let value: Option<u32> = cache.get("board:1").await;
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_unavailable_backend_passes_through_to_store() {
        let cache = CacheGateway::new(Arc::new(DownBackend));

        cache.set("board:1", &"v", Duration::from_secs(60)).await;
        cache.remove("board:1").await;
        cache.remove_prefix("board:").await;

        let value: String = cache
            .get_or_load("board:1", Duration::from_secs(60), || async {
                Ok::<_, CacheError>("from store".to_string())
            })
            .await
            .unwrap();
        assert_eq!(value, "from store");
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let backend = Arc::new(MemoryCache::new());
        backend
            .set("board:1", "not json".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        let cache = CacheGateway::new(backend.clone());

        let value: Option<Vec<u8>> = cache.get("board:1").await;
        assert_eq!(value, None);
        assert_eq!(backend.get("board:1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalidate_removes_all_listed_keys() {
        let cache = memory_gateway();
        let ttl = Duration::from_secs(60);
        cache.set("board:1", &1, ttl).await;
        cache.set("boards-by-company:9", &vec![1], ttl).await;
        cache.set("board:2", &2, ttl).await;

        cache.invalidate(["board:1", "boards-by-company:9"]).await;

        assert_eq!(cache.get::<i32>("board:1").await, None);
        assert_eq!(cache.get::<Vec<i32>>("boards-by-company:9").await, None);
        assert_eq!(cache.get::<i32>("board:2").await, Some(2));
    }
}

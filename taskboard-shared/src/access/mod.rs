/// Resource-scoped access control
///
/// # Modules
///
/// - [`resource`]: `ResourceType` and the tagged `ResourceRef`
/// - [`hierarchy`]: static parent edges and the ancestor-chain resolver
/// - [`engine`]: the permission decision function
/// - [`service`]: `AccessService`, the façade domain services call
/// - [`permissions`]: permission names used by the domain services
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskboard_shared::access::{AccessService, ResourceRef};
/// use taskboard_shared::cache::{memory::MemoryCache, CacheGateway};
/// use taskboard_shared::store::memory::MemoryStore;
/// use tokio_util::sync::CancellationToken;
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(MemoryStore::new());
/// let cache = CacheGateway::new(Arc::new(MemoryCache::new()));
/// let access = AccessService::new(store, cache);
///
/// let allowed = access
///     .has_permission(Uuid::new_v4(), ResourceRef::Board(Uuid::new_v4()), "Board.View", &CancellationToken::new())
///     .await?;
/// assert!(!allowed);
/// # Ok(())
/// # }
/// ```

pub mod engine;
pub mod error;
pub mod hierarchy;
pub mod permissions;
pub mod resource;
pub mod service;

pub use engine::{Grant, PermissionEngine};
pub use error::AccessError;
pub use hierarchy::{HierarchyResolver, HIERARCHY, MAX_DEPTH};
pub use resource::{ResourceRef, ResourceType};
pub use service::AccessService;

/// Domain services
///
/// Every operation takes the acting user explicitly and follows the same
/// sequence:
///
/// ```text
/// require_permission ──▶ read through cache ─────────────▶ result
///        │
///        └─────────────▶ write store ──▶ invalidate keys ──▶ publish event
/// ```
///
/// Services never look at memberships or roles themselves; every decision
/// goes through [`AccessService`].
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskboard_shared::cache::{memory::MemoryCache, CacheGateway};
/// use taskboard_shared::events::TracingPublisher;
/// use taskboard_shared::services::{ServiceContext, Services};
/// use taskboard_shared::store::memory::MemoryStore;
/// use tokio_util::sync::CancellationToken;
/// use uuid::Uuid;
///
/// # async fn example(owner_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let ctx = ServiceContext::new(
///     Arc::new(MemoryStore::new()),
///     CacheGateway::new(Arc::new(MemoryCache::new())),
///     Arc::new(TracingPublisher),
/// );
/// let services = Services::new(ctx);
///
/// let company = services
///     .companies
///     .create(owner_id, "Acme".to_string(), &CancellationToken::new())
///     .await?;
/// # Ok(())
/// # }
/// ```

pub mod board;
pub mod column;
pub mod company;
pub mod error;
pub mod membership;
pub mod task;
pub mod task_type;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::access::{AccessService, ResourceRef};
use crate::cache::CacheGateway;
use crate::events::{DomainEvent, EventPublisher};
use crate::store::DomainStore;

pub use board::BoardService;
pub use column::ColumnService;
pub use company::CompanyService;
pub use error::ServiceError;
pub use membership::MembershipService;
pub use task::TaskService;
pub use task_type::TaskTypeService;

/// Collaborators shared by every domain service
#[derive(Clone)]
pub struct ServiceContext {
    pub store: Arc<dyn DomainStore>,
    pub access: AccessService,
    pub cache: CacheGateway,
    pub events: Arc<dyn EventPublisher>,
}

impl ServiceContext {
    /// Wires the access service to the same store and cache the services use
    pub fn new<S>(store: Arc<S>, cache: CacheGateway, events: Arc<dyn EventPublisher>) -> Self
    where
        S: DomainStore + 'static,
    {
        let access = AccessService::new(store.clone(), cache.clone());

        Self {
            store,
            access,
            cache,
            events,
        }
    }

    /// Fails with `PermissionDenied` unless `user_id` holds `permission` on `resource`
    pub async fn authorize(
        &self,
        user_id: Uuid,
        resource: ResourceRef,
        permission: &str,
        cancel: &CancellationToken,
    ) -> Result<(), ServiceError> {
        self.access
            .require_permission(user_id, resource, permission, cancel)
            .await?;
        Ok(())
    }

    pub fn publish(&self, actor_id: Uuid, event: DomainEvent) {
        self.events.publish(actor_id, event);
    }
}

/// All domain services over one context
#[derive(Clone)]
pub struct Services {
    pub companies: CompanyService,
    pub boards: BoardService,
    pub columns: ColumnService,
    pub tasks: TaskService,
    pub memberships: MembershipService,
    pub task_types: TaskTypeService,
}

impl Services {
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            companies: CompanyService::new(ctx.clone()),
            boards: BoardService::new(ctx.clone()),
            columns: ColumnService::new(ctx.clone()),
            tasks: TaskService::new(ctx.clone()),
            memberships: MembershipService::new(ctx.clone()),
            task_types: TaskTypeService::new(ctx),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::cache::memory::MemoryCache;
    use crate::events::{ChannelPublisher, EventEnvelope};
    use crate::store::memory::MemoryStore;
    use tokio::sync::mpsc;

    pub struct Harness {
        pub store: Arc<MemoryStore>,
        pub cache_backend: Arc<MemoryCache>,
        pub ctx: ServiceContext,
        pub events: mpsc::UnboundedReceiver<EventEnvelope>,
        pub owner: Uuid,
        pub cancel: CancellationToken,
    }

    impl Harness {
        pub async fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let cache_backend = Arc::new(MemoryCache::new());
            let (publisher, events) = ChannelPublisher::new();
            let ctx = ServiceContext::new(
                store.clone(),
                CacheGateway::new(cache_backend.clone()),
                Arc::new(publisher),
            );
            let owner = store.seed_user("owner@example.com").await.id;

            Self {
                store,
                cache_backend,
                ctx,
                events,
                owner,
                cancel: CancellationToken::new(),
            }
        }

        pub fn services(&self) -> Services {
            Services::new(self.ctx.clone())
        }

        /// Drains published events, returning their names
        pub fn drain_events(&mut self) -> Vec<&'static str> {
            let mut names = Vec::new();
            while let Ok(envelope) = self.events.try_recv() {
                names.push(envelope.event.name());
            }
            names
        }
    }
}

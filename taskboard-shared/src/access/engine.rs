//! Permission evaluation
//!
//! # Decision Order
//!
//! For `(user, resource, permission)` the engine loads the resource lineage
//! (resource first, then ancestors up to the company) and allows when:
//!
//! 1. a company in the lineage is owned by the user,
//! 2. a board in the lineage is headed by the user,
//! 3. a live membership of the user on the resource grants the permission,
//! 4. a live membership on any ancestor grants it (nearest ancestor first).
//!
//! Everything else is a deny. Roles union their permissions and there are no
//! deny entries, so the first matching grant decides.
//!
//! The global target (`ResourceRef::global()`) only consults direct
//! memberships.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use super::error::AccessError;
use super::hierarchy::HierarchyResolver;
use super::resource::ResourceRef;
use crate::cache::{keys, CacheGateway};
use crate::models::membership::Membership;
use crate::store::AccessStore;

/// Why a permission was allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Grant {
    /// The user owns this company
    CompanyOwner { company_id: Uuid },

    /// The user heads this board
    BoardHead { board_id: Uuid },

    /// A membership on `scope` carries the permission
    Membership { membership_id: Uuid, scope: ResourceRef },
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grant::CompanyOwner { company_id } => write!(f, "owner of company:{}", company_id),
            Grant::BoardHead { board_id } => write!(f, "head of board:{}", board_id),
            Grant::Membership { membership_id, scope } => {
                write!(f, "membership {} on {}", membership_id, scope)
            }
        }
    }
}

/// Pure permission decision over the authoritative store
#[derive(Clone)]
pub struct PermissionEngine {
    store: Arc<dyn AccessStore>,
    resolver: HierarchyResolver,
    cache: CacheGateway,
}

impl PermissionEngine {
    /// Creates an engine reading memberships from `store`
    ///
    /// Role permission sets are read through `cache` with the reference TTL.
    pub fn new(store: Arc<dyn AccessStore>, cache: CacheGateway) -> Self {
        Self {
            resolver: HierarchyResolver::new(store.clone()),
            store,
            cache,
        }
    }

    pub fn resolver(&self) -> &HierarchyResolver {
        &self.resolver
    }

    /// Evaluates a permission at instant `now`
    ///
    /// Returns the grant that allowed the permission, or `None` for a deny.
    ///
    /// # Errors
    ///
    /// - `ResourceNotFound` / `HierarchyTooDeep` from the lineage walk
    /// - `Store` if a store read fails
    pub async fn evaluate(
        &self,
        user_id: Uuid,
        resource: ResourceRef,
        permission: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Grant>, AccessError> {
        if resource.is_global() {
            return self.membership_grant(user_id, resource, permission, now).await;
        }

        let lineage = self.resolver.lineage(resource).await?;

        for node in &lineage {
            if node.implicit_owner != Some(user_id) {
                continue;
            }
            match node.resource {
                ResourceRef::Company(company_id) => {
                    return Ok(Some(Grant::CompanyOwner { company_id }));
                }
                ResourceRef::Board(board_id) => {
                    return Ok(Some(Grant::BoardHead { board_id }));
                }
                _ => {}
            }
        }

        for node in &lineage {
            if let Some(grant) = self
                .membership_grant(user_id, node.resource, permission, now)
                .await?
            {
                return Ok(Some(grant));
            }
        }

        Ok(None)
    }

    /// Checks the user's direct memberships on one resource
    async fn membership_grant(
        &self,
        user_id: Uuid,
        scope: ResourceRef,
        permission: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Grant>, AccessError> {
        let memberships = self.store.active_memberships(user_id, scope.id(), now).await?;

        for membership in memberships.iter().filter(|m| scope_matches(m, scope)) {
            let permissions = self.role_permissions(membership.role_id).await?;

            if permissions.iter().any(|p| p == permission) {
                return Ok(Some(Grant::Membership {
                    membership_id: membership.id,
                    scope,
                }));
            }
        }

        Ok(None)
    }

    /// Permission names of a role, read through the cache
    async fn role_permissions(&self, role_id: Uuid) -> Result<Vec<String>, AccessError> {
        let store = self.store.clone();
        let permissions = self
            .cache
            .get_or_load(
                &keys::permissions_by_role(role_id),
                self.cache.reference_ttl(),
                move || async move { store.role_permissions(role_id).await },
            )
            .await?;

        Ok(permissions)
    }
}

/// Rejects memberships whose declared kind differs from the resource they reference
///
/// A mismatch means corrupted data; it is logged and the membership grants nothing.
fn scope_matches(membership: &Membership, scope: ResourceRef) -> bool {
    if membership.resource_type == scope.resource_type() {
        return true;
    }

    let err = AccessError::InvalidScope {
        membership_id: membership.id,
        declared: membership.resource_type,
        actual: scope.resource_type(),
    };
    tracing::error!(
        membership_id = %membership.id,
        user_id = %membership.user_id,
        resource = %scope,
        error = %err,
        "Ignoring membership with mismatched scope"
    );

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::resource::ResourceType;
    use crate::cache::memory::MemoryCache;
    use crate::models::board::CreateBoard;
    use crate::models::company::CreateCompany;
    use crate::models::membership::CreateMembership;
    use crate::models::task::CreateTask;
    use crate::store::memory::MemoryStore;
    use crate::store::DomainStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        engine: PermissionEngine,
        owner: Uuid,
        company_id: Uuid,
        board_id: Uuid,
        task_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let owner = store.seed_user("owner@example.com").await.id;
        let company_id = store
            .insert_company(CreateCompany {
                name: "Acme".to_string(),
                owner_id: owner,
            })
            .await
            .unwrap()
            .id;
        let board_id = store
            .insert_board(CreateBoard {
                company_id,
                name: "Roadmap".to_string(),
                description: None,
                head_id: None,
            })
            .await
            .unwrap()
            .id;
        let task_id = store
            .insert_task(CreateTask {
                board_id,
                column_id: None,
                task_type_id: None,
                title: "Write docs".to_string(),
                description: None,
                assignee_id: None,
                created_by: owner,
            })
            .await
            .unwrap()
            .id;

        let cache = CacheGateway::new(Arc::new(MemoryCache::new()));
        let engine = PermissionEngine::new(store.clone(), cache);

        Fixture {
            store,
            engine,
            owner,
            company_id,
            board_id,
            task_id,
        }
    }

    async fn grant(store: &MemoryStore, user_id: Uuid, role_id: Uuid, resource: ResourceRef) -> Membership {
        store
            .insert_membership(CreateMembership {
                user_id,
                role_id,
                resource_id: resource.id(),
                resource_type: resource.resource_type(),
                valid_from: None,
                valid_until: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_company_owner_holds_everything_below() {
        let fx = fixture().await;
        let now = Utc::now();

        let grant = fx
            .engine
            .evaluate(fx.owner, ResourceRef::Task(fx.task_id), "Task.Edit", now)
            .await
            .unwrap();
        assert_eq!(grant, Some(Grant::CompanyOwner { company_id: fx.company_id }));

        let grant = fx
            .engine
            .evaluate(fx.owner, ResourceRef::Board(fx.board_id), "Anything.AtAll", now)
            .await
            .unwrap();
        assert!(grant.is_some());
    }

    #[tokio::test]
    async fn test_stranger_is_denied() {
        let fx = fixture().await;
        let stranger = fx.store.seed_user("stranger@example.com").await.id;

        let grant = fx
            .engine
            .evaluate(stranger, ResourceRef::Task(fx.task_id), "Task.View", Utc::now())
            .await
            .unwrap();
        assert_eq!(grant, None);
    }

    #[tokio::test]
    async fn test_board_head_covers_board_and_tasks_only() {
        let fx = fixture().await;
        let head = fx.store.seed_user("head@example.com").await.id;
        let headed = fx
            .store
            .insert_board(CreateBoard {
                company_id: fx.company_id,
                name: "Ops".to_string(),
                description: None,
                head_id: Some(head),
            })
            .await
            .unwrap();
        let task = fx
            .store
            .insert_task(CreateTask {
                board_id: headed.id,
                column_id: None,
                task_type_id: None,
                title: "Rotate keys".to_string(),
                description: None,
                assignee_id: None,
                created_by: head,
            })
            .await
            .unwrap();
        let now = Utc::now();

        let on_task = fx
            .engine
            .evaluate(head, ResourceRef::Task(task.id), "Task.Delete", now)
            .await
            .unwrap();
        assert_eq!(on_task, Some(Grant::BoardHead { board_id: headed.id }));

        let on_company = fx
            .engine
            .evaluate(head, ResourceRef::Company(fx.company_id), "Company.View", now)
            .await
            .unwrap();
        assert_eq!(on_company, None);

        let on_other_board = fx
            .engine
            .evaluate(head, ResourceRef::Board(fx.board_id), "Board.View", now)
            .await
            .unwrap();
        assert_eq!(on_other_board, None);
    }

    #[tokio::test]
    async fn test_viewer_membership_is_scoped_to_its_board() {
        let fx = fixture().await;
        let viewer = fx.store.seed_user("viewer@example.com").await.id;
        let role = fx.store.seed_role("Viewer", &["Board.View"]).await;
        let other_board = fx
            .store
            .insert_board(CreateBoard {
                company_id: fx.company_id,
                name: "Other".to_string(),
                description: None,
                head_id: None,
            })
            .await
            .unwrap();
        grant(&fx.store, viewer, role.id, ResourceRef::Board(fx.board_id)).await;
        let now = Utc::now();
        let board = ResourceRef::Board(fx.board_id);

        assert!(fx.engine.evaluate(viewer, board, "Board.View", now).await.unwrap().is_some());
        assert!(fx.engine.evaluate(viewer, board, "Board.Edit", now).await.unwrap().is_none());
        assert!(fx
            .engine
            .evaluate(viewer, ResourceRef::Board(other_board.id), "Board.View", now)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_grants_flow_downward_only() {
        let fx = fixture().await;
        let user = fx.store.seed_user("member@example.com").await.id;
        let role = fx.store.seed_role("Editor", &["Task.Edit", "Company.View"]).await;
        let now = Utc::now();

        grant(&fx.store, user, role.id, ResourceRef::Company(fx.company_id)).await;
        let grant = fx
            .engine
            .evaluate(user, ResourceRef::Task(fx.task_id), "Task.Edit", now)
            .await
            .unwrap();
        assert!(matches!(
            grant,
            Some(Grant::Membership { scope: ResourceRef::Company(id), .. }) if id == fx.company_id
        ));

        let task_only = fx.store.seed_user("task-only@example.com").await.id;
        grant_on_task(&fx, task_only, role.id).await;
        assert!(fx
            .engine
            .evaluate(task_only, ResourceRef::Company(fx.company_id), "Company.View", now)
            .await
            .unwrap()
            .is_none());
    }

    async fn grant_on_task(fx: &Fixture, user: Uuid, role_id: Uuid) {
        grant(&fx.store, user, role_id, ResourceRef::Task(fx.task_id)).await;
    }

    #[tokio::test]
    async fn test_roles_union_permissions() {
        let fx = fixture().await;
        let user = fx.store.seed_user("multi@example.com").await.id;
        let viewer = fx.store.seed_role("Viewer", &["Board.View"]).await;
        let editor = fx.store.seed_role("Editor", &["Board.Edit"]).await;
        let board = ResourceRef::Board(fx.board_id);
        grant(&fx.store, user, viewer.id, board).await;
        grant(&fx.store, user, editor.id, board).await;
        let now = Utc::now();

        assert!(fx.engine.evaluate(user, board, "Board.View", now).await.unwrap().is_some());
        assert!(fx.engine.evaluate(user, board, "Board.Edit", now).await.unwrap().is_some());
        assert!(fx.engine.evaluate(user, board, "Board.Delete", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_soft_deleted_membership_stops_granting() {
        let fx = fixture().await;
        let user = fx.store.seed_user("revoked@example.com").await.id;
        let role = fx.store.seed_role("Viewer", &["Board.View"]).await;
        let board = ResourceRef::Board(fx.board_id);
        let membership = grant(&fx.store, user, role.id, board).await;

        assert!(fx.engine.evaluate(user, board, "Board.View", Utc::now()).await.unwrap().is_some());

        fx.store.soft_delete_membership(membership.id).await.unwrap();
        assert!(fx.engine.evaluate(user, board, "Board.View", Utc::now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_membership_outside_validity_window_is_ignored() {
        let fx = fixture().await;
        let user = fx.store.seed_user("temp@example.com").await.id;
        let role = fx.store.seed_role("Viewer", &["Board.View"]).await;
        let now = Utc::now();
        fx.store
            .insert_membership(CreateMembership {
                user_id: user,
                role_id: role.id,
                resource_id: fx.board_id,
                resource_type: ResourceType::Board,
                valid_from: Some(now - chrono::Duration::days(2)),
                valid_until: Some(now - chrono::Duration::days(1)),
            })
            .await
            .unwrap();

        let grant = fx
            .engine
            .evaluate(user, ResourceRef::Board(fx.board_id), "Board.View", now)
            .await
            .unwrap();
        assert_eq!(grant, None);
    }

    #[tokio::test]
    async fn test_mismatched_scope_fails_closed() {
        let fx = fixture().await;
        let user = fx.store.seed_user("corrupt@example.com").await.id;
        let role = fx.store.seed_role("Editor", &["Board.Edit"]).await;
        // Declares a company scope but points at a board id
        fx.store
            .insert_membership(CreateMembership {
                user_id: user,
                role_id: role.id,
                resource_id: fx.board_id,
                resource_type: ResourceType::Company,
                valid_from: None,
                valid_until: None,
            })
            .await
            .unwrap();

        let grant = fx
            .engine
            .evaluate(user, ResourceRef::Board(fx.board_id), "Board.Edit", Utc::now())
            .await
            .unwrap();
        assert_eq!(grant, None);
    }

    #[tokio::test]
    async fn test_global_target_uses_direct_memberships_only() {
        let fx = fixture().await;
        let admin = fx.store.seed_user("admin@example.com").await.id;
        let role = fx.store.seed_role("Administrator", &["User.Invite"]).await;
        grant(&fx.store, admin, role.id, ResourceRef::global()).await;
        let now = Utc::now();

        let grant = fx
            .engine
            .evaluate(admin, ResourceRef::global(), "User.Invite", now)
            .await
            .unwrap();
        assert!(grant.is_some());

        // Company ownership never reaches the global target
        let grant = fx
            .engine
            .evaluate(fx.owner, ResourceRef::global(), "User.Invite", now)
            .await
            .unwrap();
        assert_eq!(grant, None);
    }

    #[tokio::test]
    async fn test_missing_resource_surfaces_not_found() {
        let fx = fixture().await;

        let err = fx
            .engine
            .evaluate(fx.owner, ResourceRef::Task(Uuid::new_v4()), "Task.View", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::ResourceNotFound(_)));
    }
}

/// End-to-end access scenarios over the in-memory store and cache
///
/// These run without external services.

use std::sync::Arc;
use std::time::Duration;

use taskboard_shared::access::{AccessService, ResourceRef};
use taskboard_shared::cache::{memory::MemoryCache, CacheGateway};
use taskboard_shared::events::TracingPublisher;
use taskboard_shared::models::membership::CreateMembership;
use taskboard_shared::services::board::NewBoard;
use taskboard_shared::services::membership::GrantMembership;
use taskboard_shared::services::task::NewTask;
use taskboard_shared::services::{ServiceContext, ServiceError, Services};
use taskboard_shared::store::memory::MemoryStore;
use taskboard_shared::store::DomainStore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

struct World {
    store: Arc<MemoryStore>,
    services: Services,
    access: AccessService,
    cancel: CancellationToken,
    owner: Uuid,
    company_id: Uuid,
    board_id: Uuid,
    task_id: Uuid,
}

async fn world() -> anyhow::Result<World> {
    let store = Arc::new(MemoryStore::new());
    let cache = CacheGateway::new(Arc::new(MemoryCache::new()));
    let ctx = ServiceContext::new(store.clone(), cache, Arc::new(TracingPublisher));
    let access = ctx.access.clone();
    let services = Services::new(ctx);
    let cancel = CancellationToken::new();

    let owner = store.seed_user("owner@example.com").await.id;
    let company = services.companies.create(owner, "Acme".to_string(), &cancel).await?;
    let board = services
        .boards
        .create(
            owner,
            company.id,
            NewBoard {
                name: "Roadmap".to_string(),
                description: None,
                head_id: None,
            },
            &cancel,
        )
        .await?;
    let task = services
        .tasks
        .create(
            owner,
            board.id,
            NewTask {
                title: "Launch".to_string(),
                ..Default::default()
            },
            &cancel,
        )
        .await?;

    Ok(World {
        store,
        services,
        access,
        cancel,
        owner,
        company_id: company.id,
        board_id: board.id,
        task_id: task.id,
    })
}

#[tokio::test]
async fn owner_holds_every_permission_below_the_company() -> anyhow::Result<()> {
    let w = world().await?;

    for (resource, permission) in [
        (ResourceRef::Company(w.company_id), "Company.Delete"),
        (ResourceRef::Board(w.board_id), "Board.Edit"),
        (ResourceRef::Task(w.task_id), "Task.Delete"),
        (ResourceRef::Task(w.task_id), "Some.Custom.Permission"),
    ] {
        assert!(
            w.access.has_permission(w.owner, resource, permission, &w.cancel).await?,
            "owner should hold {} on {}",
            permission,
            resource
        );
    }

    Ok(())
}

#[tokio::test]
async fn user_without_any_grant_is_denied_everywhere() -> anyhow::Result<()> {
    let w = world().await?;
    let stranger = w.store.seed_user("stranger@example.com").await.id;

    for resource in [
        ResourceRef::Company(w.company_id),
        ResourceRef::Board(w.board_id),
        ResourceRef::Task(w.task_id),
        ResourceRef::global(),
    ] {
        assert!(!w.access.has_permission(stranger, resource, "Board.View", &w.cancel).await?);
    }

    Ok(())
}

#[tokio::test]
async fn viewer_role_on_one_board() -> anyhow::Result<()> {
    let w = world().await?;
    let viewer = w.store.seed_user("viewer@example.com").await.id;
    let role = w.store.seed_role("Viewer", &["Board.View", "Task.View"]).await;
    let other_board = w
        .services
        .boards
        .create(
            w.owner,
            w.company_id,
            NewBoard {
                name: "Private".to_string(),
                description: None,
                head_id: None,
            },
            &w.cancel,
        )
        .await?;

    let membership = w
        .services
        .memberships
        .grant(
            w.owner,
            GrantMembership {
                user_id: viewer,
                role_id: role.id,
                scope: ResourceRef::Board(w.board_id),
                valid_from: None,
                valid_until: None,
            },
            &w.cancel,
        )
        .await?;

    // Can read the board and its tasks
    w.services.boards.get(viewer, w.board_id, &w.cancel).await?;
    w.services.tasks.get(viewer, w.task_id, &w.cancel).await?;
    assert_eq!(w.services.tasks.list(viewer, w.board_id, &w.cancel).await?.len(), 1);

    // Cannot edit, cannot see the company, cannot see the other board
    let edit = w
        .services
        .tasks
        .update(viewer, w.task_id, Default::default(), &w.cancel)
        .await;
    assert!(matches!(edit, Err(ServiceError::PermissionDenied { .. })));
    assert!(w.services.companies.get(viewer, w.company_id, &w.cancel).await.is_err());
    assert!(w.services.boards.get(viewer, other_board.id, &w.cancel).await.is_err());

    // Revoking the only grant closes the board again
    w.services.memberships.revoke(w.owner, membership.id, &w.cancel).await?;
    assert!(!w
        .access
        .has_permission(viewer, ResourceRef::Board(w.board_id), "Board.View", &w.cancel)
        .await?);

    Ok(())
}

#[tokio::test]
async fn expired_membership_grants_nothing() -> anyhow::Result<()> {
    let w = world().await?;
    let contractor = w.store.seed_user("contractor@example.com").await.id;
    let role = w.store.seed_role("Editor", &["Task.Edit"]).await;
    let now = chrono::Utc::now();

    w.store
        .insert_membership(CreateMembership {
            user_id: contractor,
            role_id: role.id,
            resource_id: w.company_id,
            resource_type: taskboard_shared::access::ResourceType::Company,
            valid_from: Some(now - chrono::Duration::days(30)),
            valid_until: Some(now - chrono::Duration::seconds(1)),
        })
        .await?;

    assert!(!w
        .access
        .has_permission(contractor, ResourceRef::Task(w.task_id), "Task.Edit", &w.cancel)
        .await?);

    Ok(())
}

#[tokio::test]
async fn deleted_resources_are_denied_not_errors() -> anyhow::Result<()> {
    let w = world().await?;

    w.services.tasks.delete(w.owner, w.task_id, &w.cancel).await?;

    let allowed = w
        .access
        .has_permission(w.owner, ResourceRef::Task(w.task_id), "Task.View", &w.cancel)
        .await?;
    assert!(!allowed);

    let missing = w
        .access
        .has_permission(w.owner, ResourceRef::Board(Uuid::new_v4()), "Board.View", &w.cancel)
        .await?;
    assert!(!missing);

    Ok(())
}

#[tokio::test]
async fn store_outage_is_neither_allow_nor_deny() -> anyhow::Result<()> {
    let w = world().await?;
    w.store.set_unavailable(true);

    let result = w
        .services
        .boards
        .get(w.owner, w.board_id, &w.cancel)
        .await;
    assert!(matches!(result, Err(ServiceError::Store(_))));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn set_with_ttl_expires() {
    let cache = CacheGateway::new(Arc::new(MemoryCache::new()));
    let key = "task:expiring";

    cache.set(key, &"value".to_string(), Duration::from_secs(5)).await;
    tokio::time::advance(Duration::from_secs(4)).await;
    assert_eq!(cache.get::<String>(key).await.as_deref(), Some("value"));

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(cache.get::<String>(key).await, None);
}

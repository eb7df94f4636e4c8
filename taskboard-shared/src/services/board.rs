//! Board operations
//!
//! Cache keys touched by board writes:
//!
//! | write            | invalidated                                                     |
//! |------------------|-----------------------------------------------------------------|
//! | create           | `board:{id}`, `boards-by-company:{c}`, `board-users-by-board:{id}`, `boards-by-user:{head}` |
//! | update           | `board:{id}`, `boards-by-company:{c}`, `board-users-by-board:{id}`, `boards-by-user:{u}` for every listed user and the previous head |
//! | delete           | the update keys plus `columns-by-board:{id}` and `tasks-by-board:{id}` |
//! | add/remove user  | `board-users-by-board:{id}`, `boards-by-user:{u}`               |

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{ServiceContext, ServiceError};
use crate::access::{permissions, ResourceRef};
use crate::cache::keys;
use crate::events::DomainEvent;
use crate::models::board::{Board, BoardUser, CreateBoard, UpdateBoard};

/// Input for creating a board under a company
#[derive(Debug, Clone)]
pub struct NewBoard {
    pub name: String,
    pub description: Option<String>,
    pub head_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct BoardService {
    ctx: ServiceContext,
}

impl BoardService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Creates a board; a head, if given, is listed as a board user in the same write
    pub async fn create(
        &self,
        user_id: Uuid,
        company_id: Uuid,
        data: NewBoard,
        cancel: &CancellationToken,
    ) -> Result<Board, ServiceError> {
        self.ctx
            .authorize(user_id, ResourceRef::Company(company_id), permissions::BOARD_CREATE, cancel)
            .await?;

        if let Some(head_id) = data.head_id {
            self.require_user(head_id).await?;
        }

        let board = self
            .ctx
            .store
            .insert_board(CreateBoard {
                company_id,
                name: data.name,
                description: data.description,
                head_id: data.head_id,
            })
            .await?;

        let mut stale = vec![
            keys::board(board.id),
            keys::boards_by_company(company_id),
            keys::board_users_by_board(board.id),
        ];
        if let Some(head_id) = board.head_id {
            stale.push(keys::boards_by_user(head_id));
        }
        self.ctx.cache.invalidate(stale).await;

        tracing::info!(user_id = %user_id, board_id = %board.id, company_id = %company_id, "Board created");
        self.ctx.publish(
            user_id,
            DomainEvent::BoardCreated {
                board_id: board.id,
                company_id,
            },
        );

        Ok(board)
    }

    pub async fn get(
        &self,
        user_id: Uuid,
        board_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Board, ServiceError> {
        self.ctx
            .authorize(user_id, ResourceRef::Board(board_id), permissions::BOARD_VIEW, cancel)
            .await?;

        self.load(board_id).await
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        board_id: Uuid,
        data: UpdateBoard,
        cancel: &CancellationToken,
    ) -> Result<Board, ServiceError> {
        self.ctx
            .authorize(user_id, ResourceRef::Board(board_id), permissions::BOARD_EDIT, cancel)
            .await?;

        if let Some(head_id) = data.head_id {
            self.require_user(head_id).await?;
        }

        let previous_head = self
            .ctx
            .store
            .find_board(board_id)
            .await?
            .and_then(|b| b.head_id);

        let board = self
            .ctx
            .store
            .update_board(board_id, data)
            .await?
            .ok_or_else(|| ServiceError::not_found(ResourceRef::Board(board_id)))?;
        let members = self.ctx.store.list_board_users(board_id).await?;

        let mut stale = vec![
            keys::board(board_id),
            keys::boards_by_company(board.company_id),
            keys::board_users_by_board(board_id),
        ];
        stale.extend(members.iter().map(|m| keys::boards_by_user(m.user_id)));
        stale.extend(
            previous_head
                .into_iter()
                .chain(board.head_id)
                .map(keys::boards_by_user),
        );
        stale.sort();
        stale.dedup();
        self.ctx.cache.invalidate(stale).await;

        tracing::info!(user_id = %user_id, board_id = %board_id, "Board updated");
        self.ctx.publish(user_id, DomainEvent::BoardUpdated { board_id });

        Ok(board)
    }

    pub async fn delete(
        &self,
        user_id: Uuid,
        board_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<(), ServiceError> {
        self.ctx
            .authorize(user_id, ResourceRef::Board(board_id), permissions::BOARD_DELETE, cancel)
            .await?;

        let board = self
            .ctx
            .store
            .find_board(board_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ResourceRef::Board(board_id)))?;
        let members = self.ctx.store.list_board_users(board_id).await?;

        if !self.ctx.store.soft_delete_board(board_id).await? {
            return Err(ServiceError::not_found(ResourceRef::Board(board_id)));
        }

        let mut stale = vec![
            keys::board(board_id),
            keys::boards_by_company(board.company_id),
            keys::board_users_by_board(board_id),
            keys::columns_by_board(board_id),
            keys::tasks_by_board(board_id),
        ];
        stale.extend(members.iter().map(|m| keys::boards_by_user(m.user_id)));
        self.ctx.cache.invalidate(stale).await;

        tracing::info!(user_id = %user_id, board_id = %board_id, "Board deleted");
        self.ctx.publish(user_id, DomainEvent::BoardDeleted { board_id });

        Ok(())
    }

    /// Lists `member_id` on the board
    ///
    /// Returns false if the user was already listed.
    pub async fn add_user(
        &self,
        user_id: Uuid,
        board_id: Uuid,
        member_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<bool, ServiceError> {
        self.ctx
            .authorize(user_id, ResourceRef::Board(board_id), permissions::BOARD_MANAGE_USERS, cancel)
            .await?;
        self.require_user(member_id).await?;

        let added = self.ctx.store.add_board_user(board_id, member_id).await?;
        if !added {
            return Ok(false);
        }

        self.ctx
            .cache
            .invalidate([keys::board_users_by_board(board_id), keys::boards_by_user(member_id)])
            .await;

        tracing::info!(user_id = %user_id, board_id = %board_id, member_id = %member_id, "Board user added");
        self.ctx.publish(
            user_id,
            DomainEvent::BoardUserAdded {
                board_id,
                user_id: member_id,
            },
        );

        Ok(true)
    }

    /// Removes `member_id` from the board
    ///
    /// # Errors
    ///
    /// `Conflict` when `member_id` is the board head.
    pub async fn remove_user(
        &self,
        user_id: Uuid,
        board_id: Uuid,
        member_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<bool, ServiceError> {
        self.ctx
            .authorize(user_id, ResourceRef::Board(board_id), permissions::BOARD_MANAGE_USERS, cancel)
            .await?;

        let board = self.load(board_id).await?;
        if board.head_id == Some(member_id) {
            return Err(ServiceError::Conflict(format!(
                "user {} heads board {}; assign a new head first",
                member_id, board_id
            )));
        }

        let removed = self.ctx.store.remove_board_user(board_id, member_id).await?;
        if !removed {
            return Ok(false);
        }

        self.ctx
            .cache
            .invalidate([keys::board_users_by_board(board_id), keys::boards_by_user(member_id)])
            .await;

        tracing::info!(user_id = %user_id, board_id = %board_id, member_id = %member_id, "Board user removed");
        self.ctx.publish(
            user_id,
            DomainEvent::BoardUserRemoved {
                board_id,
                user_id: member_id,
            },
        );

        Ok(true)
    }

    pub async fn list_users(
        &self,
        user_id: Uuid,
        board_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Vec<BoardUser>, ServiceError> {
        self.ctx
            .authorize(user_id, ResourceRef::Board(board_id), permissions::BOARD_VIEW, cancel)
            .await?;

        let store = self.ctx.store.clone();
        let users = self
            .ctx
            .cache
            .get_or_load(
                &keys::board_users_by_board(board_id),
                self.ctx.cache.mutable_ttl(),
                || async move { store.list_board_users(board_id).await },
            )
            .await?;

        Ok(users)
    }

    /// Boards the caller is listed on
    ///
    /// Listing is not an authorization grant; each board is still checked
    /// before it is returned.
    pub async fn list_mine(
        &self,
        user_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Vec<Board>, ServiceError> {
        let store = self.ctx.store.clone();
        let boards: Vec<Board> = self
            .ctx
            .cache
            .get_or_load(
                &keys::boards_by_user(user_id),
                self.ctx.cache.mutable_ttl(),
                || async move { store.list_boards_by_user(user_id).await },
            )
            .await?;

        let mut visible = Vec::with_capacity(boards.len());
        for board in boards {
            if self
                .ctx
                .access
                .has_permission(user_id, ResourceRef::Board(board.id), permissions::BOARD_VIEW, cancel)
                .await?
            {
                visible.push(board);
            }
        }

        Ok(visible)
    }

    async fn load(&self, board_id: Uuid) -> Result<Board, ServiceError> {
        let store = self.ctx.store.clone();
        self.ctx
            .cache
            .get_or_load_optional(&keys::board(board_id), self.ctx.cache.mutable_ttl(), || async move {
                store.find_board(board_id).await
            })
            .await?
            .ok_or_else(|| ServiceError::not_found(ResourceRef::Board(board_id)))
    }

    async fn require_user(&self, id: Uuid) -> Result<(), ServiceError> {
        let store = self.ctx.store.clone();
        let user = self
            .ctx
            .cache
            .get_or_load_optional(&keys::user(id), self.ctx.cache.reference_ttl(), || async move {
                store.find_user(id).await
            })
            .await?;

        match user {
            Some(_) => Ok(()),
            None => Err(ServiceError::Validation(format!("unknown user {}", id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::membership::GrantMembership;
    use crate::services::test_support::Harness;

    async fn company(h: &Harness) -> Uuid {
        h.services()
            .companies
            .create(h.owner, "Acme".to_string(), &h.cancel)
            .await
            .unwrap()
            .id
    }

    fn new_board(name: &str, head_id: Option<Uuid>) -> NewBoard {
        NewBoard {
            name: name.to_string(),
            description: None,
            head_id,
        }
    }

    #[tokio::test]
    async fn test_created_board_shows_up_in_cached_company_listing() {
        let h = Harness::new().await;
        let services = h.services();
        let company_id = company(&h).await;

        // Cache the empty listing first
        let boards = services.companies.list_boards(h.owner, company_id, &h.cancel).await.unwrap();
        assert!(boards.is_empty());

        let board = services
            .boards
            .create(h.owner, company_id, new_board("Roadmap", None), &h.cancel)
            .await
            .unwrap();

        let boards = services.companies.list_boards(h.owner, company_id, &h.cancel).await.unwrap();
        assert_eq!(boards, vec![board]);
    }

    #[tokio::test]
    async fn test_head_gets_full_access_to_board() {
        let h = Harness::new().await;
        let services = h.services();
        let company_id = company(&h).await;
        let head = h.store.seed_user("head@example.com").await.id;

        let board = services
            .boards
            .create(h.owner, company_id, new_board("Ops", Some(head)), &h.cancel)
            .await
            .unwrap();

        let fetched = services.boards.get(head, board.id, &h.cancel).await.unwrap();
        assert_eq!(fetched.head_id, Some(head));

        let mine = services.boards.list_mine(head, &h.cancel).await.unwrap();
        assert_eq!(mine.len(), 1);

        // Heading a board grants nothing on the company
        let err = services.companies.get(head, company_id, &h.cancel).await.unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn test_unknown_head_is_a_validation_error() {
        let h = Harness::new().await;
        let services = h.services();
        let company_id = company(&h).await;

        let err = services
            .boards
            .create(h.owner, company_id, new_board("Ops", Some(Uuid::new_v4())), &h.cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_board_users_are_managed_and_head_is_protected() {
        let mut h = Harness::new().await;
        let services = h.services();
        let company_id = company(&h).await;
        let head = h.store.seed_user("head@example.com").await.id;
        let member = h.store.seed_user("member@example.com").await.id;
        let board = services
            .boards
            .create(h.owner, company_id, new_board("Ops", Some(head)), &h.cancel)
            .await
            .unwrap();

        assert!(services.boards.add_user(head, board.id, member, &h.cancel).await.unwrap());
        assert!(!services.boards.add_user(head, board.id, member, &h.cancel).await.unwrap());
        assert_eq!(services.boards.list_users(head, board.id, &h.cancel).await.unwrap().len(), 2);

        let err = services
            .boards
            .remove_user(h.owner, board.id, head, &h.cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        assert!(services.boards.remove_user(head, board.id, member, &h.cancel).await.unwrap());
        assert_eq!(services.boards.list_users(head, board.id, &h.cancel).await.unwrap().len(), 1);

        assert_eq!(
            h.drain_events(),
            vec!["company_created", "board_created", "board_user_added", "board_user_removed"]
        );
    }

    #[tokio::test]
    async fn test_listed_user_without_role_sees_nothing() {
        let h = Harness::new().await;
        let services = h.services();
        let company_id = company(&h).await;
        let member = h.store.seed_user("member@example.com").await.id;
        let board = services
            .boards
            .create(h.owner, company_id, new_board("Ops", None), &h.cancel)
            .await
            .unwrap();
        services.boards.add_user(h.owner, board.id, member, &h.cancel).await.unwrap();

        assert!(services.boards.list_mine(member, &h.cancel).await.unwrap().is_empty());
        assert!(services.boards.get(member, board.id, &h.cancel).await.is_err());
    }

    #[tokio::test]
    async fn test_deleted_board_is_denied_even_when_cached() {
        let h = Harness::new().await;
        let services = h.services();
        let company_id = company(&h).await;
        let board = services
            .boards
            .create(h.owner, company_id, new_board("Roadmap", None), &h.cancel)
            .await
            .unwrap();
        services.boards.get(h.owner, board.id, &h.cancel).await.unwrap();

        services.boards.delete(h.owner, board.id, &h.cancel).await.unwrap();

        let err = services.boards.get(h.owner, board.id, &h.cancel).await.unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied { .. }));
        assert!(services
            .companies
            .list_boards(h.owner, company_id, &h.cancel)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_rename_refreshes_every_listed_users_boards() {
        let h = Harness::new().await;
        let services = h.services();
        let company_id = company(&h).await;
        let member = h.store.seed_user("member@example.com").await.id;
        let role = h.store.seed_role("Viewer", &["Board.View"]).await;
        let board = services
            .boards
            .create(h.owner, company_id, new_board("Old", None), &h.cancel)
            .await
            .unwrap();
        services.boards.add_user(h.owner, board.id, member, &h.cancel).await.unwrap();
        services
            .memberships
            .grant(
                h.owner,
                GrantMembership {
                    user_id: member,
                    role_id: role.id,
                    scope: ResourceRef::Board(board.id),
                    valid_from: None,
                    valid_until: None,
                },
                &h.cancel,
            )
            .await
            .unwrap();

        let mine = services.boards.list_mine(member, &h.cancel).await.unwrap();
        assert_eq!(mine[0].name, "Old");

        services
            .boards
            .update(
                h.owner,
                board.id,
                UpdateBoard {
                    name: Some("New".to_string()),
                    description: None,
                    head_id: None,
                },
                &h.cancel,
            )
            .await
            .unwrap();

        let mine = services.boards.list_mine(member, &h.cancel).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].name, "New");
    }
}

/// In-process store
///
/// Mirrors the PostgreSQL store's semantics (soft deletes, one live company
/// per owner, reference checks on inserts) over plain vectors, so services
/// and the permission engine can be exercised without a database.
///
/// Collections keep insertion order, which stands in for `ORDER BY created_at`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AccessStore, DomainStore, ResourceNode, StoreError};
use crate::access::ResourceRef;
use crate::models::board::{Board, BoardUser, CreateBoard, UpdateBoard};
use crate::models::column::{Column, CreateColumn};
use crate::models::company::{Company, CreateCompany, UpdateCompany};
use crate::models::membership::{CreateMembership, Membership};
use crate::models::role::Role;
use crate::models::task::{CreateTask, Task, UpdateTask};
use crate::models::task_type::{CreateTaskType, TaskType};
use crate::models::user::User;

#[derive(Default)]
struct State {
    users: Vec<User>,
    companies: Vec<Company>,
    boards: Vec<Board>,
    board_users: Vec<BoardUser>,
    columns: Vec<Column>,
    tasks: Vec<Task>,
    task_types: Vec<TaskType>,
    roles: Vec<(Role, Vec<String>)>,
    memberships: Vec<Membership>,
}

impl State {
    fn live_company(&self, id: Uuid) -> Option<&Company> {
        self.companies.iter().find(|c| c.id == id && c.delete_date.is_none())
    }

    fn live_board(&self, id: Uuid) -> Option<&Board> {
        self.boards.iter().find(|b| b.id == id && b.delete_date.is_none())
    }

    fn live_task(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id && t.delete_date.is_none())
    }

    fn live_user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == id && u.delete_date.is_none())
    }

    fn user_exists(&self, id: Uuid) -> bool {
        self.users.iter().any(|u| u.id == id)
    }

    fn list_board_user(&mut self, board_id: Uuid, user_id: Uuid) -> bool {
        if self
            .board_users
            .iter()
            .any(|bu| bu.board_id == board_id && bu.user_id == user_id)
        {
            return false;
        }
        self.board_users.push(BoardUser {
            board_id,
            user_id,
            created_at: Utc::now(),
        });
        true
    }
}

/// Store keeping everything in memory
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every store call fail with `StoreError::Unavailable` until reset
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store marked unavailable".to_string()));
        }
        Ok(())
    }

    /// Inserts a user with the given email
    pub async fn seed_user(&self, email: &str) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: None,
            avatar_url: None,
            created_at: now,
            updated_at: now,
            delete_date: None,
        };
        self.state.write().await.users.push(user.clone());
        user
    }

    /// Inserts a role carrying `permissions`
    pub async fn seed_role(&self, name: &str, permissions: &[&str]) -> Role {
        let role = Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
            delete_date: None,
        };
        let names = permissions.iter().map(|p| p.to_string()).collect();
        self.state.write().await.roles.push((role.clone(), names));
        role
    }

    /// Soft-deletes a role; its memberships stop granting anything
    pub async fn soft_delete_role(&self, id: Uuid) -> bool {
        let mut state = self.state.write().await;
        match state
            .roles
            .iter_mut()
            .find(|(r, _)| r.id == id && r.delete_date.is_none())
        {
            Some((role, _)) => {
                role.delete_date = Some(Utc::now());
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl AccessStore for MemoryStore {
    async fn load_node(&self, resource: ResourceRef) -> Result<Option<ResourceNode>, StoreError> {
        self.check()?;
        let state = self.state.read().await;

        let node = match resource {
            ResourceRef::Company(id) => state.live_company(id).map(|c| ResourceNode {
                resource,
                parent_id: None,
                implicit_owner: Some(c.owner_id),
            }),
            ResourceRef::Board(id) => state.live_board(id).map(|b| ResourceNode {
                resource,
                parent_id: Some(b.company_id),
                implicit_owner: b.head_id,
            }),
            ResourceRef::Task(id) => state.live_task(id).map(|t| ResourceNode {
                resource,
                parent_id: Some(t.board_id),
                implicit_owner: None,
            }),
            ResourceRef::User(id) => state.live_user(id).map(|_| ResourceNode {
                resource,
                parent_id: None,
                implicit_owner: None,
            }),
        };

        Ok(node)
    }

    async fn active_memberships(
        &self,
        user_id: Uuid,
        resource_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Vec<Membership>, StoreError> {
        self.check()?;
        let state = self.state.read().await;

        Ok(state
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id && m.resource_id == resource_id && m.is_active_at(at))
            .cloned()
            .collect())
    }

    async fn role_permissions(&self, role_id: Uuid) -> Result<Vec<String>, StoreError> {
        self.check()?;
        let state = self.state.read().await;

        Ok(state
            .roles
            .iter()
            .find(|(r, _)| r.id == role_id && r.delete_date.is_none())
            .map(|(_, permissions)| permissions.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl DomainStore for MemoryStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.check()?;
        Ok(self.state.read().await.live_user(id).cloned())
    }

    async fn insert_company(&self, data: CreateCompany) -> Result<Company, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;

        if !state.user_exists(data.owner_id) {
            return Err(StoreError::Conflict(format!("user {} does not exist", data.owner_id)));
        }
        if state
            .companies
            .iter()
            .any(|c| c.owner_id == data.owner_id && c.delete_date.is_none())
        {
            return Err(StoreError::Conflict(format!(
                "user {} already owns a company",
                data.owner_id
            )));
        }

        let now = Utc::now();
        let company = Company {
            id: Uuid::new_v4(),
            name: data.name,
            owner_id: data.owner_id,
            created_at: now,
            updated_at: now,
            delete_date: None,
        };
        state.companies.push(company.clone());

        Ok(company)
    }

    async fn find_company(&self, id: Uuid) -> Result<Option<Company>, StoreError> {
        self.check()?;
        Ok(self.state.read().await.live_company(id).cloned())
    }

    async fn find_company_by_owner(&self, owner_id: Uuid) -> Result<Option<Company>, StoreError> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state
            .companies
            .iter()
            .find(|c| c.owner_id == owner_id && c.delete_date.is_none())
            .cloned())
    }

    async fn update_company(&self, id: Uuid, data: UpdateCompany) -> Result<Option<Company>, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;

        let Some(company) = state
            .companies
            .iter_mut()
            .find(|c| c.id == id && c.delete_date.is_none())
        else {
            return Ok(None);
        };
        if let Some(name) = data.name {
            company.name = name;
        }
        company.updated_at = Utc::now();

        Ok(Some(company.clone()))
    }

    async fn soft_delete_company(&self, id: Uuid) -> Result<bool, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;

        match state
            .companies
            .iter_mut()
            .find(|c| c.id == id && c.delete_date.is_none())
        {
            Some(company) => {
                company.delete_date = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_board(&self, data: CreateBoard) -> Result<Board, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;

        if !state.companies.iter().any(|c| c.id == data.company_id) {
            return Err(StoreError::Conflict(format!(
                "company {} does not exist",
                data.company_id
            )));
        }
        if let Some(head_id) = data.head_id {
            if !state.user_exists(head_id) {
                return Err(StoreError::Conflict(format!("user {} does not exist", head_id)));
            }
        }

        let now = Utc::now();
        let board = Board {
            id: Uuid::new_v4(),
            company_id: data.company_id,
            head_id: data.head_id,
            name: data.name,
            description: data.description,
            created_at: now,
            updated_at: now,
            delete_date: None,
        };
        state.boards.push(board.clone());
        if let Some(head_id) = board.head_id {
            state.list_board_user(board.id, head_id);
        }

        Ok(board)
    }

    async fn find_board(&self, id: Uuid) -> Result<Option<Board>, StoreError> {
        self.check()?;
        Ok(self.state.read().await.live_board(id).cloned())
    }

    async fn list_boards_by_company(&self, company_id: Uuid) -> Result<Vec<Board>, StoreError> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state
            .boards
            .iter()
            .filter(|b| b.company_id == company_id && b.delete_date.is_none())
            .cloned()
            .collect())
    }

    async fn list_boards_by_user(&self, user_id: Uuid) -> Result<Vec<Board>, StoreError> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state
            .boards
            .iter()
            .filter(|b| b.delete_date.is_none())
            .filter(|b| {
                state
                    .board_users
                    .iter()
                    .any(|bu| bu.board_id == b.id && bu.user_id == user_id)
            })
            .cloned()
            .collect())
    }

    async fn update_board(&self, id: Uuid, data: UpdateBoard) -> Result<Option<Board>, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;

        if let Some(head_id) = data.head_id {
            if !state.user_exists(head_id) {
                return Err(StoreError::Conflict(format!("user {} does not exist", head_id)));
            }
        }

        let Some(board) = state
            .boards
            .iter_mut()
            .find(|b| b.id == id && b.delete_date.is_none())
        else {
            return Ok(None);
        };
        if let Some(name) = data.name {
            board.name = name;
        }
        if let Some(description) = data.description {
            board.description = Some(description);
        }
        if let Some(head_id) = data.head_id {
            board.head_id = Some(head_id);
        }
        board.updated_at = Utc::now();
        let board = board.clone();

        if let Some(head_id) = data.head_id {
            state.list_board_user(board.id, head_id);
        }

        Ok(Some(board))
    }

    async fn soft_delete_board(&self, id: Uuid) -> Result<bool, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;

        match state
            .boards
            .iter_mut()
            .find(|b| b.id == id && b.delete_date.is_none())
        {
            Some(board) => {
                board.delete_date = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn add_board_user(&self, board_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;

        if !state.user_exists(user_id) {
            return Err(StoreError::Conflict(format!("user {} does not exist", user_id)));
        }

        Ok(state.list_board_user(board_id, user_id))
    }

    async fn remove_board_user(&self, board_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;

        let before = state.board_users.len();
        state
            .board_users
            .retain(|bu| !(bu.board_id == board_id && bu.user_id == user_id));

        Ok(state.board_users.len() < before)
    }

    async fn list_board_users(&self, board_id: Uuid) -> Result<Vec<BoardUser>, StoreError> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state
            .board_users
            .iter()
            .filter(|bu| bu.board_id == board_id)
            .cloned()
            .collect())
    }

    async fn insert_column(&self, data: CreateColumn) -> Result<Column, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;

        if !state.boards.iter().any(|b| b.id == data.board_id) {
            return Err(StoreError::Conflict(format!("board {} does not exist", data.board_id)));
        }

        let column = Column {
            id: Uuid::new_v4(),
            board_id: data.board_id,
            name: data.name,
            position: data.position,
            created_at: Utc::now(),
            delete_date: None,
        };
        state.columns.push(column.clone());

        Ok(column)
    }

    async fn find_column(&self, id: Uuid) -> Result<Option<Column>, StoreError> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state
            .columns
            .iter()
            .find(|c| c.id == id && c.delete_date.is_none())
            .cloned())
    }

    async fn list_columns_by_board(&self, board_id: Uuid) -> Result<Vec<Column>, StoreError> {
        self.check()?;
        let state = self.state.read().await;
        let mut columns: Vec<Column> = state
            .columns
            .iter()
            .filter(|c| c.board_id == board_id && c.delete_date.is_none())
            .cloned()
            .collect();
        columns.sort_by_key(|c| c.position);
        Ok(columns)
    }

    async fn soft_delete_column(&self, id: Uuid) -> Result<Option<Vec<Uuid>>, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;
        let now = Utc::now();

        match state
            .columns
            .iter_mut()
            .find(|c| c.id == id && c.delete_date.is_none())
        {
            Some(column) => column.delete_date = Some(now),
            None => return Ok(None),
        }

        let mut detached = Vec::new();
        for task in state
            .tasks
            .iter_mut()
            .filter(|t| t.column_id == Some(id) && t.delete_date.is_none())
        {
            task.column_id = None;
            task.updated_at = now;
            detached.push(task.id);
        }

        Ok(Some(detached))
    }

    async fn insert_task(&self, data: CreateTask) -> Result<Task, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;

        if !state.boards.iter().any(|b| b.id == data.board_id) {
            return Err(StoreError::Conflict(format!("board {} does not exist", data.board_id)));
        }
        if !state.user_exists(data.created_by) {
            return Err(StoreError::Conflict(format!("user {} does not exist", data.created_by)));
        }

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            board_id: data.board_id,
            column_id: data.column_id,
            task_type_id: data.task_type_id,
            title: data.title,
            description: data.description,
            assignee_id: data.assignee_id,
            created_by: data.created_by,
            created_at: now,
            updated_at: now,
            delete_date: None,
        };
        state.tasks.push(task.clone());

        Ok(task)
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        self.check()?;
        Ok(self.state.read().await.live_task(id).cloned())
    }

    async fn list_tasks_by_board(&self, board_id: Uuid) -> Result<Vec<Task>, StoreError> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state
            .tasks
            .iter()
            .filter(|t| t.board_id == board_id && t.delete_date.is_none())
            .cloned()
            .collect())
    }

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> Result<Option<Task>, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;

        let Some(task) = state
            .tasks
            .iter_mut()
            .find(|t| t.id == id && t.delete_date.is_none())
        else {
            return Ok(None);
        };
        if let Some(title) = data.title {
            task.title = title;
        }
        if let Some(description) = data.description {
            task.description = Some(description);
        }
        if let Some(column_id) = data.column_id {
            task.column_id = Some(column_id);
        }
        if let Some(task_type_id) = data.task_type_id {
            task.task_type_id = Some(task_type_id);
        }
        if let Some(assignee_id) = data.assignee_id {
            task.assignee_id = Some(assignee_id);
        }
        task.updated_at = Utc::now();

        Ok(Some(task.clone()))
    }

    async fn soft_delete_task(&self, id: Uuid) -> Result<bool, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;

        match state
            .tasks
            .iter_mut()
            .find(|t| t.id == id && t.delete_date.is_none())
        {
            Some(task) => {
                task.delete_date = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_task_type(&self, data: CreateTaskType) -> Result<TaskType, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;

        let task_type = TaskType {
            id: Uuid::new_v4(),
            company_id: data.company_id,
            name: data.name,
            created_at: Utc::now(),
            delete_date: None,
        };
        state.task_types.push(task_type.clone());

        Ok(task_type)
    }

    async fn list_task_types_by_company(&self, company_id: Uuid) -> Result<Vec<TaskType>, StoreError> {
        self.check()?;
        let state = self.state.read().await;
        let mut task_types: Vec<TaskType> = state
            .task_types
            .iter()
            .filter(|t| t.company_id == company_id && t.delete_date.is_none())
            .cloned()
            .collect();
        task_types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(task_types)
    }

    async fn find_role(&self, id: Uuid) -> Result<Option<Role>, StoreError> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state
            .roles
            .iter()
            .find(|(r, _)| r.id == id && r.delete_date.is_none())
            .map(|(r, _)| r.clone()))
    }

    async fn insert_membership(&self, data: CreateMembership) -> Result<Membership, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;

        if !state.user_exists(data.user_id) {
            return Err(StoreError::Conflict(format!("user {} does not exist", data.user_id)));
        }
        if !state.roles.iter().any(|(r, _)| r.id == data.role_id) {
            return Err(StoreError::Conflict(format!("role {} does not exist", data.role_id)));
        }

        let membership = Membership {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            role_id: data.role_id,
            resource_id: data.resource_id,
            resource_type: data.resource_type,
            valid_from: data.valid_from,
            valid_until: data.valid_until,
            created_at: Utc::now(),
            delete_date: None,
        };
        state.memberships.push(membership.clone());

        Ok(membership)
    }

    async fn find_membership(&self, id: Uuid) -> Result<Option<Membership>, StoreError> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state
            .memberships
            .iter()
            .find(|m| m.id == id && m.delete_date.is_none())
            .cloned())
    }

    async fn soft_delete_membership(&self, id: Uuid) -> Result<bool, StoreError> {
        self.check()?;
        let mut state = self.state.write().await;

        match state
            .memberships
            .iter_mut()
            .find(|m| m.id == id && m.delete_date.is_none())
        {
            Some(membership) => {
                membership.delete_date = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_one_live_company_per_owner() {
        let store = MemoryStore::new();
        let owner = store.seed_user("owner@example.com").await;
        let create = || CreateCompany {
            name: "Acme".to_string(),
            owner_id: owner.id,
        };

        let first = store.insert_company(create()).await.unwrap();
        assert!(matches!(
            store.insert_company(create()).await,
            Err(StoreError::Conflict(_))
        ));

        store.soft_delete_company(first.id).await.unwrap();
        assert!(store.insert_company(create()).await.is_ok());
    }

    #[tokio::test]
    async fn test_board_head_is_listed_as_board_user() {
        let store = MemoryStore::new();
        let owner = store.seed_user("owner@example.com").await;
        let head = store.seed_user("head@example.com").await;
        let company = store
            .insert_company(CreateCompany {
                name: "Acme".to_string(),
                owner_id: owner.id,
            })
            .await
            .unwrap();

        let board = store
            .insert_board(CreateBoard {
                company_id: company.id,
                name: "Roadmap".to_string(),
                description: None,
                head_id: Some(head.id),
            })
            .await
            .unwrap();

        let users = store.list_board_users(board.id).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].user_id, head.id);
        assert_eq!(store.list_boards_by_user(head.id).await.unwrap(), vec![board]);
    }

    #[tokio::test]
    async fn test_deleting_column_detaches_tasks() {
        let store = MemoryStore::new();
        let owner = store.seed_user("owner@example.com").await;
        let company = store
            .insert_company(CreateCompany {
                name: "Acme".to_string(),
                owner_id: owner.id,
            })
            .await
            .unwrap();
        let board = store
            .insert_board(CreateBoard {
                company_id: company.id,
                name: "Roadmap".to_string(),
                description: None,
                head_id: None,
            })
            .await
            .unwrap();
        let column = store
            .insert_column(CreateColumn {
                board_id: board.id,
                name: "Todo".to_string(),
                position: 0,
            })
            .await
            .unwrap();
        let task = store
            .insert_task(CreateTask {
                board_id: board.id,
                column_id: Some(column.id),
                task_type_id: None,
                title: "Plan".to_string(),
                description: None,
                assignee_id: None,
                created_by: owner.id,
            })
            .await
            .unwrap();

        let detached = store.soft_delete_column(column.id).await.unwrap();
        assert_eq!(detached, Some(vec![task.id]));
        assert_eq!(store.find_task(task.id).await.unwrap().unwrap().column_id, None);
        assert_eq!(store.soft_delete_column(column.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_deleted_role_carries_no_permissions() {
        let store = MemoryStore::new();
        let role = store.seed_role("Viewer", &["Board.View"]).await;

        assert_eq!(store.role_permissions(role.id).await.unwrap(), vec!["Board.View"]);
        assert!(store.soft_delete_role(role.id).await);
        assert!(store.role_permissions(role.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_unavailable(true);

        assert!(matches!(
            store.find_board(Uuid::new_v4()).await,
            Err(StoreError::Unavailable(_))
        ));

        store.set_unavailable(false);
        assert!(store.find_board(Uuid::new_v4()).await.unwrap().is_none());
    }
}

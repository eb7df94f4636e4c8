/// PostgreSQL store
///
/// Thin adapter from the store traits onto the model methods. Constraint
/// violations are reported as `StoreError::Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
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

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps unique and foreign-key violations to `Conflict`
fn conflict_or_db(err: sqlx::Error, context: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() || db_err.is_foreign_key_violation() {
            return StoreError::Conflict(format!(
                "{} ({})",
                context,
                db_err.constraint().unwrap_or("constraint")
            ));
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl AccessStore for PgStore {
    async fn load_node(&self, resource: ResourceRef) -> Result<Option<ResourceNode>, StoreError> {
        let node = match resource {
            ResourceRef::Company(id) => Company::find_by_id(&self.pool, id).await?.map(|c| ResourceNode {
                resource,
                parent_id: None,
                implicit_owner: Some(c.owner_id),
            }),
            ResourceRef::Board(id) => Board::find_by_id(&self.pool, id).await?.map(|b| ResourceNode {
                resource,
                parent_id: Some(b.company_id),
                implicit_owner: b.head_id,
            }),
            ResourceRef::Task(id) => Task::find_by_id(&self.pool, id).await?.map(|t| ResourceNode {
                resource,
                parent_id: Some(t.board_id),
                implicit_owner: None,
            }),
            ResourceRef::User(id) => User::find_by_id(&self.pool, id).await?.map(|_| ResourceNode {
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
        Ok(Membership::list_active(&self.pool, user_id, resource_id, at).await?)
    }

    async fn role_permissions(&self, role_id: Uuid) -> Result<Vec<String>, StoreError> {
        Ok(Role::permission_names(&self.pool, role_id).await?)
    }
}

#[async_trait]
impl DomainStore for PgStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn insert_company(&self, data: CreateCompany) -> Result<Company, StoreError> {
        let owner_id = data.owner_id;
        Company::create(&self.pool, data)
            .await
            .map_err(|e| conflict_or_db(e, &format!("user {} already owns a company", owner_id)))
    }

    async fn find_company(&self, id: Uuid) -> Result<Option<Company>, StoreError> {
        Ok(Company::find_by_id(&self.pool, id).await?)
    }

    async fn find_company_by_owner(&self, owner_id: Uuid) -> Result<Option<Company>, StoreError> {
        Ok(Company::find_by_owner(&self.pool, owner_id).await?)
    }

    async fn update_company(&self, id: Uuid, data: UpdateCompany) -> Result<Option<Company>, StoreError> {
        Ok(Company::update(&self.pool, id, data).await?)
    }

    async fn soft_delete_company(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(Company::soft_delete(&self.pool, id).await?)
    }

    async fn insert_board(&self, data: CreateBoard) -> Result<Board, StoreError> {
        Board::create(&self.pool, data)
            .await
            .map_err(|e| conflict_or_db(e, "board references a missing company or user"))
    }

    async fn find_board(&self, id: Uuid) -> Result<Option<Board>, StoreError> {
        Ok(Board::find_by_id(&self.pool, id).await?)
    }

    async fn list_boards_by_company(&self, company_id: Uuid) -> Result<Vec<Board>, StoreError> {
        Ok(Board::list_by_company(&self.pool, company_id).await?)
    }

    async fn list_boards_by_user(&self, user_id: Uuid) -> Result<Vec<Board>, StoreError> {
        Ok(Board::list_by_user(&self.pool, user_id).await?)
    }

    async fn update_board(&self, id: Uuid, data: UpdateBoard) -> Result<Option<Board>, StoreError> {
        Board::update(&self.pool, id, data)
            .await
            .map_err(|e| conflict_or_db(e, "board head references a missing user"))
    }

    async fn soft_delete_board(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(Board::soft_delete(&self.pool, id).await?)
    }

    async fn add_board_user(&self, board_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        Board::add_user(&self.pool, board_id, user_id)
            .await
            .map_err(|e| conflict_or_db(e, "board user references a missing user"))
    }

    async fn remove_board_user(&self, board_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(Board::remove_user(&self.pool, board_id, user_id).await?)
    }

    async fn list_board_users(&self, board_id: Uuid) -> Result<Vec<BoardUser>, StoreError> {
        Ok(Board::list_users(&self.pool, board_id).await?)
    }

    async fn insert_column(&self, data: CreateColumn) -> Result<Column, StoreError> {
        Ok(Column::create(&self.pool, data).await?)
    }

    async fn find_column(&self, id: Uuid) -> Result<Option<Column>, StoreError> {
        Ok(Column::find_by_id(&self.pool, id).await?)
    }

    async fn list_columns_by_board(&self, board_id: Uuid) -> Result<Vec<Column>, StoreError> {
        Ok(Column::list_by_board(&self.pool, board_id).await?)
    }

    async fn soft_delete_column(&self, id: Uuid) -> Result<Option<Vec<Uuid>>, StoreError> {
        Ok(Column::soft_delete(&self.pool, id).await?)
    }

    async fn insert_task(&self, data: CreateTask) -> Result<Task, StoreError> {
        Task::create(&self.pool, data)
            .await
            .map_err(|e| conflict_or_db(e, "task references a missing board, column or user"))
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn list_tasks_by_board(&self, board_id: Uuid) -> Result<Vec<Task>, StoreError> {
        Ok(Task::list_by_board(&self.pool, board_id).await?)
    }

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> Result<Option<Task>, StoreError> {
        Task::update(&self.pool, id, data)
            .await
            .map_err(|e| conflict_or_db(e, "task references a missing column or user"))
    }

    async fn soft_delete_task(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(Task::soft_delete(&self.pool, id).await?)
    }

    async fn insert_task_type(&self, data: CreateTaskType) -> Result<TaskType, StoreError> {
        Ok(TaskType::create(&self.pool, data).await?)
    }

    async fn list_task_types_by_company(&self, company_id: Uuid) -> Result<Vec<TaskType>, StoreError> {
        Ok(TaskType::list_by_company(&self.pool, company_id).await?)
    }

    async fn find_role(&self, id: Uuid) -> Result<Option<Role>, StoreError> {
        Ok(Role::find_by_id(&self.pool, id).await?)
    }

    async fn insert_membership(&self, data: CreateMembership) -> Result<Membership, StoreError> {
        Membership::create(&self.pool, data)
            .await
            .map_err(|e| conflict_or_db(e, "membership references a missing user or role"))
    }

    async fn find_membership(&self, id: Uuid) -> Result<Option<Membership>, StoreError> {
        Ok(Membership::find_by_id(&self.pool, id).await?)
    }

    async fn soft_delete_membership(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(Membership::soft_delete(&self.pool, id).await?)
    }
}

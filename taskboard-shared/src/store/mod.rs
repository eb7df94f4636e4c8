/// Authoritative store abstraction
///
/// Two traits split the store by caller:
///
/// - [`AccessStore`]: the three reads the permission engine needs
/// - [`DomainStore`]: everything domain services read and write
///
/// Implementations:
///
/// - [`postgres::PgStore`]: PostgreSQL via the models in [`crate::models`]
/// - [`memory::MemoryStore`]: in-process store for tests and local runs
///
/// Soft-deleted rows are invisible to every `find_*`, `list_*` and
/// [`AccessStore::load_node`] call.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::access::ResourceRef;
use crate::models::board::{Board, BoardUser, CreateBoard, UpdateBoard};
use crate::models::column::{Column, CreateColumn};
use crate::models::company::{Company, CreateCompany, UpdateCompany};
use crate::models::membership::{CreateMembership, Membership};
use crate::models::role::Role;
use crate::models::task::{CreateTask, Task, UpdateTask};
use crate::models::task_type::{CreateTaskType, TaskType};
use crate::models::user::User;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database query failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A uniqueness or reference constraint was violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The store cannot be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// One resource as seen by the hierarchy walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNode {
    pub resource: ResourceRef,

    /// Id of the parent resource (company of a board, board of a task)
    pub parent_id: Option<Uuid>,

    /// User holding every permission here implicitly
    /// (company owner, board head)
    pub implicit_owner: Option<Uuid>,
}

/// Reads required by the permission engine
#[async_trait]
pub trait AccessStore: Send + Sync {
    /// Loads a live resource, or `None` if it is absent or soft-deleted
    ///
    /// The id is looked up in the table of `resource`'s kind only.
    async fn load_node(&self, resource: ResourceRef) -> Result<Option<ResourceNode>, StoreError>;

    /// Memberships of `user_id` on `resource_id` that are active at `at`
    async fn active_memberships(
        &self,
        user_id: Uuid,
        resource_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Vec<Membership>, StoreError>;

    /// Permission names carried by a live role (empty for deleted roles)
    async fn role_permissions(&self, role_id: Uuid) -> Result<Vec<String>, StoreError>;
}

/// Reads and writes used by domain services
///
/// Multi-row writes (board creation with its head, column deletion
/// detaching tasks) are atomic.
#[async_trait]
pub trait DomainStore: AccessStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Inserts a company
    ///
    /// # Errors
    ///
    /// `Conflict` if the owner already owns a live company.
    async fn insert_company(&self, data: CreateCompany) -> Result<Company, StoreError>;
    async fn find_company(&self, id: Uuid) -> Result<Option<Company>, StoreError>;
    async fn find_company_by_owner(&self, owner_id: Uuid) -> Result<Option<Company>, StoreError>;
    async fn update_company(&self, id: Uuid, data: UpdateCompany) -> Result<Option<Company>, StoreError>;
    async fn soft_delete_company(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Inserts a board and lists its head (if any) as a board user
    async fn insert_board(&self, data: CreateBoard) -> Result<Board, StoreError>;
    async fn find_board(&self, id: Uuid) -> Result<Option<Board>, StoreError>;
    async fn list_boards_by_company(&self, company_id: Uuid) -> Result<Vec<Board>, StoreError>;
    async fn list_boards_by_user(&self, user_id: Uuid) -> Result<Vec<Board>, StoreError>;
    async fn update_board(&self, id: Uuid, data: UpdateBoard) -> Result<Option<Board>, StoreError>;
    async fn soft_delete_board(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn add_board_user(&self, board_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;
    async fn remove_board_user(&self, board_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;
    async fn list_board_users(&self, board_id: Uuid) -> Result<Vec<BoardUser>, StoreError>;

    async fn insert_column(&self, data: CreateColumn) -> Result<Column, StoreError>;
    async fn find_column(&self, id: Uuid) -> Result<Option<Column>, StoreError>;
    async fn list_columns_by_board(&self, board_id: Uuid) -> Result<Vec<Column>, StoreError>;

    /// Soft-deletes a column and detaches its tasks
    ///
    /// Returns the detached task ids, or `None` if the column was not live.
    async fn soft_delete_column(&self, id: Uuid) -> Result<Option<Vec<Uuid>>, StoreError>;

    async fn insert_task(&self, data: CreateTask) -> Result<Task, StoreError>;
    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError>;
    async fn list_tasks_by_board(&self, board_id: Uuid) -> Result<Vec<Task>, StoreError>;
    async fn update_task(&self, id: Uuid, data: UpdateTask) -> Result<Option<Task>, StoreError>;
    async fn soft_delete_task(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn insert_task_type(&self, data: CreateTaskType) -> Result<TaskType, StoreError>;
    async fn list_task_types_by_company(&self, company_id: Uuid) -> Result<Vec<TaskType>, StoreError>;

    async fn find_role(&self, id: Uuid) -> Result<Option<Role>, StoreError>;

    async fn insert_membership(&self, data: CreateMembership) -> Result<Membership, StoreError>;
    async fn find_membership(&self, id: Uuid) -> Result<Option<Membership>, StoreError>;
    async fn soft_delete_membership(&self, id: Uuid) -> Result<bool, StoreError>;
}

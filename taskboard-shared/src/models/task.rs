/// Task model and database operations
///
/// Tasks are leaves of the resource hierarchy: a task belongs to one board
/// and optionally sits in one of that board's columns.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     board_id UUID NOT NULL REFERENCES boards(id),
///     column_id UUID REFERENCES columns(id),
///     task_type_id UUID REFERENCES task_types(id),
///     title VARCHAR(500) NOT NULL,
///     description TEXT,
///     assignee_id UUID REFERENCES users(id),
///     created_by UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     delete_date TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Task on a board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    /// Owning board (the task's hierarchy parent)
    pub board_id: Uuid,

    /// Column the task sits in; `None` when unplaced or its column was deleted
    pub column_id: Option<Uuid>,

    pub task_type_id: Option<Uuid>,

    pub title: String,

    pub description: Option<String>,

    pub assignee_id: Option<Uuid>,

    /// User who created the task
    pub created_by: Uuid,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub delete_date: Option<DateTime<Utc>>,
}

/// Input for creating a new task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub board_id: Uuid,
    pub column_id: Option<Uuid>,
    pub task_type_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub assignee_id: Option<Uuid>,
    pub created_by: Uuid,
}

/// Input for updating a task; `None` fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub column_id: Option<Uuid>,
    pub task_type_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
}

const TASK_COLUMNS: &str = "id, board_id, column_id, task_type_id, title, description, \
                            assignee_id, created_by, created_at, updated_at, delete_date";

impl Task {
    pub fn is_deleted(&self) -> bool {
        self.delete_date.is_some()
    }

    /// Creates a new task
    ///
    /// # Errors
    ///
    /// Returns an error if a referenced board, column or user does not exist.
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (board_id, column_id, task_type_id, title, description, assignee_id, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            TASK_COLUMNS
        ))
        .bind(data.board_id)
        .bind(data.column_id)
        .bind(data.task_type_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.assignee_id)
        .bind(data.created_by)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a live task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE id = $1 AND delete_date IS NULL",
            TASK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists live tasks of a board, oldest first
    pub async fn list_by_board(pool: &PgPool, board_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {}
            FROM tasks
            WHERE board_id = $1 AND delete_date IS NULL
            ORDER BY created_at ASC
            "#,
            TASK_COLUMNS
        ))
        .bind(board_id)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Updates a live task
    pub async fn update(pool: &PgPool, id: Uuid, data: UpdateTask) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                column_id = COALESCE($4, column_id),
                task_type_id = COALESCE($5, task_type_id),
                assignee_id = COALESCE($6, assignee_id),
                updated_at = NOW()
            WHERE id = $1 AND delete_date IS NULL
            RETURNING {}
            "#,
            TASK_COLUMNS
        ))
        .bind(id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.column_id)
        .bind(data.task_type_id)
        .bind(data.assignee_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Soft-deletes a task
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tasks SET delete_date = NOW() WHERE id = $1 AND delete_date IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

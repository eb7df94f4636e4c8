/// Board column model
///
/// Columns order the tasks of a board. Deleting a column detaches its tasks
/// rather than deleting them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Column {
    pub id: Uuid,
    pub board_id: Uuid,
    pub name: String,

    /// Sort position within the board (ascending)
    pub position: i32,

    pub created_at: DateTime<Utc>,
    pub delete_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateColumn {
    pub board_id: Uuid,
    pub name: String,
    pub position: i32,
}

const COLUMN_COLUMNS: &str = "id, board_id, name, position, created_at, delete_date";

impl Column {
    pub async fn create(pool: &PgPool, data: CreateColumn) -> Result<Self, sqlx::Error> {
        let column = sqlx::query_as::<_, Column>(&format!(
            "INSERT INTO columns (board_id, name, position) VALUES ($1, $2, $3) RETURNING {}",
            COLUMN_COLUMNS
        ))
        .bind(data.board_id)
        .bind(data.name)
        .bind(data.position)
        .fetch_one(pool)
        .await?;

        Ok(column)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let column = sqlx::query_as::<_, Column>(&format!(
            "SELECT {} FROM columns WHERE id = $1 AND delete_date IS NULL",
            COLUMN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(column)
    }

    pub async fn list_by_board(pool: &PgPool, board_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let columns = sqlx::query_as::<_, Column>(&format!(
            r#"
            SELECT {}
            FROM columns
            WHERE board_id = $1 AND delete_date IS NULL
            ORDER BY position ASC, created_at ASC
            "#,
            COLUMN_COLUMNS
        ))
        .bind(board_id)
        .fetch_all(pool)
        .await?;

        Ok(columns)
    }

    /// Soft-deletes a column and detaches its tasks, in one transaction
    ///
    /// Returns the ids of the detached tasks, or `None` if the column was not live.
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<Option<Vec<Uuid>>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let result = sqlx::query(
            "UPDATE columns SET delete_date = NOW() WHERE id = $1 AND delete_date IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let detached: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            UPDATE tasks
            SET column_id = NULL, updated_at = NOW()
            WHERE column_id = $1 AND delete_date IS NULL
            RETURNING id
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(detached.into_iter().map(|(id,)| id).collect()))
    }
}

/// Board model and database operations
///
/// A board belongs to exactly one company and may have a head. The head is
/// stored on the board and is also listed in `board_users`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE boards (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     company_id UUID NOT NULL REFERENCES companies(id),
///     head_id UUID REFERENCES users(id),
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     delete_date TIMESTAMPTZ
/// );
///
/// CREATE TABLE board_users (
///     board_id UUID NOT NULL REFERENCES boards(id),
///     user_id UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (board_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Board within a company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Board {
    pub id: Uuid,

    /// Owning company
    pub company_id: Uuid,

    /// Board head (implicitly holds every permission on the board and its tasks)
    pub head_id: Option<Uuid>,

    pub name: String,

    pub description: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub delete_date: Option<DateTime<Utc>>,
}

/// A user listed on a board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BoardUser {
    pub board_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBoard {
    pub company_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub head_id: Option<Uuid>,
}

/// Input for updating a board
///
/// `None` leaves a field unchanged. The head can be replaced but not cleared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBoard {
    pub name: Option<String>,
    pub description: Option<String>,
    pub head_id: Option<Uuid>,
}

const BOARD_COLUMNS: &str =
    "id, company_id, head_id, name, description, created_at, updated_at, delete_date";

impl Board {
    pub fn is_deleted(&self) -> bool {
        self.delete_date.is_some()
    }

    /// Creates a board and lists its head as a board user, in one transaction
    pub async fn create(pool: &PgPool, data: CreateBoard) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let board = sqlx::query_as::<_, Board>(&format!(
            r#"
            INSERT INTO boards (company_id, head_id, name, description)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            BOARD_COLUMNS
        ))
        .bind(data.company_id)
        .bind(data.head_id)
        .bind(data.name)
        .bind(data.description)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(head_id) = board.head_id {
            sqlx::query(
                "INSERT INTO board_users (board_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(board.id)
            .bind(head_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(board)
    }

    /// Finds a live board by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let board = sqlx::query_as::<_, Board>(&format!(
            "SELECT {} FROM boards WHERE id = $1 AND delete_date IS NULL",
            BOARD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(board)
    }

    /// Lists live boards of a company, oldest first
    pub async fn list_by_company(pool: &PgPool, company_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let boards = sqlx::query_as::<_, Board>(&format!(
            r#"
            SELECT {}
            FROM boards
            WHERE company_id = $1 AND delete_date IS NULL
            ORDER BY created_at ASC
            "#,
            BOARD_COLUMNS
        ))
        .bind(company_id)
        .fetch_all(pool)
        .await?;

        Ok(boards)
    }

    /// Lists live boards a user is listed on
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let boards = sqlx::query_as::<_, Board>(
            r#"
            SELECT b.id, b.company_id, b.head_id, b.name, b.description,
                   b.created_at, b.updated_at, b.delete_date
            FROM boards b
            JOIN board_users bu ON bu.board_id = b.id
            WHERE bu.user_id = $1 AND b.delete_date IS NULL
            ORDER BY b.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(boards)
    }

    /// Updates a live board
    ///
    /// A new head is also added to `board_users`.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateBoard,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let board = sqlx::query_as::<_, Board>(&format!(
            r#"
            UPDATE boards
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                head_id = COALESCE($4, head_id),
                updated_at = NOW()
            WHERE id = $1 AND delete_date IS NULL
            RETURNING {}
            "#,
            BOARD_COLUMNS
        ))
        .bind(id)
        .bind(data.name)
        .bind(data.description)
        .bind(data.head_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let (Some(board), Some(head_id)) = (&board, data.head_id) {
            sqlx::query(
                "INSERT INTO board_users (board_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(board.id)
            .bind(head_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(board)
    }

    /// Soft-deletes a board
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE boards SET delete_date = NOW() WHERE id = $1 AND delete_date IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists a user on a board; returns false if already listed
    pub async fn add_user(pool: &PgPool, board_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO board_users (board_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(board_id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes a user from a board; returns false if not listed
    pub async fn remove_user(pool: &PgPool, board_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM board_users WHERE board_id = $1 AND user_id = $2")
            .bind(board_id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists the users of a board
    pub async fn list_users(pool: &PgPool, board_id: Uuid) -> Result<Vec<BoardUser>, sqlx::Error> {
        let users = sqlx::query_as::<_, BoardUser>(
            r#"
            SELECT board_id, user_id, created_at
            FROM board_users
            WHERE board_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(board_id)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }
}

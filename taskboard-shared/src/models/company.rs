/// Company model and database operations
///
/// Companies are the root of the resource hierarchy. The owner holds every
/// permission on the company and everything beneath it.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE companies (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     owner_id UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     delete_date TIMESTAMPTZ
/// );
///
/// -- a user owns at most one live company
/// CREATE UNIQUE INDEX companies_owner_live ON companies (owner_id) WHERE delete_date IS NULL;
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Company (tenant root)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub delete_date: Option<DateTime<Utc>>,
}

/// Input for creating a new company
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCompany {
    pub name: String,
    pub owner_id: Uuid,
}

/// Input for updating a company
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCompany {
    pub name: Option<String>,
}

const COMPANY_COLUMNS: &str = "id, name, owner_id, created_at, updated_at, delete_date";

impl Company {
    pub fn is_deleted(&self) -> bool {
        self.delete_date.is_some()
    }

    /// Creates a new company
    ///
    /// # Errors
    ///
    /// Returns a database error with constraint `companies_owner_live` if the
    /// owner already owns a live company.
    pub async fn create(pool: &PgPool, data: CreateCompany) -> Result<Self, sqlx::Error> {
        let company = sqlx::query_as::<_, Company>(&format!(
            "INSERT INTO companies (name, owner_id) VALUES ($1, $2) RETURNING {}",
            COMPANY_COLUMNS
        ))
        .bind(data.name)
        .bind(data.owner_id)
        .fetch_one(pool)
        .await?;

        Ok(company)
    }

    /// Finds a live company by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let company = sqlx::query_as::<_, Company>(&format!(
            "SELECT {} FROM companies WHERE id = $1 AND delete_date IS NULL",
            COMPANY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(company)
    }

    /// Finds the live company owned by a user
    pub async fn find_by_owner(pool: &PgPool, owner_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let company = sqlx::query_as::<_, Company>(&format!(
            "SELECT {} FROM companies WHERE owner_id = $1 AND delete_date IS NULL",
            COMPANY_COLUMNS
        ))
        .bind(owner_id)
        .fetch_optional(pool)
        .await?;

        Ok(company)
    }

    /// Updates a live company; `None` fields are left unchanged
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateCompany,
    ) -> Result<Option<Self>, sqlx::Error> {
        let company = sqlx::query_as::<_, Company>(&format!(
            r#"
            UPDATE companies
            SET name = COALESCE($2, name), updated_at = NOW()
            WHERE id = $1 AND delete_date IS NULL
            RETURNING {}
            "#,
            COMPANY_COLUMNS
        ))
        .bind(id)
        .bind(data.name)
        .fetch_optional(pool)
        .await?;

        Ok(company)
    }

    /// Soft-deletes a company
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE companies SET delete_date = NOW() WHERE id = $1 AND delete_date IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

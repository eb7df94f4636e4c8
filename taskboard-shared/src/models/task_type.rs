/// Task type reference data
///
/// Task types are defined per company and rarely change, so they are cached
/// with the reference TTL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskType {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub delete_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskType {
    pub company_id: Uuid,
    pub name: String,
}

impl TaskType {
    pub async fn create(pool: &PgPool, data: CreateTaskType) -> Result<Self, sqlx::Error> {
        let task_type = sqlx::query_as::<_, TaskType>(
            r#"
            INSERT INTO task_types (company_id, name)
            VALUES ($1, $2)
            RETURNING id, company_id, name, created_at, delete_date
            "#,
        )
        .bind(data.company_id)
        .bind(data.name)
        .fetch_one(pool)
        .await?;

        Ok(task_type)
    }

    pub async fn list_by_company(pool: &PgPool, company_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let task_types = sqlx::query_as::<_, TaskType>(
            r#"
            SELECT id, company_id, name, created_at, delete_date
            FROM task_types
            WHERE company_id = $1 AND delete_date IS NULL
            ORDER BY name ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(pool)
        .await?;

        Ok(task_types)
    }
}

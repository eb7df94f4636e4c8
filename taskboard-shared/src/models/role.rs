/// Role and permission models
///
/// A role is a named set of permission names (`"Board.View"`, `"Task.Edit"`,
/// ...). Roles carry no scope themselves; a membership binds a role to a
/// user and a resource.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE roles (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL UNIQUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     delete_date TIMESTAMPTZ
/// );
///
/// CREATE TABLE permissions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL UNIQUE
/// );
///
/// CREATE TABLE role_permissions (
///     role_id UUID NOT NULL REFERENCES roles(id),
///     permission_id UUID NOT NULL REFERENCES permissions(id),
///     PRIMARY KEY (role_id, permission_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Named permission set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub delete_date: Option<DateTime<Utc>>,
}

/// A single permission name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Permission {
    pub id: Uuid,
    pub name: String,
}

impl Role {
    pub fn is_deleted(&self) -> bool {
        self.delete_date.is_some()
    }

    /// Creates a role with the given permission names, in one transaction
    ///
    /// Unknown permission names are created on the fly.
    pub async fn create(pool: &PgPool, name: &str, permissions: &[&str]) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let role = sqlx::query_as::<_, Role>(
            "INSERT INTO roles (name) VALUES ($1) RETURNING id, name, created_at, delete_date",
        )
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;

        for permission in permissions {
            let permission = sqlx::query_as::<_, Permission>(
                r#"
                INSERT INTO permissions (name) VALUES ($1)
                ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                RETURNING id, name
                "#,
            )
            .bind(*permission)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(role.id)
            .bind(permission.id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(role)
    }

    /// Finds a live role by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let role = sqlx::query_as::<_, Role>(
            "SELECT id, name, created_at, delete_date FROM roles WHERE id = $1 AND delete_date IS NULL",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(role)
    }

    /// Finds a live role by name
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        let role = sqlx::query_as::<_, Role>(
            "SELECT id, name, created_at, delete_date FROM roles WHERE name = $1 AND delete_date IS NULL",
        )
        .bind(name)
        .fetch_optional(pool)
        .await?;

        Ok(role)
    }

    /// Returns the permission names of a live role
    ///
    /// A deleted or unknown role yields an empty list.
    pub async fn permission_names(pool: &PgPool, role_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT p.name
            FROM role_permissions rp
            JOIN permissions p ON p.id = rp.permission_id
            JOIN roles r ON r.id = rp.role_id
            WHERE rp.role_id = $1 AND r.delete_date IS NULL
            ORDER BY p.name ASC
            "#,
        )
        .bind(role_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }
}

/// Membership model and database operations
///
/// A membership grants a role to a user on exactly one resource. Grants flow
/// down the hierarchy: a membership on a company applies to its boards and
/// tasks.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE memberships (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id),
///     role_id UUID NOT NULL REFERENCES roles(id),
///     resource_id UUID NOT NULL,
///     resource_type resource_type NOT NULL,
///     valid_from TIMESTAMPTZ,
///     valid_until TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     delete_date TIMESTAMPTZ
/// );
/// ```
///
/// # Liveness
///
/// A membership is active at instant `t` when it is not soft-deleted and
/// `valid_from <= t < valid_until`, with a missing bound treated as open.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::access::ResourceType;

/// Role assignment scoped to one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    pub id: Uuid,

    pub user_id: Uuid,

    pub role_id: Uuid,

    /// Scope resource id (nil UUID with `User` kind for the global target)
    pub resource_id: Uuid,

    /// Declared kind of the scope resource
    pub resource_type: ResourceType,

    pub valid_from: Option<DateTime<Utc>>,

    pub valid_until: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub delete_date: Option<DateTime<Utc>>,
}

/// Input for creating a membership
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMembership {
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub resource_id: Uuid,
    pub resource_type: ResourceType,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

const MEMBERSHIP_COLUMNS: &str = "id, user_id, role_id, resource_id, resource_type, \
                                  valid_from, valid_until, created_at, delete_date";

impl Membership {
    /// Returns true if the membership grants anything at instant `at`
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        if self.delete_date.is_some() {
            return false;
        }
        if matches!(self.valid_from, Some(from) if at < from) {
            return false;
        }
        if matches!(self.valid_until, Some(until) if at >= until) {
            return false;
        }
        true
    }

    pub async fn create(pool: &PgPool, data: CreateMembership) -> Result<Self, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(&format!(
            r#"
            INSERT INTO memberships (user_id, role_id, resource_id, resource_type, valid_from, valid_until)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            MEMBERSHIP_COLUMNS
        ))
        .bind(data.user_id)
        .bind(data.role_id)
        .bind(data.resource_id)
        .bind(data.resource_type)
        .bind(data.valid_from)
        .bind(data.valid_until)
        .fetch_one(pool)
        .await?;

        Ok(membership)
    }

    /// Finds a live membership by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(&format!(
            "SELECT {} FROM memberships WHERE id = $1 AND delete_date IS NULL",
            MEMBERSHIP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Lists a user's memberships on one resource that are active at `at`
    ///
    /// Rows are returned whatever their declared `resource_type`; callers
    /// check the declared kind against the resource they evaluate.
    pub async fn list_active(
        pool: &PgPool,
        user_id: Uuid,
        resource_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let memberships = sqlx::query_as::<_, Membership>(&format!(
            r#"
            SELECT {}
            FROM memberships
            WHERE user_id = $1
              AND resource_id = $2
              AND delete_date IS NULL
              AND (valid_from IS NULL OR valid_from <= $3)
              AND (valid_until IS NULL OR valid_until > $3)
            ORDER BY created_at ASC
            "#,
            MEMBERSHIP_COLUMNS
        ))
        .bind(user_id)
        .bind(resource_id)
        .bind(at)
        .fetch_all(pool)
        .await?;

        Ok(memberships)
    }

    /// Soft-deletes a membership
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE memberships SET delete_date = NOW() WHERE id = $1 AND delete_date IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

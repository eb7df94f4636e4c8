/// Membership endpoints
///
/// - `POST /v1/memberships` - Grant a role on a scope
/// - `DELETE /v1/memberships/:id` - Revoke a membership
///
/// The scope is a tagged resource reference, e.g.
/// `{ "type": "board", "id": "uuid" }`. The global scope is
/// `{ "type": "user", "id": "00000000-0000-0000-0000-000000000000" }`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::auth::Principal,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use taskboard_shared::access::ResourceRef;
use taskboard_shared::models::membership::Membership;
use taskboard_shared::services::membership::GrantMembership;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct GrantMembershipRequest {
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub scope: ResourceRef,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

/// Grant membership
///
/// ```text
/// POST /v1/memberships
/// Authorization: Bearer <jwt_token>
///
/// {
///   "user_id": "uuid",
///   "role_id": "uuid",
///   "scope": { "type": "company", "id": "uuid" },
///   "valid_until": "2027-01-01T00:00:00Z"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: unknown user or role, inverted validity window, or a
///   scope that does not name a live resource of its kind
/// - `403 Forbidden`: caller cannot manage memberships on the scope
pub async fn grant_membership(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<GrantMembershipRequest>,
) -> ApiResult<(StatusCode, Json<Membership>)> {
    if req.user_id.is_nil() {
        return Err(ApiError::BadRequest("user_id must not be nil".to_string()));
    }

    let membership = state
        .services
        .memberships
        .grant(
            principal.user_id,
            GrantMembership {
                user_id: req.user_id,
                role_id: req.role_id,
                scope: req.scope,
                valid_from: req.valid_from,
                valid_until: req.valid_until,
            },
            &state.request_token(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(membership)))
}

pub async fn revoke_membership(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(membership_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .services
        .memberships
        .revoke(principal.user_id, membership_id, &state.request_token())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Company endpoints
///
/// # Endpoints
///
/// - `POST /v1/companies` - Create a company owned by the caller
/// - `GET /v1/companies/:id` - Get a company
/// - `PATCH /v1/companies/:id` - Rename a company
/// - `DELETE /v1/companies/:id` - Soft-delete a company
/// - `GET /v1/companies/:id/boards` - List the company's boards

use crate::{app::AppState, error::ApiResult, middleware::auth::Principal};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskboard_shared::models::board::Board;
use taskboard_shared::models::company::{Company, UpdateCompany};
use uuid::Uuid;
use validator::Validate;

/// Create company request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCompanyRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
}

/// Update company request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCompanyRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,
}

/// Create company
///
/// The caller becomes the owner. A caller who already owns a live company
/// gets `409 Conflict`.
///
/// ```text
/// POST /v1/companies
/// Authorization: Bearer <jwt_token>
///
/// { "name": "Acme" }
/// ```
pub async fn create_company(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CreateCompanyRequest>,
) -> ApiResult<(StatusCode, Json<Company>)> {
    req.validate()?;

    let company = state
        .services
        .companies
        .create(principal.user_id, req.name, &state.request_token())
        .await?;

    Ok((StatusCode::CREATED, Json(company)))
}

pub async fn get_company(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(company_id): Path<Uuid>,
) -> ApiResult<Json<Company>> {
    let company = state
        .services
        .companies
        .get(principal.user_id, company_id, &state.request_token())
        .await?;

    Ok(Json(company))
}

pub async fn update_company(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(company_id): Path<Uuid>,
    Json(req): Json<UpdateCompanyRequest>,
) -> ApiResult<Json<Company>> {
    req.validate()?;

    let company = state
        .services
        .companies
        .update(
            principal.user_id,
            company_id,
            UpdateCompany { name: req.name },
            &state.request_token(),
        )
        .await?;

    Ok(Json(company))
}

pub async fn delete_company(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(company_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .services
        .companies
        .delete(principal.user_id, company_id, &state.request_token())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_company_boards(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(company_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Board>>> {
    let boards = state
        .services
        .companies
        .list_boards(principal.user_id, company_id, &state.request_token())
        .await?;

    Ok(Json(boards))
}

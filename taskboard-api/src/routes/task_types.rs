/// Task type endpoints
///
/// - `GET /v1/companies/:id/task-types` - List a company's task types
/// - `POST /v1/companies/:id/task-types` - Add a task type

use crate::{app::AppState, error::ApiResult, middleware::auth::Principal};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskboard_shared::models::task_type::TaskType;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskTypeRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
}

pub async fn list_task_types(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(company_id): Path<Uuid>,
) -> ApiResult<Json<Vec<TaskType>>> {
    let task_types = state
        .services
        .task_types
        .list(principal.user_id, company_id, &state.request_token())
        .await?;

    Ok(Json(task_types))
}

pub async fn create_task_type(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(company_id): Path<Uuid>,
    Json(req): Json<CreateTaskTypeRequest>,
) -> ApiResult<(StatusCode, Json<TaskType>)> {
    req.validate()?;

    let task_type = state
        .services
        .task_types
        .create(principal.user_id, company_id, req.name, &state.request_token())
        .await?;

    Ok((StatusCode::CREATED, Json(task_type)))
}

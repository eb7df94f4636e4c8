/// Column endpoints
///
/// - `GET /v1/boards/:id/columns` - List a board's columns by position
/// - `POST /v1/boards/:id/columns` - Create a column
/// - `DELETE /v1/columns/:id` - Soft-delete a column; its tasks are detached

use crate::{app::AppState, error::ApiResult, middleware::auth::Principal};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskboard_shared::models::column::Column;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateColumnRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(range(min = 0, message = "Position must not be negative"))]
    pub position: i32,
}

pub async fn list_columns(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(board_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Column>>> {
    let columns = state
        .services
        .columns
        .list(principal.user_id, board_id, &state.request_token())
        .await?;

    Ok(Json(columns))
}

pub async fn create_column(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(board_id): Path<Uuid>,
    Json(req): Json<CreateColumnRequest>,
) -> ApiResult<(StatusCode, Json<Column>)> {
    req.validate()?;

    let column = state
        .services
        .columns
        .create(
            principal.user_id,
            board_id,
            req.name,
            req.position,
            &state.request_token(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(column)))
}

pub async fn delete_column(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(column_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .services
        .columns
        .delete(principal.user_id, column_id, &state.request_token())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

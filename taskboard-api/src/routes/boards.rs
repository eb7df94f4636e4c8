/// Board endpoints
///
/// # Endpoints
///
/// - `POST /v1/companies/:id/boards` - Create a board under a company
/// - `GET /v1/boards` - List the boards the caller can view
/// - `GET /v1/boards/:id` - Get a board
/// - `PATCH /v1/boards/:id` - Update a board
/// - `DELETE /v1/boards/:id` - Soft-delete a board
/// - `GET /v1/boards/:id/users` - List board users
/// - `POST /v1/boards/:id/users/:user_id` - Add a board user
/// - `DELETE /v1/boards/:id/users/:user_id` - Remove a board user

use crate::{app::AppState, error::ApiResult, middleware::auth::Principal};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskboard_shared::models::board::{Board, BoardUser, UpdateBoard};
use taskboard_shared::services::board::NewBoard;
use uuid::Uuid;
use validator::Validate;

/// Create board request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBoardRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    /// Board head; must be an existing user
    pub head_id: Option<Uuid>,
}

/// Update board request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBoardRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    pub head_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct AddBoardUserResponse {
    /// False if the user was already on the board
    pub added: bool,
}

#[derive(Debug, Serialize)]
pub struct RemoveBoardUserResponse {
    /// False if the user was not on the board
    pub removed: bool,
}

/// Create board
///
/// Requires `Board.Create` on the company.
///
/// ```text
/// POST /v1/companies/:id/boards
/// Authorization: Bearer <jwt_token>
///
/// { "name": "Roadmap", "description": "Q3", "head_id": "uuid" }
/// ```
pub async fn create_board(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(company_id): Path<Uuid>,
    Json(req): Json<CreateBoardRequest>,
) -> ApiResult<(StatusCode, Json<Board>)> {
    req.validate()?;

    let board = state
        .services
        .boards
        .create(
            principal.user_id,
            company_id,
            NewBoard {
                name: req.name,
                description: req.description,
                head_id: req.head_id,
            },
            &state.request_token(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(board)))
}

pub async fn list_my_boards(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<Vec<Board>>> {
    let boards = state
        .services
        .boards
        .list_mine(principal.user_id, &state.request_token())
        .await?;

    Ok(Json(boards))
}

pub async fn get_board(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(board_id): Path<Uuid>,
) -> ApiResult<Json<Board>> {
    let board = state
        .services
        .boards
        .get(principal.user_id, board_id, &state.request_token())
        .await?;

    Ok(Json(board))
}

pub async fn update_board(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(board_id): Path<Uuid>,
    Json(req): Json<UpdateBoardRequest>,
) -> ApiResult<Json<Board>> {
    req.validate()?;

    let board = state
        .services
        .boards
        .update(
            principal.user_id,
            board_id,
            UpdateBoard {
                name: req.name,
                description: req.description,
                head_id: req.head_id,
            },
            &state.request_token(),
        )
        .await?;

    Ok(Json(board))
}

pub async fn delete_board(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(board_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .services
        .boards
        .delete(principal.user_id, board_id, &state.request_token())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_board_users(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(board_id): Path<Uuid>,
) -> ApiResult<Json<Vec<BoardUser>>> {
    let users = state
        .services
        .boards
        .list_users(principal.user_id, board_id, &state.request_token())
        .await?;

    Ok(Json(users))
}

pub async fn add_board_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((board_id, member_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<AddBoardUserResponse>> {
    let added = state
        .services
        .boards
        .add_user(principal.user_id, board_id, member_id, &state.request_token())
        .await?;

    Ok(Json(AddBoardUserResponse { added }))
}

pub async fn remove_board_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((board_id, member_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<RemoveBoardUserResponse>> {
    let removed = state
        .services
        .boards
        .remove_user(principal.user_id, board_id, member_id, &state.request_token())
        .await?;

    Ok(Json(RemoveBoardUserResponse { removed }))
}

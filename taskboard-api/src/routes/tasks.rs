/// Task endpoints
///
/// # Endpoints
///
/// - `GET /v1/boards/:id/tasks` - List a board's tasks
/// - `POST /v1/boards/:id/tasks` - Create a task on a board
/// - `GET /v1/tasks/:id` - Get a task
/// - `PATCH /v1/tasks/:id` - Update a task, including moving it between columns
/// - `DELETE /v1/tasks/:id` - Soft-delete a task

use crate::{app::AppState, error::ApiResult, middleware::auth::Principal};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskboard_shared::models::task::{Task, UpdateTask};
use taskboard_shared::services::task::NewTask;
use uuid::Uuid;
use validator::Validate;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 500, message = "Title must be 1-500 characters"))]
    pub title: String,

    #[validate(length(max = 10000, message = "Description must be at most 10000 characters"))]
    pub description: Option<String>,

    /// Column on the same board
    pub column_id: Option<Uuid>,

    /// Task type of the board's company
    pub task_type_id: Option<Uuid>,

    pub assignee_id: Option<Uuid>,
}

/// Update task request; omitted fields are left unchanged
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 500, message = "Title must be 1-500 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 10000, message = "Description must be at most 10000 characters"))]
    pub description: Option<String>,

    pub column_id: Option<Uuid>,
    pub task_type_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(board_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = state
        .services
        .tasks
        .list(principal.user_id, board_id, &state.request_token())
        .await?;

    Ok(Json(tasks))
}

/// Create task
///
/// Requires `Task.Create` on the board.
///
/// ```text
/// POST /v1/boards/:id/tasks
/// Authorization: Bearer <jwt_token>
///
/// { "title": "Ship it", "column_id": "uuid" }
/// ```
pub async fn create_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(board_id): Path<Uuid>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;

    let task = state
        .services
        .tasks
        .create(
            principal.user_id,
            board_id,
            NewTask {
                title: req.title,
                description: req.description,
                column_id: req.column_id,
                task_type_id: req.task_type_id,
                assignee_id: req.assignee_id,
            },
            &state.request_token(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = state
        .services
        .tasks
        .get(principal.user_id, task_id, &state.request_token())
        .await?;

    Ok(Json(task))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate()?;

    let task = state
        .services
        .tasks
        .update(
            principal.user_id,
            task_id,
            UpdateTask {
                title: req.title,
                description: req.description,
                column_id: req.column_id,
                task_type_id: req.task_type_id,
                assignee_id: req.assignee_id,
            },
            &state.request_token(),
        )
        .await?;

    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .services
        .tasks
        .delete(principal.user_id, task_id, &state.request_token())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

//! Task operations

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{ServiceContext, ServiceError};
use crate::access::{permissions, ResourceRef};
use crate::cache::keys;
use crate::events::DomainEvent;
use crate::models::task::{CreateTask, Task, UpdateTask};

/// Input for creating a task on a board
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub column_id: Option<Uuid>,
    pub task_type_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct TaskService {
    ctx: ServiceContext,
}

impl TaskService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        board_id: Uuid,
        data: NewTask,
        cancel: &CancellationToken,
    ) -> Result<Task, ServiceError> {
        self.ctx
            .authorize(user_id, ResourceRef::Board(board_id), permissions::TASK_CREATE, cancel)
            .await?;

        if let Some(column_id) = data.column_id {
            self.check_column(board_id, column_id).await?;
        }
        if let Some(task_type_id) = data.task_type_id {
            self.check_task_type(board_id, task_type_id).await?;
        }

        let task = self
            .ctx
            .store
            .insert_task(CreateTask {
                board_id,
                column_id: data.column_id,
                task_type_id: data.task_type_id,
                title: data.title,
                description: data.description,
                assignee_id: data.assignee_id,
                created_by: user_id,
            })
            .await?;

        self.ctx
            .cache
            .invalidate([keys::task(task.id), keys::tasks_by_board(board_id)])
            .await;

        tracing::info!(user_id = %user_id, board_id = %board_id, task_id = %task.id, "Task created");
        self.ctx.publish(
            user_id,
            DomainEvent::TaskCreated {
                task_id: task.id,
                board_id,
            },
        );

        Ok(task)
    }

    pub async fn get(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Task, ServiceError> {
        self.ctx
            .authorize(user_id, ResourceRef::Task(task_id), permissions::TASK_VIEW, cancel)
            .await?;

        let store = self.ctx.store.clone();
        self.ctx
            .cache
            .get_or_load_optional(&keys::task(task_id), self.ctx.cache.mutable_ttl(), || async move {
                store.find_task(task_id).await
            })
            .await?
            .ok_or_else(|| ServiceError::not_found(ResourceRef::Task(task_id)))
    }

    /// Live tasks of a board
    pub async fn list(
        &self,
        user_id: Uuid,
        board_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Vec<Task>, ServiceError> {
        self.ctx
            .authorize(user_id, ResourceRef::Board(board_id), permissions::TASK_VIEW, cancel)
            .await?;

        let store = self.ctx.store.clone();
        let tasks = self
            .ctx
            .cache
            .get_or_load(
                &keys::tasks_by_board(board_id),
                self.ctx.cache.mutable_ttl(),
                || async move { store.list_tasks_by_board(board_id).await },
            )
            .await?;

        Ok(tasks)
    }

    /// Updates a task; setting `column_id` moves it to another column of the same board
    pub async fn update(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        data: UpdateTask,
        cancel: &CancellationToken,
    ) -> Result<Task, ServiceError> {
        self.ctx
            .authorize(user_id, ResourceRef::Task(task_id), permissions::TASK_EDIT, cancel)
            .await?;

        let current = self
            .ctx
            .store
            .find_task(task_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ResourceRef::Task(task_id)))?;

        if let Some(column_id) = data.column_id {
            self.check_column(current.board_id, column_id).await?;
        }
        if let Some(task_type_id) = data.task_type_id {
            self.check_task_type(current.board_id, task_type_id).await?;
        }

        let task = self
            .ctx
            .store
            .update_task(task_id, data)
            .await?
            .ok_or_else(|| ServiceError::not_found(ResourceRef::Task(task_id)))?;

        self.ctx
            .cache
            .invalidate([keys::task(task_id), keys::tasks_by_board(task.board_id)])
            .await;

        tracing::info!(user_id = %user_id, task_id = %task_id, "Task updated");
        self.ctx.publish(
            user_id,
            DomainEvent::TaskUpdated {
                task_id,
                board_id: task.board_id,
            },
        );

        Ok(task)
    }

    pub async fn delete(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<(), ServiceError> {
        self.ctx
            .authorize(user_id, ResourceRef::Task(task_id), permissions::TASK_DELETE, cancel)
            .await?;

        let task = self
            .ctx
            .store
            .find_task(task_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ResourceRef::Task(task_id)))?;

        if !self.ctx.store.soft_delete_task(task_id).await? {
            return Err(ServiceError::not_found(ResourceRef::Task(task_id)));
        }

        self.ctx
            .cache
            .invalidate([keys::task(task_id), keys::tasks_by_board(task.board_id)])
            .await;

        tracing::info!(user_id = %user_id, task_id = %task_id, "Task deleted");
        self.ctx.publish(
            user_id,
            DomainEvent::TaskDeleted {
                task_id,
                board_id: task.board_id,
            },
        );

        Ok(())
    }

    async fn check_column(&self, board_id: Uuid, column_id: Uuid) -> Result<(), ServiceError> {
        match self.ctx.store.find_column(column_id).await? {
            Some(column) if column.board_id == board_id => Ok(()),
            _ => Err(ServiceError::Validation(format!(
                "column {} is not on board {}",
                column_id, board_id
            ))),
        }
    }

    async fn check_task_type(&self, board_id: Uuid, task_type_id: Uuid) -> Result<(), ServiceError> {
        let board = self
            .ctx
            .store
            .find_board(board_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ResourceRef::Board(board_id)))?;

        let store = self.ctx.store.clone();
        let company_id = board.company_id;
        let task_types = self
            .ctx
            .cache
            .get_or_load(
                &keys::task_types_by_company(company_id),
                self.ctx.cache.reference_ttl(),
                || async move { store.list_task_types_by_company(company_id).await },
            )
            .await?;

        if task_types.iter().any(|t| t.id == task_type_id) {
            Ok(())
        } else {
            Err(ServiceError::Validation(format!(
                "task type {} does not belong to company {}",
                task_type_id, company_id
            )))
        }
    }
}

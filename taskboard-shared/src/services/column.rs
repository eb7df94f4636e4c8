//! Column operations
//!
//! Columns are not a resource kind of their own; every check runs against
//! the owning board.

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{ServiceContext, ServiceError};
use crate::access::{permissions, ResourceRef};
use crate::cache::keys;
use crate::events::DomainEvent;
use crate::models::column::{Column, CreateColumn};

#[derive(Clone)]
pub struct ColumnService {
    ctx: ServiceContext,
}

impl ColumnService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        board_id: Uuid,
        name: String,
        position: i32,
        cancel: &CancellationToken,
    ) -> Result<Column, ServiceError> {
        self.ctx
            .authorize(user_id, ResourceRef::Board(board_id), permissions::COLUMN_EDIT, cancel)
            .await?;

        let column = self
            .ctx
            .store
            .insert_column(CreateColumn {
                board_id,
                name,
                position,
            })
            .await?;

        self.ctx
            .cache
            .invalidate([keys::column(column.id), keys::columns_by_board(board_id)])
            .await;

        tracing::info!(user_id = %user_id, board_id = %board_id, column_id = %column.id, "Column created");
        self.ctx.publish(
            user_id,
            DomainEvent::ColumnCreated {
                column_id: column.id,
                board_id,
            },
        );

        Ok(column)
    }

    /// Columns of a board ordered by position
    pub async fn list(
        &self,
        user_id: Uuid,
        board_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Vec<Column>, ServiceError> {
        self.ctx
            .authorize(user_id, ResourceRef::Board(board_id), permissions::BOARD_VIEW, cancel)
            .await?;

        let store = self.ctx.store.clone();
        let columns = self
            .ctx
            .cache
            .get_or_load(
                &keys::columns_by_board(board_id),
                self.ctx.cache.mutable_ttl(),
                || async move { store.list_columns_by_board(board_id).await },
            )
            .await?;

        Ok(columns)
    }

    /// Deletes a column; its tasks stay on the board without a column
    pub async fn delete(
        &self,
        user_id: Uuid,
        column_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<(), ServiceError> {
        let column = self
            .ctx
            .store
            .find_column(column_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("column:{}", column_id)))?;

        self.ctx
            .authorize(user_id, ResourceRef::Board(column.board_id), permissions::COLUMN_EDIT, cancel)
            .await?;

        let detached = self
            .ctx
            .store
            .soft_delete_column(column_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("column:{}", column_id)))?;

        let mut stale = vec![
            keys::column(column_id),
            keys::columns_by_board(column.board_id),
            keys::tasks_by_board(column.board_id),
        ];
        stale.extend(detached.iter().map(|task_id| keys::task(*task_id)));
        self.ctx.cache.invalidate(stale).await;

        tracing::info!(
            user_id = %user_id,
            column_id = %column_id,
            detached_tasks = detached.len(),
            "Column deleted"
        );
        self.ctx.publish(
            user_id,
            DomainEvent::ColumnDeleted {
                column_id,
                board_id: column.board_id,
            },
        );

        Ok(())
    }
}

//! Errors returned by domain services

use thiserror::Error;
use uuid::Uuid;

use crate::access::{AccessError, ResourceRef};
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The caller lacks the permission the operation requires
    #[error("Permission denied: {permission} on {resource}")]
    PermissionDenied {
        user_id: Uuid,
        resource: ResourceRef,
        permission: String,
    },

    /// The target was authorized but has since disappeared
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The request was cancelled before completing
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn not_found(resource: impl std::fmt::Display) -> Self {
        ServiceError::NotFound(resource.to_string())
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Store(other),
        }
    }
}

impl From<AccessError> for ServiceError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::PermissionDenied {
                user_id,
                resource,
                permission,
            } => ServiceError::PermissionDenied {
                user_id,
                resource,
                permission,
            },
            AccessError::Cancelled => ServiceError::Cancelled,
            AccessError::Store(e) => ServiceError::from(e),
            AccessError::ResourceNotFound(resource) => ServiceError::not_found(resource),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

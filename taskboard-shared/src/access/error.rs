//! Access-control error taxonomy

use thiserror::Error;
use uuid::Uuid;

use super::resource::{ResourceRef, ResourceType};
use crate::store::StoreError;

/// Errors raised while evaluating or enforcing a permission
///
/// Only [`AccessError::PermissionDenied`], [`AccessError::Cancelled`] and
/// [`AccessError::Store`] ever leave [`AccessService`](super::AccessService);
/// the remaining variants are turned into a logged deny at the façade.
#[derive(Debug, Error)]
pub enum AccessError {
    /// The resource (or one of its ancestors) is deleted or absent
    #[error("Resource not found: {0}")]
    ResourceNotFound(ResourceRef),

    /// The principal does not hold the permission
    #[error("Permission denied: user {user_id} lacks {permission} on {resource}")]
    PermissionDenied {
        user_id: Uuid,
        resource: ResourceRef,
        permission: String,
    },

    /// A membership row is scoped to a different kind than the resource it references
    #[error("Invalid membership scope: membership {membership_id} declares {declared} but references a {actual}")]
    InvalidScope {
        membership_id: Uuid,
        declared: ResourceType,
        actual: ResourceType,
    },

    /// The ancestor walk exceeded the configured hierarchy depth
    #[error("Resource hierarchy too deep starting at {0}")]
    HierarchyTooDeep(ResourceRef),

    /// The check was cancelled before a decision was reached
    #[error("Permission check cancelled")]
    Cancelled,

    /// The authoritative store failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl AccessError {
    /// True when the error is a definitive deny rather than an unknown outcome
    pub fn is_denied(&self) -> bool {
        matches!(self, AccessError::PermissionDenied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_error_display() {
        let board = ResourceRef::Board(Uuid::nil());

        let err = AccessError::PermissionDenied {
            user_id: Uuid::nil(),
            resource: board,
            permission: "Board.Edit".to_string(),
        };
        assert!(err.to_string().contains("Board.Edit"));
        assert!(err.is_denied());

        let err = AccessError::Cancelled;
        assert!(err.to_string().contains("cancelled"));
        assert!(!err.is_denied());

        let err = AccessError::InvalidScope {
            membership_id: Uuid::nil(),
            declared: ResourceType::Company,
            actual: ResourceType::Board,
        };
        assert!(err.to_string().contains("declares company"));
    }
}

//! Access façade used by every domain service
//!
//! # Outcomes
//!
//! | Engine result            | `has_permission`            |
//! |--------------------------|-----------------------------|
//! | grant                    | `Ok(true)`                  |
//! | no grant                 | `Ok(false)`                 |
//! | resource not found       | `Ok(false)`, logged at warn |
//! | hierarchy too deep       | `Ok(false)`, logged at error|
//! | cancelled                | `Err(Cancelled)`            |
//! | store failure            | `Err(Store)`                |
//!
//! A cancelled or failed check is an unknown outcome, never a deny.

use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::engine::PermissionEngine;
use super::error::AccessError;
use super::resource::ResourceRef;
use crate::cache::CacheGateway;
use crate::store::AccessStore;

/// Single entry point for authorization decisions
#[derive(Clone)]
pub struct AccessService {
    engine: Arc<PermissionEngine>,
}

impl AccessService {
    pub fn new(store: Arc<dyn AccessStore>, cache: CacheGateway) -> Self {
        Self {
            engine: Arc::new(PermissionEngine::new(store, cache)),
        }
    }

    pub fn engine(&self) -> &PermissionEngine {
        &self.engine
    }

    /// Does `user_id` hold `permission` on `resource`?
    ///
    /// # Errors
    ///
    /// - `AccessError::Cancelled` if `cancel` fires before a decision is reached
    /// - `AccessError::Store` if the authoritative store fails
    ///
    /// Missing resources are reported as `Ok(false)`.
    pub async fn has_permission(
        &self,
        user_id: Uuid,
        resource: ResourceRef,
        permission: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, AccessError> {
        if cancel.is_cancelled() {
            return Err(AccessError::Cancelled);
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(
                    user_id = %user_id,
                    resource = %resource,
                    permission,
                    "Permission check cancelled"
                );
                return Err(AccessError::Cancelled);
            }
            outcome = self.engine.evaluate(user_id, resource, permission, Utc::now()) => outcome,
        };

        match outcome {
            Ok(Some(grant)) => {
                tracing::debug!(
                    user_id = %user_id,
                    resource = %resource,
                    permission,
                    grant = %grant,
                    "Permission granted"
                );
                Ok(true)
            }
            Ok(None) => {
                tracing::debug!(
                    user_id = %user_id,
                    resource = %resource,
                    permission,
                    "Permission denied"
                );
                Ok(false)
            }
            Err(AccessError::ResourceNotFound(missing)) => {
                tracing::warn!(
                    user_id = %user_id,
                    resource = %resource,
                    missing = %missing,
                    permission,
                    "Resource not found during permission check, denying"
                );
                Ok(false)
            }
            Err(err @ AccessError::HierarchyTooDeep(_)) => {
                tracing::error!(
                    user_id = %user_id,
                    resource = %resource,
                    permission,
                    error = %err,
                    "Corrupted resource hierarchy, denying"
                );
                Ok(false)
            }
            Err(err) => {
                tracing::error!(
                    user_id = %user_id,
                    resource = %resource,
                    permission,
                    error = %err,
                    "Permission check failed"
                );
                Err(err)
            }
        }
    }

    /// Like [`has_permission`](Self::has_permission) but turns a deny into
    /// `AccessError::PermissionDenied`
    pub async fn require_permission(
        &self,
        user_id: Uuid,
        resource: ResourceRef,
        permission: &str,
        cancel: &CancellationToken,
    ) -> Result<(), AccessError> {
        if self.has_permission(user_id, resource, permission, cancel).await? {
            return Ok(());
        }

        Err(AccessError::PermissionDenied {
            user_id,
            resource,
            permission: permission.to_string(),
        })
    }
}

//! Membership grants and revocations
//!
//! Managing memberships needs a permission on the membership's scope:
//!
//! | scope             | permission               |
//! |-------------------|--------------------------|
//! | company           | `Company.ManageMembers`  |
//! | board, task       | `Board.ManageUsers`      |
//! | global (nil user) | `User.Invite` on global  |
//!
//! Permission decisions are never cached, so a revocation is effective for
//! every request issued after it commits.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{ServiceContext, ServiceError};
use crate::access::{permissions, AccessError, ResourceRef};
use crate::events::DomainEvent;
use crate::models::membership::{CreateMembership, Membership};

/// Input for granting a role
#[derive(Debug, Clone)]
pub struct GrantMembership {
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub scope: ResourceRef,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

/// Permission required to manage memberships on `scope`
pub fn manage_permission(scope: ResourceRef) -> Option<&'static str> {
    match scope {
        ResourceRef::Company(_) => Some(permissions::COMPANY_MANAGE_MEMBERS),
        ResourceRef::Board(_) | ResourceRef::Task(_) => Some(permissions::BOARD_MANAGE_USERS),
        ResourceRef::User(_) if scope.is_global() => Some(permissions::USER_INVITE),
        ResourceRef::User(_) => None,
    }
}

#[derive(Clone)]
pub struct MembershipService {
    ctx: ServiceContext,
}

impl MembershipService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Grants a role on a scope
    ///
    /// # Errors
    ///
    /// - `PermissionDenied` if the caller cannot manage memberships on the scope
    /// - `Validation` for an unknown user or role, an inverted validity
    ///   window, or a scope that does not resolve to a live resource of its kind
    pub async fn grant(
        &self,
        user_id: Uuid,
        data: GrantMembership,
        cancel: &CancellationToken,
    ) -> Result<Membership, ServiceError> {
        let permission = manage_permission(data.scope).ok_or_else(|| {
            ServiceError::Validation(format!("memberships cannot be scoped to {}", data.scope))
        })?;
        self.ctx.authorize(user_id, data.scope, permission, cancel).await?;

        if let (Some(from), Some(until)) = (data.valid_from, data.valid_until) {
            if from >= until {
                return Err(ServiceError::Validation(
                    "valid_from must be earlier than valid_until".to_string(),
                ));
            }
        }

        if self.ctx.store.find_role(data.role_id).await?.is_none() {
            return Err(ServiceError::Validation(format!("unknown role {}", data.role_id)));
        }
        if self.ctx.store.find_user(data.user_id).await?.is_none() {
            return Err(ServiceError::Validation(format!("unknown user {}", data.user_id)));
        }
        self.check_scope(data.scope).await?;

        let membership = self
            .ctx
            .store
            .insert_membership(CreateMembership {
                user_id: data.user_id,
                role_id: data.role_id,
                resource_id: data.scope.id(),
                resource_type: data.scope.resource_type(),
                valid_from: data.valid_from,
                valid_until: data.valid_until,
            })
            .await?;

        tracing::info!(
            user_id = %user_id,
            member_id = %membership.user_id,
            role_id = %membership.role_id,
            scope = %data.scope,
            membership_id = %membership.id,
            "Membership granted"
        );
        self.ctx.publish(
            user_id,
            DomainEvent::MembershipGranted {
                membership_id: membership.id,
                user_id: membership.user_id,
                scope: data.scope,
            },
        );

        Ok(membership)
    }

    /// Soft-deletes a membership
    pub async fn revoke(
        &self,
        user_id: Uuid,
        membership_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<(), ServiceError> {
        let membership = self
            .ctx
            .store
            .find_membership(membership_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("membership:{}", membership_id)))?;

        let scope = ResourceRef::new(membership.resource_type, membership.resource_id);
        let permission = manage_permission(scope).ok_or_else(|| {
            ServiceError::Validation(format!("memberships cannot be scoped to {}", scope))
        })?;
        self.ctx.authorize(user_id, scope, permission, cancel).await?;

        if !self.ctx.store.soft_delete_membership(membership_id).await? {
            return Err(ServiceError::not_found(format!("membership:{}", membership_id)));
        }

        tracing::info!(
            user_id = %user_id,
            membership_id = %membership_id,
            scope = %scope,
            "Membership revoked"
        );
        self.ctx.publish(
            user_id,
            DomainEvent::MembershipRevoked {
                membership_id,
                user_id: membership.user_id,
                scope,
            },
        );

        Ok(())
    }

    /// Rejects scopes that do not resolve to a live resource of their declared kind
    async fn check_scope(&self, scope: ResourceRef) -> Result<(), ServiceError> {
        if scope.is_global() {
            return Ok(());
        }

        match self.ctx.store.load_node(scope).await? {
            Some(_) => Ok(()),
            None => {
                let err = AccessError::ResourceNotFound(scope);
                Err(ServiceError::Validation(err.to_string()))
            }
        }
    }
}

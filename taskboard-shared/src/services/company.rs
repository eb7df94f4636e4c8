//! Company operations

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{ServiceContext, ServiceError};
use crate::access::{permissions, ResourceRef};
use crate::cache::keys;
use crate::events::DomainEvent;
use crate::models::board::Board;
use crate::models::company::{Company, CreateCompany, UpdateCompany};

#[derive(Clone)]
pub struct CompanyService {
    ctx: ServiceContext,
}

impl CompanyService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Creates a company owned by the caller
    ///
    /// # Errors
    ///
    /// `Conflict` if the caller already owns a live company.
    pub async fn create(
        &self,
        user_id: Uuid,
        name: String,
        cancel: &CancellationToken,
    ) -> Result<Company, ServiceError> {
        if cancel.is_cancelled() {
            return Err(ServiceError::Cancelled);
        }

        if let Some(existing) = self.ctx.store.find_company_by_owner(user_id).await? {
            return Err(ServiceError::Conflict(format!(
                "user {} already owns company {}",
                user_id, existing.id
            )));
        }

        let company = self
            .ctx
            .store
            .insert_company(CreateCompany {
                name,
                owner_id: user_id,
            })
            .await?;

        self.ctx.cache.remove(&keys::company(company.id)).await;

        tracing::info!(user_id = %user_id, company_id = %company.id, "Company created");
        self.ctx.publish(user_id, DomainEvent::CompanyCreated { company_id: company.id });

        Ok(company)
    }

    pub async fn get(
        &self,
        user_id: Uuid,
        company_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Company, ServiceError> {
        self.ctx
            .authorize(user_id, ResourceRef::Company(company_id), permissions::COMPANY_VIEW, cancel)
            .await?;

        let store = self.ctx.store.clone();
        self.ctx
            .cache
            .get_or_load_optional(&keys::company(company_id), self.ctx.cache.mutable_ttl(), || async move {
                store.find_company(company_id).await
            })
            .await?
            .ok_or_else(|| ServiceError::not_found(ResourceRef::Company(company_id)))
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        company_id: Uuid,
        data: UpdateCompany,
        cancel: &CancellationToken,
    ) -> Result<Company, ServiceError> {
        self.ctx
            .authorize(user_id, ResourceRef::Company(company_id), permissions::COMPANY_EDIT, cancel)
            .await?;

        let company = self
            .ctx
            .store
            .update_company(company_id, data)
            .await?
            .ok_or_else(|| ServiceError::not_found(ResourceRef::Company(company_id)))?;

        self.ctx.cache.remove(&keys::company(company_id)).await;

        tracing::info!(user_id = %user_id, company_id = %company_id, "Company updated");
        self.ctx.publish(user_id, DomainEvent::CompanyUpdated { company_id });

        Ok(company)
    }

    /// Soft-deletes a company
    ///
    /// Boards and tasks below it become unreachable: every permission check
    /// on them fails the hierarchy walk.
    pub async fn delete(
        &self,
        user_id: Uuid,
        company_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<(), ServiceError> {
        self.ctx
            .authorize(user_id, ResourceRef::Company(company_id), permissions::COMPANY_DELETE, cancel)
            .await?;

        if !self.ctx.store.soft_delete_company(company_id).await? {
            return Err(ServiceError::not_found(ResourceRef::Company(company_id)));
        }

        self.ctx
            .cache
            .invalidate([
                keys::company(company_id),
                keys::boards_by_company(company_id),
                keys::task_types_by_company(company_id),
            ])
            .await;

        tracing::info!(user_id = %user_id, company_id = %company_id, "Company deleted");
        self.ctx.publish(user_id, DomainEvent::CompanyDeleted { company_id });

        Ok(())
    }

    /// Lists the live boards of a company
    pub async fn list_boards(
        &self,
        user_id: Uuid,
        company_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Vec<Board>, ServiceError> {
        self.ctx
            .authorize(user_id, ResourceRef::Company(company_id), permissions::COMPANY_VIEW, cancel)
            .await?;

        let store = self.ctx.store.clone();
        let boards = self
            .ctx
            .cache
            .get_or_load(
                &keys::boards_by_company(company_id),
                self.ctx.cache.mutable_ttl(),
                || async move { store.list_boards_by_company(company_id).await },
            )
            .await?;

        Ok(boards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::Harness;

    #[tokio::test]
    async fn test_create_then_get() {
        let mut h = Harness::new().await;
        let services = h.services();

        let company = services
            .companies
            .create(h.owner, "Acme".to_string(), &h.cancel)
            .await
            .unwrap();
        assert_eq!(company.owner_id, h.owner);

        let fetched = services.companies.get(h.owner, company.id, &h.cancel).await.unwrap();
        assert_eq!(fetched, company);
        assert_eq!(h.drain_events(), vec!["company_created"]);
    }

    #[tokio::test]
    async fn test_second_company_for_same_owner_is_rejected() {
        let h = Harness::new().await;
        let services = h.services();

        services
            .companies
            .create(h.owner, "Acme".to_string(), &h.cancel)
            .await
            .unwrap();
        let err = services
            .companies
            .create(h.owner, "Acme Two".to_string(), &h.cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_stranger_cannot_view_company() {
        let h = Harness::new().await;
        let services = h.services();
        let stranger = h.store.seed_user("stranger@example.com").await.id;
        let company = services
            .companies
            .create(h.owner, "Acme".to_string(), &h.cancel)
            .await
            .unwrap();

        let err = services.companies.get(stranger, company.id, &h.cancel).await.unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn test_update_invalidates_cached_company() {
        let h = Harness::new().await;
        let services = h.services();
        let company = services
            .companies
            .create(h.owner, "Acme".to_string(), &h.cancel)
            .await
            .unwrap();

        // Populate the cache
        services.companies.get(h.owner, company.id, &h.cancel).await.unwrap();

        services
            .companies
            .update(
                h.owner,
                company.id,
                UpdateCompany {
                    name: Some("Acme Corp".to_string()),
                },
                &h.cancel,
            )
            .await
            .unwrap();

        let fetched = services.companies.get(h.owner, company.id, &h.cancel).await.unwrap();
        assert_eq!(fetched.name, "Acme Corp");
    }

    #[tokio::test]
    async fn test_deleted_company_denies_its_owner() {
        let h = Harness::new().await;
        let services = h.services();
        let company = services
            .companies
            .create(h.owner, "Acme".to_string(), &h.cancel)
            .await
            .unwrap();

        services.companies.delete(h.owner, company.id, &h.cancel).await.unwrap();

        let err = services.companies.get(h.owner, company.id, &h.cancel).await.unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied { .. }));

        // Ownership is freed for a new company
        assert!(services
            .companies
            .create(h.owner, "Acme Again".to_string(), &h.cancel)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_request_is_not_a_denial() {
        let h = Harness::new().await;
        let services = h.services();
        let company = services
            .companies
            .create(h.owner, "Acme".to_string(), &h.cancel)
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = services.companies.get(h.owner, company.id, &cancel).await.unwrap_err();
        assert!(matches!(err, ServiceError::Cancelled));
    }
}

//! Task type reference data, cached with the long TTL

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{ServiceContext, ServiceError};
use crate::access::{permissions, ResourceRef};
use crate::cache::keys;
use crate::models::task_type::{CreateTaskType, TaskType};

#[derive(Clone)]
pub struct TaskTypeService {
    ctx: ServiceContext,
}

impl TaskTypeService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        company_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<Vec<TaskType>, ServiceError> {
        self.ctx
            .authorize(user_id, ResourceRef::Company(company_id), permissions::COMPANY_VIEW, cancel)
            .await?;

        let store = self.ctx.store.clone();
        let task_types = self
            .ctx
            .cache
            .get_or_load(
                &keys::task_types_by_company(company_id),
                self.ctx.cache.reference_ttl(),
                || async move { store.list_task_types_by_company(company_id).await },
            )
            .await?;

        Ok(task_types)
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        company_id: Uuid,
        name: String,
        cancel: &CancellationToken,
    ) -> Result<TaskType, ServiceError> {
        self.ctx
            .authorize(user_id, ResourceRef::Company(company_id), permissions::COMPANY_EDIT, cancel)
            .await?;

        let task_type = self
            .ctx
            .store
            .insert_task_type(CreateTaskType { company_id, name })
            .await?;

        self.ctx.cache.remove(&keys::task_types_by_company(company_id)).await;

        tracing::info!(user_id = %user_id, company_id = %company_id, task_type_id = %task_type.id, "Task type created");

        Ok(task_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheBackend;
    use crate::services::test_support::Harness;

    #[tokio::test(start_paused = true)]
    async fn test_task_types_are_cached_with_reference_ttl() {
        let h = Harness::new().await;
        let services = h.services();
        let company = services
            .companies
            .create(h.owner, "Acme".to_string(), &h.cancel)
            .await
            .unwrap();

        services
            .task_types
            .create(h.owner, company.id, "Bug".to_string(), &h.cancel)
            .await
            .unwrap();
        let listed = services.task_types.list(h.owner, company.id, &h.cancel).await.unwrap();
        assert_eq!(listed.len(), 1);

        let key = keys::task_types_by_company(company.id);
        tokio::time::advance(keys::MUTABLE_TTL * 2).await;
        assert!(h.cache_backend.get(&key).await.unwrap().is_some());

        tokio::time::advance(keys::REFERENCE_TTL).await;
        assert!(h.cache_backend.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_new_task_type_is_visible_immediately() {
        let h = Harness::new().await;
        let services = h.services();
        let company = services
            .companies
            .create(h.owner, "Acme".to_string(), &h.cancel)
            .await
            .unwrap();

        assert!(services.task_types.list(h.owner, company.id, &h.cancel).await.unwrap().is_empty());

        services
            .task_types
            .create(h.owner, company.id, "Feature".to_string(), &h.cancel)
            .await
            .unwrap();
        let names: Vec<String> = services
            .task_types
            .list(h.owner, company.id, &h.cancel)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Feature"]);
    }
}

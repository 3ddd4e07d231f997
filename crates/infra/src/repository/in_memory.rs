use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use followup_core::{PlanId, PublishableItem};

use super::{PendingItemRepository, RepositoryError};

/// In-memory plan repository.
///
/// Intended for tests/dev. Every operation takes the lock once, so a single
/// `mark_published` is atomic.
#[derive(Debug, Default)]
pub struct InMemoryPlanRepository {
    plans: RwLock<HashMap<PlanId, PublishableItem>>,
}

impl InMemoryPlanRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a plan (seeding for tests/dev).
    pub fn insert(&self, plan: PublishableItem) -> Result<(), RepositoryError> {
        let mut plans = self
            .plans
            .write()
            .map_err(|_| RepositoryError::storage("insert", "lock poisoned"))?;
        plans.insert(plan.id(), plan);
        Ok(())
    }

    pub fn get(&self, id: PlanId) -> Result<Option<PublishableItem>, RepositoryError> {
        let plans = self
            .plans
            .read()
            .map_err(|_| RepositoryError::storage("get", "lock poisoned"))?;
        Ok(plans.get(&id).cloned())
    }

    pub fn all(&self) -> Result<Vec<PublishableItem>, RepositoryError> {
        let plans = self
            .plans
            .read()
            .map_err(|_| RepositoryError::storage("all", "lock poisoned"))?;
        Ok(plans.values().cloned().collect())
    }
}

#[async_trait::async_trait]
impl PendingItemRepository for InMemoryPlanRepository {
    async fn find_pending(&self) -> Result<Vec<PublishableItem>, RepositoryError> {
        let plans = self
            .plans
            .read()
            .map_err(|_| RepositoryError::storage("find_pending", "lock poisoned"))?;
        Ok(plans.values().filter(|p| p.is_pending()).cloned().collect())
    }

    async fn mark_published(&self, id: PlanId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut plans = self
            .plans
            .write()
            .map_err(|_| RepositoryError::storage("mark_published", "lock poisoned"))?;
        let plan = plans.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
        plan.mark_published(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::TimeZone;
    use proptest::prelude::*;

    use super::*;
    use crate::testing::pending_plan;

    #[tokio::test]
    async fn mark_published_is_idempotent() {
        let repo = InMemoryPlanRepository::new();
        let plan = pending_plan();
        let id = plan.id();
        repo.insert(plan).unwrap();

        let first = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap();

        repo.mark_published(id, first).await.unwrap();
        repo.mark_published(id, second).await.unwrap();

        assert_eq!(repo.get(id).unwrap().unwrap().published_at(), Some(first));
        assert!(repo.find_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_published_unknown_id_is_not_found() {
        let repo = InMemoryPlanRepository::new();
        let id = PlanId::new();
        let err = repo.mark_published(id, Utc::now()).await.unwrap_err();
        assert_eq!(err, RepositoryError::NotFound(id));
    }

    proptest! {
        // Each flag is one plan in insertion order; `true` means already published.
        #[test]
        fn find_pending_returns_exactly_the_unpublished(
            flags in proptest::collection::vec(any::<bool>(), 0..24),
        ) {
            let repo = InMemoryPlanRepository::new();
            let mut expected = HashSet::new();
            for published in flags {
                let plan = if published {
                    pending_plan().with_published_at(Some(Utc::now()))
                } else {
                    let p = pending_plan();
                    expected.insert(p.id());
                    p
                };
                repo.insert(plan).unwrap();
            }

            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let found: HashSet<PlanId> = rt
                .block_on(repo.find_pending())
                .unwrap()
                .into_iter()
                .map(|p| p.id())
                .collect();

            prop_assert_eq!(found, expected);
        }
    }
}

//! Persistence of follow-up plans, as needed by the publication pipeline.
//!
//! Two operations only: list what still awaits publication, and record that
//! a plan was published. Both are single-row/row-set operations; the pipeline
//! never needs a cross-row transaction because every plan is independent.

pub mod in_memory;
pub mod postgres;

use chrono::{DateTime, Utc};
use thiserror::Error;

use followup_core::{PlanId, PublishableItem};

pub use in_memory::InMemoryPlanRepository;
pub use postgres::PostgresPlanRepository;

/// Repository error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("plan not found: {0}")]
    NotFound(PlanId),
    /// The backing store could not be reached or rejected the operation.
    #[error("storage error in {operation}: {message}")]
    Storage {
        operation: &'static str,
        message: String,
    },
    /// A stored row could not be mapped to a plan.
    #[error("corrupt row for plan {id}: {message}")]
    CorruptRow { id: String, message: String },
}

impl RepositoryError {
    pub fn storage(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Storage {
            operation,
            message: message.into(),
        }
    }
}

/// Query/mutation contract over persisted plans.
#[async_trait::async_trait]
pub trait PendingItemRepository: Send + Sync {
    /// All plans whose `published_at` is unset. Order is unspecified.
    async fn find_pending(&self) -> Result<Vec<PublishableItem>, RepositoryError>;

    /// Set `published_at` for one plan.
    ///
    /// Idempotent: an already published plan keeps its original timestamp and
    /// the call succeeds. Must be committed when this returns `Ok`.
    async fn mark_published(&self, id: PlanId, at: DateTime<Utc>) -> Result<(), RepositoryError>;
}

#[async_trait::async_trait]
impl<T> PendingItemRepository for std::sync::Arc<T>
where
    T: PendingItemRepository + ?Sized,
{
    async fn find_pending(&self) -> Result<Vec<PublishableItem>, RepositoryError> {
        (**self).find_pending().await
    }

    async fn mark_published(&self, id: PlanId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        (**self).mark_published(id, at).await
    }
}

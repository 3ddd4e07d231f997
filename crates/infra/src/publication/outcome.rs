//! Results of a publication pass.

use chrono::{DateTime, Utc};
use thiserror::Error;

use followup_core::PlanId;

use crate::document::{PublishError, RenderError};
use crate::repository::RepositoryError;

/// Why a single plan could not be published in this pass.
///
/// The plan stays pending and is retried on the next pass.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ItemFailureCause {
    #[error("rendering failed: {0}")]
    Render(#[source] RenderError),
    #[error("renderer returned an empty document")]
    EmptyDocument,
    #[error("publishing failed: {0}")]
    Publish(#[source] PublishError),
    #[error("recording publication failed: {0}")]
    MarkPublished(#[source] RepositoryError),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("plan {id}: {cause}")]
pub struct ItemFailure {
    pub id: PlanId,
    pub cause: ItemFailureCause,
}

/// The work list could not be loaded; nothing was attempted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("could not load pending plans: {cause}")]
pub struct BatchFailure {
    #[source]
    pub cause: RepositoryError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Published { id: PlanId, at: DateTime<Utc> },
    Failed(ItemFailure),
}

/// Aggregate result of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Pending plans found at the start of the pass.
    pub total: usize,
    pub published: Vec<PlanId>,
    pub failures: Vec<ItemFailure>,
    /// Plans not attempted because shutdown was requested mid-pass.
    pub skipped: usize,
}

impl RunSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Published { id, .. } => self.published.push(id),
            ItemOutcome::Failed(failure) => self.failures.push(failure),
        }
    }

    pub fn published_count(&self) -> usize {
        self.published.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    /// Every pending plan was published.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.skipped == 0
    }
}

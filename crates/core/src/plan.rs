//! The follow-up plan as seen by the publication pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{CounterpartyId, OrganizationId, PlanId, SubjectId};

/// Publication state, derived solely from `published_at`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum PublicationState {
    /// Not yet delivered to the archive.
    Pending,
    /// Delivered and recorded; terminal.
    Published { at: DateTime<Utc> },
}

impl PublicationState {
    pub fn is_pending(&self) -> bool {
        matches!(self, PublicationState::Pending)
    }
}

/// A persisted follow-up plan.
///
/// Identifying attributes are fixed at creation. `published_at` moves from
/// `None` to `Some` exactly once and never back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishableItem {
    id: PlanId,
    subject_id: SubjectId,
    counterparty_id: CounterpartyId,
    organization_id: OrganizationId,
    counterparty_display_name: Option<String>,
    organization_display_name: Option<String>,
    content: serde_json::Value,
    created_at: DateTime<Utc>,
    published_at: Option<DateTime<Utc>>,
}

impl PublishableItem {
    /// A pending plan.
    pub fn new(
        id: PlanId,
        subject_id: SubjectId,
        counterparty_id: CounterpartyId,
        organization_id: OrganizationId,
        content: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            subject_id,
            counterparty_id,
            organization_id,
            counterparty_display_name: None,
            organization_display_name: None,
            content,
            created_at,
            published_at: None,
        }
    }

    pub fn with_counterparty_display_name(mut self, name: impl Into<String>) -> Self {
        self.counterparty_display_name = Some(name.into());
        self
    }

    pub fn with_organization_display_name(mut self, name: impl Into<String>) -> Self {
        self.organization_display_name = Some(name.into());
        self
    }

    /// Rehydrate the persisted publication timestamp (storage adapters only).
    pub fn with_published_at(mut self, published_at: Option<DateTime<Utc>>) -> Self {
        self.published_at = published_at;
        self
    }

    pub fn id(&self) -> PlanId {
        self.id
    }

    pub fn subject_id(&self) -> &SubjectId {
        &self.subject_id
    }

    pub fn counterparty_id(&self) -> &CounterpartyId {
        &self.counterparty_id
    }

    pub fn organization_id(&self) -> &OrganizationId {
        &self.organization_id
    }

    pub fn counterparty_display_name(&self) -> Option<&str> {
        self.counterparty_display_name.as_deref()
    }

    pub fn organization_display_name(&self) -> Option<&str> {
        self.organization_display_name.as_deref()
    }

    pub fn content(&self) -> &serde_json::Value {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    pub fn publication_state(&self) -> PublicationState {
        match self.published_at {
            None => PublicationState::Pending,
            Some(at) => PublicationState::Published { at },
        }
    }

    pub fn is_pending(&self) -> bool {
        self.published_at.is_none()
    }

    /// Fill in the counterparty display name if it is still missing.
    ///
    /// An already known name is kept.
    pub fn enrich_counterparty_display_name(&mut self, name: impl Into<String>) {
        if self.counterparty_display_name.is_none() {
            self.counterparty_display_name = Some(name.into());
        }
    }

    /// Record publication.
    ///
    /// Returns `true` when this call performed the transition. An already
    /// published plan keeps its original timestamp and `false` is returned.
    pub fn mark_published(&mut self, at: DateTime<Utc>) -> bool {
        if self.published_at.is_some() {
            return false;
        }
        self.published_at = Some(at);
        true
    }
}

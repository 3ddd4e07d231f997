//! External collaborators used to turn a plan into a delivered document.
//!
//! - `DocumentRenderer`: plan → PDF bytes
//! - `DocumentPublisher`: PDF bytes + metadata → archival partner
//! - `NameResolver`: best-effort lookup of a missing counterparty name
//!
//! The HTTP implementations live in the submodules; tests use in-process fakes.

pub mod names;
pub mod publisher;
pub mod renderer;

use serde::Serialize;
use thiserror::Error;

use followup_core::{CounterpartyId, OrganizationId, PlanId, PublishableItem, SubjectId};

pub use names::HttpNameResolver;
pub use publisher::HttpDocumentPublisher;
pub use renderer::HttpDocumentRenderer;

/// Content type of every rendered plan.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Metadata sent along with a rendered document.
///
/// `document_id` is the plan id, so a repeated delivery of the same plan is
/// recognisable as a duplicate by the archival partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub document_id: PlanId,
    pub subject_id: SubjectId,
    pub organization_id: OrganizationId,
    pub title: String,
    pub summary: String,
    pub content_type: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("renderer unreachable: {0}")]
    Transport(String),
    #[error("renderer answered {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PublishError {
    #[error("archive unreachable: {0}")]
    Transport(String),
    #[error("archive answered {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NameResolveError {
    #[error("person lookup unreachable: {0}")]
    Transport(String),
    #[error("person lookup answered {status}")]
    Status { status: u16 },
    #[error("unparseable person lookup response: {0}")]
    Parse(String),
}

#[async_trait::async_trait]
pub trait DocumentRenderer: Send + Sync {
    /// Render the plan. An empty payload is returned as-is; callers decide.
    async fn render(&self, item: &PublishableItem) -> Result<Vec<u8>, RenderError>;
}

#[async_trait::async_trait]
pub trait DocumentPublisher: Send + Sync {
    async fn publish(&self, metadata: &DocumentMetadata, document: Vec<u8>) -> Result<(), PublishError>;
}

#[async_trait::async_trait]
pub trait NameResolver: Send + Sync {
    /// `Ok(None)` when the person is unknown to the lookup service.
    async fn resolve_display_name(
        &self,
        id: &CounterpartyId,
    ) -> Result<Option<String>, NameResolveError>;
}

#[async_trait::async_trait]
impl<T> DocumentRenderer for std::sync::Arc<T>
where
    T: DocumentRenderer + ?Sized,
{
    async fn render(&self, item: &PublishableItem) -> Result<Vec<u8>, RenderError> {
        (**self).render(item).await
    }
}

#[async_trait::async_trait]
impl<T> DocumentPublisher for std::sync::Arc<T>
where
    T: DocumentPublisher + ?Sized,
{
    async fn publish(&self, metadata: &DocumentMetadata, document: Vec<u8>) -> Result<(), PublishError> {
        (**self).publish(metadata, document).await
    }
}

#[async_trait::async_trait]
impl<T> NameResolver for std::sync::Arc<T>
where
    T: NameResolver + ?Sized,
{
    async fn resolve_display_name(
        &self,
        id: &CounterpartyId,
    ) -> Result<Option<String>, NameResolveError> {
        (**self).resolve_display_name(id).await
    }
}

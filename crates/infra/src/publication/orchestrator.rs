//! One publication pass over all pending plans.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use followup_core::PublishableItem;

use crate::config::PublicationConfig;
use crate::document::{
    DocumentMetadata, DocumentPublisher, DocumentRenderer, NameResolver, PDF_CONTENT_TYPE,
};
use crate::repository::PendingItemRepository;

use super::outcome::{BatchFailure, ItemFailure, ItemFailureCause, ItemOutcome, RunSummary};

const DOCUMENT_TITLE: &str = "Oppfølgingsplan";

/// Publishes every pending plan once.
///
/// Plans are handled one after another. A failure for one plan is recorded in
/// the returned summary and never stops the others; only a failure to load
/// the work list fails the pass as a whole.
pub struct PublicationOrchestrator<R, D, P> {
    repository: R,
    renderer: D,
    publisher: P,
    names: Option<Box<dyn NameResolver>>,
    fallback_counterparty_label: String,
}

impl<R, D, P> PublicationOrchestrator<R, D, P>
where
    R: PendingItemRepository,
    D: DocumentRenderer,
    P: DocumentPublisher,
{
    pub fn new(repository: R, renderer: D, publisher: P, config: &PublicationConfig) -> Self {
        Self {
            repository,
            renderer,
            publisher,
            names: None,
            fallback_counterparty_label: config.fallback_counterparty_label.clone(),
        }
    }

    /// Resolve missing counterparty names before rendering.
    pub fn with_name_resolver(mut self, names: impl NameResolver + 'static) -> Self {
        self.names = Some(Box::new(names));
        self
    }

    /// Run one pass.
    ///
    /// `cancel` is checked before each plan; once it fires the remaining plans
    /// are left pending (counted as `skipped`) and picked up after restart.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<RunSummary, BatchFailure> {
        let items = self
            .repository
            .find_pending()
            .await
            .map_err(|cause| BatchFailure { cause })?;

        let mut summary = RunSummary::new(items.len());
        if items.is_empty() {
            debug!("no pending plans");
            return Ok(summary);
        }
        info!(pending = items.len(), "publishing pending plans");

        for (idx, item) in items.into_iter().enumerate() {
            if cancel.is_cancelled() {
                summary.skipped = summary.total - idx;
                warn!(skipped = summary.skipped, "shutdown requested; leaving remaining plans pending");
                break;
            }

            let outcome = self.process_item(item).await;
            if let ItemOutcome::Failed(failure) = &outcome {
                error!(plan_id = %failure.id, error = %failure.cause, "failed to publish plan");
            }
            summary.record(outcome);
        }

        info!(
            total = summary.total,
            published = summary.published_count(),
            failed = summary.failed_count(),
            skipped = summary.skipped,
            "publication pass finished"
        );
        Ok(summary)
    }

    /// Enrich, render, publish and mark a single plan.
    pub async fn process_item(&self, mut item: PublishableItem) -> ItemOutcome {
        let id = item.id();
        self.enrich(&mut item).await;

        match self.publish_item(&item).await {
            Ok(at) => {
                debug!(plan_id = %id, "plan published");
                ItemOutcome::Published { id, at }
            }
            Err(cause) => ItemOutcome::Failed(ItemFailure { id, cause }),
        }
    }

    async fn publish_item(&self, item: &PublishableItem) -> Result<DateTime<Utc>, ItemFailureCause> {
        let document = self
            .renderer
            .render(item)
            .await
            .map_err(ItemFailureCause::Render)?;
        if document.is_empty() {
            return Err(ItemFailureCause::EmptyDocument);
        }

        let metadata = self.metadata_for(item);
        self.publisher
            .publish(&metadata, document)
            .await
            .map_err(ItemFailureCause::Publish)?;

        // Not transactional with the publish above: a crash here republishes.
        let at = Utc::now();
        self.repository
            .mark_published(item.id(), at)
            .await
            .map_err(ItemFailureCause::MarkPublished)?;
        Ok(at)
    }

    /// Best effort: failures fall back to the configured label later on.
    async fn enrich(&self, item: &mut PublishableItem) {
        if item.counterparty_display_name().is_some() {
            return;
        }
        let Some(names) = &self.names else {
            return;
        };

        match names.resolve_display_name(item.counterparty_id()).await {
            Ok(Some(name)) => item.enrich_counterparty_display_name(name),
            Ok(None) => {
                warn!(plan_id = %item.id(), "counterparty name unknown; using fallback label");
            }
            Err(err) => {
                warn!(plan_id = %item.id(), error = %err, "counterparty name lookup failed; using fallback label");
            }
        }
    }

    fn metadata_for(&self, item: &PublishableItem) -> DocumentMetadata {
        document_metadata(item, &self.fallback_counterparty_label)
    }
}

/// Title and summary shown in the archive for a plan.
pub fn document_metadata(item: &PublishableItem, fallback_counterparty_label: &str) -> DocumentMetadata {
    let title = match item.organization_display_name() {
        Some(org) => format!("{DOCUMENT_TITLE} for {org}"),
        None => DOCUMENT_TITLE.to_string(),
    };
    let author = item
        .counterparty_display_name()
        .unwrap_or(fallback_counterparty_label);
    let summary = format!(
        "{DOCUMENT_TITLE} opprettet {} av {author}",
        item.created_at().format("%d.%m.%Y")
    );

    DocumentMetadata {
        document_id: item.id(),
        subject_id: item.subject_id().clone(),
        organization_id: item.organization_id().clone(),
        title,
        summary,
        content_type: PDF_CONTENT_TYPE.to_string(),
    }
}

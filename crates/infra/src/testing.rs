//! Test fixtures and in-process fakes for the external collaborators.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, TimeZone, Utc};

use followup_core::{CounterpartyId, OrganizationId, PlanId, PublishableItem, SubjectId};

use crate::document::{
    DocumentMetadata, DocumentPublisher, DocumentRenderer, NameResolveError, NameResolver,
    PublishError, RenderError,
};
use crate::leader::{LeaderElectionError, LeaderElector};
use crate::repository::{InMemoryPlanRepository, PendingItemRepository, RepositoryError};

pub fn plan_created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
}

pub fn pending_plan() -> PublishableItem {
    pending_plan_for("10987654321")
}

pub fn pending_plan_for(counterparty: &str) -> PublishableItem {
    PublishableItem::new(
        PlanId::new(),
        SubjectId::new("12345678910").unwrap(),
        CounterpartyId::new(counterparty).unwrap(),
        OrganizationId::new("974600951").unwrap(),
        serde_json::json!({ "arbeidsoppgaver": [], "tiltak": [] }),
        plan_created_at(),
    )
}

/// Renders `%PDF-<plan id>` unless told otherwise for a plan.
#[derive(Debug, Default)]
pub struct StubRenderer {
    failures: Mutex<HashMap<PlanId, RenderError>>,
    empty: Mutex<Vec<PlanId>>,
    calls: AtomicUsize,
}

impl StubRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, id: PlanId, err: RenderError) {
        self.failures.lock().unwrap().insert(id, err);
    }

    pub fn empty_for(&self, id: PlanId) {
        self.empty.lock().unwrap().push(id);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DocumentRenderer for StubRenderer {
    async fn render(&self, item: &PublishableItem) -> Result<Vec<u8>, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failures.lock().unwrap().get(&item.id()) {
            return Err(err.clone());
        }
        if self.empty.lock().unwrap().contains(&item.id()) {
            return Ok(Vec::new());
        }
        Ok(format!("%PDF-{}", item.id()).into_bytes())
    }
}

/// Records every publish attempt; can be told to fail for specific plans.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    attempts: Mutex<Vec<DocumentMetadata>>,
    failures: Mutex<HashMap<PlanId, PublishError>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, id: PlanId, err: PublishError) {
        self.failures.lock().unwrap().insert(id, err);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// Number of publish calls, failed ones included.
    pub fn calls(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    pub fn published_ids(&self) -> Vec<PlanId> {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.document_id)
            .collect()
    }

    pub fn summaries(&self) -> HashMap<PlanId, String> {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .map(|m| (m.document_id, m.summary.clone()))
            .collect()
    }
}

#[async_trait::async_trait]
impl DocumentPublisher for RecordingPublisher {
    async fn publish(&self, metadata: &DocumentMetadata, _document: Vec<u8>) -> Result<(), PublishError> {
        self.attempts.lock().unwrap().push(metadata.clone());
        match self.failures.lock().unwrap().get(&metadata.document_id) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct StaticNameResolver {
    names: HashMap<CounterpartyId, String>,
    errors: HashMap<CounterpartyId, NameResolveError>,
    calls: AtomicUsize,
}

impl StaticNameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, id: CounterpartyId, name: impl Into<String>) -> Self {
        self.names.insert(id, name.into());
        self
    }

    pub fn with_error(mut self, id: CounterpartyId, err: NameResolveError) -> Self {
        self.errors.insert(id, err);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl NameResolver for StaticNameResolver {
    async fn resolve_display_name(
        &self,
        id: &CounterpartyId,
    ) -> Result<Option<String>, NameResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.errors.get(id) {
            return Err(err.clone());
        }
        Ok(self.names.get(id).cloned())
    }
}

/// In-memory repository that counts calls.
#[derive(Debug, Default)]
pub struct CountingRepository {
    inner: InMemoryPlanRepository,
    find_calls: AtomicUsize,
    mark_calls: AtomicUsize,
}

impl CountingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &InMemoryPlanRepository {
        &self.inner
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn mark_calls(&self) -> usize {
        self.mark_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PendingItemRepository for CountingRepository {
    async fn find_pending(&self) -> Result<Vec<PublishableItem>, RepositoryError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_pending().await
    }

    async fn mark_published(&self, id: PlanId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        self.mark_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.mark_published(id, at).await
    }
}

/// Repository whose fetch or mark operations fail.
#[derive(Debug)]
pub struct FailingRepository {
    plans: Mutex<Vec<PublishableItem>>,
    fail_fetch: bool,
    fetch_calls: AtomicUsize,
}

impl FailingRepository {
    pub fn failing_fetch() -> Self {
        Self {
            plans: Mutex::new(Vec::new()),
            fail_fetch: true,
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_marks() -> Self {
        Self {
            plans: Mutex::new(Vec::new()),
            fail_fetch: false,
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub fn insert(&self, plan: PublishableItem) {
        self.plans.lock().unwrap().push(plan);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PendingItemRepository for FailingRepository {
    async fn find_pending(&self) -> Result<Vec<PublishableItem>, RepositoryError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch {
            return Err(RepositoryError::storage("find_pending", "connection refused"));
        }
        Ok(self.plans.lock().unwrap().clone())
    }

    async fn mark_published(&self, _id: PlanId, _at: DateTime<Utc>) -> Result<(), RepositoryError> {
        Err(RepositoryError::storage("mark_published", "connection refused"))
    }
}

/// Leader elector that replays scripted answers, then repeats the fallback.
#[derive(Debug)]
pub struct ScriptedElector {
    script: Mutex<VecDeque<Result<bool, LeaderElectionError>>>,
    fallback: Result<bool, LeaderElectionError>,
    calls: AtomicUsize,
}

impl ScriptedElector {
    pub fn always(answer: bool) -> Self {
        Self::new(Vec::new(), Ok(answer))
    }

    pub fn new(
        script: Vec<Result<bool, LeaderElectionError>>,
        fallback: Result<bool, LeaderElectionError>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LeaderElector for ScriptedElector {
    async fn is_leader(&self) -> Result<bool, LeaderElectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

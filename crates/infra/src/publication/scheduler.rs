//! Leader-gated polling loop around the orchestrator.
//!
//! ```text
//! Idle ──tick──▶ CheckingLeadership ──not leader──▶ Idle
//!                        │
//!                        └──leader──▶ Running ──▶ Idle
//! (any state) ──cancel──▶ Stopped
//! ```
//!
//! Errors from the leadership check or from loading the work list are logged
//! and the loop carries on at the normal interval. Cancellation is only
//! observed between ticks and between plans, never in the middle of one.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::PublicationConfig;
use crate::document::{DocumentPublisher, DocumentRenderer};
use crate::leader::{LeaderElectionError, LeaderElector};
use crate::repository::PendingItemRepository;

use super::orchestrator::PublicationOrchestrator;
use super::outcome::{BatchFailure, RunSummary};

/// Interval used when the configured one is zero.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    #[default]
    Idle,
    CheckingLeadership,
    Running,
    Stopped,
}

/// Scheduler runtime statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub state: SchedulerState,
    pub ticks: u64,
    pub skipped_not_leader: u64,
    pub runs: u64,
    pub items_published: u64,
    pub items_failed: u64,
    pub tick_errors: u64,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    NotLeader,
    Ran(RunSummary),
    LeadershipCheckFailed(LeaderElectionError),
    BatchFailed(BatchFailure),
}

/// Handle to control and join a spawned scheduler.
#[derive(Debug)]
pub struct SchedulerHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
    stats: Arc<Mutex<SchedulerStats>>,
}

impl SchedulerHandle {
    /// Request graceful shutdown and wait for the loop to stop.
    ///
    /// A plan already being published is finished first. Returns the final
    /// stats; a `JoinError` means the loop panicked.
    pub async fn shutdown(self) -> Result<SchedulerStats, JoinError> {
        self.cancel.cancel();
        self.join.await?;
        Ok(lock(&self.stats).clone())
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn stats(&self) -> SchedulerStats {
        lock(&self.stats).clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// Periodically runs the orchestrator while this instance is leader.
pub struct PublicationScheduler<L, R, D, P> {
    elector: L,
    orchestrator: PublicationOrchestrator<R, D, P>,
    config: PublicationConfig,
    stats: Arc<Mutex<SchedulerStats>>,
}

impl<L, R, D, P> PublicationScheduler<L, R, D, P>
where
    L: LeaderElector + 'static,
    R: PendingItemRepository + 'static,
    D: DocumentRenderer + 'static,
    P: DocumentPublisher + 'static,
{
    pub fn new(
        elector: L,
        orchestrator: PublicationOrchestrator<R, D, P>,
        mut config: PublicationConfig,
    ) -> Self {
        if config.interval.is_zero() {
            warn!(
                interval_secs = MIN_INTERVAL.as_secs(),
                "zero publication interval; using minimum"
            );
            config.interval = MIN_INTERVAL;
        }
        Self {
            elector,
            orchestrator,
            config,
            stats: Arc::new(Mutex::new(SchedulerStats::default())),
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        lock(&self.stats).clone()
    }

    /// Spawn the loop as a tokio task, stopped by `cancel`.
    pub fn spawn(self, cancel: CancellationToken) -> SchedulerHandle {
        let stats = self.stats.clone();
        let token = cancel.clone();
        let join = tokio::spawn(async move { self.run(token).await });

        SchedulerHandle {
            cancel,
            join,
            stats,
        }
    }

    /// Run until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            initial_delay_secs = self.config.initial_delay.as_secs(),
            "publication scheduler started"
        );

        if !self.config.initial_delay.is_zero() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.stopped();
                    return;
                }
                _ = tokio::time::sleep(self.config.initial_delay) => {}
            }
        }

        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.tick(&cancel).await;
                }
            }
        }

        self.stopped();
    }

    /// Perform exactly one tick: leadership check, then a pass if leader.
    pub async fn tick(&self, cancel: &CancellationToken) -> TickOutcome {
        self.update(|s| {
            s.ticks += 1;
            s.state = SchedulerState::CheckingLeadership;
        });

        let outcome = match self.elector.is_leader().await {
            Ok(false) => {
                debug!("not leader; skipping publication pass");
                self.update(|s| s.skipped_not_leader += 1);
                TickOutcome::NotLeader
            }
            Ok(true) => {
                self.update(|s| s.state = SchedulerState::Running);
                match self.orchestrator.run_once(cancel).await {
                    Ok(summary) => {
                        self.update(|s| {
                            s.runs += 1;
                            s.items_published += summary.published_count() as u64;
                            s.items_failed += summary.failed_count() as u64;
                            s.last_run_at = Some(Utc::now());
                        });
                        TickOutcome::Ran(summary)
                    }
                    Err(err) => {
                        error!(error = %err, "publication pass failed; retrying next tick");
                        self.record_error(err.to_string());
                        TickOutcome::BatchFailed(err)
                    }
                }
            }
            Err(err) => {
                error!(error = %err, "leader check failed; skipping tick");
                self.record_error(err.to_string());
                TickOutcome::LeadershipCheckFailed(err)
            }
        };

        self.update(|s| s.state = SchedulerState::Idle);
        outcome
    }

    fn record_error(&self, message: String) {
        self.update(|s| {
            s.tick_errors += 1;
            s.last_error = Some(message);
        });
    }

    fn stopped(&self) {
        self.update(|s| s.state = SchedulerState::Stopped);
        info!("publication scheduler stopped");
    }

    fn update(&self, f: impl FnOnce(&mut SchedulerStats)) {
        f(&mut lock(&self.stats));
    }
}

// Stats stay readable even if a holder panicked.
fn lock(stats: &Mutex<SchedulerStats>) -> MutexGuard<'_, SchedulerStats> {
    stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

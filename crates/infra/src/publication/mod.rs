//! Asynchronous publication of follow-up plans to the external archive.
//!
//! ## Components
//!
//! - `PublicationOrchestrator`: one pass over all pending plans
//!   (enrich → render → publish → mark), isolating failures per plan
//! - `PublicationScheduler`: the leader-gated polling loop around it
//! - `outcome`: the closed set of results a pass can produce
//!
//! Delivery is at-least-once: publishing and marking are two separate,
//! non-transactional steps, so a crash between them republishes the plan on
//! a later pass. The archive is addressed by plan id and must tolerate that.

pub mod orchestrator;
pub mod outcome;
pub mod scheduler;

pub use orchestrator::PublicationOrchestrator;
pub use outcome::{BatchFailure, ItemFailure, ItemFailureCause, ItemOutcome, RunSummary};
pub use scheduler::{
    PublicationScheduler, SchedulerHandle, SchedulerState, SchedulerStats, TickOutcome,
};

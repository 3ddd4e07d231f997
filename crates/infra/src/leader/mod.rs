//! Leader election: is this instance the one that should run the pipeline?
//!
//! Every call asks afresh; leadership may move between ticks without a
//! restart. There is no lock beyond the election authority's answer, so two
//! instances may both see `true` briefly during a handover. Publication is
//! at-least-once and keyed by plan id downstream, which tolerates that.

pub mod http;

use thiserror::Error;

pub use http::HttpLeaderElector;

/// Leader election error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LeaderElectionError {
    #[error("election authority unreachable: {0}")]
    Transport(String),
    #[error("election authority answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unparseable election response: {0}")]
    Parse(String),
}

#[async_trait::async_trait]
pub trait LeaderElector: Send + Sync {
    async fn is_leader(&self) -> Result<bool, LeaderElectionError>;
}

#[async_trait::async_trait]
impl<T> LeaderElector for std::sync::Arc<T>
where
    T: LeaderElector + ?Sized,
{
    async fn is_leader(&self) -> Result<bool, LeaderElectionError> {
        (**self).is_leader().await
    }
}

/// Single-instance deployments: always the leader, no network call.
#[derive(Debug, Default, Copy, Clone)]
pub struct LocalLeaderElector;

#[async_trait::async_trait]
impl LeaderElector for LocalLeaderElector {
    async fn is_leader(&self) -> Result<bool, LeaderElectionError> {
        Ok(true)
    }
}

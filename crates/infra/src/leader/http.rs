//! Leader election through a cluster-local election sidecar.
//!
//! The sidecar answers `GET <url>` with `{"name": "<elected instance>"}`.
//! This instance is the leader when that name equals its own instance name
//! (the pod hostname in a cluster).

use serde::Deserialize;
use tracing::{debug, instrument};

use super::{LeaderElectionError, LeaderElector};

#[derive(Debug, Deserialize)]
struct ElectionResponse {
    name: String,
}

/// Leader elector backed by the HTTP election sidecar.
#[derive(Debug, Clone)]
pub struct HttpLeaderElector {
    client: reqwest::Client,
    url: String,
    instance_name: String,
}

impl HttpLeaderElector {
    pub fn new(client: reqwest::Client, url: impl Into<String>, instance_name: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            instance_name: instance_name.into(),
        }
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }
}

#[async_trait::async_trait]
impl LeaderElector for HttpLeaderElector {
    #[instrument(skip(self), fields(instance = %self.instance_name), err)]
    async fn is_leader(&self) -> Result<bool, LeaderElectionError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| LeaderElectionError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LeaderElectionError::Status {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| LeaderElectionError::Transport(e.to_string()))?;
        let elected: ElectionResponse = serde_json::from_slice(&body)
            .map_err(|e| LeaderElectionError::Parse(e.to_string()))?;

        let leader = elected.name.trim() == self.instance_name;
        debug!(elected = %elected.name, leader, "leader election answered");
        Ok(leader)
    }
}

//! Best-effort person name lookup for the plan's counterparty.

use serde::Deserialize;
use tracing::instrument;

use followup_core::CounterpartyId;

use super::{NameResolveError, NameResolver};

#[derive(Debug, Deserialize)]
struct PersonResponse {
    name: Option<String>,
}

/// Resolves names with `GET <base_url>/<id>`; `404` means unknown.
#[derive(Debug, Clone)]
pub struct HttpNameResolver {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNameResolver {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait::async_trait]
impl NameResolver for HttpNameResolver {
    // The id is a person identifier; keep it out of span fields.
    #[instrument(skip_all, err)]
    async fn resolve_display_name(
        &self,
        id: &CounterpartyId,
    ) -> Result<Option<String>, NameResolveError> {
        let url = format!("{}/{}", self.base_url, id.as_str());
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| NameResolveError::Transport(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(NameResolveError::Status {
                status: status.as_u16(),
            });
        }

        let person: PersonResponse = resp
            .json()
            .await
            .map_err(|e| NameResolveError::Parse(e.to_string()))?;
        Ok(person
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> CounterpartyId {
        CounterpartyId::new("10987654321").unwrap()
    }

    #[tokio::test]
    async fn resolves_known_person() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/person/10987654321")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name":"Kari Leder"}"#)
            .create_async()
            .await;

        let resolver = HttpNameResolver::new(reqwest::Client::new(), format!("{}/person/", server.url()));
        assert_eq!(
            resolver.resolve_display_name(&id()).await,
            Ok(Some("Kari Leder".to_string()))
        );
    }

    #[tokio::test]
    async fn unknown_person_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/person/10987654321")
            .with_status(404)
            .create_async()
            .await;

        let resolver = HttpNameResolver::new(reqwest::Client::new(), format!("{}/person", server.url()));
        assert_eq!(resolver.resolve_display_name(&id()).await, Ok(None));
    }

    #[tokio::test]
    async fn blank_name_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/person/10987654321")
            .with_status(200)
            .with_body(r#"{"name":"  "}"#)
            .create_async()
            .await;

        let resolver = HttpNameResolver::new(reqwest::Client::new(), format!("{}/person", server.url()));
        assert_eq!(resolver.resolve_display_name(&id()).await, Ok(None));
    }
}

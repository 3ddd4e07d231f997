//! Delivery of rendered plans to the external archive.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use tracing::{info, instrument};

use super::{DocumentMetadata, DocumentPublisher, PublishError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PublishRequest<'a> {
    #[serde(flatten)]
    metadata: &'a DocumentMetadata,
    /// Base64 encoded document.
    content: String,
}

/// Publishes documents by POSTing metadata plus base64 content.
///
/// `409 Conflict` means the archive already holds a document with this id
/// (a redelivery after a crash between publish and mark); it counts as
/// success.
#[derive(Debug, Clone)]
pub struct HttpDocumentPublisher {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl HttpDocumentPublisher {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

#[async_trait::async_trait]
impl DocumentPublisher for HttpDocumentPublisher {
    #[instrument(skip(self, metadata, document), fields(plan_id = %metadata.document_id), err)]
    async fn publish(&self, metadata: &DocumentMetadata, document: Vec<u8>) -> Result<(), PublishError> {
        let body = PublishRequest {
            metadata,
            content: STANDARD.encode(&document),
        };

        let mut req = self.client.post(&self.url).json(&body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::CONFLICT {
            info!(plan_id = %metadata.document_id, "archive already holds document; treating as published");
            return Ok(());
        }
        if !status.is_success() {
            return Err(PublishError::Status {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PDF_CONTENT_TYPE;
    use followup_core::{OrganizationId, PlanId, SubjectId};

    fn metadata() -> DocumentMetadata {
        DocumentMetadata {
            document_id: PlanId::new(),
            subject_id: SubjectId::new("12345678910").unwrap(),
            organization_id: OrganizationId::new("974600951").unwrap(),
            title: "Oppfølgingsplan".to_string(),
            summary: "Oppfølgingsplan opprettet 01.03.2024 av Kari Leder".to_string(),
            content_type: PDF_CONTENT_TYPE.to_string(),
        }
    }

    #[tokio::test]
    async fn sends_metadata_and_base64_content_with_token() {
        let mut server = mockito::Server::new_async().await;
        let meta = metadata();
        let mock = server
            .mock("POST", "/api/v1/documents")
            .match_header("authorization", "Bearer s3cret")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "documentId": meta.document_id.to_string(),
                "subjectId": "12345678910",
                "organizationId": "974600951",
                "title": "Oppfølgingsplan",
                "summary": "Oppfølgingsplan opprettet 01.03.2024 av Kari Leder",
                "contentType": "application/pdf",
                "content": "JVBERg==",
            })))
            .with_status(201)
            .create_async()
            .await;

        let publisher = HttpDocumentPublisher::new(
            reqwest::Client::new(),
            format!("{}/api/v1/documents", server.url()),
        )
        .with_token("s3cret");

        publisher.publish(&meta, b"%PDF".to_vec()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn conflict_counts_as_already_published() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(409)
            .create_async()
            .await;

        let publisher = HttpDocumentPublisher::new(reqwest::Client::new(), format!("{}/", server.url()));
        assert_eq!(publisher.publish(&metadata(), vec![1, 2, 3]).await, Ok(()));
    }

    #[tokio::test]
    async fn other_error_status_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let publisher = HttpDocumentPublisher::new(reqwest::Client::new(), format!("{}/", server.url()));
        assert_eq!(
            publisher.publish(&metadata(), vec![1]).await,
            Err(PublishError::Status {
                status: 502,
                body: "bad gateway".to_string()
            })
        );
    }
}

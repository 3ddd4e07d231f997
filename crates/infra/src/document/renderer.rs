//! PDF rendering through the internal pdfgen service.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument};

use followup_core::PublishableItem;

use super::{DocumentRenderer, RenderError};

/// Request body understood by the pdfgen template for follow-up plans.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderRequest<'a> {
    id: String,
    subject_id: &'a str,
    counterparty_id: &'a str,
    counterparty_name: Option<&'a str>,
    organization_id: &'a str,
    organization_name: Option<&'a str>,
    created_at: DateTime<Utc>,
    content: &'a serde_json::Value,
}

impl<'a> From<&'a PublishableItem> for RenderRequest<'a> {
    fn from(item: &'a PublishableItem) -> Self {
        Self {
            id: item.id().to_string(),
            subject_id: item.subject_id().as_str(),
            counterparty_id: item.counterparty_id().as_str(),
            counterparty_name: item.counterparty_display_name(),
            organization_id: item.organization_id().as_str(),
            organization_name: item.organization_display_name(),
            created_at: item.created_at(),
            content: item.content(),
        }
    }
}

/// Renders plans by POSTing them as JSON; the response body is the PDF.
#[derive(Debug, Clone)]
pub struct HttpDocumentRenderer {
    client: reqwest::Client,
    url: String,
}

impl HttpDocumentRenderer {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait::async_trait]
impl DocumentRenderer for HttpDocumentRenderer {
    #[instrument(skip(self, item), fields(plan_id = %item.id()), err)]
    async fn render(&self, item: &PublishableItem) -> Result<Vec<u8>, RenderError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&RenderRequest::from(item))
            .send()
            .await
            .map_err(|e| RenderError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RenderError::Status {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let pdf = resp
            .bytes()
            .await
            .map_err(|e| RenderError::Transport(e.to_string()))?;
        debug!(bytes = pdf.len(), "rendered plan");
        Ok(pdf.to_vec())
    }
}

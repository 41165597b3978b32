//! Document-parsing provider that uploads a PDF and polls until the
//! service has finished reading it.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::{ExtractionProvider, ProcessingStatus, Result};
use crate::error::ProviderError;
use crate::models::config::NuDeltaConfig;
use crate::models::record::{DocumentInput, FieldTree, scalar_text};
use crate::orchestrate::retry::Backoff;

const POLL_ATTEMPTS: u32 = 5;
const POLL_BACKOFF: Backoff = Backoff::Exponential {
    base: Duration::from_secs(1),
};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    document_id: String,
}

/// Client for the document-parsing API. Requests authenticate with HTTP
/// Basic credentials.
pub struct NuDeltaProvider {
    client: reqwest::Client,
    config: NuDeltaConfig,
    auth: String,
}

impl NuDeltaProvider {
    pub fn new(config: NuDeltaConfig) -> Self {
        let credentials = format!("{}:{}", config.username, config.password);
        let auth = format!("Basic {}", STANDARD.encode(credentials));
        Self {
            client: reqwest::Client::new(),
            config,
            auth,
        }
    }

    async fn upload(&self, document: &DocumentInput) -> Result<String> {
        let part = reqwest::multipart::Part::bytes(document.bytes.clone())
            .file_name(document.filename.clone())
            .mime_str(document.content_type())
            .map_err(|err| ProviderError::UploadFailed(err.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let url = format!("{}/documents", self.config.base_url);
        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, &self.auth)
            .multipart(form)
            .send()
            .await
            .map_err(|err| ProviderError::UploadFailed(err.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ProviderError::UploadFailed(format!(
                "status {status}: {message}"
            )));
        }

        let parsed: UploadResponse = resp
            .json()
            .await
            .map_err(|err| ProviderError::UploadFailed(err.to_string()))?;
        Ok(parsed.document_id)
    }

    async fn document_status(&self, document_id: &str) -> Result<ProcessingStatus> {
        let url = format!("{}/documents/{}", self.config.base_url, document_id);
        let resp = self
            .client
            .get(&url)
            .header(AUTHORIZATION, &self.auth)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = resp.json().await?;
        Ok(parse_state(&body))
    }

    async fn wait_until_done(&self, document_id: &str) -> Result<()> {
        for attempt in 1..=POLL_ATTEMPTS {
            match self.document_status(document_id).await? {
                ProcessingStatus::Done => return Ok(()),
                ProcessingStatus::Failed => {
                    return Err(ProviderError::ProcessingFailed(format!(
                        "document {document_id} failed at the parsing service"
                    )));
                }
                state => {
                    debug!(document_id, ?state, attempt, "Result not ready yet");
                    tokio::time::sleep(POLL_BACKOFF.delay(attempt)).await;
                }
            }
        }
        Err(ProviderError::PollingExhausted {
            attempts: POLL_ATTEMPTS,
        })
    }

    async fn retrieve(&self, document_id: &str) -> Result<FieldTree> {
        let url = format!(
            "{}/documents/{}?compact-response=true",
            self.config.base_url, document_id
        );
        let resp = self
            .client
            .get(&url)
            .header(AUTHORIZATION, &self.auth)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = resp.text().await?;
        FieldTree::from_json(&text).map_err(|err| ProviderError::ResultUnparsable(err.to_string()))
    }
}

/// The state field may arrive as a plain scalar or wrapped in an answer
/// object, the same as every other field in the tree.
fn parse_state(body: &Value) -> ProcessingStatus {
    ProcessingStatus::from_document_state(&scalar_text(body.get("state")))
}

#[async_trait::async_trait]
impl ExtractionProvider for NuDeltaProvider {
    fn name(&self) -> &'static str {
        "nudelta"
    }

    async fn extract(&self, document: &DocumentInput) -> Result<FieldTree> {
        info!(filename = %document.filename, "Uploading document for parsing");
        let document_id = self.upload(document).await?;
        debug!(document_id = %document_id, "Document accepted");
        self.wait_until_done(&document_id).await?;
        let tree = self.retrieve(&document_id).await?;
        info!(document_id = %document_id, "Parsed field tree retrieved");
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_state_scalar() {
        assert_eq!(
            parse_state(&json!({ "state": "done" })),
            ProcessingStatus::Done
        );
        assert_eq!(
            parse_state(&json!({ "state": "waiting" })),
            ProcessingStatus::Queued
        );
    }

    #[test]
    fn test_parse_state_wrapped() {
        let body = json!({ "state": { "ans": { "val": "processing" } } });
        assert_eq!(parse_state(&body), ProcessingStatus::Processing);
    }

    #[test]
    fn test_parse_state_missing_keeps_polling() {
        assert_eq!(parse_state(&json!({})), ProcessingStatus::Processing);
    }

    #[test]
    fn test_upload_response_shape() {
        let parsed: UploadResponse =
            serde_json::from_value(json!({ "document_id": "doc-123" })).unwrap();
        assert_eq!(parsed.document_id, "doc-123");
    }

    #[test]
    fn test_basic_auth_header() {
        let provider = NuDeltaProvider::new(NuDeltaConfig {
            base_url: "https://example.com/api/v1".to_string(),
            username: "user".to_string(),
            password: "pass".to_string(),
        });
        assert_eq!(provider.auth, "Basic dXNlcjpwYXNz");
    }
}

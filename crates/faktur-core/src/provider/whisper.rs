//! Text-rendering client used to produce the plain-text fallback input.
//!
//! Not an extraction provider itself: it turns a PDF into layout-preserving
//! text which is cached next to the original and picked up when the primary
//! path is exhausted.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::{debug, info};

use super::{ProcessingStatus, Result};
use crate::error::ProviderError;
use crate::models::config::WhisperConfig;
use crate::models::record::DocumentInput;

const API_KEY_HEADER: &str = "unstract-key";
const STATUS_ATTEMPTS: u32 = 10;
const STATUS_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    whisper_hash: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

pub struct WhisperClient {
    client: reqwest::Client,
    config: WhisperConfig,
}

impl WhisperClient {
    pub fn new(config: WhisperConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Submit the document and wait until its text rendering is available.
    pub async fn render_text(&self, document: &DocumentInput) -> Result<String> {
        info!(filename = %document.filename, "Submitting document for text rendering");
        let hash = self.submit(document).await?;
        debug!(whisper_hash = %hash, "Document accepted for rendering");
        self.wait_until_processed(&hash).await?;
        self.retrieve_text(&hash).await
    }

    async fn submit(&self, document: &DocumentInput) -> Result<String> {
        let url = format!("{}/api/v2/whisper", self.config.base_url);
        let resp = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(document.bytes.clone())
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

        let parsed: SubmitResponse = resp
            .json()
            .await
            .map_err(|err| ProviderError::UploadFailed(err.to_string()))?;
        Ok(parsed.whisper_hash)
    }

    async fn rendering_status(&self, hash: &str) -> Result<ProcessingStatus> {
        let url = format!("{}/api/v2/whisper-status", self.config.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("whisper_hash", hash)])
            .header(API_KEY_HEADER, &self.config.api_key)
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

        let parsed: StatusResponse = resp.json().await?;
        Ok(ProcessingStatus::from_whisper_status(&parsed.status))
    }

    async fn wait_until_processed(&self, hash: &str) -> Result<()> {
        for attempt in 1..=STATUS_ATTEMPTS {
            match self.rendering_status(hash).await? {
                ProcessingStatus::Done => return Ok(()),
                ProcessingStatus::Failed => {
                    return Err(ProviderError::ProcessingFailed(format!(
                        "text rendering failed for {hash}"
                    )));
                }
                state => {
                    debug!(whisper_hash = %hash, ?state, attempt, "Rendering not finished yet");
                    tokio::time::sleep(STATUS_DELAY).await;
                }
            }
        }
        Err(ProviderError::PollingExhausted {
            attempts: STATUS_ATTEMPTS,
        })
    }

    async fn retrieve_text(&self, hash: &str) -> Result<String> {
        let url = format!("{}/api/v2/whisper-retrieve", self.config.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("whisper_hash", hash), ("text_only", "true")])
            .header(API_KEY_HEADER, &self.config.api_key)
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

        Ok(resp.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_submit_response_shape() {
        let parsed: SubmitResponse =
            serde_json::from_value(json!({ "whisper_hash": "abc|def" })).unwrap();
        assert_eq!(parsed.whisper_hash, "abc|def");
    }

    #[test]
    fn test_status_response_maps_to_processing_status() {
        let parsed: StatusResponse =
            serde_json::from_value(json!({ "status": "processed" })).unwrap();
        assert_eq!(
            ProcessingStatus::from_whisper_status(&parsed.status),
            ProcessingStatus::Done
        );
    }
}

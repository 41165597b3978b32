//! Extraction providers.
//!
//! Two interchangeable families produce the same raw field tree: a
//! polling-document API and an assistant-thread flow. The orchestrator only
//! sees the [`ExtractionProvider`] trait.

mod assistant;
mod nudelta;
mod whisper;

pub use assistant::AssistantProvider;
pub use nudelta::NuDeltaProvider;
pub use whisper::WhisperClient;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::models::config::{FakturConfig, ProviderKind};
use crate::models::record::{DocumentInput, FieldTree};

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// A remote service that turns a document into a raw field tree.
#[async_trait]
pub trait ExtractionProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    /// Upload the document, wait for completion and return the field tree.
    async fn extract(&self, document: &DocumentInput) -> Result<FieldTree>;
}

/// Build the provider selected by the configuration.
pub fn provider_for(config: &FakturConfig) -> Box<dyn ExtractionProvider> {
    match config.provider.active {
        ProviderKind::NuDelta => Box::new(NuDeltaProvider::new(config.nudelta.clone())),
        ProviderKind::Assistant => Box::new(AssistantProvider::new(config.assistant.clone())),
    }
}

/// Canonical processing state a document moves through at a provider.
///
/// Terminal states are `Done` and `Failed`; polling loops stop there and
/// never transition back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStatus {
    Queued,
    Processing,
    Done,
    Failed,
}

impl ProcessingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingStatus::Done | ProcessingStatus::Failed)
    }

    /// Map a document-parsing API state string.
    pub fn from_document_state(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "done" => ProcessingStatus::Done,
            "error" | "failed" => ProcessingStatus::Failed,
            "waiting" | "queued" | "new" => ProcessingStatus::Queued,
            // Unknown states keep the poll loop going until its budget ends.
            _ => ProcessingStatus::Processing,
        }
    }

    /// Map an assistant run status string.
    pub fn from_run_status(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "completed" => ProcessingStatus::Done,
            "failed" | "cancelled" | "expired" | "incomplete" => ProcessingStatus::Failed,
            "queued" => ProcessingStatus::Queued,
            _ => ProcessingStatus::Processing,
        }
    }

    /// Map a text-rendering service status string.
    pub fn from_whisper_status(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "processed" => ProcessingStatus::Done,
            "error" | "failed" => ProcessingStatus::Failed,
            "accepted" => ProcessingStatus::Queued,
            _ => ProcessingStatus::Processing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_document_state_mapping() {
        assert_eq!(
            ProcessingStatus::from_document_state("done"),
            ProcessingStatus::Done
        );
        assert_eq!(
            ProcessingStatus::from_document_state("DONE"),
            ProcessingStatus::Done
        );
        assert_eq!(
            ProcessingStatus::from_document_state("error"),
            ProcessingStatus::Failed
        );
        assert_eq!(
            ProcessingStatus::from_document_state("waiting"),
            ProcessingStatus::Queued
        );
        assert_eq!(
            ProcessingStatus::from_document_state("reticulating"),
            ProcessingStatus::Processing
        );
    }

    #[test]
    fn test_run_status_mapping() {
        assert_eq!(
            ProcessingStatus::from_run_status("completed"),
            ProcessingStatus::Done
        );
        assert_eq!(
            ProcessingStatus::from_run_status("expired"),
            ProcessingStatus::Failed
        );
        assert_eq!(
            ProcessingStatus::from_run_status("in_progress"),
            ProcessingStatus::Processing
        );
        assert_eq!(
            ProcessingStatus::from_run_status("queued"),
            ProcessingStatus::Queued
        );
    }

    #[test]
    fn test_whisper_status_mapping() {
        assert_eq!(
            ProcessingStatus::from_whisper_status("processed"),
            ProcessingStatus::Done
        );
        assert_eq!(
            ProcessingStatus::from_whisper_status("accepted"),
            ProcessingStatus::Queued
        );
        assert_eq!(
            ProcessingStatus::from_whisper_status("error"),
            ProcessingStatus::Failed
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(ProcessingStatus::Done.is_terminal());
        assert!(ProcessingStatus::Failed.is_terminal());
        assert!(!ProcessingStatus::Queued.is_terminal());
        assert!(!ProcessingStatus::Processing.is_terminal());
    }
}

//! Extraction orchestration.
//!
//! Runs the primary input against the configured provider with a bounded
//! retry budget, falls back to the cached text rendering when the budget is
//! spent, and normalizes the winning field tree into a record. Inputs are
//! processed strictly sequentially.

pub mod retry;

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{FakturError, Result};
use crate::link::DocumentLinkTool;
use crate::models::config::FakturConfig;
use crate::models::record::{DocumentInput, FieldTree, NormalizedInvoiceRecord, fields};
use crate::normalize::normalize_record;
use crate::provider::ExtractionProvider;
use retry::{Backoff, RetryPolicy};

/// One document to extract: the primary input plus the fallback rendering
/// tried when the primary path is exhausted.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub primary: PathBuf,
    pub fallback: PathBuf,
}

impl ExtractionRequest {
    /// Build a request for `input`. When no explicit fallback is given, the
    /// cached rendering next to the input is assumed.
    pub fn new(input: &Path, fallback: Option<PathBuf>, fallback_extension: &str) -> Self {
        let fallback = fallback.unwrap_or_else(|| input.with_extension(fallback_extension));
        Self {
            primary: input.to_path_buf(),
            fallback,
        }
    }
}

pub struct Orchestrator {
    provider: Box<dyn ExtractionProvider>,
    link_tool: Option<DocumentLinkTool>,
    required_field: String,
    policy: RetryPolicy,
}

impl Orchestrator {
    pub fn new(provider: Box<dyn ExtractionProvider>, config: &FakturConfig) -> Self {
        let link_tool = if config.link.enabled && !config.link.command.trim().is_empty() {
            Some(DocumentLinkTool::new(&config.link.command))
        } else {
            None
        };
        let policy = RetryPolicy::new(
            config.processing.attempts,
            Backoff::Fixed(Duration::from_secs(config.processing.retry_delay_secs)),
        );

        Self {
            provider,
            link_tool,
            required_field: config.provider.required_field.clone(),
            policy,
        }
    }

    /// Extract `request` into a normalized record.
    ///
    /// The primary input gets the full attempt budget first. Only when it is
    /// exhausted, and the fallback file actually exists, does the fallback
    /// get its own budget. Both exhausted means the document failed.
    pub async fn run(&self, request: &ExtractionRequest) -> Result<NormalizedInvoiceRecord> {
        let attempts_used = Cell::new(0u32);

        match self.run_path(&request.primary, &attempts_used).await {
            Ok(record) => return Ok(record),
            Err(err) => {
                warn!(input = %request.primary.display(), error = %err, "Primary input exhausted");
            }
        }

        if !request.fallback.exists() {
            info!(fallback = %request.fallback.display(), "No fallback input present");
            return Err(FakturError::OrchestrationExhausted {
                attempts: attempts_used.get(),
            });
        }

        info!(fallback = %request.fallback.display(), "Retrying with fallback input");
        match self.run_path(&request.fallback, &attempts_used).await {
            Ok(record) => Ok(record),
            Err(err) => {
                warn!(error = %err, "Fallback input exhausted");
                Err(FakturError::OrchestrationExhausted {
                    attempts: attempts_used.get(),
                })
            }
        }
    }

    /// Run the retry budget against a single input file. The link tool runs
    /// once after a gated extraction succeeds; its failure invalidates the
    /// whole path rather than consuming another attempt.
    async fn run_path(
        &self,
        path: &Path,
        attempts_used: &Cell<u32>,
    ) -> Result<NormalizedInvoiceRecord> {
        let document = DocumentInput::from_path(path)?;

        let last_attempt = Cell::new(0u32);
        let outcome = self
            .policy
            .run(|attempt| {
                last_attempt.set(attempt);
                self.attempt_extraction(&document)
            })
            .await;
        attempts_used.set(attempts_used.get() + last_attempt.get());
        let tree = outcome.map_err(FakturError::Provider)?;

        let link = match &self.link_tool {
            Some(tool) => Some(tool.obtain_link(path).await.map_err(FakturError::Tool)?),
            None => None,
        };

        let mut record = normalize_record(&tree);
        if let Some(url) = link {
            record.set(fields::DOCUMENT_LINK, url);
        }
        Ok(record)
    }

    /// A single attempt: extract, then check the required field is present.
    async fn attempt_extraction(
        &self,
        document: &DocumentInput,
    ) -> std::result::Result<FieldTree, crate::error::ProviderError> {
        let tree = self.provider.extract(document).await?;
        if !tree.has_field(&self.required_field) {
            return Err(crate::error::ProviderError::MissingField(
                self.required_field.clone(),
            ));
        }
        Ok(tree)
    }
}

//! Optional external tool that publishes a document and returns its URL.
//!
//! The tool is any executable that takes the document path as its only
//! argument and prints a single http(s) URL on stdout. A non-zero exit or
//! malformed output fails the extraction path that invoked it.

use std::path::Path;

use tokio::process::Command;
use tracing::{debug, info};
use url::Url;

use crate::error::ToolError;

pub struct DocumentLinkTool {
    command: String,
}

impl DocumentLinkTool {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
        }
    }

    /// Run the configured command against `document` and return the URL it
    /// printed.
    pub async fn obtain_link(&self, document: &Path) -> Result<String, ToolError> {
        debug!(command = %self.command, document = %document.display(), "Running link tool");
        let output = Command::new(&self.command)
            .arg(document)
            .output()
            .await
            .map_err(|err| ToolError::Launch {
                command: self.command.clone(),
                source: err,
            })?;

        if !output.status.success() {
            return Err(ToolError::ExitStatus {
                command: self.command.clone(),
                status: output.status.to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let candidate = stdout.trim();
        if !is_valid_http_url(candidate) {
            return Err(ToolError::InvalidUrl(candidate.to_string()));
        }
        info!(url = %candidate, "Document link obtained");
        Ok(candidate.to_string())
    }
}

/// True when `candidate` parses as an absolute http or https URL.
pub fn is_valid_http_url(candidate: &str) -> bool {
    match Url::parse(candidate) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

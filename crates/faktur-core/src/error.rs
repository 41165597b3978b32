//! Error types for the faktur-core library.

use thiserror::Error;

/// Main error type for the faktur library.
#[derive(Error, Debug)]
pub enum FakturError {
    /// Extraction provider error.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Spreadsheet sink error.
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// Document link tool error.
    #[error("link tool error: {0}")]
    Tool(#[from] ToolError),

    /// Every extraction path was exhausted without a usable result.
    #[error("extraction exhausted after {attempts} attempts across all inputs")]
    OrchestrationExhausted { attempts: u32 },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised by extraction providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Submitting the document to the provider failed.
    #[error("upload failed: {0}")]
    UploadFailed(String),

    /// The provider rejected a request.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The document never reached a terminal state within the poll budget.
    #[error("polling exhausted after {attempts} attempts")]
    PollingExhausted { attempts: u32 },

    /// The provider reported the document as failed.
    #[error("processing failed: {0}")]
    ProcessingFailed(String),

    /// The provider returned a payload that is not the expected field tree.
    #[error("unparsable result: {0}")]
    ResultUnparsable(String),

    /// A field required to accept the result is missing or empty.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors raised by the spreadsheet sink.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The named sheet does not exist in the spreadsheet.
    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    /// The batch write was rejected.
    #[error("write failed: {0}")]
    Write(String),

    /// The sink API rejected a request.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors raised by the document link tool.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The tool executable could not be started.
    #[error("failed to launch {command}: {source}")]
    Launch {
        command: String,
        source: std::io::Error,
    },

    /// The tool exited with a non-zero status.
    #[error("{command} exited with {status}")]
    ExitStatus { command: String, status: String },

    /// The tool output is not a valid http(s) URL.
    #[error("tool output is not a valid http(s) URL: {0}")]
    InvalidUrl(String),
}

/// Result type for the faktur library.
pub type Result<T> = std::result::Result<T, FakturError>;

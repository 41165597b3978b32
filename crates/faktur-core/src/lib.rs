//! Core library for invoice document capture.
//!
//! This crate provides:
//! - Extraction providers (document-parsing API, assistant threads)
//! - Text rendering of PDFs for the fallback path
//! - Field normalization (currencies, amounts, dates, company suffixes)
//! - Retry orchestration across primary and fallback inputs
//! - A typed spreadsheet sink that appends one row per document

pub mod error;
pub mod models;
pub mod normalize;
pub mod provider;
pub mod orchestrate;
pub mod sheet;
pub mod link;

pub use error::{FakturError, ProviderError, Result, SinkError, ToolError};
pub use models::config::{FakturConfig, PostAction, ProviderKind};
pub use models::record::{ColumnMapping, DocumentInput, FieldTree, NormalizedInvoiceRecord, fields};
pub use normalize::{normalize_amount, normalize_record};
pub use provider::{
    AssistantProvider, ExtractionProvider, NuDeltaProvider, ProcessingStatus, WhisperClient,
    provider_for,
};
pub use orchestrate::{ExtractionRequest, Orchestrator};
pub use sheet::{SheetsClient, WriteOutcome};
pub use link::DocumentLinkTool;

//! Configuration structures for the capture pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Main configuration for the faktur pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FakturConfig {
    /// Provider selection and acceptance rules.
    pub provider: ProviderConfig,

    /// Document-parsing provider (polling API).
    pub nudelta: NuDeltaConfig,

    /// Assistant-thread provider.
    pub assistant: AssistantConfig,

    /// Text rendering service used to build the fallback input.
    pub whisper: WhisperConfig,

    /// Spreadsheet sink.
    pub sheets: SheetsConfig,

    /// External document link tool.
    pub link: LinkToolConfig,

    /// Retry and post-processing behaviour.
    pub processing: ProcessingConfig,
}

impl Default for FakturConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            nudelta: NuDeltaConfig::default(),
            assistant: AssistantConfig::default(),
            whisper: WhisperConfig::default(),
            sheets: SheetsConfig::default(),
            link: LinkToolConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

/// Which extraction provider handles the primary input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Document-parsing API with asynchronous polling.
    NuDelta,
    /// Assistant thread over an uploaded file.
    Assistant,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::NuDelta => write!(f, "nudelta"),
            ProviderKind::Assistant => write!(f, "assistant"),
        }
    }
}

/// Provider selection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider used for the primary input.
    pub active: ProviderKind,

    /// Field that must be non-empty for a result to count as extracted.
    pub required_field: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            active: ProviderKind::NuDelta,
            required_field: "issue".to_string(),
        }
    }
}

/// Document-parsing provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NuDeltaConfig {
    /// API base URL.
    pub base_url: String,

    /// Basic auth user name.
    pub username: String,

    /// Basic auth password.
    pub password: String,
}

impl Default for NuDeltaConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.nudelta.pl/api/v1".to_string(),
            username: String::new(),
            password: String::new(),
        }
    }
}

/// Assistant-thread provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// API base URL.
    pub base_url: String,

    /// Bearer token.
    pub api_key: String,

    /// Model backing the assistant.
    pub model: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}

/// Text rendering service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhisperConfig {
    /// API base URL.
    pub base_url: String,

    /// API key sent in the `unstract-key` header.
    pub api_key: String,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            base_url: "https://llmwhisperer-api.us-central.unstract.com".to_string(),
            api_key: String::new(),
        }
    }
}

/// Spreadsheet sink configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    /// Sheets API base URL.
    pub base_url: String,

    /// OAuth access token attached as bearer auth.
    pub access_token: String,

    /// Target spreadsheet ID.
    pub spreadsheet_id: String,

    /// Target sheet title within the spreadsheet.
    pub sheet_name: String,

    /// Canonical field name to column letter. Blank letters are unmapped.
    pub columns: BTreeMap<String, String>,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sheets.googleapis.com".to_string(),
            access_token: String::new(),
            spreadsheet_id: String::new(),
            sheet_name: "Invoices".to_string(),
            columns: default_columns(),
        }
    }
}

fn default_columns() -> BTreeMap<String, String> {
    use crate::models::record::fields;

    [
        (fields::INVOICE_NUMBER, "A"),
        (fields::ISSUE_DATE, "B"),
        (fields::SALE_DATE, "C"),
        (fields::DUE_DATE, "D"),
        (fields::SELLER_NAME, "E"),
        (fields::SELLER_NIP, "F"),
        (fields::BUYER_NAME, "G"),
        (fields::BUYER_NIP, "H"),
        (fields::TOTAL_AMOUNT, "I"),
        (fields::CURRENCY, "J"),
        (fields::PAYMENT_METHOD, "K"),
        (fields::IBAN, "L"),
        (fields::DOCUMENT_LINK, "M"),
    ]
    .into_iter()
    .map(|(field, letter)| (field.to_string(), letter.to_string()))
    .collect()
}

/// External document link tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkToolConfig {
    /// Run the tool after a successful extraction.
    pub enabled: bool,

    /// Executable invoked with the document path as its single argument.
    pub command: String,
}

impl Default for LinkToolConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: String::new(),
        }
    }
}

/// What happens to the source document after a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostAction {
    /// Delete the source document.
    Delete,
    /// Rename the source document to a timestamped `.bak` file.
    Archive,
    /// Leave the source document in place.
    Keep,
}

/// Retry budget and post-processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Extraction attempts per input before falling back.
    pub attempts: u32,

    /// Delay between extraction attempts, in seconds.
    pub retry_delay_secs: u64,

    /// Extension of the cached text rendering next to the primary input.
    pub fallback_extension: String,

    /// Source document handling after the row is written.
    pub post_action: PostAction,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            attempts: 5,
            retry_delay_secs: 1,
            fallback_extension: "txt".to_string(),
            post_action: PostAction::Archive,
        }
    }
}

impl FakturConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = FakturConfig::default();

        assert_eq!(config.provider.active, ProviderKind::NuDelta);
        assert_eq!(config.provider.required_field, "issue");
        assert_eq!(config.processing.attempts, 5);
        assert_eq!(config.processing.retry_delay_secs, 1);
        assert_eq!(config.processing.post_action, PostAction::Archive);
        assert_eq!(config.sheets.columns.get("InvoiceNumber").map(String::as_str), Some("A"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let json = r#"{ "provider": { "active": "assistant" } }"#;
        let config: FakturConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.provider.active, ProviderKind::Assistant);
        assert_eq!(config.provider.required_field, "issue");
        assert_eq!(config.nudelta.base_url, "https://www.nudelta.pl/api/v1");
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = FakturConfig::default();
        config.sheets.spreadsheet_id = "abc123".to_string();
        config.processing.post_action = PostAction::Delete;
        config.save(&path).unwrap();

        let loaded = FakturConfig::from_file(&path).unwrap();
        assert_eq!(loaded.sheets.spreadsheet_id, "abc123");
        assert_eq!(loaded.processing.post_action, PostAction::Delete);
    }
}

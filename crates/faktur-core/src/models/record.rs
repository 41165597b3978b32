//! Data models for extraction inputs, raw results and normalized records.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Canonical field names used across the normalizer, sink mapping and CLI.
pub mod fields {
    pub const INVOICE_NUMBER: &str = "InvoiceNumber";
    pub const REFERENCE_NUMBER: &str = "ReferenceNumber";
    pub const ISSUE_DATE: &str = "IssueDate";
    pub const SALE_DATE: &str = "SaleDate";
    pub const DUE_DATE: &str = "DueDate";
    pub const PAYMENT_METHOD: &str = "PaymentMethod";
    pub const CURRENCY: &str = "Currency";
    pub const TOTAL_AMOUNT: &str = "TotalAmount";
    pub const PAID_AMOUNT: &str = "PaidAmount";
    pub const LEFT_TO_PAY: &str = "LeftToPay";
    pub const IBAN: &str = "Iban";
    pub const SELLER_NAME: &str = "SellerName";
    pub const SELLER_NIP: &str = "SellerNip";
    pub const BUYER_NAME: &str = "BuyerName";
    pub const BUYER_NIP: &str = "BuyerNip";
    pub const DOCUMENT_LINK: &str = "DocumentLink";
}

/// Canonical field name to spreadsheet column letter. Blank letters mean the
/// field is intentionally unmapped.
pub type ColumnMapping = BTreeMap<String, String>;

/// A document handed to an extraction provider.
#[derive(Debug, Clone)]
pub struct DocumentInput {
    /// Source path on disk.
    pub path: PathBuf,

    /// File name sent to the provider.
    pub filename: String,

    /// Raw document bytes.
    pub bytes: Vec<u8>,
}

impl DocumentInput {
    /// Read a document from disk.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        Ok(Self {
            path: path.to_path_buf(),
            filename,
            bytes,
        })
    }

    /// MIME type derived from the file extension.
    pub fn content_type(&self) -> &'static str {
        match self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("pdf") => "application/pdf",
            Some("txt") => "text/plain",
            _ => "application/octet-stream",
        }
    }
}

/// Raw field tree returned by an extraction provider.
///
/// Nodes are either plain scalars or "answer wrappers" of the shape
/// `{"ans": {"val": ...}}` carrying the scalar plus provider metadata.
/// Accessors unwrap both forms to plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldTree(Value);

impl FieldTree {
    pub fn new(root: Value) -> Self {
        Self(root)
    }

    /// Parse a provider payload from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text).map(Self)
    }

    /// The `data` node holding the extracted fields.
    pub fn data(&self) -> Option<&Value> {
        self.0.get("data")
    }

    /// Scalar text of a top-level field under `data`.
    pub fn field(&self, name: &str) -> String {
        scalar_text(self.data().and_then(|d| d.get(name)))
    }

    /// Scalar text of a field nested one level under `data`, e.g. `seller.name`.
    pub fn nested_field(&self, parent: &str, name: &str) -> String {
        scalar_text(
            self.data()
                .and_then(|d| d.get(parent))
                .and_then(|p| p.get(name)),
        )
    }

    /// Whether a field under `data` is present and non-empty after unwrapping.
    pub fn has_field(&self, name: &str) -> bool {
        !self.field(name).trim().is_empty()
    }
}

/// Unwrap a node to plain text. Missing and null nodes become the empty
/// string, scalars their text form, answer wrappers the inner value, and
/// anything else its compact JSON rendering.
pub fn scalar_text(node: Option<&Value>) -> String {
    let Some(node) = node else {
        return String::new();
    };

    match node {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => {
            if let Some(val) = other.get("ans").and_then(|a| a.get("val")) {
                if !val.is_null() {
                    return scalar_text(Some(val));
                }
            }
            other.to_string()
        }
    }
}

/// A record of canonical field names to normalized text values.
///
/// Values are always canonical: ISO currency codes, invariant decimal text,
/// `yyyy-MM-dd` dates and abbreviated company suffixes. An absent field reads
/// as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedInvoiceRecord {
    fields: BTreeMap<String, String>,
}

impl NormalizedInvoiceRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: &str, value: String) {
        self.fields.insert(field.to_string(), value);
    }

    /// Value of a field, or the empty string when absent.
    pub fn get(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_scalar_text_plain_values() {
        assert_eq!(scalar_text(None), "");
        assert_eq!(scalar_text(Some(&json!(null))), "");
        assert_eq!(scalar_text(Some(&json!("FV/01/2024"))), "FV/01/2024");
        assert_eq!(scalar_text(Some(&json!(42))), "42");
        assert_eq!(scalar_text(Some(&json!(true))), "true");
    }

    #[test]
    fn test_scalar_text_answer_wrapper() {
        let node = json!({ "ans": { "val": "1 234,56", "score": 0.97 } });
        assert_eq!(scalar_text(Some(&node)), "1 234,56");

        let numeric = json!({ "ans": { "val": 17 } });
        assert_eq!(scalar_text(Some(&numeric)), "17");
    }

    #[test]
    fn test_scalar_text_wrapper_without_val_renders_json() {
        let node = json!({ "ans": { "score": 0.4 } });
        assert_eq!(scalar_text(Some(&node)), node.to_string());
    }

    #[test]
    fn test_field_tree_access() {
        let tree = FieldTree::new(json!({
            "data": {
                "invn": { "ans": { "val": "FV/01/2024" } },
                "issue": "2024-01-15",
                "seller": { "name": { "ans": { "val": "Acme sp. z o.o." } } }
            }
        }));

        assert_eq!(tree.field("invn"), "FV/01/2024");
        assert_eq!(tree.field("issue"), "2024-01-15");
        assert_eq!(tree.nested_field("seller", "name"), "Acme sp. z o.o.");
        assert_eq!(tree.field("missing"), "");
        assert!(tree.has_field("issue"));
        assert!(!tree.has_field("missing"));
    }

    #[test]
    fn test_record_defaults_to_empty() {
        let mut record = NormalizedInvoiceRecord::new();
        assert_eq!(record.get(fields::CURRENCY), "");

        record.set(fields::CURRENCY, "PLN".to_string());
        assert_eq!(record.get(fields::CURRENCY), "PLN");
    }
}

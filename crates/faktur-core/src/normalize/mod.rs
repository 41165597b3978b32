//! Field normalization pipeline.
//!
//! Turns the raw field tree returned by a provider into canonical invoice
//! fields: ISO currency codes, invariant decimal text, `yyyy-MM-dd` dates
//! and abbreviated company suffixes. Missing or malformed optional fields
//! normalize to the empty string instead of failing the record.

pub mod company;
pub mod currency;
pub mod dates;
pub mod decimal;

pub use company::abbreviate;
pub use currency::resolve as resolve_currency;
pub use decimal::{parse_flexible_decimal, round_amount};

use tracing::debug;

use crate::models::record::{FieldTree, NormalizedInvoiceRecord, fields};

/// Normalize an amount field to two-decimal invariant text.
///
/// Currency symbols and unit text are stripped before parsing; anything
/// that still fails to parse yields the empty string.
pub fn normalize_amount(raw: &str) -> String {
    let stripped = decimal::strip_to_numeric(raw);
    decimal::parse_flexible_decimal(&stripped)
        .map(decimal::round_amount)
        .map(|d| format!("{:.2}", d))
        .unwrap_or_default()
}

/// Build the canonical record from a raw field tree.
pub fn normalize_record(tree: &FieldTree) -> NormalizedInvoiceRecord {
    let mut record = NormalizedInvoiceRecord::new();

    record.set(fields::INVOICE_NUMBER, tree.field("invn").trim().to_string());
    record.set(
        fields::REFERENCE_NUMBER,
        tree.field("reference").trim().to_string(),
    );

    record.set(fields::ISSUE_DATE, dates::to_canonical(&tree.field("issue")));
    record.set(fields::SALE_DATE, dates::to_canonical(&tree.field("sale")));
    record.set(fields::DUE_DATE, dates::to_canonical(&tree.field("maturity")));

    record.set(
        fields::PAYMENT_METHOD,
        tree.field("payment").trim().to_string(),
    );
    record.set(
        fields::CURRENCY,
        currency::resolve(&tree.field("currency")),
    );

    record.set(fields::TOTAL_AMOUNT, normalize_amount(&tree.field("total")));
    record.set(fields::PAID_AMOUNT, normalize_amount(&tree.field("paid")));
    record.set(fields::LEFT_TO_PAY, normalize_amount(&tree.field("left")));

    record.set(fields::IBAN, tree.field("iban").trim().to_string());

    record.set(
        fields::SELLER_NAME,
        company::abbreviate(tree.nested_field("seller", "name").trim()),
    );
    record.set(
        fields::SELLER_NIP,
        tree.nested_field("seller", "nip").trim().to_string(),
    );
    record.set(
        fields::BUYER_NAME,
        company::abbreviate(tree.nested_field("buyer", "name").trim()),
    );
    record.set(
        fields::BUYER_NIP,
        tree.nested_field("buyer", "nip").trim().to_string(),
    );

    debug!(fields = record.len(), "Normalized invoice record");
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_normalize_amount() {
        assert_eq!(normalize_amount("1 234,56 zł"), "1234.56");
        assert_eq!(normalize_amount("1,234.5"), "1234.50");
        assert_eq!(normalize_amount("oferta"), "");
        assert_eq!(normalize_amount(""), "");
    }

    #[test]
    fn test_normalize_record_end_to_end() {
        let tree = FieldTree::new(json!({
            "data": {
                "invn": { "ans": { "val": "FV/01/2024" } },
                "reference": "ZAM/7",
                "issue": { "ans": { "val": "15.01.2024" } },
                "sale": "2024-01-10",
                "maturity": "29.01.2024",
                "payment": "przelew",
                "currency": { "ans": { "val": "zł" } },
                "total": { "ans": { "val": "1 230,00 zł" } },
                "paid": "0",
                "left": "1.230,00",
                "iban": " PL61109010140000071219812874 ",
                "seller": {
                    "name": { "ans": { "val": "Huta Stali spółka akcyjna" } },
                    "nip": "1234567890"
                },
                "buyer": {
                    "name": "Acme Company",
                    "nip": { "ans": { "val": "0987654321" } }
                }
            }
        }));

        let record = normalize_record(&tree);

        assert_eq!(record.get(fields::INVOICE_NUMBER), "FV/01/2024");
        assert_eq!(record.get(fields::REFERENCE_NUMBER), "ZAM/7");
        assert_eq!(record.get(fields::ISSUE_DATE), "2024-01-15");
        assert_eq!(record.get(fields::SALE_DATE), "2024-01-10");
        assert_eq!(record.get(fields::DUE_DATE), "2024-01-29");
        assert_eq!(record.get(fields::PAYMENT_METHOD), "przelew");
        assert_eq!(record.get(fields::CURRENCY), "PLN");
        assert_eq!(record.get(fields::TOTAL_AMOUNT), "1230.00");
        assert_eq!(record.get(fields::PAID_AMOUNT), "0.00");
        assert_eq!(record.get(fields::LEFT_TO_PAY), "1230.00");
        assert_eq!(record.get(fields::IBAN), "PL61109010140000071219812874");
        assert_eq!(record.get(fields::SELLER_NAME), "Huta Stali S.A.");
        assert_eq!(record.get(fields::BUYER_NAME), "Acme Co.");
        assert_eq!(record.get(fields::BUYER_NIP), "0987654321");
    }

    #[test]
    fn test_missing_fields_normalize_to_empty() {
        let tree = FieldTree::new(json!({ "data": { "invn": "FV/02/2024" } }));
        let record = normalize_record(&tree);

        assert_eq!(record.get(fields::INVOICE_NUMBER), "FV/02/2024");
        assert_eq!(record.get(fields::ISSUE_DATE), "");
        assert_eq!(record.get(fields::TOTAL_AMOUNT), "");
        assert_eq!(record.get(fields::SELLER_NAME), "");
    }
}

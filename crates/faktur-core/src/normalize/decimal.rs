//! Locale-flexible decimal parsing.
//!
//! Amounts on scanned invoices arrive in mixed conventions: `1.234,56`,
//! `1,234.56`, `12,5`, `1,234,567`. The separator roles are inferred from the
//! string itself instead of assuming a locale.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Parse a decimal whose thousands/decimal separator convention is inferred.
///
/// When both `,` and `.` occur, the rightmost one is the decimal separator
/// and the other is stripped as grouping. A single `,` is a decimal
/// separator; repeated `,` are grouping. Otherwise the string is parsed
/// as-is with `.` as the decimal separator and an optional leading sign.
pub fn parse_flexible_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let has_comma = trimmed.contains(',');
    let has_dot = trimmed.contains('.');

    let normalized = if has_comma && has_dot {
        match (trimmed.rfind(','), trimmed.rfind('.')) {
            (Some(c), Some(d)) if c > d => trimmed.replace('.', "").replace(',', "."),
            _ => trimmed.replace(',', ""),
        }
    } else if has_comma {
        if trimmed.matches(',').count() == 1 {
            trimmed.replace(',', ".")
        } else {
            trimmed.replace(',', "")
        }
    } else {
        trimmed.to_string()
    };

    Decimal::from_str(&normalized).ok()
}

/// Round to two fractional digits, half away from zero.
pub fn round_amount(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Drop every character that is not a digit or separator.
///
/// Extracted amount fields often carry currency symbols or unit text
/// (`"1 234,56 zł"`); this reduces them to the bare numeric string before
/// parsing.
pub fn strip_to_numeric(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect()
}

//! Currency symbol to ISO-4217 code resolution.
//!
//! The lookup table is built once per process from a region dataset. Symbols
//! used by exactly one currency map directly; symbols shared by several
//! currencies fall back to a fixed disambiguation table, and shared symbols
//! absent from that table stay unmapped so lookups pass them through.

use lazy_static::lazy_static;
use std::collections::{BTreeSet, HashMap};

/// Region currency data: (symbol, ISO-4217 code). A symbol appears once per
/// currency that uses it, so shared symbols have multiple entries.
static CURRENCY_REGIONS: &[(&str, &str)] = &[
    ("zł", "PLN"),
    ("€", "EUR"),
    ("CHF", "CHF"),
    ("Kč", "CZK"),
    ("Ft", "HUF"),
    ("лв", "BGN"),
    ("₴", "UAH"),
    ("₺", "TRY"),
    ("₪", "ILS"),
    ("₫", "VND"),
    ("฿", "THB"),
    ("₱", "PHP"),
    ("₦", "NGN"),
    ("₹", "INR"),
    ("₲", "PYG"),
    ("₡", "CRC"),
    ("₵", "GHS"),
    ("₸", "KZT"),
    ("₮", "MNT"),
    ("֏", "AMD"),
    ("₾", "GEL"),
    ("ден", "MKD"),
    ("дин", "RSD"),
    ("KM", "BAM"),
    ("R", "ZAR"),
    ("R$", "BRL"),
    ("RM", "MYR"),
    ("Rp", "IDR"),
    ("Q", "GTQ"),
    ("S/", "PEN"),
    ("NT$", "TWD"),
    ("KSh", "KES"),
    // Shared symbols.
    ("$", "USD"),
    ("$", "CAD"),
    ("$", "AUD"),
    ("$", "NZD"),
    ("$", "SGD"),
    ("$", "HKD"),
    ("$", "MXN"),
    ("$", "ARS"),
    ("$", "CLP"),
    ("$", "COP"),
    ("¥", "JPY"),
    ("¥", "CNY"),
    ("kr", "SEK"),
    ("kr", "NOK"),
    ("kr", "DKK"),
    ("kr", "ISK"),
    ("£", "GBP"),
    ("£", "EGP"),
    ("£", "GIP"),
    ("₨", "PKR"),
    ("₨", "LKR"),
    ("₨", "NPR"),
    ("₨", "MUR"),
    ("Rs", "INR"),
    ("Rs", "PKR"),
    ("lei", "RON"),
    ("lei", "MDL"),
    ("₩", "KRW"),
    ("₩", "KPW"),
    ("Sh", "SOS"),
    ("Sh", "TZS"),
    ("Sh", "UGX"),
    ("Br", "BYN"),
    ("Br", "ETB"),
    ("L", "ALL"),
    ("L", "HNL"),
    ("Bs", "BOB"),
    ("Bs", "VES"),
];

/// Manual resolution for symbols shared by several currencies.
static AMBIGUOUS_FALLBACK: &[(&str, &str)] = &[
    ("$", "USD"),
    ("¥", "JPY"),
    ("kr", "SEK"),
    ("£", "GBP"),
    ("₨", "INR"),
    ("Rs", "INR"),
    ("lei", "RON"),
    ("₩", "KRW"),
    ("R$", "BRL"),
    ("KSh", "KES"),
    ("Sh", "SOS"),
    ("NT$", "TWD"),
];

lazy_static! {
    static ref SYMBOL_TO_ISO: HashMap<String, &'static str> = build_symbol_table();
}

fn build_symbol_table() -> HashMap<String, &'static str> {
    let mut candidates: HashMap<String, BTreeSet<&'static str>> = HashMap::new();
    for (symbol, iso) in CURRENCY_REGIONS {
        candidates
            .entry(symbol.to_lowercase())
            .or_default()
            .insert(iso);
    }

    let fallback: HashMap<String, &'static str> = AMBIGUOUS_FALLBACK
        .iter()
        .map(|(symbol, iso)| (symbol.to_lowercase(), *iso))
        .collect();

    let mut table = HashMap::new();
    for (symbol, codes) in candidates {
        if codes.len() == 1 {
            if let Some(iso) = codes.into_iter().next() {
                table.insert(symbol, iso);
            }
        } else if let Some(iso) = fallback.get(&symbol) {
            table.insert(symbol, *iso);
        }
    }
    table
}

/// Resolve a free-text currency symbol or code to an ISO-4217 code.
///
/// Blank input yields the empty string; symbols without a mapping come back
/// unchanged. Never fails.
pub fn resolve(symbol_or_code: &str) -> String {
    let trimmed = symbol_or_code.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    match SYMBOL_TO_ISO.get(&trimmed.to_lowercase()) {
        Some(iso) => (*iso).to_string(),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unique_symbols() {
        assert_eq!(resolve("zł"), "PLN");
        assert_eq!(resolve("€"), "EUR");
        assert_eq!(resolve("Kč"), "CZK");
        assert_eq!(resolve("R$"), "BRL");
    }

    #[test]
    fn test_ambiguous_symbols_use_fallback_table() {
        assert_eq!(resolve("$"), "USD");
        assert_eq!(resolve("¥"), "JPY");
        assert_eq!(resolve("kr"), "SEK");
        assert_eq!(resolve("£"), "GBP");
        assert_eq!(resolve("lei"), "RON");
        assert_eq!(resolve("Sh"), "SOS");
    }

    #[test]
    fn test_ambiguous_symbol_without_fallback_passes_through() {
        // Br is shared (BYN, ETB) and has no manual resolution.
        assert_eq!(resolve("Br"), "Br");
        assert_eq!(resolve("L"), "L");
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(resolve("KR"), "SEK");
        assert_eq!(resolve("ZŁ"), "PLN");
        assert_eq!(resolve("LEI"), "RON");
    }

    #[test]
    fn test_blank_and_unknown_input() {
        assert_eq!(resolve(""), "");
        assert_eq!(resolve("   "), "");
        assert_eq!(resolve("XYZ"), "XYZ");
        assert_eq!(resolve("PLN"), "PLN");
    }

    #[test]
    fn test_whitespace_around_symbol() {
        assert_eq!(resolve(" kr "), "SEK");
    }
}

//! Date normalization to canonical `yyyy-MM-dd` and sheet serial numbers.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DATE_YMD: Regex =
        Regex::new(r"^\s*(\d{4})[./\-](\d{1,2})[./\-](\d{1,2})\s*$").unwrap();
    static ref DATE_DMY: Regex =
        Regex::new(r"^\s*(\d{1,2})[./\-](\d{1,2})[./\-](\d{4}|\d{2})\s*$").unwrap();
    /// Spreadsheet day-serial base date.
    static ref SHEET_EPOCH: NaiveDate = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap();
}

/// Parse a date written as `YYYY-MM-DD` or `DD.MM.YYYY` with any of `.`,
/// `/` or `-` as the separator. Two-digit years up to 50 fall into the
/// 2000s, the rest into the 1900s.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Some(caps) = DATE_YMD.captures(raw) {
        let year: i32 = caps[1].parse().unwrap_or(0);
        let month: u32 = caps[2].parse().unwrap_or(0);
        let day: u32 = caps[3].parse().unwrap_or(0);
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = DATE_DMY.captures(raw) {
        let day: u32 = caps[1].parse().unwrap_or(0);
        let month: u32 = caps[2].parse().unwrap_or(0);
        let year = expand_year(caps[3].parse().unwrap_or(0));
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    None
}

/// Canonical `yyyy-MM-dd` text, or the empty string when unparsable.
pub fn to_canonical(raw: &str) -> String {
    parse_date(raw)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Day count since the 1899-12-30 spreadsheet epoch.
pub fn sheet_serial(date: NaiveDate) -> i64 {
    date.signed_duration_since(*SHEET_EPOCH).num_days()
}

fn expand_year(year: i32) -> i32 {
    if year < 100 {
        if year <= 50 { 2000 + year } else { 1900 + year }
    } else {
        year
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_iso() {
        assert_eq!(
            parse_date("2024-01-15"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(
            parse_date("2024/01/15"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
    }

    #[test]
    fn test_parse_dmy() {
        assert_eq!(
            parse_date("15.01.2024"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(
            parse_date("15-01-2024"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
    }

    #[test]
    fn test_two_digit_year() {
        assert_eq!(
            parse_date("15.01.24"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(
            parse_date("15.01.99"),
            NaiveDate::from_ymd_opt(1999, 1, 15)
        );
    }

    #[test]
    fn test_invalid_dates() {
        assert_eq!(parse_date("32.01.2024"), None);
        assert_eq!(parse_date("2024-13-01"), None);
        assert_eq!(parse_date("soon"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_to_canonical() {
        assert_eq!(to_canonical("15.01.2024"), "2024-01-15");
        assert_eq!(to_canonical("not a date"), "");
    }

    #[test]
    fn test_sheet_serial() {
        assert_eq!(
            sheet_serial(NaiveDate::from_ymd_opt(1899, 12, 31).unwrap()),
            1
        );
        assert_eq!(
            sheet_serial(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()),
            45306
        );
    }
}

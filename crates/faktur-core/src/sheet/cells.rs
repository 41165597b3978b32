//! Cell addressing and value typing for the spreadsheet sink.

use rust_decimal::Decimal;

use crate::normalize::{self, dates};

/// Convert a column letter like `A` or `AA` to a zero-based index.
///
/// Empty or non-alphabetic input means the column is unmapped.
pub fn column_index(letters: &str) -> Option<u32> {
    let trimmed = letters.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut index: u32 = 0;
    for c in trimmed.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        index = index * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32) + 1;
    }
    Some(index - 1)
}

/// First 1-based row after the last row containing any non-blank cell.
/// An empty grid appends at row 1.
pub fn next_free_row(grid: &[Vec<String>]) -> u32 {
    let last = grid
        .iter()
        .rposition(|row| row.iter().any(|cell| !cell.trim().is_empty()));
    match last {
        Some(index) => index as u32 + 2,
        None => 1,
    }
}

/// A typed cell value. Numbers and dates carry a display format so the
/// sheet renders them consistently regardless of locale.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number { value: Decimal },
    Date { serial: i64 },
    Text(String),
}

impl CellValue {
    /// Sheet number format for this value, if any.
    pub fn number_format(&self) -> Option<(&'static str, &'static str)> {
        match self {
            CellValue::Number { .. } => Some(("NUMBER", "0.00")),
            CellValue::Date { .. } => Some(("DATE", "yyyy-mm-dd")),
            CellValue::Text(_) => None,
        }
    }
}

/// One pending write: 1-based row, zero-based column, typed value.
#[derive(Debug, Clone, PartialEq)]
pub struct CellWrite {
    pub row: u32,
    pub column: u32,
    pub value: CellValue,
}

/// Decide how a normalized text value lands in its cell. Decimal text
/// becomes a number, date text a serial date, everything else stays text.
pub fn classify(value: &str) -> CellValue {
    if let Some(amount) = normalize::parse_flexible_decimal(value) {
        return CellValue::Number {
            value: normalize::round_amount(amount),
        };
    }
    if let Some(date) = dates::parse_date(value) {
        return CellValue::Date {
            serial: dates::sheet_serial(date),
        };
    }
    CellValue::Text(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_index("A"), Some(0));
        assert_eq!(column_index("B"), Some(1));
        assert_eq!(column_index("Z"), Some(25));
        assert_eq!(column_index("AA"), Some(26));
        assert_eq!(column_index("AB"), Some(27));
        assert_eq!(column_index("BA"), Some(52));
    }

    #[test]
    fn test_column_letters_case_and_whitespace() {
        assert_eq!(column_index("a"), Some(0));
        assert_eq!(column_index(" aa "), Some(26));
    }

    #[test]
    fn test_invalid_columns_are_unmapped() {
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("  "), None);
        assert_eq!(column_index("A1"), None);
        assert_eq!(column_index("!"), None);
    }

    #[test]
    fn test_next_free_row() {
        let grid = vec![
            vec!["Header".to_string()],
            vec!["FV/1".to_string(), "2024-01-15".to_string()],
        ];
        assert_eq!(next_free_row(&grid), 3);
    }

    #[test]
    fn test_next_free_row_skips_trailing_blanks() {
        let grid = vec![
            vec!["a".to_string()],
            vec!["b".to_string()],
            vec!["c".to_string()],
            vec!["d".to_string()],
            vec!["e".to_string()],
            vec!["".to_string(), " ".to_string()],
        ];
        assert_eq!(next_free_row(&grid), 6);
    }

    #[test]
    fn test_next_free_row_empty_grid() {
        assert_eq!(next_free_row(&[]), 1);
    }

    #[test]
    fn test_classify_number() {
        assert_eq!(
            classify("1230.00"),
            CellValue::Number {
                value: dec("1230.00")
            }
        );
        assert_eq!(
            classify("1234,56"),
            CellValue::Number {
                value: dec("1234.56")
            }
        );
    }

    #[test]
    fn test_classify_date() {
        assert_eq!(classify("2024-01-15"), CellValue::Date { serial: 45306 });
    }

    #[test]
    fn test_classify_text() {
        assert_eq!(
            classify("FV/01/2024"),
            CellValue::Text("FV/01/2024".to_string())
        );
        assert_eq!(
            classify("PL61109010140000071219812874"),
            CellValue::Text("PL61109010140000071219812874".to_string())
        );
    }

    #[test]
    fn test_formats() {
        assert_eq!(
            classify("12.50").number_format(),
            Some(("NUMBER", "0.00"))
        );
        assert_eq!(
            classify("2024-01-15").number_format(),
            Some(("DATE", "yyyy-mm-dd"))
        );
        assert_eq!(classify("przelew").number_format(), None);
    }
}

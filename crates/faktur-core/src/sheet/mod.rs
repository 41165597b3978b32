//! Spreadsheet sink.
//!
//! Appends one row per processed document to a Google Sheets worksheet.
//! Values are written cell by cell with explicit types and number formats,
//! so amounts and dates stay sortable in the sheet.

pub mod cells;

pub use cells::{CellValue, CellWrite, column_index, next_free_row};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::SinkError;
use crate::models::config::SheetsConfig;
use crate::models::record::{ColumnMapping, NormalizedInvoiceRecord};
use cells::classify;

type Result<T> = std::result::Result<T, SinkError>;

/// What an append call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A row was written at `row` with `cells` populated cells.
    Appended { row: u32, cells: usize },
    /// Nothing in the record was mapped to a column.
    NoOp,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueGrid {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct BatchUpdateBody {
    requests: Vec<UpdateCellsRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateCellsRequest {
    update_cells: UpdateCells,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateCells {
    start: GridCoordinate,
    rows: Vec<RowData>,
    fields: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GridCoordinate {
    sheet_id: i64,
    row_index: u32,
    column_index: u32,
}

#[derive(Debug, Serialize)]
struct RowData {
    values: Vec<CellData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CellData {
    user_entered_value: ExtendedValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_entered_format: Option<CellFormat>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtendedValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    number_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    string_value: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CellFormat {
    number_format: NumberFormat,
}

#[derive(Debug, Serialize)]
struct NumberFormat {
    #[serde(rename = "type")]
    kind: &'static str,
    pattern: &'static str,
}

/// Resolve the record against the column mapping. Blank and invalid column
/// letters are unmapped, empty values are skipped. When two fields map to
/// the same column the later one in field order wins on the sheet.
fn plan_writes(record: &NormalizedInvoiceRecord, mapping: &ColumnMapping) -> Vec<(u32, CellValue)> {
    let mut planned = Vec::new();
    for (field, letter) in mapping {
        let Some(column) = column_index(letter) else {
            continue;
        };
        let value = record.get(field);
        if value.trim().is_empty() {
            continue;
        }
        planned.push((column, classify(value)));
    }
    planned
}

fn cell_data(value: &CellValue) -> CellData {
    use rust_decimal::prelude::ToPrimitive;

    let user_entered_value = match value {
        CellValue::Number { value } => ExtendedValue {
            number_value: value.to_f64(),
            string_value: None,
        },
        CellValue::Date { serial } => ExtendedValue {
            number_value: Some(*serial as f64),
            string_value: None,
        },
        CellValue::Text(text) => ExtendedValue {
            number_value: None,
            string_value: Some(text.clone()),
        },
    };
    let user_entered_format = value.number_format().map(|(kind, pattern)| CellFormat {
        number_format: NumberFormat { kind, pattern },
    });

    CellData {
        user_entered_value,
        user_entered_format,
    }
}

fn batch_body(sheet_id: i64, writes: &[CellWrite]) -> BatchUpdateBody {
    let requests = writes
        .iter()
        .map(|write| UpdateCellsRequest {
            update_cells: UpdateCells {
                start: GridCoordinate {
                    sheet_id,
                    row_index: write.row - 1,
                    column_index: write.column,
                },
                rows: vec![RowData {
                    values: vec![cell_data(&write.value)],
                }],
                fields: match write.value.number_format() {
                    Some(_) => "userEnteredValue,userEnteredFormat.numberFormat",
                    None => "userEnteredValue",
                },
            },
        })
        .collect();
    BatchUpdateBody { requests }
}

pub struct SheetsClient {
    client: reqwest::Client,
    config: SheetsConfig,
}

impl SheetsClient {
    pub fn new(config: SheetsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn parse<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SinkError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.json().await?)
    }

    /// Numeric sheet id of the configured worksheet title.
    async fn locate_sheet(&self) -> Result<i64> {
        let url = format!(
            "{}/v4/spreadsheets/{}",
            self.config.base_url, self.config.spreadsheet_id
        );
        let resp = self
            .client
            .get(&url)
            .query(&[("fields", "sheets.properties")])
            .bearer_auth(&self.config.access_token)
            .send()
            .await?;
        let meta: SpreadsheetMeta = Self::parse(resp).await?;

        meta.sheets
            .into_iter()
            .map(|sheet| sheet.properties)
            .find(|properties| properties.title == self.config.sheet_name)
            .map(|properties| properties.sheet_id)
            .ok_or_else(|| SinkError::SheetNotFound(self.config.sheet_name.clone()))
    }

    /// Current cell grid of the worksheet, as rendered strings.
    async fn read_grid(&self) -> Result<Vec<Vec<String>>> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|err| SinkError::Write(format!("invalid base URL: {err}")))?;
        url.path_segments_mut()
            .map_err(|()| SinkError::Write("invalid base URL".to_string()))?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.config.spreadsheet_id.as_str(),
                "values",
                self.config.sheet_name.as_str(),
            ]);
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.config.access_token)
            .send()
            .await?;
        let grid: ValueGrid = Self::parse(resp).await?;
        Ok(grid.values)
    }

    async fn apply(&self, body: &BatchUpdateBody) -> Result<()> {
        let url = format!(
            "{}/v4/spreadsheets/{}:batchUpdate",
            self.config.base_url, self.config.spreadsheet_id
        );
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.config.access_token)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SinkError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    /// Append the record as one row after the last occupied row.
    pub async fn append(
        &self,
        record: &NormalizedInvoiceRecord,
        mapping: &ColumnMapping,
    ) -> Result<WriteOutcome> {
        let planned = plan_writes(record, mapping);
        if planned.is_empty() {
            info!("No mapped values to write");
            return Ok(WriteOutcome::NoOp);
        }

        let sheet_id = self.locate_sheet().await?;
        let grid = self.read_grid().await?;
        let row = next_free_row(&grid);
        debug!(row, sheet_id, "Appending after last occupied row");

        let writes: Vec<CellWrite> = planned
            .into_iter()
            .map(|(column, value)| CellWrite { row, column, value })
            .collect();
        let cells = writes.len();
        self.apply(&batch_body(sheet_id, &writes)).await?;

        info!(row, cells, sheet = %self.config.sheet_name, "Row appended");
        Ok(WriteOutcome::Appended { row, cells })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::fields;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_record() -> NormalizedInvoiceRecord {
        let mut record = NormalizedInvoiceRecord::new();
        record.set(fields::INVOICE_NUMBER, "FV/01/2024".to_string());
        record.set(fields::ISSUE_DATE, "2024-01-15".to_string());
        record.set(fields::TOTAL_AMOUNT, "1230.00".to_string());
        record.set(fields::CURRENCY, "PLN".to_string());
        record
    }

    fn mapping(pairs: &[(&str, &str)]) -> ColumnMapping {
        pairs
            .iter()
            .map(|(field, letter)| (field.to_string(), letter.to_string()))
            .collect()
    }

    #[test]
    fn test_plan_skips_blank_and_invalid_columns() {
        let record = sample_record();
        let columns = mapping(&[
            (fields::INVOICE_NUMBER, "A"),
            (fields::ISSUE_DATE, ""),
            (fields::TOTAL_AMOUNT, "A1"),
            (fields::CURRENCY, "J"),
        ]);

        let planned = plan_writes(&record, &columns);
        assert_eq!(
            planned,
            vec![
                (9, CellValue::Text("PLN".to_string())),
                (0, CellValue::Text("FV/01/2024".to_string())),
            ]
        );
    }

    #[test]
    fn test_plan_skips_empty_values() {
        let mut record = sample_record();
        record.set(fields::CURRENCY, String::new());
        let columns = mapping(&[(fields::CURRENCY, "J"), (fields::ISSUE_DATE, "B")]);

        let planned = plan_writes(&record, &columns);
        assert_eq!(planned, vec![(1, CellValue::Date { serial: 45306 })]);
    }

    #[test]
    fn test_plan_keeps_duplicate_columns_in_field_order() {
        let record = sample_record();
        let columns = mapping(&[(fields::INVOICE_NUMBER, "A"), (fields::CURRENCY, "A")]);

        // Both writes stay in the batch; the later one lands last and wins.
        let planned = plan_writes(&record, &columns);
        assert_eq!(
            planned,
            vec![
                (0, CellValue::Text("PLN".to_string())),
                (0, CellValue::Text("FV/01/2024".to_string())),
            ]
        );
    }

    #[test]
    fn test_empty_plan_means_noop() {
        let record = NormalizedInvoiceRecord::new();
        let columns = mapping(&[(fields::INVOICE_NUMBER, "A")]);
        assert!(plan_writes(&record, &columns).is_empty());
    }

    #[test]
    fn test_batch_body_wire_shape() {
        let writes = vec![
            CellWrite {
                row: 7,
                column: 0,
                value: CellValue::Text("FV/01/2024".to_string()),
            },
            CellWrite {
                row: 7,
                column: 8,
                value: classify("1230.00"),
            },
            CellWrite {
                row: 7,
                column: 1,
                value: classify("2024-01-15"),
            },
        ];

        let body = serde_json::to_value(batch_body(31337, &writes)).unwrap();
        assert_eq!(
            body,
            json!({
                "requests": [
                    {
                        "updateCells": {
                            "start": { "sheetId": 31337, "rowIndex": 6, "columnIndex": 0 },
                            "rows": [ { "values": [
                                { "userEnteredValue": { "stringValue": "FV/01/2024" } }
                            ] } ],
                            "fields": "userEnteredValue"
                        }
                    },
                    {
                        "updateCells": {
                            "start": { "sheetId": 31337, "rowIndex": 6, "columnIndex": 8 },
                            "rows": [ { "values": [
                                {
                                    "userEnteredValue": { "numberValue": 1230.0 },
                                    "userEnteredFormat": {
                                        "numberFormat": { "type": "NUMBER", "pattern": "0.00" }
                                    }
                                }
                            ] } ],
                            "fields": "userEnteredValue,userEnteredFormat.numberFormat"
                        }
                    },
                    {
                        "updateCells": {
                            "start": { "sheetId": 31337, "rowIndex": 6, "columnIndex": 1 },
                            "rows": [ { "values": [
                                {
                                    "userEnteredValue": { "numberValue": 45306.0 },
                                    "userEnteredFormat": {
                                        "numberFormat": { "type": "DATE", "pattern": "yyyy-mm-dd" }
                                    }
                                }
                            ] } ],
                            "fields": "userEnteredValue,userEnteredFormat.numberFormat"
                        }
                    }
                ]
            })
        );
    }

    #[test]
    fn test_sheet_metadata_deserializes() {
        let meta: SpreadsheetMeta = serde_json::from_value(json!({
            "sheets": [
                { "properties": { "sheetId": 0, "title": "Invoices", "index": 0 } },
                { "properties": { "sheetId": 1203, "title": "Archive" } }
            ]
        }))
        .unwrap();
        assert_eq!(meta.sheets.len(), 2);
        assert_eq!(meta.sheets[0].properties.title, "Invoices");
        assert_eq!(meta.sheets[1].properties.sheet_id, 1203);
    }
}

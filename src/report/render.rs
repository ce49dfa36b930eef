//! Renderers turning a [`DiffResult`] into output for one surface.
//!
//! - [`JsonRenderer`]: the full result as JSON.
//! - [`StatusRenderer`]: a small status payload carrying the summary.
//! - [`TableRenderer`]: flat `Data_Loss` / `Value_Differences` / `Summary` tables, each writable
//!   as CSV. The xlsx renderer writes the same tables as worksheets.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CompareResult;
use crate::types::{Record, Value};

use super::{DiffResult, Summary};

pub const DATA_LOSS_SHEET: &str = "Data_Loss";
pub const VALUE_DIFFERENCES_SHEET: &str = "Value_Differences";
pub const SUMMARY_SHEET: &str = "Summary";

/// Render one [`DiffResult`] for one output surface.
pub trait Renderer {
    type Output;

    fn render(&self, result: &DiffResult) -> CompareResult<Self::Output>;
}

/// Full result as a JSON document.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer {
    pub pretty: bool,
}

impl Renderer for JsonRenderer {
    type Output = String;

    fn render(&self, result: &DiffResult) -> CompareResult<String> {
        let out = if self.pretty {
            serde_json::to_string_pretty(result)?
        } else {
            serde_json::to_string(result)?
        };
        Ok(out)
    }
}

/// Status payload returned to API callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPayload {
    /// Always `"success"`; failures never produce a payload.
    pub status: String,
    /// No missing records and no value differences.
    pub clean: bool,
    pub summary: Summary,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatusRenderer;

impl Renderer for StatusRenderer {
    type Output = StatusPayload;

    fn render(&self, result: &DiffResult) -> CompareResult<StatusPayload> {
        Ok(StatusPayload {
            status: "success".to_string(),
            clean: result.is_clean(),
            summary: result.summary().clone(),
        })
    }
}

/// A named table with a header row.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub headers: Vec<String>,
    /// Each row has exactly `headers.len()` cells.
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table from rows of named cells. Columns are the union of all names in first-seen
    /// order; a row without a column gets [`Value::Null`] there.
    pub fn from_records(name: impl Into<String>, records: &[Record]) -> Self {
        let mut headers: Vec<String> = Vec::new();
        for record in records {
            for field in record.field_names() {
                if !headers.iter().any(|h| h == field) {
                    headers.push(field.to_string());
                }
            }
        }
        let rows = records
            .iter()
            .map(|r| {
                headers
                    .iter()
                    .map(|h| r.get(h).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// Cell at `row` under `header`.
    pub fn cell(&self, row: usize, header: &str) -> Option<&Value> {
        let col = self.headers.iter().position(|h| h == header)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Write as CSV with a header row. Null cells are written empty.
    pub fn write_csv<W: Write>(&self, writer: W) -> CompareResult<()> {
        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|v| v.to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// The tables of one report, in sheet order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportTables {
    pub tables: Vec<Table>,
}

impl ReportTables {
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    /// Write every table to `<dir>/<name>.csv`.
    pub fn write_csv_dir(&self, dir: impl AsRef<Path>) -> CompareResult<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        for table in &self.tables {
            table.write_csv(File::create(dir.join(format!("{}.csv", table.name)))?)?;
        }
        Ok(())
    }
}

/// Flattens a result into spreadsheet-style tables.
///
/// `Data_Loss` and `Value_Differences` are only present when they have rows; `Summary` always is.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableRenderer;

impl TableRenderer {
    fn data_loss(result: &DiffResult) -> Option<Table> {
        if result.missing_records().is_empty() {
            return None;
        }
        let rows: Vec<Record> = result
            .missing_records()
            .iter()
            .map(|m| {
                let mut row = prefixed("Key_", &m.key);
                extend_prefixed(&mut row, "Source_", &m.source);
                row.insert("Reason", m.reason.as_str());
                row
            })
            .collect();
        Some(Table::from_records(DATA_LOSS_SHEET, &rows))
    }

    fn value_differences(result: &DiffResult) -> Option<Table> {
        if result.value_differences().is_empty() {
            return None;
        }
        let rows: Vec<Record> = result
            .value_differences()
            .iter()
            .map(|vd| {
                let mut row = prefixed("Key_", &vd.key);
                extend_prefixed(&mut row, "Source_", &vd.source);
                extend_prefixed(&mut row, "Target_", &vd.target);
                for d in &vd.differences {
                    let f = &d.source_field;
                    row.insert(format!("Diff_{f}_Source"), d.source_value.clone());
                    row.insert(format!("Diff_{f}_Target"), d.target_value.clone());
                    row.insert(format!("Diff_{f}_TargetField"), d.target_field.as_str());
                }
                row
            })
            .collect();
        Some(Table::from_records(VALUE_DIFFERENCES_SHEET, &rows))
    }

    fn summary(summary: &Summary) -> Table {
        let count = |n: usize| Value::Int64(i64::try_from(n).unwrap_or(i64::MAX));
        let mut rows: Vec<(String, Value)> = vec![
            ("source_total_records".into(), count(summary.source_total_records)),
            ("target_total_records".into(), count(summary.target_total_records)),
            ("source_indexed_records".into(), count(summary.source_indexed_records)),
            ("target_indexed_records".into(), count(summary.target_indexed_records)),
            ("data_loss_count".into(), count(summary.data_loss_count)),
            ("value_diff_count".into(), count(summary.value_diff_count)),
            ("matching_records".into(), count(summary.matching_records)),
            ("target_only_count".into(), count(summary.target_only_count)),
        ];
        for (source, target) in summary.field_mapping.iter() {
            rows.push((format!("Field_Mapping_{source}"), Value::text(target)));
        }
        for key in &summary.key_fields {
            rows.push((format!("Key_Field_{key}"), Value::text("Yes")));
        }
        for skipped in &summary.skipped_mappings {
            rows.push((
                format!("Skipped_Mapping_{}", skipped.source_field),
                Value::text(format!("{} (not in {})", skipped.target_field, skipped.missing_from)),
            ));
        }

        Table {
            name: SUMMARY_SHEET.to_string(),
            headers: vec!["Metric".to_string(), "Value".to_string()],
            rows: rows
                .into_iter()
                .map(|(metric, value)| vec![Value::Utf8(metric), value])
                .collect(),
        }
    }
}

fn prefixed(prefix: &str, record: &Record) -> Record {
    let mut out = Record::new();
    extend_prefixed(&mut out, prefix, record);
    out
}

fn extend_prefixed(out: &mut Record, prefix: &str, record: &Record) {
    for (name, value) in record.iter() {
        out.insert(format!("{prefix}{name}"), value.clone());
    }
}

impl Renderer for TableRenderer {
    type Output = ReportTables;

    fn render(&self, result: &DiffResult) -> CompareResult<ReportTables> {
        let mut tables = Vec::with_capacity(3);
        tables.extend(Self::data_loss(result));
        tables.extend(Self::value_differences(result));
        tables.push(Self::summary(result.summary()));
        Ok(ReportTables { tables })
    }
}

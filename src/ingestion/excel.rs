#![cfg(feature = "excel")]

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};

use crate::error::{CompareError, CompareResult};
use crate::types::{Dataset, Schema, Value};

/// Load one sheet of an Excel document (`.xlsx`, `.xls`, `.ods`, etc.) into a [`Dataset`].
///
/// Behavior:
/// - Picks `sheet_name` if provided; otherwise uses the first sheet in the workbook
/// - Detects the first non-empty row as the header row
/// - Header cells must be non-empty and unique
/// - Empty cells become [`Value::Null`]; numbers, booleans and text keep their cell type
pub fn load_excel_from_path(path: impl AsRef<Path>, sheet_name: Option<&str>) -> CompareResult<Dataset> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet = match sheet_name {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| CompareError::format(None, "workbook has no sheets"))?,
    };

    let range = workbook.worksheet_range(&sheet)?;
    load_sheet_range(&sheet, &range)
}

fn load_sheet_range(sheet: &str, range: &calamine::Range<Data>) -> CompareResult<Dataset> {
    let (header_row_idx, columns) = read_header(sheet, range)?;

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (idx0, row) in range.rows().enumerate() {
        if idx0 <= header_row_idx {
            continue;
        }
        let out_row = (0..columns.len())
            .map(|i| convert_cell(row.get(i).unwrap_or(&Data::Empty)))
            .collect();
        rows.push(out_row);
    }

    Ok(Dataset::new(Schema::new(columns), rows))
}

fn read_header(sheet: &str, range: &calamine::Range<Data>) -> CompareResult<(usize, Vec<String>)> {
    let (header_row_idx, cells) = range
        .rows()
        .enumerate()
        .find(|(_, row)| row.iter().any(|c| !matches!(c, Data::Empty)))
        .ok_or_else(|| CompareError::format(None, format!("sheet '{sheet}' has no header row")))?;

    // Report 1-based row number (Excel-like).
    let user_row = header_row_idx + 1;

    let mut columns: Vec<String> = Vec::with_capacity(cells.len());
    for (i, cell) in cells.iter().enumerate() {
        let name = cell_to_string(cell);
        if name.is_empty() {
            return Err(CompareError::format(
                Some(user_row),
                format!("sheet '{sheet}': header cell {} is empty", i + 1),
            ));
        }
        if columns.contains(&name) {
            return Err(CompareError::format(
                Some(user_row),
                format!("sheet '{sheet}': duplicate column '{name}' in header"),
            ));
        }
        columns.push(name);
    }

    Ok((header_row_idx, columns))
}

fn cell_to_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Empty => String::new(),
        _ => convert_cell(c).to_string(),
    }
}

/// Workbooks store every number as a float; whole numbers read back as integers so `30` in a
/// sheet matches `30` in a CSV.
fn float_cell(f: f64) -> Value {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0; // 2^63
    if f.is_finite() && f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f) {
        Value::Int64(f as i64)
    } else {
        Value::Float64(f)
    }
}

fn convert_cell(c: &Data) -> Value {
    match c {
        Data::Empty => Value::Null,
        Data::String(s) => Value::Utf8(s.clone()),
        Data::Int(i) => Value::Int64(*i),
        Data::Float(f) => float_cell(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(d) => Value::Utf8(d.to_string()),
        Data::DateTimeIso(s) => Value::Utf8(s.clone()),
        Data::DurationIso(s) => Value::Utf8(s.clone()),
        Data::Error(e) => Value::Utf8(format!("{e:?}")),
    }
}

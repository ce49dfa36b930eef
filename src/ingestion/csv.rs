//! CSV loading implementation.
//!
//! Values are kept as raw text: no trimming and no numeric coercion. The only normalization is
//! deciding which raw cells become [`Value::Null`] (see [`CsvOptions`]).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{CompareError, CompareResult};
use crate::types::{Dataset, Schema, Value};

/// Options controlling how delimited text is parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    /// Field delimiter byte (`b','` for CSV, `b'\t'` for TSV).
    pub delimiter: u8,
    /// Treat an empty cell as [`Value::Null`] rather than an empty string.
    pub empty_as_null: bool,
    /// Additional raw cell texts (exact match) read as [`Value::Null`], e.g. `"NULL"`.
    pub null_tokens: Vec<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            empty_as_null: true,
            null_tokens: Vec::new(),
        }
    }
}

impl CsvOptions {
    /// Tab-separated defaults.
    pub fn tsv() -> Self {
        Self {
            delimiter: b'\t',
            ..Self::default()
        }
    }

    fn to_value(&self, raw: &str) -> Value {
        if (self.empty_as_null && raw.is_empty()) || self.null_tokens.iter().any(|t| t == raw) {
            Value::Null
        } else {
            Value::Utf8(raw.to_owned())
        }
    }
}

/// Load a CSV file into an in-memory [`Dataset`].
///
/// Rules:
///
/// - The first row is the header and must be present.
/// - Header names must be unique (case- and whitespace-sensitive).
/// - Every data row must have exactly as many fields as the header.
pub fn load_csv_from_path(path: impl AsRef<Path>, options: &CsvOptions) -> CompareResult<Dataset> {
    let file = File::open(path)?;
    load_csv_from_reader(file, options)
}

/// Load CSV text held in memory.
pub fn load_csv_from_str(input: &str, options: &CsvOptions) -> CompareResult<Dataset> {
    load_csv_from_reader(input.as_bytes(), options)
}

/// Load CSV data from any byte reader (an upload body, a file, ...).
pub fn load_csv_from_reader<R: Read>(reader: R, options: &CsvOptions) -> CompareResult<Dataset> {
    let rows = CsvRows::new(reader, options)?;
    let schema = rows.schema().clone();
    let rows = rows.collect::<CompareResult<Vec<_>>>()?;
    Ok(Dataset::new(schema, rows))
}

/// Row-at-a-time CSV reader.
///
/// The header is parsed and validated on construction; each iteration yields one data row in
/// schema order. Use this with [`crate::index::index_rows`] to index large inputs without
/// materializing a [`Dataset`] first.
pub struct CsvRows<R> {
    rdr: csv::Reader<R>,
    schema: Schema,
    options: CsvOptions,
    record: csv::StringRecord,
    rows_read: usize,
    done: bool,
}

impl<R: Read> CsvRows<R> {
    /// Read and validate the header row.
    pub fn new(reader: R, options: &CsvOptions) -> CompareResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(options.delimiter)
            // Field counts are checked here so ragged rows surface as format errors with a row.
            .flexible(true)
            .from_reader(reader);

        let headers = rdr.headers().map_err(|e| read_error(e, 1))?.clone();
        if headers.is_empty() {
            return Err(CompareError::format(Some(1), "input has no header row"));
        }

        let mut columns: Vec<String> = Vec::with_capacity(headers.len());
        for h in headers.iter() {
            if columns.iter().any(|c| c == h) {
                return Err(CompareError::format(
                    Some(1),
                    format!("duplicate column '{h}' in header. headers={:?}", headers.iter().collect::<Vec<_>>()),
                ));
            }
            columns.push(h.to_owned());
        }

        Ok(Self {
            rdr,
            schema: Schema::new(columns),
            options: options.clone(),
            record: csv::StringRecord::new(),
            rows_read: 0,
            done: false,
        })
    }

    /// Columns from the header row.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Number of data rows yielded so far.
    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    fn next_row(&mut self) -> CompareResult<Option<Vec<Value>>> {
        let next_row = self.rows_read + 2;
        if !self
            .rdr
            .read_record(&mut self.record)
            .map_err(|e| read_error(e, next_row))?
        {
            return Ok(None);
        }

        // Record numbers, not lines: a quoted field may span several lines.
        let user_row = self.record.position().map_or(next_row, record_row);

        if self.record.len() != self.schema.len() {
            return Err(CompareError::format(
                Some(user_row),
                format!(
                    "row has {} fields but the header has {}",
                    self.record.len(),
                    self.schema.len()
                ),
            ));
        }

        self.rows_read += 1;
        Ok(Some(self.record.iter().map(|raw| self.options.to_value(raw)).collect()))
    }
}

/// 1-based row of a record, the header being row 1.
fn record_row(pos: &csv::Position) -> usize {
    usize::try_from(pos.record()).map_or(usize::MAX, |r| r.saturating_add(1))
}

/// Invalid UTF-8 is malformed input and reported with its row; other reader errors pass through.
fn read_error(err: csv::Error, fallback_row: usize) -> CompareError {
    if let csv::ErrorKind::Utf8 { pos, err: utf8 } = err.kind() {
        let row = pos.as_ref().map_or(fallback_row, record_row);
        return CompareError::format(Some(row), format!("field {} is not valid utf-8", utf8.field() + 1));
    }
    err.into()
}

impl<R: Read> Iterator for CsvRows<R> {
    type Item = CompareResult<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

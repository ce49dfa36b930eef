//! Key-indexed views of a dataset.
//!
//! A [`KeyedView`] maps each [`RecordKey`] to one row. Entries iterate in the order their key
//! was first seen, so everything derived from a view is reproducible for identical input order.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use serde::{Deserialize, Serialize};

use crate::error::{CompareError, CompareResult};
use crate::types::{Dataset, Record, RecordKey, Schema, Side, Value};

/// What to do when two rows of one dataset share a record key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateKeyPolicy {
    /// Fail with [`CompareError::DuplicateKey`].
    Error,
    /// Keep the earliest row.
    KeepFirst,
    /// Keep the latest row (the key keeps its first-seen position).
    #[default]
    KeepLast,
}

/// Options for [`index`] / [`index_rows`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexOptions {
    /// Side label used in errors.
    pub side: Side,
    pub duplicates: DuplicateKeyPolicy,
}

impl IndexOptions {
    pub fn new(side: Side, duplicates: DuplicateKeyPolicy) -> Self {
        Self { side, duplicates }
    }
}

/// In-memory index from record key to row.
#[derive(Debug, Clone)]
pub struct KeyedView {
    side: Side,
    schema: Schema,
    key_columns: Vec<String>,
    keys: Vec<RecordKey>,
    rows: Vec<Vec<Value>>,
    positions: HashMap<RecordKey, usize>,
    raw_row_count: usize,
    duplicate_rows: usize,
}

impl KeyedView {
    pub fn side(&self) -> Side {
        self.side
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Key columns as named in this dataset.
    pub fn key_columns(&self) -> &[String] {
        &self.key_columns
    }

    /// Number of distinct keys (rows after collisions were resolved).
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Number of rows read, before collisions were resolved.
    pub fn raw_row_count(&self) -> usize {
        self.raw_row_count
    }

    /// Rows that collided with an earlier key.
    pub fn duplicate_rows(&self) -> usize {
        self.duplicate_rows
    }

    pub fn contains(&self, key: &RecordKey) -> bool {
        self.positions.contains_key(key)
    }

    pub fn get(&self, key: &RecordKey) -> Option<&[Value]> {
        self.positions.get(key).map(|&i| self.rows[i].as_slice())
    }

    /// Value of `column` in the row indexed under `key`.
    pub fn value(&self, key: &RecordKey, column: &str) -> Option<&Value> {
        let idx = self.schema.index_of(column)?;
        self.get(key).and_then(|row| row.get(idx))
    }

    /// Row under `key` as a named [`Record`].
    pub fn record(&self, key: &RecordKey) -> Option<Record> {
        self.get(key).map(|row| Record::from_row(&self.schema, row))
    }

    /// Entries in first-seen key order.
    pub fn iter(&self) -> impl Iterator<Item = (&RecordKey, &[Value])> {
        self.keys.iter().zip(self.rows.iter().map(Vec::as_slice))
    }

    pub fn keys(&self) -> impl Iterator<Item = &RecordKey> {
        self.keys.iter()
    }
}

/// Index a loaded dataset by `key_columns` (names in this dataset's schema).
pub fn index(dataset: &Dataset, key_columns: &[String], options: &IndexOptions) -> CompareResult<KeyedView> {
    index_rows(
        dataset.schema.clone(),
        dataset.rows.iter().cloned().map(Ok),
        key_columns,
        options,
    )
}

/// Index rows as they are produced, e.g. from [`crate::ingestion::CsvRows`].
///
/// Fails with [`CompareError::KeyFieldMissing`] before reading any row if a key column is not in
/// `schema`.
pub fn index_rows<I>(
    schema: Schema,
    rows: I,
    key_columns: &[String],
    options: &IndexOptions,
) -> CompareResult<KeyedView>
where
    I: IntoIterator<Item = CompareResult<Vec<Value>>>,
{
    if key_columns.is_empty() {
        return Err(CompareError::config("at least one key field is required"));
    }

    let key_idxs = key_columns
        .iter()
        .map(|k| {
            schema.index_of(k).ok_or_else(|| CompareError::KeyFieldMissing {
                side: options.side,
                field: k.clone(),
                available: schema.columns().to_vec(),
            })
        })
        .collect::<CompareResult<Vec<usize>>>()?;

    let mut view = KeyedView {
        side: options.side,
        schema,
        key_columns: key_columns.to_vec(),
        keys: Vec::new(),
        rows: Vec::new(),
        positions: HashMap::new(),
        raw_row_count: 0,
        duplicate_rows: 0,
    };
    // File-style row numbers (header is row 1) of the row kept per entry.
    let mut row_numbers: Vec<usize> = Vec::new();

    for (idx0, row) in rows.into_iter().enumerate() {
        let row = row?;
        let user_row = idx0 + 2;
        view.raw_row_count += 1;

        let key = RecordKey::new(
            key_idxs
                .iter()
                .map(|&i| row.get(i).cloned().unwrap_or(Value::Null))
                .collect(),
        );

        match view.positions.entry(key) {
            Entry::Vacant(slot) => {
                view.keys.push(slot.key().clone());
                slot.insert(view.rows.len());
                view.rows.push(row);
                row_numbers.push(user_row);
            }
            Entry::Occupied(slot) => {
                let pos = *slot.get();
                view.duplicate_rows += 1;
                match options.duplicates {
                    DuplicateKeyPolicy::Error => {
                        return Err(CompareError::DuplicateKey {
                            side: options.side,
                            key: slot.key().to_string(),
                            first_row: row_numbers[pos],
                            row: user_row,
                        });
                    }
                    DuplicateKeyPolicy::KeepFirst => {}
                    DuplicateKeyPolicy::KeepLast => {
                        view.rows[pos] = row;
                        row_numbers[pos] = user_row;
                    }
                }
            }
        }
    }

    tracing::debug!(
        side = %view.side,
        rows = view.raw_row_count,
        indexed = view.len(),
        duplicates = view.duplicate_rows,
        "indexed dataset"
    );

    Ok(view)
}

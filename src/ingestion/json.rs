//! JSON loading implementation.
//!
//! Supported inputs:
//! - A JSON array of objects: `[{"a":1}, {"a":2}]`
//! - A single JSON object
//! - Newline-delimited JSON (NDJSON): `{"a":1}\n{"a":2}\n`
//!
//! Columns are the union of object keys in first-seen order. A key absent from one object reads
//! as [`Value::Null`] for that row. Scalars keep their JSON type; nested arrays/objects are
//! rejected.

use std::fs;
use std::path::Path;

use crate::error::{CompareError, CompareResult};
use crate::types::{Dataset, Schema, Value};

/// Load a JSON / NDJSON file into an in-memory [`Dataset`].
pub fn load_json_from_path(path: impl AsRef<Path>) -> CompareResult<Dataset> {
    let text = fs::read_to_string(path)?;
    load_json_from_str(&text)
}

/// Load JSON from an in-memory string into a [`Dataset`].
pub fn load_json_from_str(input: &str) -> CompareResult<Dataset> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CompareError::format(None, "json input is empty"));
    }

    // First try parsing as a single JSON value (array or object).
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(trimmed) {
        match v {
            serde_json::Value::Array(items) => load_json_values(&items),
            serde_json::Value::Object(_) => load_json_values(std::slice::from_ref(&v)),
            _ => Err(CompareError::format(
                None,
                "json must be an object, an array of objects, or NDJSON",
            )),
        }
    } else {
        // Fall back to NDJSON.
        let mut values = Vec::new();
        for (i, line) in trimmed.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let v = serde_json::from_str::<serde_json::Value>(line)
                .map_err(|e| CompareError::format(Some(i + 1), format!("invalid ndjson: {e}")))?;
            values.push(v);
        }
        load_json_values(&values)
    }
}

fn load_json_values(values: &[serde_json::Value]) -> CompareResult<Dataset> {
    let mut columns: Vec<String> = Vec::new();
    let mut objects = Vec::with_capacity(values.len());

    for (idx0, v) in values.iter().enumerate() {
        let obj = v
            .as_object()
            .ok_or_else(|| CompareError::format(Some(idx0 + 1), "record is not a json object"))?;
        for key in obj.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
        objects.push(obj);
    }

    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(objects.len());
    for (idx0, obj) in objects.into_iter().enumerate() {
        let mut row = Vec::with_capacity(columns.len());
        for column in &columns {
            let value = match obj.get(column) {
                Some(jv) => convert_json_value(idx0 + 1, column, jv)?,
                None => Value::Null,
            };
            row.push(value);
        }
        rows.push(row);
    }

    Ok(Dataset::new(Schema::new(columns), rows))
}

fn convert_json_value(row: usize, column: &str, v: &serde_json::Value) -> CompareResult<Value> {
    match v {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_json::Value::String(s) => Ok(Value::Utf8(s.clone())),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Int64(i))
            } else if n.is_u64() {
                // Out of i64 range: keep the exact digits rather than lose precision.
                Ok(Value::Utf8(n.to_string()))
            } else {
                Ok(n.as_f64().map(Value::Float64).unwrap_or(Value::Null))
            }
        }
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => Err(CompareError::format(
            Some(row),
            format!("column '{column}' holds a nested value; only scalars can be compared"),
        )),
    }
}

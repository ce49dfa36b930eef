//! The persisted default mapping table.
//!
//! On disk this is a CSV with the header `source1,source2,desc,is_key`:
//!
//! ```text
//! source1,source2,desc,is_key
//! id,user_id,primary identifier,yes
//! name,full_name,,no
//! ```
//!
//! `is_key` is read case-insensitively: `yes` marks a key row, anything else does not.
//! `desc` is free text for people editing the table; comparisons ignore it.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CompareResult;

use super::FieldMapping;

const HEADER: [&str; 4] = ["source1", "source2", "desc", "is_key"];

/// One row of the mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRow {
    /// Source column.
    pub source1: String,
    /// Target column.
    #[serde(default)]
    pub source2: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default, deserialize_with = "deserialize_yes", serialize_with = "serialize_yes")]
    pub is_key: bool,
}

impl MappingRow {
    pub fn new(
        source1: impl Into<String>,
        source2: impl Into<String>,
        desc: impl Into<String>,
        is_key: bool,
    ) -> Self {
        Self {
            source1: source1.into(),
            source2: source2.into(),
            desc: desc.into(),
            is_key,
        }
    }
}

fn deserialize_yes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.is_some_and(|s| s.eq_ignore_ascii_case("yes")))
}

fn serialize_yes<S: Serializer>(is_key: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *is_key { "yes" } else { "no" })
}

/// Target column plus its description, as shown to people editing the mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingEntry {
    pub target: String,
    pub desc: String,
}

/// Read-only view of a [`MappingConfig`]: `{"field_mapping": {src: {target, desc}}, "key_fields": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingView {
    #[serde(serialize_with = "serialize_entries")]
    pub field_mapping: Vec<(String, MappingEntry)>,
    pub key_fields: Vec<String>,
}

fn serialize_entries<S: Serializer>(
    entries: &[(String, MappingEntry)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (source, entry) in entries {
        map.serialize_entry(source, entry)?;
    }
    map.end()
}

/// The full mapping table, rows in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingConfig {
    rows: Vec<MappingRow>,
}

impl MappingConfig {
    pub fn new(rows: Vec<MappingRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[MappingRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Parse a mapping table. `source1` is required; `source2`, `desc` and `is_key` default to
    /// empty / `no` when the column is absent.
    pub fn from_reader<R: Read>(reader: R) -> CompareResult<Self> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let rows = rdr
            .deserialize::<MappingRow>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rows })
    }

    pub fn from_path(path: impl AsRef<Path>) -> CompareResult<Self> {
        Self::from_reader(File::open(path)?)
    }

    /// Write the table, header included even when there are no rows.
    pub fn to_writer<W: Write>(&self, writer: W) -> CompareResult<()> {
        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
        wtr.write_record(HEADER)?;
        for row in &self.rows {
            wtr.write_record([
                row.source1.as_str(),
                row.source2.as_str(),
                row.desc.as_str(),
                if row.is_key { "yes" } else { "no" },
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_path(&self, path: impl AsRef<Path>) -> CompareResult<()> {
        self.to_writer(File::create(path)?)
    }

    /// `source1 → source2` for every row naming both columns. A repeated `source1` keeps the
    /// later target.
    pub fn field_mapping(&self) -> FieldMapping {
        self.rows
            .iter()
            .filter(|r| !r.source1.is_empty() && !r.source2.is_empty())
            .map(|r| (r.source1.as_str(), r.source2.as_str()))
            .collect()
    }

    /// `source1` of every key row, in file order.
    pub fn key_fields(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for row in self.rows.iter().filter(|r| r.is_key && !r.source1.is_empty()) {
            if !keys.contains(&row.source1) {
                keys.push(row.source1.clone());
            }
        }
        keys
    }

    pub fn view(&self) -> MappingView {
        let mut field_mapping: Vec<(String, MappingEntry)> = Vec::new();
        for row in &self.rows {
            let entry = MappingEntry {
                target: row.source2.clone(),
                desc: row.desc.clone(),
            };
            match field_mapping.iter_mut().find(|(s, _)| *s == row.source1) {
                Some(slot) => slot.1 = entry,
                None => field_mapping.push((row.source1.clone(), entry)),
            }
        }
        MappingView {
            field_mapping,
            key_fields: self.key_fields(),
        }
    }

    /// Merge an edit into the table.
    ///
    /// - Existing rows keep their `desc`; their target is replaced when `field_mapping` names
    ///   their source.
    /// - `is_key` is recomputed for every row from `key_fields`.
    /// - Sources in `field_mapping` without a row are appended with an empty `desc`.
    pub fn apply_update(&mut self, field_mapping: &FieldMapping, key_fields: &[String]) {
        for row in &mut self.rows {
            if let Some(target) = field_mapping.target_for(&row.source1) {
                row.source2 = target.to_string();
            }
            row.is_key = key_fields.contains(&row.source1);
        }

        for (source, target) in field_mapping.iter() {
            if !self.rows.iter().any(|r| r.source1 == source) {
                self.rows.push(MappingRow::new(
                    source,
                    target,
                    "",
                    key_fields.iter().any(|k| k == source),
                ));
            }
        }
    }
}

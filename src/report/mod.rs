//! Comparison results.
//!
//! [`DiffResult`] is plain data: it is built once by [`crate::diff::diff`] and then only read.
//! Everything serializes with serde; records come out as JSON objects in column order and
//! [`Value::Null`] as JSON `null`. Turning a result into something a person looks at is the job
//! of a [`Renderer`].

pub mod render;
#[cfg(feature = "xlsx")]
pub mod xlsx;

use serde::{Deserialize, Serialize};

use crate::mapping::FieldMapping;
use crate::types::{Record, Side, Value};

pub use render::{JsonRenderer, Renderer, ReportTables, StatusRenderer, Table, TableRenderer};
#[cfg(feature = "xlsx")]
pub use xlsx::XlsxRenderer;

/// Reason attached to every [`MissingRecord`].
pub const MISSING_IN_TARGET: &str = "Record exists in source but not in target";

/// A source record whose key does not occur in the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingRecord {
    /// Key fields (source names) and their values.
    pub key: Record,
    /// The full source record.
    pub source: Record,
    pub reason: String,
}

/// One mapped field whose values differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDifference {
    pub source_field: String,
    pub target_field: String,
    pub source_value: Value,
    pub target_value: Value,
}

/// A key present on both sides with at least one differing field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueDifference {
    pub key: Record,
    pub source: Record,
    pub target: Record,
    /// In field-mapping order; never empty.
    pub differences: Vec<FieldDifference>,
}

impl ValueDifference {
    /// Difference for `source_field`, if that field differs.
    pub fn field(&self, source_field: &str) -> Option<&FieldDifference> {
        self.differences.iter().find(|d| d.source_field == source_field)
    }
}

/// A target record whose key does not occur in the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetOnlyRecord {
    /// Key values, named by the source key fields.
    pub key: Record,
    pub target: Record,
}

/// A field-mapping entry that was not compared because a column does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedMapping {
    pub source_field: String,
    pub target_field: String,
    /// The side whose schema lacks its column (source when both do).
    pub missing_from: Side,
}

/// Aggregate counts plus the mapping and key fields the comparison actually used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Rows read from the source, before key collisions were resolved.
    pub source_total_records: usize,
    pub target_total_records: usize,
    /// Distinct source keys; the basis for every count below.
    pub source_indexed_records: usize,
    pub target_indexed_records: usize,
    pub data_loss_count: usize,
    pub value_diff_count: usize,
    /// Common keys without any differing field.
    pub matching_records: usize,
    pub target_only_count: usize,
    /// Pairs that were applied: key pairs plus the value pairs that were compared.
    pub field_mapping: FieldMapping,
    pub key_fields: Vec<String>,
    #[serde(default)]
    pub skipped_mappings: Vec<SkippedMapping>,
}

impl Summary {
    /// Keys present on both sides.
    pub fn common_keys(&self) -> usize {
        self.matching_records + self.value_diff_count
    }
}

/// Outcome of one comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    missing_records: Vec<MissingRecord>,
    value_differences: Vec<ValueDifference>,
    #[serde(default)]
    target_only: Vec<TargetOnlyRecord>,
    summary: Summary,
}

impl DiffResult {
    pub(crate) fn new(
        missing_records: Vec<MissingRecord>,
        value_differences: Vec<ValueDifference>,
        target_only: Vec<TargetOnlyRecord>,
        summary: Summary,
    ) -> Self {
        Self {
            missing_records,
            value_differences,
            target_only,
            summary,
        }
    }

    /// Source records absent from the target, in source order.
    pub fn missing_records(&self) -> &[MissingRecord] {
        &self.missing_records
    }

    /// Common keys with differing values, in source order.
    pub fn value_differences(&self) -> &[ValueDifference] {
        &self.value_differences
    }

    /// Target records absent from the source, in target order.
    pub fn target_only(&self) -> &[TargetOnlyRecord] {
        &self.target_only
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    /// No missing records and no value differences. Target-only records do not count.
    pub fn is_clean(&self) -> bool {
        self.missing_records.is_empty() && self.value_differences.is_empty()
    }
}

//! Core data model types shared by loading, indexing and diffing.
//!
//! A [`Dataset`] is an ordered list of rows over a [`Schema`] (ordered, unique column names).
//! Cells are [`Value`]s; [`Value::Null`] is the explicit missing sentinel and is distinct from
//! `Value::Utf8(String::new())`.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Which side of a comparison a dataset belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The reference dataset (records missing elsewhere are reported from here).
    #[default]
    Source,
    /// The dataset checked against the source.
    Target,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Source => "source",
            Side::Target => "target",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single scalar cell value.
///
/// Serializes untagged: `null`, a JSON number, a JSON bool, or a JSON string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing value.
    Null,
    /// Boolean.
    Bool(bool),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// UTF-8 string, kept exactly as read.
    Utf8(String),
}

impl Value {
    /// Build a string value.
    pub fn text(s: impl Into<String>) -> Self {
        Value::Utf8(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// String representation used for equality, or `None` for [`Value::Null`].
    pub fn canonical(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Null => None,
            Value::Utf8(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Bool(b) => Some(Cow::Owned(b.to_string())),
            Value::Int64(i) => Some(Cow::Owned(i.to_string())),
            // Shortest round-trip form that keeps the fraction or exponent: `30.0`, `1e20`.
            Value::Float64(f) => Some(Cow::Owned(format!("{f:?}"))),
        }
    }

    /// Comparison equality: both null, or both non-null with identical string forms.
    ///
    /// A value that is null on exactly one side is never equivalent to anything.
    pub fn equivalent(&self, other: &Value) -> bool {
        match (self.canonical(), other.canonical()) {
            (None, None) => true,
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.canonical() {
            Some(s) => f.write_str(&s),
            None => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Utf8(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Utf8(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int64(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float64(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Ordered list of unique column names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    columns: Vec<String>,
}

impl Schema {
    /// Create a schema. Callers are responsible for uniqueness; loaders reject duplicates.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Iterate column names in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// Returns the index of a column by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// First column, used as the fallback key field.
    pub fn first(&self) -> Option<&str> {
        self.columns.first().map(String::as_str)
    }
}

/// In-memory tabular dataset.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Column names in header order.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Create a dataset from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Materialize row `idx` as a named [`Record`].
    pub fn record(&self, idx: usize) -> Option<Record> {
        self.rows.get(idx).map(|row| Record::from_row(&self.schema, row))
    }

    /// Iterate all rows as named [`Record`]s.
    pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
        self.rows.iter().map(|row| Record::from_row(&self.schema, row))
    }
}

/// Ordered mapping from column name to value.
///
/// Serializes as a JSON object whose key order follows the column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair a row with its schema. Short rows are padded with [`Value::Null`].
    pub fn from_row(schema: &Schema, row: &[Value]) -> Self {
        let fields = schema
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_owned(), row.get(i).cloned().unwrap_or(Value::Null)))
            .collect();
        Self { fields }
    }

    /// Set `name` to `value`, replacing an existing entry in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Builder-style [`Record::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = Record;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of column name to scalar value")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Record, A::Error> {
                let mut record = Record::new();
                while let Some((name, value)) = access.next_entry::<String, Value>()? {
                    record.insert(name, value);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

/// Tuple of key-field values identifying a record.
///
/// Equality and hashing follow [`Value::equivalent`]: parts compare by string form, and two
/// null parts are equal.
#[derive(Debug, Clone)]
pub struct RecordKey(Vec<Value>);

impl RecordKey {
    pub fn new(parts: Vec<Value>) -> Self {
        Self(parts)
    }

    pub fn parts(&self) -> &[Value] {
        &self.0
    }

    /// Pair each part with its key-field name.
    pub fn to_record(&self, key_fields: &[String]) -> Record {
        key_fields
            .iter()
            .zip(self.0.iter())
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

impl PartialEq for RecordKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().zip(other.0.iter()).all(|(a, b)| a.equivalent(b))
    }
}

impl Eq for RecordKey {}

impl Hash for RecordKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.len().hash(state);
        for part in &self.0 {
            part.canonical().hash(state);
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match part.canonical() {
                Some(s) => write!(f, "{s:?}")?,
                None => f.write_str("null")?,
            }
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{Dataset, Record, RecordKey, Schema, Value};

    #[test]
    fn null_is_distinct_from_empty_string() {
        assert!(Value::Null.equivalent(&Value::Null));
        assert!(!Value::Null.equivalent(&Value::text("")));
        assert!(!Value::text("").equivalent(&Value::Null));
        assert!(Value::text("").equivalent(&Value::text("")));
    }

    #[test]
    fn values_compare_by_string_form() {
        assert!(Value::Int64(10).equivalent(&Value::text("10")));
        assert!(!Value::Int64(10).equivalent(&Value::Int64(20)));
        assert!(!Value::text("Alice").equivalent(&Value::text("alice")));
        assert!(!Value::text("a ").equivalent(&Value::text("a")));
    }

    #[test]
    fn floats_keep_fraction_and_exponent_markers() {
        assert_eq!(Value::Float64(30.0).to_string(), "30.0");
        assert_eq!(Value::Float64(1e20).to_string(), "1e20");
        assert_eq!(Value::Float64(9.99).to_string(), "9.99");
        assert!(Value::Float64(30.0).equivalent(&Value::text("30.0")));
        assert!(!Value::Float64(30.0).equivalent(&Value::text("30")));
        assert!(!Value::Float64(30.0).equivalent(&Value::Int64(30)));
    }

    #[test]
    fn record_keys_hash_consistently_with_equality() {
        let a = RecordKey::new(vec![Value::Int64(1), Value::Null]);
        let b = RecordKey::new(vec![Value::text("1"), Value::Null]);
        let c = RecordKey::new(vec![Value::text("1"), Value::text("")]);

        let mut set = HashSet::new();
        set.insert(a.clone());
        assert!(set.contains(&b));
        assert!(!set.contains(&c));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "(\"1\", null)");
    }

    #[test]
    fn record_serializes_in_column_order() {
        let record = Record::new().with("z", "last").with("a", Value::Null).with("m", 3_i64);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"z":"last","a":null,"m":3}"#);

        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn dataset_records_pair_rows_with_schema() {
        let ds = Dataset::new(
            Schema::new(["id", "name"]),
            vec![vec![Value::text("1"), Value::text("Ada")]],
        );
        let record = ds.record(0).unwrap();
        assert_eq!(record.get("name"), Some(&Value::text("Ada")));
        assert_eq!(record.field_names().collect::<Vec<_>>(), vec!["id", "name"]);
        assert!(ds.record(1).is_none());
    }
}

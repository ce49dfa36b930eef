//! Field correspondence between the source and target datasets.
//!
//! A comparison run needs two things: a [`FieldMapping`] (source column → target column) and an
//! ordered list of key fields. [`resolve`] produces both from caller overrides and a persisted
//! default ([`MappingConfig`]), which is read/written through a [`MappingStore`].

pub mod config;
pub mod store;

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CompareError, CompareResult};
use crate::types::Schema;

pub use config::{MappingConfig, MappingEntry, MappingRow, MappingView};
pub use store::{DirectoryMappingStore, InMemoryMappingStore, MappingStore};

/// One source column paired with the target column it is compared against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPair {
    pub source: String,
    pub target: String,
}

/// Source column name → target column name.
///
/// Source names are unique. Insertion order carries no meaning but is kept so reports come out
/// in a stable order. Serializes as a JSON object `{"source": "target", ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapping {
    pairs: Vec<FieldPair>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each field mapped to itself.
    pub fn identity<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        fields
            .into_iter()
            .map(|f| {
                let f = f.into();
                (f.clone(), f)
            })
            .collect()
    }

    /// Map `source` to `target`. Re-mapping an existing source replaces its target in place.
    pub fn insert(&mut self, source: impl Into<String>, target: impl Into<String>) {
        let source = source.into();
        let target = target.into();
        match self.pairs.iter_mut().find(|p| p.source == source) {
            Some(pair) => pair.target = target,
            None => self.pairs.push(FieldPair { source, target }),
        }
    }

    /// Target column for `source`, if mapped.
    pub fn target_for(&self, source: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|p| p.source == source)
            .map(|p| p.target.as_str())
    }

    pub fn contains_source(&self, source: &str) -> bool {
        self.target_for(source).is_some()
    }

    pub fn pairs(&self) -> &[FieldPair] {
        &self.pairs
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|p| (p.source.as_str(), p.target.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<S: Into<String>, T: Into<String>> FromIterator<(S, T)> for FieldMapping {
    fn from_iter<I: IntoIterator<Item = (S, T)>>(iter: I) -> Self {
        let mut mapping = FieldMapping::new();
        for (s, t) in iter {
            mapping.insert(s, t);
        }
        mapping
    }
}

impl Serialize for FieldMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pairs.len()))?;
        for pair in &self.pairs {
            map.serialize_entry(&pair.source, &pair.target)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MappingVisitor;

        impl<'de> Visitor<'de> for MappingVisitor {
            type Value = FieldMapping;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of source field to target field")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FieldMapping, A::Error> {
                let mut mapping = FieldMapping::new();
                while let Some((source, target)) = access.next_entry::<String, String>()? {
                    mapping.insert(source, target);
                }
                Ok(mapping)
            }
        }

        deserializer.deserialize_map(MappingVisitor)
    }
}

/// The mapping and key fields a comparison run actually uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMapping {
    /// May be empty: the diff engine then compares the schema intersection.
    pub field_mapping: FieldMapping,
    /// Source-side key columns, never empty.
    pub key_fields: Vec<String>,
}

impl ResolvedMapping {
    /// Key columns as named in the target: the mapped target column, or the same name.
    pub fn target_key_columns(&self) -> Vec<String> {
        self.key_fields
            .iter()
            .map(|k| self.field_mapping.target_for(k).unwrap_or(k).to_string())
            .collect()
    }
}

/// Combine caller overrides with the persisted default.
///
/// - A non-empty `explicit_mapping` replaces the default mapping entirely; fields only named in
///   the default are dropped.
/// - An empty `explicit_mapping` takes the default's `source1 → source2` pairs.
/// - `explicit_keys` vs the default's `is_key` rows follow the same rule.
/// - With no key fields from either, the first source column is the key. An empty source
///   schema at that point is a [`CompareError::Config`].
pub fn resolve(
    explicit_mapping: &FieldMapping,
    explicit_keys: &[String],
    persisted_default: Option<&MappingConfig>,
    source_schema: &Schema,
) -> CompareResult<ResolvedMapping> {
    let field_mapping = if !explicit_mapping.is_empty() {
        explicit_mapping.clone()
    } else {
        persisted_default
            .map(MappingConfig::field_mapping)
            .unwrap_or_default()
    };

    let mut key_fields: Vec<String> = Vec::new();
    let candidates = if !explicit_keys.is_empty() {
        explicit_keys.to_vec()
    } else {
        persisted_default
            .map(MappingConfig::key_fields)
            .unwrap_or_default()
    };
    for key in candidates {
        if key.is_empty() {
            return Err(CompareError::config("key field names must not be empty"));
        }
        if !key_fields.contains(&key) {
            key_fields.push(key);
        }
    }

    if key_fields.is_empty() {
        let first = source_schema.first().ok_or_else(|| {
            CompareError::config("no key fields configured and the source has no columns to fall back on")
        })?;
        key_fields.push(first.to_string());
    }

    Ok(ResolvedMapping {
        field_mapping,
        key_fields,
    })
}

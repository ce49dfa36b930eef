//! The diff engine: classify keys as missing, differing or matching.

use serde::{Deserialize, Serialize};

use crate::error::{CompareError, CompareResult};
use crate::index::KeyedView;
use crate::mapping::FieldMapping;
use crate::report::{
    DiffResult, FieldDifference, MissingRecord, SkippedMapping, Summary, TargetOnlyRecord,
    ValueDifference, MISSING_IN_TARGET,
};
use crate::types::{Record, Side, Value};

static NULL: Value = Value::Null;

/// What to do with a mapping entry whose column is absent from the loaded schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnmappedFieldPolicy {
    /// Leave the field out and list it in [`Summary::skipped_mappings`].
    #[default]
    Skip,
    /// Fail with [`CompareError::Config`] before comparing anything.
    Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffOptions {
    pub unmapped_fields: UnmappedFieldPolicy,
}

/// A value pair that will be compared for every common key.
struct ComparedField<'a> {
    source_field: &'a str,
    target_field: &'a str,
    source_idx: usize,
    target_idx: usize,
}

struct Plan<'a> {
    fields: Vec<ComparedField<'a>>,
    applied: FieldMapping,
    skipped: Vec<SkippedMapping>,
}

fn plan<'a>(
    source: &'a KeyedView,
    target: &'a KeyedView,
    field_mapping: &'a FieldMapping,
    key_fields: &[String],
    options: &DiffOptions,
) -> CompareResult<Plan<'a>> {
    let is_key = |f: &str| key_fields.iter().any(|k| k == f);
    let mut fields = Vec::new();
    let mut applied = FieldMapping::new();
    let mut skipped = Vec::new();

    if field_mapping.is_empty() {
        // Same-named columns on both sides, key fields excluded.
        for (source_idx, name) in source.schema().iter().enumerate() {
            if is_key(name) {
                continue;
            }
            if let Some(target_idx) = target.schema().index_of(name) {
                applied.insert(name, name);
                fields.push(ComparedField {
                    source_field: name,
                    target_field: name,
                    source_idx,
                    target_idx,
                });
            }
        }
        return Ok(Plan {
            fields,
            applied,
            skipped,
        });
    }

    for (source_field, target_field) in field_mapping.iter() {
        if is_key(source_field) {
            // Keys are equal by construction; they only align the two views.
            applied.insert(source_field, target_field);
            continue;
        }
        let source_idx = source.schema().index_of(source_field);
        let target_idx = target.schema().index_of(target_field);
        match (source_idx, target_idx) {
            (Some(source_idx), Some(target_idx)) => {
                applied.insert(source_field, target_field);
                fields.push(ComparedField {
                    source_field,
                    target_field,
                    source_idx,
                    target_idx,
                });
            }
            (s, _) => {
                let missing_from = if s.is_none() { Side::Source } else { Side::Target };
                if options.unmapped_fields == UnmappedFieldPolicy::Error {
                    let column = match missing_from {
                        Side::Source => source_field,
                        Side::Target => target_field,
                    };
                    return Err(CompareError::config(format!(
                        "field mapping '{source_field}' -> '{target_field}': '{column}' is not a {missing_from} column"
                    )));
                }
                tracing::debug!(
                    source_field,
                    target_field,
                    missing_from = %missing_from,
                    "skipping field mapping"
                );
                skipped.push(SkippedMapping {
                    source_field: source_field.to_string(),
                    target_field: target_field.to_string(),
                    missing_from,
                });
            }
        }
    }

    Ok(Plan {
        fields,
        applied,
        skipped,
    })
}

/// Compare two keyed views.
///
/// `key_fields` are the source-side key names; they name the key values in the report and are
/// never compared as values. `field_mapping` may be empty, in which case every column present
/// under the same name on both sides (keys excluded) is compared.
///
/// Missing and differing records come out in source index order, target-only records in target
/// index order, so identical inputs always give identical results.
pub fn diff(
    source: &KeyedView,
    target: &KeyedView,
    field_mapping: &FieldMapping,
    key_fields: &[String],
    options: &DiffOptions,
) -> CompareResult<DiffResult> {
    if key_fields.is_empty() {
        return Err(CompareError::config("at least one key field is required"));
    }
    if source.key_columns().len() != key_fields.len() || target.key_columns().len() != key_fields.len() {
        return Err(CompareError::config(format!(
            "key arity mismatch: {} key fields, source indexed by {:?}, target indexed by {:?}",
            key_fields.len(),
            source.key_columns(),
            target.key_columns()
        )));
    }

    let plan = plan(source, target, field_mapping, key_fields, options)?;

    let mut missing_records = Vec::new();
    let mut value_differences = Vec::new();
    let mut common = 0usize;

    for (key, source_row) in source.iter() {
        let Some(target_row) = target.get(key) else {
            missing_records.push(MissingRecord {
                key: key.to_record(key_fields),
                source: Record::from_row(source.schema(), source_row),
                reason: MISSING_IN_TARGET.to_string(),
            });
            continue;
        };
        common += 1;

        let differences: Vec<FieldDifference> = plan
            .fields
            .iter()
            .filter_map(|f| {
                // Short rows read as null, as in `Record::from_row`.
                let sv = source_row.get(f.source_idx).unwrap_or(&NULL);
                let tv = target_row.get(f.target_idx).unwrap_or(&NULL);
                (!sv.equivalent(tv)).then(|| FieldDifference {
                    source_field: f.source_field.to_string(),
                    target_field: f.target_field.to_string(),
                    source_value: sv.clone(),
                    target_value: tv.clone(),
                })
            })
            .collect();

        if !differences.is_empty() {
            value_differences.push(ValueDifference {
                key: key.to_record(key_fields),
                source: Record::from_row(source.schema(), source_row),
                target: Record::from_row(target.schema(), target_row),
                differences,
            });
        }
    }

    let target_only: Vec<TargetOnlyRecord> = target
        .iter()
        .filter(|(key, _)| !source.contains(key))
        .map(|(key, row)| TargetOnlyRecord {
            key: key.to_record(key_fields),
            target: Record::from_row(target.schema(), row),
        })
        .collect();

    let summary = Summary {
        source_total_records: source.raw_row_count(),
        target_total_records: target.raw_row_count(),
        source_indexed_records: source.len(),
        target_indexed_records: target.len(),
        data_loss_count: missing_records.len(),
        value_diff_count: value_differences.len(),
        matching_records: common - value_differences.len(),
        target_only_count: target_only.len(),
        field_mapping: plan.applied,
        key_fields: key_fields.to_vec(),
        skipped_mappings: plan.skipped,
    };

    tracing::debug!(
        missing = summary.data_loss_count,
        differing = summary.value_diff_count,
        matching = summary.matching_records,
        target_only = summary.target_only_count,
        "diff complete"
    );

    Ok(DiffResult::new(missing_records, value_differences, target_only, summary))
}

#[cfg(test)]
mod tests {
    use super::{diff, DiffOptions, UnmappedFieldPolicy};
    use crate::error::CompareError;
    use crate::index::{index, DuplicateKeyPolicy, IndexOptions, KeyedView};
    use crate::mapping::FieldMapping;
    use crate::report::MISSING_IN_TARGET;
    use crate::types::{Dataset, Schema, Side, Value};

    fn dataset(columns: &[&str], rows: &[&[&str]]) -> Dataset {
        Dataset::new(
            Schema::new(columns.iter().copied()),
            rows.iter()
                .map(|r| r.iter().map(|v| Value::text(*v)).collect())
                .collect(),
        )
    }

    fn view(ds: &Dataset, keys: &[&str], side: Side) -> KeyedView {
        let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        index(ds, &keys, &IndexOptions::new(side, DuplicateKeyPolicy::KeepLast)).unwrap()
    }

    fn id() -> Vec<String> {
        vec!["id".to_string()]
    }

    #[test]
    fn reports_missing_source_records() {
        let src = dataset(&["id", "name"], &[&["1", "Alice"], &["2", "Bob"]]);
        let tgt = dataset(&["id", "name"], &[&["1", "Alice"], &["3", "Carl"]]);
        let mapping: FieldMapping = [("name", "name")].into_iter().collect();

        let result = diff(
            &view(&src, &["id"], Side::Source),
            &view(&tgt, &["id"], Side::Target),
            &mapping,
            &id(),
            &DiffOptions::default(),
        )
        .unwrap();

        assert_eq!(result.missing_records().len(), 1);
        let missing = &result.missing_records()[0];
        assert_eq!(missing.key.get("id"), Some(&Value::text("2")));
        assert_eq!(missing.source.get("name"), Some(&Value::text("Bob")));
        assert_eq!(missing.reason, MISSING_IN_TARGET);
        assert!(result.value_differences().is_empty());
        assert_eq!(result.summary().matching_records, 1);
        assert_eq!(result.summary().target_only_count, 1);
        assert_eq!(result.target_only()[0].key.get("id"), Some(&Value::text("3")));
    }

    #[test]
    fn reports_differing_values_with_target_field() {
        let src = dataset(&["id", "val"], &[&["1", "10"]]);
        let tgt = dataset(&["id", "amount"], &[&["1", "20"]]);
        let mapping: FieldMapping = [("val", "amount")].into_iter().collect();

        let result = diff(
            &view(&src, &["id"], Side::Source),
            &view(&tgt, &["id"], Side::Target),
            &mapping,
            &id(),
            &DiffOptions::default(),
        )
        .unwrap();

        assert_eq!(result.value_differences().len(), 1);
        let vd = &result.value_differences()[0];
        assert_eq!(vd.key.get("id"), Some(&Value::text("1")));
        let field = vd.field("val").unwrap();
        assert_eq!(field.target_field, "amount");
        assert_eq!(field.source_value, Value::text("10"));
        assert_eq!(field.target_value, Value::text("20"));
        assert_eq!(result.summary().matching_records, 0);
    }

    #[test]
    fn empty_mapping_compares_shared_columns_only() {
        let src = dataset(&["id", "a", "b"], &[&["1", "x", "left"]]);
        let tgt = dataset(&["id", "a", "c"], &[&["1", "y", "right"]]);

        let result = diff(
            &view(&src, &["id"], Side::Source),
            &view(&tgt, &["id"], Side::Target),
            &FieldMapping::new(),
            &id(),
            &DiffOptions::default(),
        )
        .unwrap();

        let applied: Vec<(&str, &str)> = result.summary().field_mapping.iter().collect();
        assert_eq!(applied, vec![("a", "a")]);
        let vd = &result.value_differences()[0];
        assert_eq!(vd.differences.len(), 1);
        assert_eq!(vd.differences[0].source_field, "a");
    }

    #[test]
    fn duplicate_source_keys_keep_later_row_and_report_both_counts() {
        let src = dataset(&["id", "name"], &[&["1", "Alice"], &["1", "Alicia"]]);
        let tgt = dataset(&["id", "name"], &[&["1", "Alicia"]]);

        let result = diff(
            &view(&src, &["id"], Side::Source),
            &view(&tgt, &["id"], Side::Target),
            &FieldMapping::new(),
            &id(),
            &DiffOptions::default(),
        )
        .unwrap();

        let s = result.summary();
        assert_eq!(s.source_total_records, 2);
        assert_eq!(s.source_indexed_records, 1);
        assert_eq!(s.matching_records, 1);
        assert!(result.is_clean());
    }

    #[test]
    fn null_rule_applies_per_field() {
        let schema = Schema::new(["id", "a", "b"]);
        let src = Dataset::new(
            schema.clone(),
            vec![vec![Value::text("1"), Value::Null, Value::Null]],
        );
        let tgt = Dataset::new(
            schema,
            vec![vec![Value::text("1"), Value::Null, Value::text("")]],
        );

        let result = diff(
            &view(&src, &["id"], Side::Source),
            &view(&tgt, &["id"], Side::Target),
            &FieldMapping::new(),
            &id(),
            &DiffOptions::default(),
        )
        .unwrap();

        let vd = &result.value_differences()[0];
        assert!(vd.field("a").is_none());
        let b = vd.field("b").unwrap();
        assert_eq!((&b.source_value, &b.target_value), (&Value::Null, &Value::text("")));
    }

    #[test]
    fn empty_sides() {
        let empty = dataset(&["id", "name"], &[]);
        let full = dataset(&["id", "name"], &[&["1", "a"], &["2", "b"]]);

        let from_empty = diff(
            &view(&empty, &["id"], Side::Source),
            &view(&full, &["id"], Side::Target),
            &FieldMapping::new(),
            &id(),
            &DiffOptions::default(),
        )
        .unwrap();
        assert!(from_empty.missing_records().is_empty());
        assert!(from_empty.value_differences().is_empty());
        assert_eq!(from_empty.summary().target_only_count, 2);

        let into_empty = diff(
            &view(&full, &["id"], Side::Source),
            &view(&empty, &["id"], Side::Target),
            &FieldMapping::new(),
            &id(),
            &DiffOptions::default(),
        )
        .unwrap();
        assert_eq!(into_empty.summary().data_loss_count, 2);
        assert_eq!(into_empty.summary().matching_records, 0);
    }

    #[test]
    fn unknown_mapped_columns_are_skipped_or_rejected() {
        let src = dataset(&["id", "name"], &[&["1", "a"]]);
        let tgt = dataset(&["id", "full_name"], &[&["1", "b"]]);
        let mapping: FieldMapping = [("name", "fullname"), ("nme", "full_name")].into_iter().collect();
        let sv = view(&src, &["id"], Side::Source);
        let tv = view(&tgt, &["id"], Side::Target);

        let lenient = diff(&sv, &tv, &mapping, &id(), &DiffOptions::default()).unwrap();
        let skipped = &lenient.summary().skipped_mappings;
        assert_eq!(skipped.len(), 2);
        assert_eq!(skipped[0].missing_from, Side::Target);
        assert_eq!(skipped[1].missing_from, Side::Source);
        assert!(lenient.summary().field_mapping.is_empty());
        assert_eq!(lenient.summary().matching_records, 1);

        let strict = DiffOptions {
            unmapped_fields: UnmappedFieldPolicy::Error,
        };
        let err = diff(&sv, &tv, &mapping, &id(), &strict).unwrap_err();
        assert!(matches!(err, CompareError::Config { .. }));
        assert!(err.to_string().contains("'fullname' is not a target column"));
    }

    #[test]
    fn mapped_key_fields_are_not_compared_as_values() {
        let src = dataset(&["id", "name"], &[&["1", "a"]]);
        let tgt = dataset(&["user_id", "name"], &[&["1", "a"]]);
        let mapping: FieldMapping = [("id", "user_id"), ("name", "name")].into_iter().collect();

        let result = diff(
            &view(&src, &["id"], Side::Source),
            &view(&tgt, &["user_id"], Side::Target),
            &mapping,
            &id(),
            &DiffOptions::default(),
        )
        .unwrap();
        assert!(result.is_clean());
        assert_eq!(result.summary().field_mapping.len(), 2);
        assert!(result.summary().skipped_mappings.is_empty());
    }
}

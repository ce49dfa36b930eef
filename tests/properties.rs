// Property tests for comparison invariants.
// Default 128 cases; override with PROPTEST_CASES.

use std::collections::BTreeMap;

use proptest::prelude::*;
use tabular_diff::compare::{compare, ComparisonRequest};
use tabular_diff::types::{Dataset, Schema, Value};

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(128),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        3 => "[a-c]{0,2}".prop_map(Value::text),
        1 => (0i64..4).prop_map(Value::Int64),
        1 => Just(Value::Null),
    ]
}

/// Rows keyed by a small id space so the two sides overlap.
fn arb_rows() -> impl Strategy<Value = BTreeMap<u8, (Value, Value)>> {
    prop::collection::btree_map(0u8..12, (arb_value(), arb_value()), 0..10)
}

fn dataset(rows: &BTreeMap<u8, (Value, Value)>) -> Dataset {
    Dataset::new(
        Schema::new(["id", "a", "b"]),
        rows.iter()
            .map(|(id, (a, b))| vec![Value::text(id.to_string()), a.clone(), b.clone()])
            .collect(),
    )
}

fn request() -> ComparisonRequest {
    ComparisonRequest::new().with_key_fields(["id"])
}

proptest! {
    #![proptest_config(config())]

    #[test]
    fn comparing_a_dataset_with_itself_is_clean(rows in arb_rows()) {
        let ds = dataset(&rows);
        let result = compare(&ds, &ds, &request()).unwrap();
        prop_assert!(result.is_clean());
        prop_assert!(result.target_only().is_empty());
        prop_assert_eq!(result.summary().matching_records, rows.len());
    }

    #[test]
    fn counts_are_conserved(src in arb_rows(), tgt in arb_rows()) {
        let result = compare(&dataset(&src), &dataset(&tgt), &request()).unwrap();
        let s = result.summary();

        let common = src.keys().filter(|k| tgt.contains_key(k)).count();
        prop_assert_eq!(s.common_keys(), common);
        prop_assert_eq!(common + s.data_loss_count, s.source_indexed_records);
        prop_assert_eq!(common + s.target_only_count, s.target_indexed_records);
        prop_assert_eq!(s.data_loss_count, result.missing_records().len());
        prop_assert_eq!(s.value_diff_count, result.value_differences().len());
    }

    #[test]
    fn empty_target_loses_every_source_record(src in arb_rows()) {
        let empty = dataset(&BTreeMap::new());
        let result = compare(&dataset(&src), &empty, &request()).unwrap();
        prop_assert_eq!(result.summary().data_loss_count, src.len());
        prop_assert!(result.value_differences().is_empty());

        let reversed = compare(&empty, &dataset(&src), &request()).unwrap();
        prop_assert_eq!(reversed.summary().data_loss_count, 0);
        prop_assert_eq!(reversed.summary().target_only_count, src.len());
    }

    #[test]
    fn differences_only_name_fields_that_disagree(src in arb_rows(), tgt in arb_rows()) {
        let result = compare(&dataset(&src), &dataset(&tgt), &request()).unwrap();
        for vd in result.value_differences() {
            prop_assert!(!vd.differences.is_empty());
            for d in &vd.differences {
                prop_assert!(!d.source_value.equivalent(&d.target_value));
                prop_assert!(d.source_field != "id");
            }
        }
    }

    #[test]
    fn comparison_is_deterministic(src in arb_rows(), tgt in arb_rows()) {
        let first = compare(&dataset(&src), &dataset(&tgt), &request()).unwrap();
        let second = compare(&dataset(&src), &dataset(&tgt), &request()).unwrap();
        prop_assert_eq!(first, second);
    }
}

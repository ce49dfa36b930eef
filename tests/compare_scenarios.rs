use tabular_diff::compare::{compare, compare_paths, ComparisonRequest};
use tabular_diff::diff::UnmappedFieldPolicy;
use tabular_diff::index::DuplicateKeyPolicy;
use tabular_diff::ingestion::LoadOptions;
use tabular_diff::mapping::{FieldMapping, MappingConfig};
use tabular_diff::report::MISSING_IN_TARGET;
use tabular_diff::types::{Dataset, Record, Schema, Side, Value};
use tabular_diff::{CompareError, CompareOptions};

fn dataset(columns: &[&str], rows: &[&[&str]]) -> Dataset {
    Dataset::new(
        Schema::new(columns.iter().copied()),
        rows.iter()
            .map(|r| r.iter().map(|v| Value::text(*v)).collect())
            .collect(),
    )
}

fn fixture_request() -> ComparisonRequest {
    let defaults = MappingConfig::from_path("tests/fixtures/mapping.csv").unwrap();
    ComparisonRequest::new().with_defaults(defaults)
}

#[test]
fn scenario_missing_record_is_reported_with_full_source_row() {
    let source = dataset(&["id", "name"], &[&["1", "Alice"], &["2", "Bob"]]);
    let target = dataset(&["id", "name"], &[&["1", "Alice"], &["3", "Carl"]]);
    let request = ComparisonRequest::new()
        .with_field_mapping([("name", "name")].into_iter().collect())
        .with_key_fields(["id"]);

    let result = compare(&source, &target, &request).unwrap();

    assert_eq!(result.missing_records().len(), 1);
    let missing = &result.missing_records()[0];
    assert_eq!(missing.source, Record::new().with("id", "2").with("name", "Bob"));
    assert_eq!(missing.reason, MISSING_IN_TARGET);
    assert!(result.value_differences().is_empty());
    assert_eq!(result.summary().matching_records, 1);
}

#[test]
fn scenario_value_difference_carries_both_values() {
    let source = dataset(&["id", "val"], &[&["1", "10"]]);
    let target = dataset(&["id", "val"], &[&["1", "20"]]);
    let request = ComparisonRequest::new()
        .with_field_mapping([("val", "val")].into_iter().collect())
        .with_key_fields(["id"]);

    let result = compare(&source, &target, &request).unwrap();

    let json = serde_json::to_value(&result.value_differences()[0]).unwrap();
    assert_eq!(json["key"], serde_json::json!({"id": "1"}));
    assert_eq!(json["differences"][0]["source_field"], "val");
    assert_eq!(json["differences"][0]["source_value"], "10");
    assert_eq!(json["differences"][0]["target_value"], "20");
}

#[test]
fn scenario_empty_mapping_compares_schema_intersection() {
    let source = dataset(&["id", "a", "b"], &[&["1", "same", "only-source"]]);
    let target = dataset(&["id", "a", "c"], &[&["1", "same", "only-target"]]);

    let result = compare(&source, &target, &ComparisonRequest::new().with_key_fields(["id"])).unwrap();

    assert!(result.is_clean());
    let applied: Vec<(&str, &str)> = result.summary().field_mapping.iter().collect();
    assert_eq!(applied, vec![("a", "a")]);
}

#[test]
fn scenario_duplicate_keys_keep_last_and_report_raw_count() {
    let source = dataset(&["id", "name"], &[&["1", "first"], &["1", "second"]]);
    let target = dataset(&["id", "name"], &[&["1", "first"]]);

    let result = compare(&source, &target, &ComparisonRequest::new().with_key_fields(["id"])).unwrap();

    let summary = result.summary();
    assert_eq!(summary.source_total_records, 2);
    assert_eq!(summary.source_indexed_records, 1);
    assert_eq!(summary.value_diff_count, 1);
    assert_eq!(
        result.value_differences()[0].field("name").unwrap().source_value,
        Value::text("second")
    );

    let strict = ComparisonRequest::new()
        .with_key_fields(["id"])
        .with_options(CompareOptions {
            duplicates: DuplicateKeyPolicy::Error,
            ..CompareOptions::default()
        });
    let err = compare(&source, &target, &strict).unwrap_err();
    assert!(matches!(err, CompareError::DuplicateKey { side: Side::Source, .. }));
}

#[test]
fn fixture_files_with_stored_mapping() {
    let result = compare_paths(
        "tests/fixtures/source.csv",
        "tests/fixtures/target.csv",
        &LoadOptions::default(),
        &fixture_request(),
    )
    .unwrap();

    let summary = result.summary();
    assert_eq!(summary.key_fields, vec!["id".to_string()]);
    assert_eq!(summary.source_total_records, 4);
    assert_eq!(summary.target_total_records, 4);
    assert_eq!(summary.data_loss_count, 1);
    assert_eq!(summary.value_diff_count, 2);
    assert_eq!(summary.matching_records, 1);
    assert_eq!(summary.target_only_count, 1);
    assert_eq!(summary.field_mapping.len(), 4);

    assert_eq!(result.missing_records()[0].key.get("id"), Some(&Value::text("2")));

    let carol = &result.value_differences()[0];
    assert_eq!(carol.key.get("id"), Some(&Value::text("3")));
    assert_eq!(carol.differences.len(), 1);
    assert_eq!(carol.differences[0].target_field, "location");
    // Both ages are empty, hence null on both sides.
    assert!(carol.field("age").is_none());

    let dan = &result.value_differences()[1];
    assert_eq!(dan.field("age").unwrap().target_value, Value::text("42"));

    assert_eq!(result.target_only()[0].target.get("full_name"), Some(&Value::text("Eve")));
}

#[test]
fn csv_source_against_json_target_matches_by_string_form() {
    let result = compare_paths(
        "tests/fixtures/source.csv",
        "tests/fixtures/target.json",
        &LoadOptions::default(),
        &fixture_request(),
    )
    .unwrap();

    let summary = result.summary();
    assert_eq!(summary.data_loss_count, 1);
    assert_eq!(summary.value_diff_count, 2);
    assert_eq!(summary.matching_records, 1);
}

#[test]
fn explicit_mapping_overrides_stored_mapping() {
    let explicit: FieldMapping = [("id", "user_id"), ("name", "full_name"), ("nickname", "alias")]
        .into_iter()
        .collect();
    let request = fixture_request().with_field_mapping(explicit);

    let result = compare_paths(
        "tests/fixtures/source.csv",
        "tests/fixtures/target.csv",
        &LoadOptions::default(),
        &request,
    )
    .unwrap();

    // Only names are compared now, and they all agree.
    assert!(result.value_differences().is_empty());
    assert_eq!(result.summary().skipped_mappings.len(), 1);
    assert_eq!(result.summary().skipped_mappings[0].source_field, "nickname");

    let strict = request.with_options(CompareOptions {
        unmapped_fields: UnmappedFieldPolicy::Error,
        ..CompareOptions::default()
    });
    let err = compare_paths(
        "tests/fixtures/source.csv",
        "tests/fixtures/target.csv",
        &LoadOptions::default(),
        &strict,
    )
    .unwrap_err();
    assert!(err.to_string().contains("'nickname' is not a source column"));
}

#[test]
fn comparisons_are_repeatable() {
    let run = || {
        compare_paths(
            "tests/fixtures/source.csv",
            "tests/fixtures/target.csv",
            &LoadOptions::default(),
            &fixture_request(),
        )
        .unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn result_json_round_trips() {
    let result = compare_paths(
        "tests/fixtures/source.csv",
        "tests/fixtures/target.csv",
        &LoadOptions::default(),
        &fixture_request(),
    )
    .unwrap();

    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains(r#""reason":"Record exists in source but not in target""#));
    assert!(json.contains(r#""age":null"#));
    let back: tabular_diff::report::DiffResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back, result);
}

#[test]
fn json_floats_compare_by_their_literal_form() {
    use tabular_diff::ingestion::csv::load_csv_from_str;
    use tabular_diff::ingestion::json::load_json_from_str;
    use tabular_diff::ingestion::CsvOptions;

    let request = ComparisonRequest::new().with_key_fields(["id"]);
    let json = load_json_from_str(r#"[{"id":1,"amount":30.0,"big":1e20}]"#).unwrap();

    let same = load_csv_from_str("id,amount,big\n1,30.0,1e20\n", &CsvOptions::default()).unwrap();
    let result = compare(&same, &json, &request).unwrap();
    assert!(result.is_clean(), "{:?}", result.value_differences());

    // `30` and `30.0` are different strings.
    let whole = load_csv_from_str("id,amount,big\n1,30,1e20\n", &CsvOptions::default()).unwrap();
    let result = compare(&whole, &json, &request).unwrap();
    let diff = result.value_differences()[0].field("amount").unwrap();
    assert_eq!(diff.source_value, Value::text("30"));
    assert_eq!(diff.target_value, Value::Float64(30.0));
    assert!(result.value_differences()[0].field("big").is_none());
}

use tabular_diff::index::{index_rows, DuplicateKeyPolicy, IndexOptions};
use tabular_diff::ingestion::csv::{load_csv_from_path, load_csv_from_str};
use tabular_diff::ingestion::json::load_json_from_path;
use tabular_diff::ingestion::{load_from_path, CsvOptions, CsvRows, InputFormat, LoadOptions};
use tabular_diff::types::{RecordKey, Side, Value};
use tabular_diff::CompareError;

#[test]
fn load_csv_from_path_happy_path() {
    let ds = load_csv_from_path("tests/fixtures/source.csv", &CsvOptions::default()).unwrap();

    assert_eq!(ds.row_count(), 4);
    assert_eq!(ds.schema.columns(), &["id", "name", "city", "age"]);
    assert_eq!(
        ds.rows[0],
        vec![
            Value::text("1"),
            Value::text("Alice"),
            Value::text("Paris"),
            Value::text("30"),
        ]
    );
    // Trailing empty cell is the null sentinel.
    assert_eq!(ds.rows[2][3], Value::Null);
}

#[test]
fn ragged_row_is_a_format_error_naming_the_row() {
    let err = load_csv_from_path("tests/fixtures/ragged.csv", &CsvOptions::default()).unwrap_err();
    match err {
        CompareError::Format { row, message } => {
            assert_eq!(row, Some(3));
            assert!(message.contains("3 fields"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_header_and_duplicate_header_are_rejected() {
    let err = load_csv_from_str("", &CsvOptions::default()).unwrap_err();
    assert!(matches!(err, CompareError::Format { row: Some(1), .. }));

    let err = load_csv_from_str("id,id\n1,2\n", &CsvOptions::default()).unwrap_err();
    assert!(err.to_string().contains("duplicate column 'id'"));
}

#[test]
fn null_tokens_and_literal_empty_strings() {
    let opts = CsvOptions {
        empty_as_null: false,
        null_tokens: vec!["NULL".to_string()],
        ..CsvOptions::default()
    };
    let ds = load_csv_from_str("a,b\n,NULL\n", &opts).unwrap();
    assert_eq!(ds.rows[0], vec![Value::text(""), Value::Null]);
}

#[test]
fn unified_loader_dispatches_on_extension() {
    let tsv = load_from_path("tests/fixtures/source.tsv", &LoadOptions::default()).unwrap();
    assert_eq!(tsv.schema.columns(), &["id", "name", "city", "age"]);
    assert_eq!(tsv.row_count(), 2);

    let json = load_from_path("tests/fixtures/target.json", &LoadOptions::default()).unwrap();
    assert_eq!(json.schema.columns(), &["user_id", "full_name", "location", "age"]);
    assert_eq!(json.rows[0][0], Value::Int64(1));
    assert_eq!(json.rows[1][3], Value::Null);

    let forced = LoadOptions {
        format: Some(InputFormat::Tsv),
        ..LoadOptions::default()
    };
    // A comma file read as TSV has a single column.
    let one_col = load_from_path("tests/fixtures/source.csv", &forced).unwrap();
    assert_eq!(one_col.schema.columns(), &["id,name,city,age"]);

    let err = load_from_path("tests/fixtures/source.parquet", &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, CompareError::Config { .. }));
}

#[test]
fn json_matches_csv_by_string_form() {
    let json = load_json_from_path("tests/fixtures/target.json").unwrap();
    let csv = load_csv_from_path("tests/fixtures/target.csv", &CsvOptions::default()).unwrap();
    for (j, c) in json.rows.iter().zip(csv.rows.iter()) {
        for (jv, cv) in j.iter().zip(c.iter()) {
            assert!(jv.equivalent(cv), "{jv:?} vs {cv:?}");
        }
    }
}

#[test]
fn streamed_rows_index_without_a_dataset() {
    let file = std::fs::File::open("tests/fixtures/source.csv").unwrap();
    let rows = CsvRows::new(file, &CsvOptions::default()).unwrap();
    let schema = rows.schema().clone();

    let view = index_rows(
        schema,
        rows,
        &["id".to_string()],
        &IndexOptions::new(Side::Source, DuplicateKeyPolicy::Error),
    )
    .unwrap();

    assert_eq!(view.len(), 4);
    assert_eq!(view.raw_row_count(), 4);
    let key = RecordKey::new(vec![Value::text("2")]);
    assert_eq!(view.value(&key, "name"), Some(&Value::text("Bob")));
}

#[test]
fn streamed_format_errors_stop_indexing() {
    let rows = CsvRows::new("id,name\n1,a\n2\n".as_bytes(), &CsvOptions::default()).unwrap();
    let schema = rows.schema().clone();
    let err = index_rows(schema, rows, &["id".to_string()], &IndexOptions::default()).unwrap_err();
    assert!(matches!(err, CompareError::Format { row: Some(3), .. }));
}

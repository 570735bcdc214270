use std::fs;
use std::path::PathBuf;

use harmonize_ingest::{CsvOptions, IngestError, read_csv_frame};
use polars::prelude::*;
use tempfile::TempDir;

fn write_csv(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write csv");
    path
}

#[test]
fn reads_all_columns_as_text_with_nulls() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(&dir, "site.csv", "site_id,name\n1, North \n2,\n");

    let df = read_csv_frame(&path, &CsvOptions::default()).unwrap();

    assert_eq!(df.get_column_names_str(), vec!["site_id", "name"]);
    assert_eq!(df.height(), 2);
    assert_eq!(df.column("site_id").unwrap().dtype(), &DataType::String);
    let name = df.column("name").unwrap().str().unwrap();
    assert_eq!(name.get(0), Some("North"));
    assert_eq!(name.get(1), None);
}

#[test]
fn selects_and_orders_requested_columns() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(&dir, "sample.csv", "a;b;c\n1;2;3\n");
    let options = CsvOptions {
        delimiter: Some(';'),
        columns: vec!["c".to_string(), "a".to_string()],
    };

    let df = read_csv_frame(&path, &options).unwrap();

    assert_eq!(df.get_column_names_str(), vec!["c", "a"]);
    assert_eq!(df.column("c").unwrap().str().unwrap().get(0), Some("3"));
}

#[test]
fn pads_short_records() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(&dir, "short.csv", "a,b\n1\n");

    let df = read_csv_frame(&path, &CsvOptions::default()).unwrap();

    assert_eq!(df.column("b").unwrap().null_count(), 1);
}

#[test]
fn names_every_missing_column() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(&dir, "sample.csv", "a\n1\n");
    let options = CsvOptions {
        delimiter: None,
        columns: vec!["x".to_string(), "a".to_string(), "y".to_string()],
    };

    let err = read_csv_frame(&path, &options).unwrap_err();

    match err {
        IngestError::MissingColumns { columns, .. } => assert_eq!(columns, vec!["x", "y"]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn rejects_duplicate_headers() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(&dir, "dup.csv", "a,a\n1,2\n");

    let err = read_csv_frame(&path, &CsvOptions::default()).unwrap_err();

    assert!(matches!(err, IngestError::DuplicateHeader { column, .. } if column == "a"));
}

#[test]
fn missing_file_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.csv");

    let err = read_csv_frame(&path, &CsvOptions::default()).unwrap_err();

    assert!(err.to_string().contains("absent.csv"));
}

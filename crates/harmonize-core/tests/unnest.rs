use std::collections::BTreeSet;

use harmonize_core::{UnnestError, unnest};
use harmonize_model::UnnestDescriptor;
use polars::prelude::{Column, DataFrame};

fn wide() -> DataFrame {
    DataFrame::new(vec![
        Column::new("id".into(), [1i64, 2]),
        Column::new("a".into(), [10i64, 20]),
        Column::new("b".into(), [11i64, 21]),
        Column::new("c".into(), [12i64, 22]),
    ])
    .expect("df")
}

#[test]
fn melts_every_value_column_per_row() {
    let spec = UnnestDescriptor::new(["id"], ["a", "b", "c"]);
    let out = unnest("measurement", &wide(), &spec).expect("unnest");

    assert_eq!(out.table.height(), 6);
    assert_eq!(
        out.table.get_column_names_str(),
        vec!["id", "variable", "value"]
    );
    assert!(out.warnings.is_empty());

    let ids = out.table.column("id").expect("id").i64().expect("i64");
    let variables = out
        .table
        .column("variable")
        .expect("variable")
        .str()
        .expect("str");
    let values = out.table.column("value").expect("value").i64().expect("i64");

    let first: BTreeSet<&str> = (0..out.table.height())
        .filter(|&row| ids.get(row) == Some(1))
        .filter_map(|row| variables.get(row))
        .collect();
    assert_eq!(first, BTreeSet::from(["a", "b", "c"]));

    assert_eq!(
        values.into_iter().collect::<Vec<_>>(),
        vec![Some(10), Some(11), Some(12), Some(20), Some(21), Some(22)]
    );
}

#[test]
fn custom_output_names_are_used() {
    let spec = UnnestDescriptor::new(["id"], ["b"]).with_names("field", "reading");
    let out = unnest("measurement", &wide(), &spec).expect("unnest");
    assert_eq!(
        out.table.get_column_names_str(),
        vec!["id", "field", "reading"]
    );
    assert_eq!(out.table.height(), 2);
}

#[test]
fn missing_value_column_is_named() {
    let spec = UnnestDescriptor::new(["id"], ["a", "d"]);
    let err = unnest("measurement", &wide(), &spec).expect_err("missing");
    assert!(matches!(
        &err,
        UnnestError::MissingColumns { entity, columns } if entity == "measurement" && columns == &["d"]
    ));
    insta::assert_snapshot!(
        err.to_string(),
        @"entity measurement: unnest references missing column(s) d"
    );
}

#[test]
fn missing_id_column_is_named() {
    let spec = UnnestDescriptor::new(["subject"], ["a"]);
    let err = unnest("measurement", &wide(), &spec).expect_err("missing");
    assert!(matches!(err, UnnestError::MissingColumns { columns, .. } if columns == ["subject"]));
}

#[test]
fn empty_value_columns_warn_and_yield_no_rows() {
    let spec = UnnestDescriptor::new(["id"], Vec::<String>::new());
    let out = unnest("measurement", &wide(), &spec).expect("unnest");
    assert_eq!(out.table.height(), 0);
    assert_eq!(
        out.table.get_column_names_str(),
        vec!["id", "variable", "value"]
    );
    assert_eq!(out.warnings.len(), 1);
}

//! Tables written literally in configuration.

use std::collections::BTreeSet;

use harmonize_model::ScalarValue;
use polars::prelude::*;

use crate::error::{IngestError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inferred {
    Int,
    Float,
    Bool,
    Text,
}

fn infer(values: &[Option<&ScalarValue>]) -> Inferred {
    let mut kind: Option<Inferred> = None;
    for value in values.iter().flatten() {
        let next = match value {
            ScalarValue::Integer(_) => Inferred::Int,
            ScalarValue::Float(_) => Inferred::Float,
            ScalarValue::Boolean(_) => Inferred::Bool,
            ScalarValue::Text(_) => Inferred::Text,
        };
        kind = Some(match (kind, next) {
            (None, next) => next,
            (Some(current), next) if current == next => current,
            (Some(Inferred::Int), Inferred::Float) | (Some(Inferred::Float), Inferred::Int) => {
                Inferred::Float
            }
            _ => Inferred::Text,
        });
    }
    kind.unwrap_or(Inferred::Text)
}

fn build_column(name: &str, values: &[Option<&ScalarValue>]) -> Column {
    match infer(values) {
        Inferred::Int => {
            let data: Vec<Option<i64>> = values
                .iter()
                .map(|value| match value {
                    Some(ScalarValue::Integer(v)) => Some(*v),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), data).into()
        }
        Inferred::Float => {
            let data: Vec<Option<f64>> = values
                .iter()
                .map(|value| match value {
                    Some(ScalarValue::Integer(v)) => Some(*v as f64),
                    Some(ScalarValue::Float(v)) => Some(*v),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), data).into()
        }
        Inferred::Bool => {
            let data: Vec<Option<bool>> = values
                .iter()
                .map(|value| match value {
                    Some(ScalarValue::Boolean(v)) => Some(*v),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), data).into()
        }
        Inferred::Text => {
            let data: Vec<Option<String>> = values
                .iter()
                .map(|value| value.map(ScalarValue::render))
                .collect();
            Series::new(name.into(), data).into()
        }
    }
}

/// Builds a table from literal rows.
///
/// Rows shorter than `columns` are padded with nulls; longer rows are an error.
/// Column dtypes are inferred from the values present.
pub fn build_fixed_frame(columns: &[String], values: &[Vec<ScalarValue>]) -> Result<DataFrame> {
    let mut seen = BTreeSet::new();
    for column in columns {
        if !seen.insert(column.as_str()) {
            return Err(IngestError::DuplicateFixedColumn {
                column: column.clone(),
            });
        }
    }
    for (row, record) in values.iter().enumerate() {
        if record.len() > columns.len() {
            return Err(IngestError::RowWidth {
                row,
                expected: columns.len(),
                found: record.len(),
            });
        }
    }
    let mut out: Vec<Column> = Vec::with_capacity(columns.len());
    for (idx, name) in columns.iter().enumerate() {
        let cells: Vec<Option<&ScalarValue>> =
            values.iter().map(|record| record.get(idx)).collect();
        out.push(build_column(name, &cells));
    }
    Ok(DataFrame::new(out)?)
}

/// A column of `len` copies of `value`.
pub fn scalar_column(name: &str, value: &ScalarValue, len: usize) -> Column {
    match value {
        ScalarValue::Integer(v) => Series::new(name.into(), vec![*v; len]).into(),
        ScalarValue::Float(v) => Series::new(name.into(), vec![*v; len]).into(),
        ScalarValue::Boolean(v) => Series::new(name.into(), vec![*v; len]).into(),
        ScalarValue::Text(v) => Series::new(name.into(), vec![v.as_str(); len]).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(columns: &[&str]) -> Vec<String> {
        columns.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn infers_column_types() {
        let df = build_fixed_frame(
            &names(&["id", "ratio", "flag", "label"]),
            &[
                vec![1.into(), 1.into(), true.into(), "a".into()],
                vec![2.into(), 0.5.into(), false.into(), 3.into()],
            ],
        )
        .unwrap();
        assert_eq!(df.column("id").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("ratio").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("flag").unwrap().dtype(), &DataType::Boolean);
        assert_eq!(df.column("label").unwrap().dtype(), &DataType::String);
        let label = df.column("label").unwrap().str().unwrap();
        assert_eq!(label.get(1), Some("3"));
    }

    #[test]
    fn pads_short_rows_with_null() {
        let df = build_fixed_frame(&names(&["a", "b"]), &[vec![1.into()], vec![2.into(), 3.into()]])
            .unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("b").unwrap().null_count(), 1);
    }

    #[test]
    fn rejects_wide_rows() {
        let err = build_fixed_frame(&names(&["a"]), &[vec![1.into(), 2.into()]]).unwrap_err();
        assert!(matches!(
            err,
            IngestError::RowWidth {
                row: 0,
                expected: 1,
                found: 2
            }
        ));
    }

    #[test]
    fn scalar_column_repeats_value() {
        let column = scalar_column("origin", &ScalarValue::text("lab"), 3);
        assert_eq!(column.len(), 3);
        assert_eq!(column.str().unwrap().get(2), Some("lab"));
    }
}

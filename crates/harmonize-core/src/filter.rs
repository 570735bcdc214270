//! Post-load row filters. Filters only ever remove rows.

use std::collections::HashSet;

use harmonize_ingest::any_to_key;
use harmonize_model::FilterDescriptor;
use polars::prelude::*;
use thiserror::Error;

use crate::frame_utils::{key_values, missing_columns, row_mask};
use crate::store::{StoreError, TableStore};

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("{kind} filter on {table}: missing column(s) {}", columns.join(", "))]
    MissingColumns {
        kind: &'static str,
        table: String,
        columns: Vec<String>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Frame(#[from] PolarsError),
}

fn require_columns(
    kind: &'static str,
    table: &str,
    df: &DataFrame,
    columns: &[String],
) -> Result<(), FilterError> {
    let missing = missing_columns(df, columns);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(FilterError::MissingColumns {
            kind,
            table: table.to_string(),
            columns: missing,
        })
    }
}

/// Applies one filter to the rows of `entity`.
///
/// `exists_in` reads the already-stored table of another entity; null values
/// never exist in it.
pub fn apply_filter(
    entity: &str,
    df: &DataFrame,
    filter: &FilterDescriptor,
    store: &TableStore,
) -> Result<DataFrame, FilterError> {
    let kind = filter.kind();
    let keep: Vec<bool> = match filter {
        FilterDescriptor::ExistsIn {
            column,
            entity: target,
            remote_column,
        } => {
            let column = std::slice::from_ref(column);
            require_columns(kind, entity, df, column)?;
            let remote = store.require(target)?;
            let remote_column = std::slice::from_ref(remote_column);
            require_columns(kind, target, remote, remote_column)?;
            let known: HashSet<String> = key_values(remote, remote_column)?
                .into_iter()
                .flatten()
                .collect();
            key_values(df, column)?
                .iter()
                .map(|key| key.as_ref().is_some_and(|key| known.contains(key)))
                .collect()
        }
        FilterDescriptor::Equals { column, value } => {
            require_columns(kind, entity, df, std::slice::from_ref(column))?;
            let expected = value.render();
            let values = df.column(column)?;
            (0..df.height())
                .map(|idx| {
                    any_to_key(values.get(idx).unwrap_or(AnyValue::Null))
                        .is_some_and(|text| text == expected)
                })
                .collect()
        }
        FilterDescriptor::NotNull { columns } => {
            require_columns(kind, entity, df, columns)?;
            let mut keep = vec![true; df.height()];
            for name in columns {
                let values = df.column(name)?;
                for (idx, slot) in keep.iter_mut().enumerate() {
                    if matches!(values.get(idx).unwrap_or(AnyValue::Null), AnyValue::Null) {
                        *slot = false;
                    }
                }
            }
            keep
        }
    };
    Ok(df.filter(&row_mask(kind, &keep))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use harmonize_model::ScalarValue;

    #[test]
    fn equals_compares_rendered_text() {
        let df = df! { "status" => [Some(1i64), Some(2), None] }.unwrap();
        let filter = FilterDescriptor::Equals {
            column: "status".to_string(),
            value: ScalarValue::text("1"),
        };
        let out = apply_filter("obs", &df, &filter, &TableStore::new()).unwrap();
        assert_eq!(out.height(), 1);
    }

    #[test]
    fn not_null_drops_rows_with_any_null() {
        let df = df! {
            "a" => [Some("x"), None, Some("z")],
            "b" => [Some(1i64), Some(2), None],
        }
        .unwrap();
        let filter = FilterDescriptor::NotNull {
            columns: vec!["a".to_string(), "b".to_string()],
        };
        let out = apply_filter("obs", &df, &filter, &TableStore::new()).unwrap();
        assert_eq!(out.height(), 1);
    }

    #[test]
    fn exists_in_requires_stored_entity() {
        let df = df! { "site" => ["a"] }.unwrap();
        let filter = FilterDescriptor::ExistsIn {
            column: "site".to_string(),
            entity: "site".to_string(),
            remote_column: "code".to_string(),
        };
        let err = apply_filter("obs", &df, &filter, &TableStore::new()).unwrap_err();
        assert!(matches!(err, FilterError::Store(StoreError::Missing { .. })));
    }
}

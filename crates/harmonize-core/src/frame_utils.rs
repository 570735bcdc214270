//! Row-wise helpers over `DataFrame`s.

use harmonize_ingest::{any_to_key, any_to_string};
use polars::prelude::*;

/// Separator between the components of a composite key.
const KEY_SEPARATOR: char = '\u{1f}';
/// Stand-in for a null cell inside a row signature.
const NULL_MARKER: &str = "\u{0}";

/// Names from `columns` that are absent from `df`, in the order given.
pub fn missing_columns(df: &DataFrame, columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .filter(|name| df.column(name).is_err())
        .cloned()
        .collect()
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

fn lookup<'a>(df: &'a DataFrame, columns: &[String]) -> PolarsResult<Vec<&'a Column>> {
    columns.iter().map(|name| df.column(name)).collect()
}

/// Composite join key per row. A row with a null component has no key.
pub fn key_values(df: &DataFrame, columns: &[String]) -> PolarsResult<Vec<Option<String>>> {
    let cols = lookup(df, columns)?;
    let mut keys = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let mut composite = String::new();
        let mut complete = true;
        for (pos, col) in cols.iter().enumerate() {
            let Some(text) = any_to_key(col.get(idx).unwrap_or(AnyValue::Null)) else {
                complete = false;
                break;
            };
            if pos > 0 {
                composite.push(KEY_SEPARATOR);
            }
            composite.push_str(&text);
        }
        keys.push(complete.then_some(composite));
    }
    Ok(keys)
}

/// Null-aware signature per row; two null cells compare equal.
pub fn row_signatures(df: &DataFrame, columns: &[String]) -> PolarsResult<Vec<String>> {
    let cols = lookup(df, columns)?;
    let mut signatures = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let mut composite = String::new();
        for (pos, col) in cols.iter().enumerate() {
            if pos > 0 {
                composite.push(KEY_SEPARATOR);
            }
            match col.get(idx).unwrap_or(AnyValue::Null) {
                AnyValue::Null => composite.push_str(NULL_MARKER),
                value => composite.push_str(&any_to_string(value)),
            }
        }
        signatures.push(composite);
    }
    Ok(signatures)
}

/// Human-readable form of a composite key or signature.
pub fn display_key(key: &str) -> String {
    let parts: Vec<&str> = key
        .split(KEY_SEPARATOR)
        .map(|part| if part == NULL_MARKER { "<null>" } else { part })
        .collect();
    if parts.len() == 1 {
        parts[0].to_string()
    } else {
        format!("({})", parts.join(", "))
    }
}

/// Displays an optional key, rendering a missing key as `<null>`.
pub fn display_optional_key(key: Option<&String>) -> String {
    key.map_or_else(|| "<null>".to_string(), |key| display_key(key))
}

/// Keep-mask from a predicate over row indices.
pub fn row_mask(name: &str, keep: &[bool]) -> BooleanChunked {
    BooleanChunked::from_slice(name.into(), keep)
}

//! Wide-to-long reshape.
//!
//! Output is row-major: input row `i` produces `value_vars.len()` consecutive
//! rows, one per value column in declaration order. When the value columns do
//! not share a dtype, every value is cast to String.

use std::collections::BTreeSet;

use harmonize_model::UnnestDescriptor;
use polars::prelude::*;
use thiserror::Error;

use crate::frame_utils::missing_columns;

#[derive(Debug, Error)]
pub enum UnnestError {
    #[error("entity {entity}: unnest references missing column(s) {}", columns.join(", "))]
    MissingColumns { entity: String, columns: Vec<String> },

    #[error("entity {entity}: unnest value column {column} is listed more than once")]
    DuplicateValueVar { entity: String, column: String },

    #[error("entity {entity}: unnest output column {name} clashes with another output column")]
    NameClash { entity: String, name: String },

    #[error(transparent)]
    Frame(#[from] PolarsError),
}

#[derive(Debug, Clone)]
pub struct Unnested {
    pub table: DataFrame,
    pub warnings: Vec<String>,
}

fn check_names(entity: &str, df: &DataFrame, spec: &UnnestDescriptor) -> Result<(), UnnestError> {
    let mut wanted = spec.id_vars.clone();
    wanted.extend(spec.value_vars.iter().cloned());
    let missing = missing_columns(df, &wanted);
    if !missing.is_empty() {
        return Err(UnnestError::MissingColumns {
            entity: entity.to_string(),
            columns: missing,
        });
    }

    let mut seen = BTreeSet::new();
    for column in &spec.value_vars {
        if !seen.insert(column.as_str()) {
            return Err(UnnestError::DuplicateValueVar {
                entity: entity.to_string(),
                column: column.clone(),
            });
        }
    }

    let mut outputs: BTreeSet<&str> = BTreeSet::new();
    for name in spec
        .id_vars
        .iter()
        .chain([&spec.var_name, &spec.value_name])
    {
        if !outputs.insert(name.as_str()) {
            return Err(UnnestError::NameClash {
                entity: entity.to_string(),
                name: name.clone(),
            });
        }
    }
    Ok(())
}

/// Stacks the value columns end to end: value `j` of row `i` sits at `j * n + i`.
fn stack_values(df: &DataFrame, spec: &UnnestDescriptor) -> PolarsResult<Series> {
    let mut columns: Vec<Series> = spec
        .value_vars
        .iter()
        .map(|name| {
            df.column(name)
                .map(|column| column.as_materialized_series().clone())
        })
        .collect::<PolarsResult<_>>()?;
    let first_dtype = columns
        .first()
        .map(|column| column.dtype().clone())
        .unwrap_or(DataType::String);
    if columns.iter().any(|column| column.dtype() != &first_dtype) {
        columns = columns
            .iter()
            .map(|column| column.cast(&DataType::String))
            .collect::<PolarsResult<_>>()?;
    }
    let mut parts = columns.into_iter();
    let Some(mut stacked) = parts.next() else {
        return Ok(Series::new_empty(spec.value_name.as_str().into(), &DataType::String));
    };
    for part in parts {
        stacked.append(&part)?;
    }
    stacked.rename(spec.value_name.as_str().into());
    Ok(stacked)
}

/// Reshapes `df` from wide to long form.
///
/// An empty `value_vars` yields the id columns plus empty variable and value
/// columns, with a warning.
pub fn unnest(entity: &str, df: &DataFrame, spec: &UnnestDescriptor) -> Result<Unnested, UnnestError> {
    check_names(entity, df, spec)?;
    let ids = df.select(spec.id_vars.iter().map(String::as_str))?;

    if spec.value_vars.is_empty() {
        let mut columns = ids.clear().take_columns();
        columns.push(Series::new_empty(spec.var_name.as_str().into(), &DataType::String).into());
        columns.push(Series::new_empty(spec.value_name.as_str().into(), &DataType::String).into());
        return Ok(Unnested {
            table: DataFrame::new(columns)?,
            warnings: vec![format!(
                "entity {entity}: unnest has no value columns; result is empty"
            )],
        });
    }

    let rows = df.height();
    let width = spec.value_vars.len();
    let total = rows * width;

    let id_idx = IdxCa::from_vec(
        "id_idx".into(),
        (0..total).map(|r| (r / width) as IdxSize).collect(),
    );
    let value_idx = IdxCa::from_vec(
        "value_idx".into(),
        (0..total)
            .map(|r| ((r % width) * rows + r / width) as IdxSize)
            .collect(),
    );

    let mut columns = ids.take(&id_idx)?.take_columns();
    let variable = Series::new(
        spec.var_name.as_str().into(),
        (0..total)
            .map(|r| spec.value_vars[r % width].as_str())
            .collect::<Vec<_>>(),
    );
    let value = stack_values(df, spec)?.take(&value_idx)?;
    columns.push(variable.into());
    columns.push(value.into());

    Ok(Unnested {
        table: DataFrame::new(columns)?,
        warnings: Vec::new(),
    })
}

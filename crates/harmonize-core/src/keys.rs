//! Surrogate id generation and key uniqueness checks on the final table.

use polars::prelude::*;

use crate::constraints::SAMPLE_LIMIT;
use crate::error::{PipelineError, PipelineStage};
use crate::frame_utils::{display_key, has_column, missing_columns, row_signatures};

/// Adds a 1-based Int64 identity column at position 0 when `column` is absent.
///
/// Returns whether the column was generated.
pub fn ensure_surrogate_id(
    entity: &str,
    df: &mut DataFrame,
    column: &str,
) -> Result<bool, PipelineError> {
    if has_column(df, column) {
        return Ok(false);
    }
    let ids: Vec<i64> = (1..=df.height() as i64).collect();
    df.insert_column(0, Series::new(column.into(), ids))
        .map_err(|e| PipelineError::frame(entity, PipelineStage::SurrogateId, e))?;
    Ok(true)
}

/// Fails unless every combination of `columns` occurs at most once.
///
/// Null cells compare equal, so two rows with the same nulls are duplicates.
pub fn check_unique(
    entity: &str,
    df: &DataFrame,
    columns: &[String],
    stage: PipelineStage,
) -> Result<(), PipelineError> {
    if columns.is_empty() {
        return Ok(());
    }
    let missing = missing_columns(df, columns);
    if !missing.is_empty() {
        return Err(PipelineError::MissingColumns {
            entity: entity.to_string(),
            stage,
            columns: missing,
        });
    }
    let signatures =
        row_signatures(df, columns).map_err(|e| PipelineError::frame(entity, stage, e))?;
    let mut seen = std::collections::HashSet::new();
    let mut reported = std::collections::HashSet::new();
    let mut duplicates = 0;
    let mut sample = Vec::new();
    for signature in &signatures {
        if seen.insert(signature.as_str()) {
            continue;
        }
        duplicates += 1;
        if sample.len() < SAMPLE_LIMIT && reported.insert(signature.as_str()) {
            sample.push(display_key(signature));
        }
    }
    if duplicates == 0 {
        return Ok(());
    }
    Err(PipelineError::DuplicateKey {
        entity: entity.to_string(),
        stage,
        columns: columns.to_vec(),
        duplicates,
        sample,
    })
}

/// Surrogate ids must be present on every row and unique.
pub fn check_surrogate_id(entity: &str, df: &DataFrame, column: &str) -> Result<(), PipelineError> {
    let values = df
        .column(column)
        .map_err(|e| PipelineError::frame(entity, PipelineStage::KeyCheck, e))?;
    let nulls = values.null_count();
    if nulls > 0 {
        return Err(PipelineError::NullKey {
            entity: entity.to_string(),
            stage: PipelineStage::KeyCheck,
            column: column.to_string(),
            rows: nulls,
        });
    }
    check_unique(
        entity,
        df,
        std::slice::from_ref(&column.to_string()),
        PipelineStage::KeyCheck,
    )
}

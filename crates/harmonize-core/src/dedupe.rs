use std::collections::HashSet;

use harmonize_model::DropDuplicates;
use polars::prelude::*;

use crate::error::{PipelineError, PipelineStage};
use crate::frame_utils::{missing_columns, row_mask, row_signatures};

/// Drops repeated rows, keeping the first occurrence and the original order.
///
/// Nulls compare equal to each other.
pub fn drop_duplicates(
    entity: &str,
    df: &DataFrame,
    policy: &DropDuplicates,
) -> Result<DataFrame, PipelineError> {
    let columns: Vec<String> = match policy {
        DropDuplicates::All(false) => return Ok(df.clone()),
        DropDuplicates::All(true) => df
            .get_column_names_str()
            .into_iter()
            .map(str::to_string)
            .collect(),
        DropDuplicates::Columns(columns) => {
            let missing = missing_columns(df, columns);
            if !missing.is_empty() {
                return Err(PipelineError::MissingColumns {
                    entity: entity.to_string(),
                    stage: PipelineStage::Dedupe,
                    columns: missing,
                });
            }
            columns.clone()
        }
    };
    if columns.is_empty() || df.height() == 0 {
        return Ok(df.clone());
    }

    let signatures = row_signatures(df, &columns)
        .map_err(|e| PipelineError::frame(entity, PipelineStage::Dedupe, e))?;
    let mut seen = HashSet::new();
    let keep: Vec<bool> = signatures
        .iter()
        .map(|signature| seen.insert(signature.as_str()))
        .collect();
    df.filter(&row_mask("dedupe", &keep))
        .map_err(|e| PipelineError::frame(entity, PipelineStage::Dedupe, e))
}

use harmonize_model::EntityDescriptor;
use polars::prelude::*;

use crate::error::{PipelineError, PipelineStage};
use crate::frame_utils::{has_column, missing_columns};

/// Renames columns, then selects and orders the declared output columns.
///
/// The surrogate id column, when present, always survives selection and leads
/// the output if it was not listed.
pub fn translate(entity: &EntityDescriptor, df: &DataFrame) -> Result<DataFrame, PipelineError> {
    let name = entity.name.as_str();
    let mut out = df.clone();

    let sources: Vec<String> = entity.rename.keys().cloned().collect();
    let missing = missing_columns(&out, &sources);
    if !missing.is_empty() {
        return Err(PipelineError::MissingColumns {
            entity: name.to_string(),
            stage: PipelineStage::Translate,
            columns: missing,
        });
    }
    for (from, to) in &entity.rename {
        if from == to {
            continue;
        }
        if has_column(&out, to) && !entity.rename.contains_key(to) {
            return Err(PipelineError::ColumnCollision {
                entity: name.to_string(),
                stage: PipelineStage::Translate,
                column: to.clone(),
            });
        }
    }
    // Two-phase rename so that swaps like {a = "b", b = "a"} work.
    let staged: Vec<(String, String, String)> = entity
        .rename
        .iter()
        .filter(|(from, to)| from != to)
        .enumerate()
        .map(|(idx, (from, to))| (from.clone(), format!("__rename_{idx}"), to.clone()))
        .collect();
    for (from, temp, _) in &staged {
        out.rename(from, temp.as_str().into())
            .map_err(|e| PipelineError::frame(name, PipelineStage::Translate, e))?;
    }
    for (_, temp, to) in &staged {
        out.rename(temp, to.as_str().into())
            .map_err(|e| PipelineError::frame(name, PipelineStage::Translate, e))?;
    }

    if entity.columns.is_empty() {
        return Ok(out);
    }
    let mut selection: Vec<String> = Vec::with_capacity(entity.columns.len() + 1);
    if let Some(id) = &entity.surrogate_id
        && has_column(&out, id)
        && !entity.columns.contains(id)
    {
        selection.push(id.clone());
    }
    selection.extend(entity.columns.iter().cloned());
    let missing = missing_columns(&out, &selection);
    if !missing.is_empty() {
        return Err(PipelineError::MissingColumns {
            entity: name.to_string(),
            stage: PipelineStage::Translate,
            columns: missing,
        });
    }
    out.select(selection.iter().map(String::as_str))
        .map_err(|e| PipelineError::frame(name, PipelineStage::Translate, e))
}

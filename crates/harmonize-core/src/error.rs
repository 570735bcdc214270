use std::fmt;

use polars::prelude::PolarsError;
use serde::Serialize;
use thiserror::Error;

use crate::constraints::ConstraintViolation;
use crate::extract::ExtractError;
use crate::filter::FilterError;
use crate::graph::GraphError;
use crate::linker::LinkError;
use crate::store::StoreError;
use crate::unnest::UnnestError;

/// Per-entity pipeline stage, as reported in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Extract,
    Filter,
    Dedupe,
    Link,
    Unnest,
    Translate,
    SurrogateId,
    KeyCheck,
    Store,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Extract => "extract",
            PipelineStage::Filter => "filter",
            PipelineStage::Dedupe => "dedupe",
            PipelineStage::Link => "link",
            PipelineStage::Unnest => "unnest",
            PipelineStage::Translate => "translate",
            PipelineStage::SurrogateId => "surrogate_id",
            PipelineStage::KeyCheck => "key_check",
            PipelineStage::Store => "store",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal failure of a run. Every variant but `Graph` names the entity.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("entity {entity} is in the processing order but has no descriptor")]
    UnknownEntity { entity: String },

    #[error("entity {entity}: extract failed: {source}")]
    Extract {
        entity: String,
        #[source]
        source: ExtractError,
    },

    #[error("entity {entity}: {stage}: column {column} already exists")]
    ColumnCollision {
        entity: String,
        stage: PipelineStage,
        column: String,
    },

    #[error("entity {entity}: filter failed: {source}")]
    Filter {
        entity: String,
        #[source]
        source: FilterError,
    },

    #[error("entity {entity}: {stage}: missing column(s) {}", columns.join(", "))]
    MissingColumns {
        entity: String,
        stage: PipelineStage,
        columns: Vec<String>,
    },

    #[error("entity {entity}: link failed: {source}")]
    Link {
        entity: String,
        #[source]
        source: LinkError,
    },

    #[error("entity {entity}: unnest failed: {source}")]
    Unnest {
        entity: String,
        #[source]
        source: UnnestError,
    },

    #[error(
        "entity {entity}: {stage}: {duplicates} duplicate row(s) on [{}] (e.g. {})",
        columns.join(", "),
        sample.join("; ")
    )]
    DuplicateKey {
        entity: String,
        stage: PipelineStage,
        columns: Vec<String>,
        duplicates: usize,
        sample: Vec<String>,
    },

    #[error("entity {entity}: {stage}: {rows} row(s) with null {column}")]
    NullKey {
        entity: String,
        stage: PipelineStage,
        column: String,
        rows: usize,
    },

    #[error("entity {entity}: {source}")]
    Store {
        entity: String,
        #[source]
        source: StoreError,
    },

    #[error("entity {entity}: {stage}: {source}")]
    Frame {
        entity: String,
        stage: PipelineStage,
        #[source]
        source: PolarsError,
    },
}

impl PipelineError {
    pub(crate) fn frame(entity: &str, stage: PipelineStage, source: PolarsError) -> Self {
        Self::Frame {
            entity: entity.to_string(),
            stage,
            source,
        }
    }

    /// Entity whose pipeline failed.
    pub fn entity(&self) -> Option<&str> {
        match self {
            PipelineError::Graph(_) => None,
            PipelineError::UnknownEntity { entity }
            | PipelineError::Extract { entity, .. }
            | PipelineError::ColumnCollision { entity, .. }
            | PipelineError::Filter { entity, .. }
            | PipelineError::MissingColumns { entity, .. }
            | PipelineError::Link { entity, .. }
            | PipelineError::Unnest { entity, .. }
            | PipelineError::DuplicateKey { entity, .. }
            | PipelineError::NullKey { entity, .. }
            | PipelineError::Store { entity, .. }
            | PipelineError::Frame { entity, .. } => Some(entity),
        }
    }

    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            PipelineError::Graph(_) | PipelineError::UnknownEntity { .. } => None,
            PipelineError::Extract { .. } => Some(PipelineStage::Extract),
            PipelineError::Filter { .. } => Some(PipelineStage::Filter),
            PipelineError::Link { .. } => Some(PipelineStage::Link),
            PipelineError::Unnest { .. } => Some(PipelineStage::Unnest),
            PipelineError::Store { .. } => Some(PipelineStage::Store),
            PipelineError::ColumnCollision { stage, .. }
            | PipelineError::MissingColumns { stage, .. }
            | PipelineError::DuplicateKey { stage, .. }
            | PipelineError::NullKey { stage, .. }
            | PipelineError::Frame { stage, .. } => Some(*stage),
        }
    }

    /// Constraint violations behind a failed link; empty otherwise.
    pub fn violations(&self) -> &[ConstraintViolation] {
        match self {
            PipelineError::Link { source, .. } => source.violations(),
            _ => &[],
        }
    }
}

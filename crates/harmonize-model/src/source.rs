use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::value::ScalarValue;

/// Where an entity's rows come from.
///
/// One extract handler exists per variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceDescriptor {
    /// Literal rows written in configuration. Short rows are padded with nulls.
    Fixed {
        columns: Vec<String>,
        #[serde(default)]
        values: Vec<Vec<ScalarValue>>,
    },
    /// A delimited text file; every column is read as text, empty cells are null.
    Csv {
        path: PathBuf,
        #[serde(default)]
        delimiter: Option<char>,
        /// Subset of columns to keep (all when empty).
        #[serde(default)]
        columns: Vec<String>,
    },
    /// A copy of another entity's stored table.
    Entity { entity: String },
}

impl SourceDescriptor {
    pub fn fixed<C, S>(columns: C, values: Vec<Vec<ScalarValue>>) -> Self
    where
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Fixed {
            columns: columns.into_iter().map(Into::into).collect(),
            values,
        }
    }

    pub fn csv(path: impl Into<PathBuf>) -> Self {
        Self::Csv {
            path: path.into(),
            delimiter: None,
            columns: Vec::new(),
        }
    }

    pub fn entity(entity: impl Into<String>) -> Self {
        Self::Entity {
            entity: entity.into(),
        }
    }

    /// Short name of the source type, as written in configuration.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fixed { .. } => "fixed",
            Self::Csv { .. } => "csv",
            Self::Entity { .. } => "entity",
        }
    }

    /// Entity this source reads from, if any.
    pub fn entity_reference(&self) -> Option<&str> {
        match self {
            Self::Entity { entity } => Some(entity),
            _ => None,
        }
    }

    /// Rewrites a relative CSV path against `base`.
    pub fn resolve_relative_to(&mut self, base: &Path) {
        if let Self::Csv { path, .. } = self
            && path.is_relative()
        {
            *path = base.join(&*path);
        }
    }
}

/// A post-load row filter. Filters only remove rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterDescriptor {
    /// Keep rows whose `column` value occurs in `entity.remote_column`.
    ExistsIn {
        column: String,
        entity: String,
        remote_column: String,
    },
    /// Keep rows whose `column` renders equal to `value`.
    Equals { column: String, value: ScalarValue },
    /// Keep rows with no null in any of `columns`.
    NotNull { columns: Vec<String> },
}

impl FilterDescriptor {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ExistsIn { .. } => "exists_in",
            Self::Equals { .. } => "equals",
            Self::NotNull { .. } => "not_null",
        }
    }

    pub fn entity_reference(&self) -> Option<&str> {
        match self {
            Self::ExistsIn { entity, .. } => Some(entity),
            _ => None,
        }
    }
}

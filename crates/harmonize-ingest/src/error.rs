use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised while turning a source into a table.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("read csv {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("csv delimiter {delimiter:?} is not a single-byte character")]
    InvalidDelimiter { delimiter: char },

    #[error("{}: duplicate column {column}", path.display())]
    DuplicateHeader { path: PathBuf, column: String },

    #[error("{}: missing column(s) {}", path.display(), columns.join(", "))]
    MissingColumns { path: PathBuf, columns: Vec<String> },

    #[error("fixed values row {row} has {found} value(s) but only {expected} column(s) are declared")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("duplicate fixed column {column}")]
    DuplicateFixedColumn { column: String },

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

pub type Result<T> = std::result::Result<T, IngestError>;

//! Source extraction.
//!
//! The [`Extractor`] trait is the seam to external loaders: one call per
//! entity, returning a fresh table that the pipeline owns.

use harmonize_ingest::{CsvOptions, IngestError, build_fixed_frame, read_csv_frame};
use harmonize_model::{EntityDescriptor, SourceDescriptor};
use polars::prelude::DataFrame;
use thiserror::Error;

use crate::store::{StoreError, TableStore};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Produces the raw table of an entity from its source descriptor.
///
/// `store` gives read-only access to entities processed earlier.
pub trait Extractor: Send + Sync {
    fn extract(
        &self,
        entity: &EntityDescriptor,
        store: &TableStore,
    ) -> Result<DataFrame, ExtractError>;
}

/// Loads fixed values and CSV files, and copies stored entities.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExtractor;

impl Extractor for DefaultExtractor {
    fn extract(
        &self,
        entity: &EntityDescriptor,
        store: &TableStore,
    ) -> Result<DataFrame, ExtractError> {
        match &entity.source {
            SourceDescriptor::Fixed { columns, values } => Ok(build_fixed_frame(columns, values)?),
            SourceDescriptor::Csv {
                path,
                delimiter,
                columns,
            } => {
                let options = CsvOptions {
                    delimiter: *delimiter,
                    columns: columns.clone(),
                };
                Ok(read_csv_frame(path, &options)?)
            }
            SourceDescriptor::Entity { entity: source } => Ok(store.require(source)?.clone()),
        }
    }
}

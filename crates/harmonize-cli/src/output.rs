//! CSV output of stored entity tables.
//!
//! Cells use the same text rendering as join keys; nulls are written as empty
//! cells.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use harmonize_core::TableStore;
use harmonize_ingest::any_to_string;
use polars::prelude::DataFrame;
use tracing::debug;

/// Output file of `entity` under `dir`.
pub fn output_path(dir: &Path, entity: &str) -> PathBuf {
    dir.join(format!("{entity}.csv"))
}

/// Writes one CSV per stored entity, in processing order.
///
/// Tables are written into a staging directory inside `dir` and only moved
/// into place once every table has been written, so a failed write leaves
/// `dir` without any new CSV.
pub fn write_tables(store: &TableStore, dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let staging = tempfile::Builder::new()
        .prefix(".harmonize-")
        .tempdir_in(dir)
        .with_context(|| format!("create staging directory in {}", dir.display()))?;

    let mut staged = Vec::with_capacity(store.len());
    for (entity, table) in store.iter() {
        let path = output_path(staging.path(), entity);
        write_table(table, &path).with_context(|| format!("write {entity} table"))?;
        staged.push((entity, path, table.height()));
    }

    let mut written = Vec::with_capacity(staged.len());
    for (entity, staged_path, rows) in staged {
        let path = output_path(dir, entity);
        fs::rename(&staged_path, &path)
            .with_context(|| format!("move {entity} table to {}", path.display()))?;
        debug!(entity, path = %path.display(), rows, "wrote table");
        written.push((entity.to_string(), path));
    }
    Ok(written)
}

/// Writes `table` as a header row plus one record per row.
pub fn write_table(table: &DataFrame, path: &Path) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("open {}", path.display()))?;
    writer.write_record(table.get_column_names_str())?;
    let columns = table.get_columns();
    let mut record: Vec<String> = Vec::with_capacity(columns.len());
    for row in 0..table.height() {
        record.clear();
        for column in columns {
            record.push(any_to_string(column.get(row)?));
        }
        writer.write_record(&record)?;
    }
    writer
        .flush()
        .with_context(|| format!("flush {}", path.display()))?;
    Ok(())
}

use std::collections::BTreeSet;
use std::path::Path;

use csv::ReaderBuilder;
use polars::prelude::*;
use tracing::debug;

use crate::error::{IngestError, Result};

/// Reader options for a CSV source.
#[derive(Debug, Clone, Default)]
pub struct CsvOptions {
    /// Field delimiter; `,` when unset.
    pub delimiter: Option<char>,
    /// Columns to keep, in this order. Empty keeps every column.
    pub columns: Vec<String>,
}

fn normalize_header(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

fn normalize_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn delimiter_byte(delimiter: Option<char>) -> Result<u8> {
    let delimiter = delimiter.unwrap_or(',');
    if delimiter.is_ascii() {
        Ok(delimiter as u8)
    } else {
        Err(IngestError::InvalidDelimiter { delimiter })
    }
}

/// Reads a CSV file with a header row into a table of String columns.
///
/// Cells are trimmed and empty cells become null. Short records are padded.
pub fn read_csv_frame(path: &Path, options: &CsvOptions) -> Result<DataFrame> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter_byte(options.delimiter)?)
        .from_path(path)
        .map_err(|source| IngestError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|source| IngestError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .iter()
        .map(normalize_header)
        .collect();
    let mut seen = BTreeSet::new();
    for header in &headers {
        if !seen.insert(header.as_str()) {
            return Err(IngestError::DuplicateHeader {
                path: path.to_path_buf(),
                column: header.clone(),
            });
        }
    }

    let selected: Vec<usize> = if options.columns.is_empty() {
        (0..headers.len()).collect()
    } else {
        let missing: Vec<String> = options
            .columns
            .iter()
            .filter(|name| !headers.contains(*name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(IngestError::MissingColumns {
                path: path.to_path_buf(),
                columns: missing,
            });
        }
        options
            .columns
            .iter()
            .filter_map(|name| headers.iter().position(|header| header == name))
            .collect()
    };

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); selected.len()];
    for record in reader.records() {
        let record = record.map_err(|source| IngestError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        for (slot, &idx) in cells.iter_mut().zip(selected.iter()) {
            slot.push(record.get(idx).and_then(normalize_cell));
        }
    }

    let columns: Vec<Column> = selected
        .iter()
        .zip(cells)
        .map(|(&idx, values)| Series::new(headers[idx].as_str().into(), values).into())
        .collect();
    let df = DataFrame::new(columns)?;
    debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "read csv source"
    );
    Ok(df)
}

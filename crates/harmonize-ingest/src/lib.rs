//! Source loaders for the harmonize engine.
//!
//! Every loader produces a polars `DataFrame`; the engine never sees the raw
//! file or literal representation.

pub mod csv_table;
pub mod error;
pub mod fixed;
pub mod polars_utils;

pub use csv_table::{CsvOptions, read_csv_frame};
pub use error::{IngestError, Result};
pub use fixed::{build_fixed_frame, scalar_column};
pub use polars_utils::{any_to_key, any_to_string, format_numeric};

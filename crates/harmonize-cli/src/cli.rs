//! CLI argument definitions for the harmonize engine.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "harmonize",
    version,
    about = "Harmonize - Build linked entity tables from declarative sources",
    long_about = "Build linked entity tables from CSV files and fixed values.\n\n\
                  Entities are processed in dependency order. Foreign keys are joined\n\
                  and validated against their declared constraints; any violation\n\
                  aborts the run before output is written."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Process every entity of a project and write one CSV per entity.
    Run(RunArgs),

    /// Print the processing order of a project.
    Order(OrderArgs),

    /// List the registered constraint validators.
    Constraints,
}

#[derive(Parser)]
pub struct RunArgs {
    /// Path to the project TOML file.
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Output directory for entity tables (default: <CONFIG_DIR>/output).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Process and report without writing output files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Write a JSON run report (entity summaries, or the failure with its
    /// constraint violations).
    #[arg(long = "report", value_name = "PATH")]
    pub report: Option<PathBuf>,
}

#[derive(Parser)]
pub struct OrderArgs {
    /// Path to the project TOML file.
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

//! Run results as printed by the CLI and written with `--report`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use harmonize_core::{ConstraintViolation, EntityReport, PipelineError, PipelineStage};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub project: String,
    pub config: PathBuf,
    /// `None` for dry runs.
    pub output_dir: Option<PathBuf>,
    pub entities: Vec<EntitySummary>,
}

impl RunSummary {
    pub fn total_rows(&self) -> usize {
        self.entities.iter().map(|e| e.rows).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.entities.iter().map(|e| e.warnings.len()).sum()
    }
}

#[derive(Debug, Serialize)]
pub struct EntitySummary {
    pub entity: String,
    pub source: &'static str,
    pub dependencies: Vec<String>,
    pub rows: usize,
    pub columns: usize,
    pub warnings: Vec<String>,
    pub output: Option<PathBuf>,
    pub duration_ms: u128,
}

impl EntitySummary {
    pub fn from_report(report: &EntityReport, dependencies: &[String]) -> Self {
        Self {
            entity: report.entity.clone(),
            source: report.source,
            dependencies: dependencies.to_vec(),
            rows: report.rows,
            columns: report.columns,
            warnings: report.warnings.clone(),
            output: None,
            duration_ms: report.duration.as_millis(),
        }
    }
}

/// A failed run: where it stopped and every violation of the failing stage.
#[derive(Debug, Serialize)]
pub struct FailureReport {
    pub project: String,
    pub entity: Option<String>,
    pub stage: Option<PipelineStage>,
    pub message: String,
    pub violations: Vec<ConstraintViolation>,
}

impl FailureReport {
    pub fn from_error(project: &str, error: &PipelineError) -> Self {
        Self {
            project: project.to_string(),
            entity: error.entity().map(str::to_string),
            stage: error.stage(),
            message: error.to_string(),
            violations: error.violations().to_vec(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunReport<'a> {
    Succeeded(&'a RunSummary),
    Failed(&'a FailureReport),
}

pub fn write_report(path: &Path, report: &RunReport<'_>) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("serialize run report")?;
    fs::write(path, json).with_context(|| format!("write {}", path.display()))
}

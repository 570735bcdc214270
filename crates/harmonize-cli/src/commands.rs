use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use comfy_table::{Cell, CellAlignment, Table};
use harmonize_config::{Project, load_project};
use harmonize_core::{
    Normalizer, PipelineError, ProcessState, RunOutput, TableStore, default_registry,
};
use harmonize_model::JoinHow;
use tracing::{info, info_span, warn};

use harmonize_cli::output::write_tables;
use harmonize_cli::report::{EntitySummary, FailureReport, RunReport, RunSummary, write_report};

use crate::cli::{OrderArgs, RunArgs};
use crate::summary::{align_column, apply_table_style, dim_cell, entity_cell, header_cell};

const JOIN_TYPES: [JoinHow; 4] = [JoinHow::Inner, JoinHow::Left, JoinHow::Outer, JoinHow::Cross];

pub fn run_project(args: &RunArgs) -> Result<RunSummary> {
    let start = Instant::now();
    let project = load_project(&args.config)
        .with_context(|| format!("load project {}", args.config.display()))?;
    let project_span = info_span!("project", project = %project.name());
    let _project_guard = project_span.enter();

    let (state, output) = match execute(&project) {
        Ok(done) => done,
        Err(error) => {
            if let Some(path) = &args.report {
                let failure = FailureReport::from_error(project.name(), &error);
                write_report(path, &RunReport::Failed(&failure))?;
            }
            return Err(error.into());
        }
    };

    let output_dir = if args.dry_run {
        None
    } else {
        Some(args.output_dir.clone().unwrap_or_else(|| {
            args.config
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("output")
        }))
    };
    let written: BTreeMap<String, _> = match &output_dir {
        Some(dir) => write_tables(&output.store, dir)?.into_iter().collect(),
        None => BTreeMap::new(),
    };

    let entities = output
        .reports
        .iter()
        .map(|report| {
            let mut summary = EntitySummary::from_report(report, state.dependencies(&report.entity));
            summary.output = written.get(&report.entity).cloned();
            summary
        })
        .collect();
    let summary = RunSummary {
        project: project.name().to_string(),
        config: args.config.clone(),
        output_dir,
        entities,
    };
    if let Some(path) = &args.report {
        write_report(path, &RunReport::Succeeded(&summary))?;
    }
    info!(
        entity_count = summary.entities.len(),
        total_rows = summary.total_rows(),
        files = written.len(),
        duration_ms = start.elapsed().as_millis(),
        "project complete"
    );
    Ok(summary)
}

/// Orders the graph and runs every entity. Nothing is written here.
fn execute(project: &Project) -> Result<(ProcessState, RunOutput), PipelineError> {
    let state = ProcessState::build(&project.entities)?;
    let output = Normalizer::new().run_with_report(&state, &project.entities, TableStore::new())?;
    if output.warning_count() > 0 {
        warn!(
            warnings = output.warning_count(),
            "run completed with data quality warnings"
        );
    }
    Ok((state, output))
}

pub fn run_order(args: &OrderArgs) -> Result<()> {
    let project = load_project(&args.config)
        .with_context(|| format!("load project {}", args.config.display()))?;
    let state = ProcessState::build(&project.entities).context("build processing order")?;

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("#"),
        header_cell("Entity"),
        header_cell("Source"),
        header_cell("Depends on"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    for (position, name) in state.order().iter().enumerate() {
        let source = project
            .entity(name)
            .map_or("-", |entity| entity.source.kind());
        let dependencies = state.dependencies(name);
        table.add_row(vec![
            Cell::new(position + 1),
            entity_cell(name),
            Cell::new(source),
            if dependencies.is_empty() {
                dim_cell("-")
            } else {
                Cell::new(dependencies.join(", "))
            },
        ]);
    }
    println!("Project: {}", project.name());
    println!("{table}");
    Ok(())
}

pub fn run_constraints() -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Stage"),
        header_cell("Constraint"),
        header_cell("Joins"),
        header_cell("Description"),
    ]);
    apply_table_style(&mut table);
    for validator in default_registry().iter() {
        let joins: Vec<&str> = JOIN_TYPES
            .iter()
            .filter(|how| validator.applies_to(**how))
            .map(JoinHow::as_str)
            .collect();
        table.add_row(vec![
            validator.stage().as_str().to_string(),
            validator.key().as_str().to_string(),
            joins.join(", "),
            validator.description().to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

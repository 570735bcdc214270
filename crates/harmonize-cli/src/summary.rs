use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use harmonize_cli::report::RunSummary;
use harmonize_core::ConstraintViolation;

pub fn print_summary(result: &RunSummary) {
    println!("Project: {}", result.project);
    match &result.output_dir {
        Some(dir) => println!("Output: {}", dir.display()),
        None => println!("Output: (dry run, nothing written)"),
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Entity"),
        header_cell("Source"),
        header_cell("Depends on"),
        header_cell("Rows"),
        header_cell("Columns"),
        header_cell("Warnings"),
        header_cell("CSV"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Right);
    align_column(&mut table, 5, CellAlignment::Right);
    align_column(&mut table, 6, CellAlignment::Center);
    for summary in &result.entities {
        let dependencies = if summary.dependencies.is_empty() {
            dim_cell("-")
        } else {
            Cell::new(summary.dependencies.join(", "))
        };
        table.add_row(vec![
            entity_cell(&summary.entity),
            Cell::new(summary.source),
            dependencies,
            Cell::new(summary.rows),
            Cell::new(summary.columns),
            count_cell(summary.warnings.len(), Color::Yellow),
            output_cell(summary.output.is_some()),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
        Cell::new(result.total_rows()).add_attribute(Attribute::Bold),
        dim_cell("-"),
        count_cell(result.warning_count(), Color::Yellow).add_attribute(Attribute::Bold),
        dim_cell("-"),
    ]);
    println!("{table}");
    print_warnings(result);
}

fn print_warnings(result: &RunSummary) {
    let warnings: Vec<(&str, &str)> = result
        .entities
        .iter()
        .flat_map(|summary| {
            summary
                .warnings
                .iter()
                .map(move |warning| (summary.entity.as_str(), warning.as_str()))
        })
        .collect();
    if warnings.is_empty() {
        return;
    }
    println!();
    println!("Warnings:");
    for (entity, warning) in warnings {
        println!("- {entity}: {warning}");
    }
}

/// Prints every constraint violation of a failed run to stderr.
pub fn print_violations(violations: &[ConstraintViolation]) {
    if violations.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Entity"),
        header_cell("Remote"),
        header_cell("Stage"),
        header_cell("Constraint"),
        header_cell("Detail"),
    ]);
    apply_table_style(&mut table);
    for violation in violations {
        table.add_row(vec![
            entity_cell(&violation.entity),
            entity_cell(&violation.remote_entity),
            Cell::new(violation.stage.as_str()),
            Cell::new(violation.key.as_str())
                .fg(Color::Red)
                .add_attribute(Attribute::Bold),
            Cell::new(violation.detail.to_string()),
        ]);
    }
    eprintln!("Constraint violations:");
    eprintln!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
}

pub fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

pub fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

pub fn entity_cell(name: &str) -> Cell {
    Cell::new(name)
        .fg(Color::Blue)
        .add_attribute(Attribute::Bold)
}

fn output_cell(written: bool) -> Cell {
    if written {
        Cell::new("✓")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold)
    } else {
        dim_cell("-")
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

pub fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use dsr_model::Strategy;

use crate::pipeline::PipelineResult;

pub fn print_summary(result: &PipelineResult) {
    println!("Report: {}", result.document_path.display());
    println!("Records: {}", result.records_path.display());
    println!("Population report: {}", result.report_path.display());
    println!(
        "Index: {} sections ({})",
        result.sections,
        if result.index_rebuilt { "rebuilt" } else { "cached" }
    );

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Strategy"),
        header_cell("Sources"),
        header_cell("Chars"),
        header_cell("Reason"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Right);

    for record in &result.records {
        let chars = record.text.as_deref().map_or(0, str::len);
        table.add_row(vec![
            Cell::new(&record.field_id),
            strategy_cell(record.strategy),
            Cell::new(record.sources.join(", ")),
            Cell::new(chars),
            reason_cell(record.reason.as_deref()),
        ]);
    }
    println!("{table}");

    let count = |strategy: Strategy| {
        result
            .records
            .iter()
            .filter(|r| r.strategy == strategy)
            .count()
    };
    println!(
        "{} fields: {} direct, {} synthesized, {} unavailable",
        result.records.len(),
        count(Strategy::Direct),
        count(Strategy::Synthesize),
        count(Strategy::Unavailable)
    );
    if !result.report.unmatched_placeholders.is_empty() {
        println!(
            "Placeholders without a mapping rule: {}",
            result.report.unmatched_placeholders.join(", ")
        );
    }
    if !result.report.missing_in_template.is_empty() {
        println!(
            "Mapped fields absent from the template: {}",
            result.report.missing_in_template.join(", ")
        );
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
}

pub fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

pub fn strategy_cell(strategy: Strategy) -> Cell {
    match strategy {
        Strategy::Direct => Cell::new("direct").fg(Color::Green),
        Strategy::Synthesize => Cell::new("synthesize").fg(Color::Blue),
        Strategy::Unavailable => Cell::new("unavailable").fg(Color::Yellow),
    }
}

fn reason_cell(reason: Option<&str>) -> Cell {
    match reason {
        Some(reason) => Cell::new(reason),
        None => Cell::new("-").fg(Color::DarkGrey),
    }
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

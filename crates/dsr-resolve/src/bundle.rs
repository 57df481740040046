//! Source bundle assembly for synthesis.
//!
//! Resolved sections are concatenated in reference priority order, each
//! labelled with its key and title and followed by a flattened rendering
//! of its tables. When the bundle exceeds the character budget, the
//! highest-priority sources stay whole and the lowest-priority sources
//! are dropped first.

use tracing::debug;

use dsr_model::{Section, TableBlock};

/// Marker appended when lower-priority sources were dropped for budget.
const TRUNCATION_MARKER: &str = "[additional source content truncated]";

/// Assembled synthesis input with the keys that actually contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBundle {
    /// Keys of the sections present in the bundle, in priority order.
    pub sources: Vec<String>,
    /// Concatenated, labelled source text.
    pub text: String,
}

/// Builds a bundle from sections in priority order under a character
/// budget.
#[must_use]
pub fn build_bundle(sections: &[&Section], char_budget: usize) -> SourceBundle {
    let mut sources = Vec::new();
    let mut parts: Vec<String> = Vec::new();
    let mut used = 0usize;
    let mut dropped = 0usize;

    for (pos, section) in sections.iter().enumerate() {
        let part = render_section(section);
        if used + part.len() > char_budget && !parts.is_empty() {
            // Everything below this priority is dropped wholesale.
            dropped = sections.len() - pos;
            break;
        }
        if part.len() > char_budget && parts.is_empty() {
            // A single oversized top-priority source still contributes,
            // cut at the budget on a character boundary.
            let cut: String = part.chars().take(char_budget).collect();
            used += cut.len();
            parts.push(cut);
            sources.push(section.key.clone());
            continue;
        }
        used += part.len();
        parts.push(part);
        sources.push(section.key.clone());
    }

    if dropped > 0 {
        debug!(dropped, "bundle budget exceeded, dropped low-priority sources");
        parts.push(TRUNCATION_MARKER.to_string());
    }

    SourceBundle {
        sources,
        text: parts.join("\n\n"),
    }
}

fn render_section(section: &Section) -> String {
    let mut out = format!("### Section {} {}\n{}", section.key, section.title, section.text);
    for table in &section.tables {
        out.push_str("\n\n");
        out.push_str(&render_table(table));
    }
    out
}

/// Flattens a table to pipe-separated rows, one line per row.
fn render_table(table: &TableBlock) -> String {
    table
        .rows
        .iter()
        .map(|row| row.join(" | "))
        .collect::<Vec<_>>()
        .join("\n")
}

//! Mapping specification parser.
//!
//! The mapping artifact is a hand-maintained, row-oriented markdown table:
//!
//! ```text
//! | Report Field                     | Source Sections | Pages | Notes          |
//! |----------------------------------|-----------------|-------|----------------|
//! | [INSERT_INDICATIONS] Indications | 6.1             | 89    | copy verbatim  |
//! | [INSERT_RISKS] Key risks         | 6.4 + 6.5       | 92-97 | summarize both |
//! ```
//!
//! Rows whose first cell carries no bracketed placeholder are tolerated
//! and skipped (headers, separators, prose). A source with no parsable
//! rule row at all is a fatal [`MappingError::NoRules`].

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use dsr_model::{FieldRule, SourceRef, Strategy};

use crate::error::{MappingError, Result};

/// Phrases in the reference or notes cells that mark a field as not
/// producible from the source document.
const UNAVAILABLE_PHRASES: &[&str] = &[
    "n/a",
    "not available",
    "cannot be populated",
    "not in brochure",
    "external source",
    "safety database",
    "requires query",
];

/// Phrases in the notes cell that force synthesis.
const SYNTHESIS_PHRASES: &[&str] = &[
    "synthesize",
    "synthesis",
    "combine",
    "summarize",
    "multiple sections",
    "rewrite",
    "adapt",
];

/// Phrase that forces a verbatim copy even for multi-reference rules.
const VERBATIM_PHRASE: &str = "copy verbatim";

static TABLE_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\|([^|]*)\|([^|]*)\|([^|]*)\|([^|]*)\|").expect("valid table row regex")
});

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[INSERT_[A-Z0-9_]+\]").expect("valid placeholder regex")
});

static SECTION_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+(?:\.\d+)*\b").expect("valid section key regex"));

static PAGE_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*-\s*(\d+)").expect("valid page range regex"));

/// Parses a mapping source into field rules, preserving row order.
///
/// Duplicate placeholders yield independent rules, one per occurrence.
///
/// # Errors
///
/// Returns [`MappingError::NoRules`] when no row parses into a rule.
pub fn load_rules(source: &str) -> Result<Vec<FieldRule>> {
    let mut rules = Vec::new();

    for line in source.lines() {
        let Some(caps) = TABLE_ROW.captures(line) else {
            continue;
        };
        let field_cell = caps[1].trim();
        let refs_cell = caps[2].trim();
        let pages_cell = caps[3].trim();
        let notes_cell = caps[4].trim();

        // Header and separator rows carry no placeholder.
        let Some(placeholder) = PLACEHOLDER.find(field_cell) else {
            continue;
        };
        if field_cell.contains("---") || field_cell.contains("===") {
            continue;
        }

        let field_id = placeholder.as_str().to_string();
        let description = field_cell
            .replace(&field_id, "")
            .trim_matches([' ', '-', ':'])
            .to_string();

        let pages = parse_pages(pages_cell);
        let source_refs = parse_refs(refs_cell, &pages);
        let strategy_hint = classify(&source_refs, refs_cell, notes_cell);

        debug!(
            field = %field_id,
            refs = source_refs.len(),
            strategy = strategy_hint.label(),
            "parsed field rule"
        );
        rules.push(FieldRule {
            field_id,
            description,
            source_refs,
            strategy_hint,
            notes: notes_cell.to_string(),
        });
    }

    if rules.is_empty() {
        return Err(MappingError::NoRules);
    }
    Ok(rules)
}

/// Extracts section key references from the references cell, in the
/// order written. Page hints apply to every reference of the row.
fn parse_refs(refs_cell: &str, pages: &[u32]) -> Vec<SourceRef> {
    if contains_phrase(refs_cell, UNAVAILABLE_PHRASES) {
        return Vec::new();
    }
    SECTION_KEY
        .find_iter(refs_cell)
        .map(|m| SourceRef {
            key: m.as_str().to_string(),
            pages: pages.to_vec(),
        })
        .collect()
}

/// Parses page hints: single pages ("89"), ranges ("34-45"), and lists
/// ("15, 22, 34"), deduplicated and sorted.
fn parse_pages(pages_cell: &str) -> Vec<u32> {
    if pages_cell.is_empty() || pages_cell.eq_ignore_ascii_case("n/a") || pages_cell == "-" {
        return Vec::new();
    }

    let mut pages = Vec::new();
    for part in pages_cell.split(',') {
        let part = part.trim();
        if let Some(caps) = PAGE_RANGE.captures(part) {
            let start: u32 = caps[1].parse().unwrap_or(0);
            let end: u32 = caps[2].parse().unwrap_or(0);
            if start > 0 && end >= start {
                pages.extend(start..=end);
            }
        } else if let Some(m) = SECTION_KEY.find(part) {
            if let Ok(page) = m.as_str().parse() {
                pages.push(page);
            }
        }
    }
    pages.sort_unstable();
    pages.dedup();
    pages
}

/// Deterministic strategy classification.
///
/// Priority: explicit unavailability marks win, then an explicit
/// "copy verbatim", then synthesis phrasing, then the reference count.
/// Ambiguity falls back to synthesize, the safer non-silent default.
fn classify(refs: &[SourceRef], refs_cell: &str, notes_cell: &str) -> Strategy {
    if contains_phrase(refs_cell, UNAVAILABLE_PHRASES)
        || contains_phrase(notes_cell, UNAVAILABLE_PHRASES)
        || refs.is_empty()
    {
        return Strategy::Unavailable;
    }
    if contains_phrase(notes_cell, &[VERBATIM_PHRASE]) {
        return Strategy::Direct;
    }
    if contains_phrase(notes_cell, SYNTHESIS_PHRASES) || refs.len() > 1 {
        return Strategy::Synthesize;
    }
    Strategy::Direct
}

fn contains_phrase(cell: &str, phrases: &[&str]) -> bool {
    let lower = cell.to_lowercase();
    phrases.iter().any(|phrase| lower.contains(phrase))
}

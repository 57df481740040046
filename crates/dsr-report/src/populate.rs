//! Template population.
//!
//! The sink side of the pipeline: a plain-text or markdown template
//! carrying `[INSERT_...]` placeholders is populated from resolution
//! records by straight key-to-text substitution. Unavailable fields
//! substitute their marked placeholder text, so a gap is visible in the
//! rendered output instead of silently disappearing.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use dsr_model::ResolutionRecord;

use crate::report::PopulationReport;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[INSERT_[A-Z0-9_]+\]").expect("valid placeholder regex")
});

/// A populated template plus the accounting of what happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulatedDocument {
    /// Template text with every known placeholder substituted.
    pub text: String,
    /// Per-field accounting for the run.
    pub report: PopulationReport,
}

/// All unique placeholders in a template, in order of first appearance.
#[must_use]
pub fn find_placeholders(template: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for m in PLACEHOLDER.find_iter(template) {
        if !seen.iter().any(|s| s == m.as_str()) {
            seen.push(m.as_str().to_string());
        }
    }
    seen
}

/// Substitutes resolution records into a template.
///
/// Every occurrence of a known placeholder is replaced. Duplicate
/// records for one field collapse to the first resolved one (falling
/// back to the first record when none resolved). Placeholders without a
/// record are left in place and reported.
#[must_use]
pub fn populate(template: &str, records: &[ResolutionRecord]) -> PopulatedDocument {
    let mut by_field: BTreeMap<&str, &ResolutionRecord> = BTreeMap::new();
    for record in records {
        let replace = match by_field.get(record.field_id.as_str()) {
            Some(existing) => !existing.is_resolved() && record.is_resolved(),
            None => true,
        };
        if replace {
            by_field.insert(&record.field_id, record);
        }
    }

    let placeholders = find_placeholders(template);
    let mut text = template.to_string();
    let mut populated = Vec::new();
    let mut unavailable = Vec::new();
    let mut unmatched_placeholders = Vec::new();

    for placeholder in &placeholders {
        let Some(record) = by_field.get(placeholder.as_str()) else {
            warn!(field = %placeholder, "template placeholder has no resolution record");
            unmatched_placeholders.push(placeholder.clone());
            continue;
        };
        let replacement = record.text.as_deref().unwrap_or_default();
        text = text.replace(placeholder.as_str(), replacement);
        debug!(field = %placeholder, chars = replacement.len(), "placeholder substituted");
        if record.is_resolved() {
            populated.push(placeholder.clone());
        } else {
            unavailable.push(placeholder.clone());
        }
    }

    let missing_in_template = by_field
        .keys()
        .filter(|field| !placeholders.iter().any(|p| p == *field))
        .map(|field| (*field).to_string())
        .collect();

    PopulatedDocument {
        text,
        report: PopulationReport::new(
            populated,
            unavailable,
            missing_in_template,
            unmatched_placeholders,
        ),
    }
}

//! Population accounting.

use serde::{Deserialize, Serialize};

/// Per-field accounting for one population run.
///
/// Serialized to JSON next to the populated document so a reviewer can
/// see at a glance which fields carried real content, which were
/// explicitly unavailable, and where template and mapping disagree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationReport {
    /// When the report was generated (RFC 3339).
    pub generated_at: String,
    /// Placeholders substituted with resolved content.
    pub populated: Vec<String>,
    /// Placeholders substituted with an explicit unavailable marker.
    pub unavailable: Vec<String>,
    /// Fields with a resolution record but no placeholder in the
    /// template.
    pub missing_in_template: Vec<String>,
    /// Placeholders in the template with no resolution record; left in
    /// place untouched.
    pub unmatched_placeholders: Vec<String>,
}

impl PopulationReport {
    /// Builds a report stamped with the current time.
    #[must_use]
    pub fn new(
        populated: Vec<String>,
        unavailable: Vec<String>,
        missing_in_template: Vec<String>,
        unmatched_placeholders: Vec<String>,
    ) -> Self {
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            populated,
            unavailable,
            missing_in_template,
            unmatched_placeholders,
        }
    }

    /// Number of placeholders that received real content.
    #[must_use]
    pub fn populated_count(&self) -> usize {
        self.populated.len()
    }

    /// Number of placeholders carrying an unavailable marker.
    #[must_use]
    pub fn unavailable_count(&self) -> usize {
        self.unavailable.len()
    }

    /// True when every template placeholder received real content.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unavailable.is_empty() && self.unmatched_placeholders.is_empty()
    }
}

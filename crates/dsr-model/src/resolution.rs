//! Resolution records: the per-field outcome of a population run.

use serde::{Deserialize, Serialize};

use crate::rule::Strategy;

/// Marker prefix carried by the substitute text of unavailable fields,
/// so downstream consumers can tell "no data" from "data present but
/// empty".
pub const UNAVAILABLE_MARKER: &str = "[DATA NOT AVAILABLE";

/// Renders the fixed placeholder text for an unavailable field.
#[must_use]
pub fn unavailable_text(reason: &str) -> String {
    format!("{UNAVAILABLE_MARKER} - {reason}]")
}

/// The outcome of resolving one field rule against the section index.
///
/// Created once per field per run and immutable afterwards. Every field
/// in a run ends in exactly one record; silent omission is not permitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    /// Target placeholder token the record belongs to.
    pub field_id: String,
    /// Strategy that actually produced (or declined) the value.
    pub strategy: Strategy,
    /// Keys of the sections actually used, in priority order.
    pub sources: Vec<String>,
    /// Resolved text, or the marked placeholder for unavailable fields.
    pub text: Option<String>,
    /// Human-readable reason when the field is not fully resolved.
    pub reason: Option<String>,
}

impl ResolutionRecord {
    /// A verbatim direct extraction.
    #[must_use]
    pub fn direct(field_id: impl Into<String>, source: impl Into<String>, text: String) -> Self {
        Self {
            field_id: field_id.into(),
            strategy: Strategy::Direct,
            sources: vec![source.into()],
            text: Some(text),
            reason: None,
        }
    }

    /// A successful synthesis over the given source sections.
    #[must_use]
    pub fn synthesized(field_id: impl Into<String>, sources: Vec<String>, text: String) -> Self {
        Self {
            field_id: field_id.into(),
            strategy: Strategy::Synthesize,
            sources,
            text: Some(text),
            reason: None,
        }
    }

    /// An explicit non-resolution carrying a reason.
    ///
    /// The record text is the fixed marked placeholder so the gap stays
    /// visible in rendered output.
    #[must_use]
    pub fn unavailable(
        field_id: impl Into<String>,
        sources: Vec<String>,
        reason: impl Into<String>,
    ) -> Self {
        let reason = reason.into();
        Self {
            field_id: field_id.into(),
            strategy: Strategy::Unavailable,
            sources,
            text: Some(unavailable_text(&reason)),
            reason: Some(reason),
        }
    }

    /// True when the record carries usable (non-placeholder) text.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.strategy != Strategy::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_record_carries_marked_text_and_reason() {
        let record = ResolutionRecord::unavailable("[INSERT_X]", Vec::new(), "not in brochure");
        assert_eq!(record.strategy, Strategy::Unavailable);
        assert!(record.text.as_deref().unwrap().starts_with(UNAVAILABLE_MARKER));
        assert_eq!(record.reason.as_deref(), Some("not in brochure"));
        assert!(!record.is_resolved());
    }
}

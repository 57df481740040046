//! Field rules: one declarative mapping row per target placeholder.

use serde::{Deserialize, Serialize};

/// Extraction strategy for a target field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Verbatim copy of a single source section's text.
    Direct,
    /// Combine one or more source passages through the completion service.
    Synthesize,
    /// Explicit, reasoned non-resolution; the field cannot be produced.
    Unavailable,
}

impl Strategy {
    /// Lowercase label used in logs and summaries.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Synthesize => "synthesize",
            Self::Unavailable => "unavailable",
        }
    }
}

/// One section reference within a field rule, in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Section numbering key, e.g. "5.5.1".
    pub key: String,
    /// Optional page hints carried alongside the reference.
    #[serde(default)]
    pub pages: Vec<u32>,
}

impl SourceRef {
    /// Builds a reference with no page hints.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            pages: Vec::new(),
        }
    }
}

/// One row of the mapping specification.
///
/// Duplicate `field_id`s are permitted and represent independent
/// occurrences of the same placeholder; each is resolved on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    /// Target placeholder token, e.g. "[INSERT_INDICATIONS]".
    pub field_id: String,
    /// Human description of the field, taken from the mapping row.
    #[serde(default)]
    pub description: String,
    /// Candidate source references in priority order.
    pub source_refs: Vec<SourceRef>,
    /// Declared or inferred extraction strategy.
    pub strategy_hint: Strategy,
    /// Free-text notes; not interpreted beyond strategy classification
    /// and as the fallback unavailable reason.
    #[serde(default)]
    pub notes: String,
}

impl FieldRule {
    /// Reason string for an unavailable field: the notes when present,
    /// otherwise a generic marker.
    #[must_use]
    pub fn declared_reason(&self) -> Option<&str> {
        let notes = self.notes.trim();
        (!notes.is_empty()).then_some(notes)
    }
}

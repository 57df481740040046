//! The section index: the queryable, hierarchical view of a source document.
//!
//! Sections form a forest ordered by document position. Parent links are
//! key-based back-references resolved through the index, never owned
//! pointers, so the structure stays a flat arena.

use serde::{Deserialize, Serialize};

use crate::document::TableBlock;

/// Key assigned to content that precedes the first detected heading.
pub const PREAMBLE_KEY: &str = "preamble";

/// One indexed subdivision of the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Normalized numbering key (e.g. "5.5.1.2.4"), unique within the
    /// index. Headings without a numbering pattern get a synthetic key
    /// derived from document order (e.g. "#0007").
    pub key: String,
    /// Heading text, trimmed.
    pub title: String,
    /// Depth inferred from the numbering key's dot count; synthetic and
    /// keyword headings sit at level 1, the preamble at level 0.
    pub level: usize,
    /// First page of the section (inclusive).
    pub page_start: u32,
    /// Last page of the section (inclusive). Never less than `page_start`.
    pub page_end: u32,
    /// Body text strictly between this heading and the next heading of
    /// any level.
    pub text: String,
    /// Tables attributed to this section, in document order.
    #[serde(default)]
    pub tables: Vec<TableBlock>,
    /// Key of the nearest shallower-level section preceding this one.
    pub parent_key: Option<String>,
}

impl Section {
    /// True when the section has neither body text nor tables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.tables.is_empty()
    }
}

/// Ordered arena of sections plus key-based lookup.
///
/// The index is the cache medium: its JSON serialization must round-trip
/// exactly, so every field is plain data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionIndex {
    /// Content hash of the extraction the index was built from.
    pub source_hash: String,
    /// First page covered by the input.
    pub page_start: u32,
    /// Last page covered by the input.
    pub page_end: u32,
    /// Sections in document order. A non-empty preamble, when present,
    /// is the first entry under [`PREAMBLE_KEY`].
    pub sections: Vec<Section>,
}

impl SectionIndex {
    /// Number of sections in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// True when the index holds no sections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Looks up a section by exact key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.key == key)
    }

    /// Sections whose key starts with `prefix` followed by a dot, in
    /// document order. A reference to "6.4" matches "6.4.1" and
    /// "6.4.1.2" but not "6.40".
    #[must_use]
    pub fn with_prefix(&self, prefix: &str) -> Vec<&Section> {
        let dotted = format!("{prefix}.");
        self.sections
            .iter()
            .filter(|s| s.key.starts_with(&dotted))
            .collect()
    }

    /// Resolves a section's parent through its back-reference key.
    #[must_use]
    pub fn parent_of(&self, section: &Section) -> Option<&Section> {
        section.parent_key.as_deref().and_then(|key| self.get(key))
    }
}

//! Raw extraction output consumed by the indexer.
//!
//! These types are produced once by the external PDF/text extraction step
//! and never mutated afterwards. Blocks arrive ordered by page and then by
//! their original sequence within the page.

use serde::{Deserialize, Serialize};

/// A page-tagged run of extracted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    /// 1-indexed page number the text was extracted from.
    pub page: u32,
    /// Raw text content, line breaks preserved.
    pub text: String,
}

/// A page-tagged extracted table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableBlock {
    /// 1-indexed page number the table was extracted from.
    pub page: u32,
    /// Table cells as rows of column strings.
    pub rows: Vec<Vec<String>>,
}

/// The full extraction payload for one source document.
///
/// Pages must be complete and in order; the extractor contract forbids
/// skipped or reordered pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// Text blocks in page/sequence order.
    pub blocks: Vec<TextBlock>,
    /// Table blocks in page/sequence order.
    #[serde(default)]
    pub tables: Vec<TableBlock>,
}

impl ExtractedDocument {
    /// Highest page number present in the extraction, if any.
    #[must_use]
    pub fn last_page(&self) -> Option<u32> {
        let text_max = self.blocks.iter().map(|b| b.page).max();
        let table_max = self.tables.iter().map(|t| t.page).max();
        text_max.max(table_max)
    }

    /// True when the extraction carries no text at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|b| b.text.trim().is_empty())
    }
}

pub mod document;
pub mod resolution;
pub mod rule;
pub mod section;

pub use document::{ExtractedDocument, TableBlock, TextBlock};
pub use resolution::{ResolutionRecord, UNAVAILABLE_MARKER, unavailable_text};
pub use rule::{FieldRule, SourceRef, Strategy};
pub use section::{PREAMBLE_KEY, Section, SectionIndex};

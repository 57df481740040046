//! Single-pass document indexer.
//!
//! Walks the extracted blocks in page/sequence order, feeding each line
//! to the heading detector. Every accepted heading closes the previous
//! section's text span and opens a new one. Content before the first
//! heading lands in an implicit preamble section; a document with no
//! detected headings at all degenerates to a single section rather than
//! failing.

use tracing::{debug, info};

use dsr_model::{ExtractedDocument, PREAMBLE_KEY, Section, SectionIndex, TableBlock};

use crate::error::{IndexError, Result};
use crate::heading::{HeadingDetector, LineClass};

/// An accepted heading whose span has not been closed yet.
struct OpenSection {
    key: String,
    title: String,
    level: usize,
    page_start: u32,
    parent_key: Option<String>,
    lines: Vec<String>,
}

impl OpenSection {
    fn preamble(page: u32) -> Self {
        Self {
            key: PREAMBLE_KEY.to_string(),
            title: String::new(),
            level: 0,
            page_start: page,
            parent_key: None,
            lines: Vec::new(),
        }
    }

    fn close(self) -> Section {
        Section {
            key: self.key,
            title: self.title,
            level: self.level,
            page_start: self.page_start,
            // Placeholder until the page-range pass runs.
            page_end: self.page_start,
            text: self.lines.join("\n").trim().to_string(),
            tables: Vec::new(),
            parent_key: self.parent_key,
        }
    }
}

/// Builds a section index from an extracted document.
///
/// # Errors
///
/// Returns [`IndexError::EmptyDocument`] when the extraction holds no
/// text blocks; every other input produces an index.
pub fn build_index(doc: &ExtractedDocument, source_hash: impl Into<String>) -> Result<SectionIndex> {
    if doc.blocks.is_empty() || doc.is_empty() {
        return Err(IndexError::EmptyDocument);
    }

    // Flatten to page-tagged lines so the detector can see neighbors
    // across block boundaries.
    let lines: Vec<(u32, &str)> = doc
        .blocks
        .iter()
        .flat_map(|block| block.text.lines().map(move |line| (block.page, line)))
        .collect();

    let first_page = doc.blocks.first().map_or(1, |b| b.page);
    let last_page = doc.last_page().unwrap_or(first_page);

    let mut detector = HeadingDetector::new();
    let mut sections: Vec<Section> = Vec::new();
    // Stack of (level, key) tracking the open ancestry for parent links.
    let mut ancestry: Vec<(usize, String)> = Vec::new();
    let mut synthetic_seq = 0usize;
    let mut current = OpenSection::preamble(first_page);

    for (pos, &(page, line)) in lines.iter().enumerate() {
        let prev = pos.checked_sub(1).map(|p| lines[p].1);
        let next = lines.get(pos + 1).map(|l| l.1);

        match detector.classify(prev, line, next) {
            LineClass::Heading(candidate) => {
                let key = match candidate.key {
                    Some(key) => key,
                    None => {
                        synthetic_seq += 1;
                        format!("#{synthetic_seq:04}")
                    }
                };
                debug!(key = %key, title = %candidate.title, page, "accepted heading");

                close_section(&mut sections, current);
                while ancestry
                    .last()
                    .is_some_and(|(level, _)| *level >= candidate.level)
                {
                    ancestry.pop();
                }
                let parent_key = ancestry.last().map(|(_, key)| key.clone());
                ancestry.push((candidate.level, key.clone()));

                current = OpenSection {
                    key,
                    title: candidate.title,
                    level: candidate.level,
                    page_start: page,
                    parent_key,
                    lines: Vec::new(),
                };
            }
            LineClass::Continuation => {}
            LineClass::Body => current.lines.push(line.to_string()),
        }
    }
    close_section(&mut sections, current);

    if sections.len() == 1 {
        info!("no headings detected, emitting single-section index");
    }

    let mut index = SectionIndex {
        source_hash: source_hash.into(),
        page_start: first_page,
        page_end: last_page,
        sections,
    };
    assign_page_ranges(&mut index.sections, last_page);
    attribute_tables(&mut index.sections, &doc.tables);

    info!(
        sections = index.len(),
        pages = last_page,
        tables = doc.tables.len(),
        "section index built"
    );
    Ok(index)
}

fn close_section(sections: &mut Vec<Section>, open: OpenSection) {
    let is_preamble = open.key == PREAMBLE_KEY;
    let section = open.close();
    // The preamble only exists when content precedes the first heading.
    if is_preamble && section.text.is_empty() {
        return;
    }
    sections.push(section);
}

/// Second pass: a section's page span closes at the next section of the
/// same or shallower level (minus one page, clamped so ranges stay
/// non-degenerate); the preamble closes at the first section of any
/// level; trailing sections run to the last page.
fn assign_page_ranges(sections: &mut [Section], last_page: u32) {
    let starts: Vec<(usize, u32, bool)> = sections
        .iter()
        .map(|s| (s.level, s.page_start, s.key == PREAMBLE_KEY))
        .collect();

    for i in 0..sections.len() {
        let (level, page_start, is_preamble) = starts[i];
        let closing = starts[i + 1..]
            .iter()
            .find(|(next_level, _, _)| is_preamble || *next_level <= level)
            .map(|(_, next_start, _)| *next_start);
        sections[i].page_end = match closing {
            Some(next_start) => next_start.saturating_sub(1).max(page_start),
            None => last_page.max(page_start),
        };
    }
}

/// Attributes each table to the deepest section whose page range contains
/// its page; ties on depth resolve to the section started earlier in
/// document order. Tables outside every range fall back to the nearest
/// preceding section.
fn attribute_tables(sections: &mut [Section], tables: &[TableBlock]) {
    for table in tables {
        let target = sections
            .iter()
            .enumerate()
            .filter(|(_, s)| s.page_start <= table.page && table.page <= s.page_end)
            .max_by(|(ia, a), (ib, b)| a.level.cmp(&b.level).then_with(|| ib.cmp(ia)))
            .map(|(i, _)| i)
            .or_else(|| sections.iter().rposition(|s| s.page_start <= table.page))
            .or(if sections.is_empty() { None } else { Some(0) });

        if let Some(i) = target {
            sections[i].tables.push(table.clone());
        }
    }
}

//! Heading pattern engine.
//!
//! A single line is classified against a fixed-priority list of patterns:
//! numeric hierarchical headings first, then keyword headings (Appendix,
//! Table, Figure), then short all-caps lines as the lowest-confidence
//! fallback. Ties break by pattern priority, never by score.
//!
//! Document-order constraints (numeric keys must not decrease) are
//! enforced by [`HeadingDetector`], which wraps the pure per-line
//! classifier with the last-accepted-key state.

use std::sync::LazyLock;

use regex::Regex;

/// Longest line still considered a heading candidate. Body text wraps
/// well below typical extraction line widths; headings stay short.
const MAX_HEADING_LEN: usize = 120;

/// Shortest accepted heading title; shorter matches are false positives
/// from tables and list fragments.
const MIN_TITLE_LEN: usize = 3;

static NUMERIC_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    // 1 to 6 dot-separated digit groups, optional trailing dot, a title.
    Regex::new(r"^(\d{1,3}(?:\.\d{1,3}){0,5})\.?\s+(\S.*)$").expect("valid numeric heading regex")
});

static KEYWORD_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(Appendix|Table|Figure)\s+([A-Za-z]?\d+|[A-Z])[:.]?\s*(.*)$")
        .expect("valid keyword heading regex")
});

/// Confidence tier of a matched heading pattern, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HeadingKind {
    /// Dot-separated numeric key, e.g. "5.5.1.2.4 Deaths".
    Numeric,
    /// Keyword plus number, e.g. "Appendix A", "Table 12".
    Keyword,
    /// Short all-caps line; lowest confidence tier.
    AllCaps,
}

/// A line that matched one of the heading patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingCandidate {
    /// Numbering key for numeric headings; `None` for headings that
    /// receive a synthetic key from the indexer.
    pub key: Option<String>,
    /// Heading text, trimmed.
    pub title: String,
    /// Depth: dot-group count for numeric keys, 1 otherwise.
    pub level: usize,
    /// Which pattern matched.
    pub kind: HeadingKind,
}

/// Classification of one line in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    /// An accepted heading; opens a new section.
    Heading(HeadingCandidate),
    /// A repeated occurrence of the current section's heading (running
    /// page headers); dropped from the body.
    Continuation,
    /// Ordinary body text.
    Body,
}

/// Classifies a single line against the prioritized pattern list.
///
/// Pure per-line check; document-order acceptance lives in
/// [`HeadingDetector`]. Returns `None` for body text.
#[must_use]
pub fn classify_line(line: &str) -> Option<HeadingCandidate> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_HEADING_LEN {
        return None;
    }

    if let Some(caps) = NUMERIC_HEADING.captures(trimmed) {
        let key = caps[1].to_string();
        let title = caps[2].trim().to_string();
        if title.len() >= MIN_TITLE_LEN
            && starts_like_title(&title)
            && !ends_like_sentence(&title)
        {
            let level = key.split('.').count();
            return Some(HeadingCandidate {
                key: Some(key),
                title,
                level,
                kind: HeadingKind::Numeric,
            });
        }
    }

    if let Some(caps) = KEYWORD_HEADING.captures(trimmed) {
        let keyword = &caps[1];
        let number = &caps[2];
        let rest = caps[3].trim();
        let title = if rest.is_empty() {
            format!("{keyword} {number}")
        } else {
            format!("{keyword} {number}: {rest}")
        };
        return Some(HeadingCandidate {
            key: None,
            title,
            level: 1,
            kind: HeadingKind::Keyword,
        });
    }

    if is_all_caps_heading(trimmed) {
        return Some(HeadingCandidate {
            key: None,
            title: trimmed.to_string(),
            level: 1,
            kind: HeadingKind::AllCaps,
        });
    }

    None
}

/// Titles start with a letter; digit-led remainders are table cells or
/// numbered list bodies.
fn starts_like_title(title: &str) -> bool {
    title.chars().next().is_some_and(char::is_alphabetic)
}

/// Heading lines do not end in sentence punctuation.
fn ends_like_sentence(title: &str) -> bool {
    matches!(title.chars().last(), Some('.' | ',' | ';' | ':'))
}

fn is_all_caps_heading(line: &str) -> bool {
    if line.len() < 4 || line.len() > 60 || ends_like_sentence(line) {
        return false;
    }
    let letters: Vec<char> = line.chars().filter(|c| c.is_alphabetic()).collect();
    letters.len() >= 4 && letters.iter().all(|c| c.is_uppercase())
}

/// Parses a numbering key into its numeric components.
#[must_use]
pub fn key_components(key: &str) -> Vec<u32> {
    key.split('.')
        .filter_map(|part| part.parse().ok())
        .collect()
}

/// Stateful heading acceptance over a document in reading order.
///
/// Numeric keys must be non-decreasing in document order: a decreasing
/// candidate is invalidated and treated as body text, which rejects
/// numeric-looking lines embedded in tables and lists. A candidate equal
/// to the last accepted key is a running-header repeat unless both its
/// neighbors read as body text, in which case it is body text too.
#[derive(Debug, Default)]
pub struct HeadingDetector {
    last_key: Option<Vec<u32>>,
}

impl HeadingDetector {
    /// Creates a detector with no accepted headings yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies `line` given its immediate neighbors.
    pub fn classify(
        &mut self,
        prev_line: Option<&str>,
        line: &str,
        next_line: Option<&str>,
    ) -> LineClass {
        let Some(candidate) = classify_line(line) else {
            return LineClass::Body;
        };

        if candidate.kind == HeadingKind::Numeric {
            let components = key_components(candidate.key.as_deref().unwrap_or_default());
            match &self.last_key {
                Some(last) if components < *last => return LineClass::Body,
                Some(last) if components == *last => {
                    if is_body_context(prev_line, next_line) {
                        return LineClass::Body;
                    }
                    return LineClass::Continuation;
                }
                _ => {}
            }
            self.last_key = Some(components);
        }

        LineClass::Heading(candidate)
    }
}

/// True when both neighbors are present and read as ordinary body text,
/// the signature of a numeric list item inside prose or a table cell.
fn is_body_context(prev_line: Option<&str>, next_line: Option<&str>) -> bool {
    let is_body = |line: Option<&str>| {
        line.is_some_and(|l| !l.trim().is_empty() && classify_line(l).is_none())
    };
    is_body(prev_line) && is_body(next_line)
}

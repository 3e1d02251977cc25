//! Citation extraction from free text.
//!
//! The extractor scans for citation-shaped fragments (URLs, DOIs, arXiv ids,
//! author-year mentions, reference-list entries), merges fragments that sit
//! next to each other on one line into a single candidate, and drops
//! duplicates by their normalized (author, year, URL) key. Candidates come
//! back in document order.
//!
//! Text without anything citation-like yields an empty list, not an error.

pub mod error;
mod patterns;

#[cfg(test)]
mod tests;

pub use error::ExtractionError;

use std::collections::HashSet;

use tracing::{debug, instrument};

use crate::citation::{CitationCandidate, CitationFields, SourceSpan, TextFormat};
use crate::constants::{DEFAULT_MAX_CITATIONS, DEFAULT_MAX_TEXT_BYTES};
use patterns::{Fragment, QUOTED_TITLE_RE, YEAR_RE, find_fragments};

/// Fragments further apart than this are never merged.
const MERGE_GAP_BYTES: usize = 120;

/// Context sentences longer than this are cut to a window around the citation.
const MAX_CONTEXT_BYTES: usize = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionLimits {
    pub max_text_bytes: usize,
    pub max_citations: usize,
}

impl Default for ExtractionLimits {
    fn default() -> Self {
        Self {
            max_text_bytes: DEFAULT_MAX_TEXT_BYTES,
            max_citations: DEFAULT_MAX_CITATIONS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Extractor {
    limits: ExtractionLimits,
}

impl Extractor {
    pub fn new(limits: ExtractionLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> ExtractionLimits {
        self.limits
    }

    /// Finds the citations in `text`.
    ///
    /// # Errors
    ///
    /// Fails when the text exceeds the byte limit, contains control characters
    /// other than whitespace, or yields more candidates than allowed.
    #[instrument(skip(self, text), fields(bytes = text.len(), format = ?format))]
    pub fn extract(
        &self,
        text: &str,
        format: TextFormat,
    ) -> Result<Vec<CitationCandidate>, ExtractionError> {
        if text.len() > self.limits.max_text_bytes {
            return Err(ExtractionError::TooLarge {
                size: text.len(),
                limit: self.limits.max_text_bytes,
            });
        }
        if let Some((offset, c)) = text
            .char_indices()
            .find(|(_, c)| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
        {
            return Err(ExtractionError::Binary {
                offset,
                code: c as u32,
            });
        }

        let mut fragments = find_fragments(text, format);
        fragments.sort_by(|a, b| {
            a.span
                .start
                .cmp(&b.span.start)
                .then(b.span.end.cmp(&a.span.end))
        });

        let merged = merge_fragments(text, fragments);
        let mut seen = HashSet::new();
        let candidates: Vec<CitationCandidate> = merged
            .into_iter()
            .map(|f| {
                let raw = &text[f.span.start..f.span.end];
                let context = context_for(text, f.span, raw);
                CitationCandidate::new(raw, f.fields, f.span, context)
            })
            .filter(|c| seen.insert(c.fields().dedup_key()))
            .collect();

        if candidates.len() > self.limits.max_citations {
            return Err(ExtractionError::TooManyCitations {
                found: candidates.len(),
                limit: self.limits.max_citations,
            });
        }

        debug!(candidates = candidates.len(), "Citations extracted");
        Ok(candidates)
    }
}

/// Parses one citation string into fields.
///
/// Everything recognizable is combined; the first value found for a field
/// wins. A string with no recognizable part becomes the title.
pub fn parse_citation(raw: &str) -> CitationFields {
    let raw = raw.trim();
    let mut fragments = find_fragments(raw, TextFormat::Markdown);
    fragments.sort_by_key(|f| f.span.start);

    let mut fields = CitationFields::default();
    for fragment in fragments {
        fill_missing(&mut fields, fragment.fields);
    }

    if fields.title.is_none()
        && let Some(caps) = QUOTED_TITLE_RE.captures(raw)
    {
        fields.title = Some(caps[1].trim().to_string());
    }
    if fields.year.is_none()
        && let Some(caps) = YEAR_RE.captures(raw)
    {
        fields.year = caps[1].parse().ok();
    }
    if fields.is_empty() && !raw.is_empty() {
        fields.title = Some(raw.to_string());
    }

    fields.normalized()
}

fn fill_missing(into: &mut CitationFields, from: CitationFields) {
    into.author = into.author.take().or(from.author);
    into.year = into.year.or(from.year);
    into.title = into.title.take().or(from.title);
    into.url = into.url.take().or(from.url);
    into.doi = into.doi.take().or(from.doi);
    into.arxiv_id = into.arxiv_id.take().or(from.arxiv_id);
    into.venue = into.venue.take().or(from.venue);
}

/// True when both sides carry a different value for the same key field,
/// meaning the fragments describe two different works.
fn conflicts(a: &CitationFields, b: &CitationFields) -> bool {
    fn differ(a: Option<&str>, b: Option<&str>) -> bool {
        matches!((a, b), (Some(x), Some(y)) if !x.trim().eq_ignore_ascii_case(y.trim()))
    }

    differ(a.author.as_deref(), b.author.as_deref())
        || matches!((a.year, b.year), (Some(x), Some(y)) if x != y)
        || differ(a.url.as_deref(), b.url.as_deref())
        || differ(a.doi.as_deref(), b.doi.as_deref())
        || differ(a.arxiv_id.as_deref(), b.arxiv_id.as_deref())
}

/// Folds each fragment into the previous one when both are in the same
/// sentence, close together, and do not contradict each other.
fn merge_fragments(text: &str, fragments: Vec<Fragment>) -> Vec<Fragment> {
    let mut merged: Vec<Fragment> = Vec::new();

    for fragment in fragments {
        if let Some(last) = merged.last_mut() {
            let gap_start = last.span.end.min(fragment.span.start);
            let same_sentence = !crosses_boundary(text, gap_start, fragment.span.start);
            let close = fragment.span.start.saturating_sub(last.span.end) <= MERGE_GAP_BYTES;
            if same_sentence && close && !conflicts(&last.fields, &fragment.fields) {
                last.span = last.span.union(&fragment.span);
                fill_missing(&mut last.fields, fragment.fields);
                continue;
            }
        }
        merged.push(fragment);
    }

    merged
}

/// True when `text[start..end]` holds a line break or a sentence end.
fn crosses_boundary(text: &str, start: usize, end: usize) -> bool {
    text[start..end]
        .char_indices()
        .any(|(i, c)| c == '\n' || is_sentence_end(text, start + i, c))
}

/// The sentence around `span`, or `None` when it holds nothing besides the
/// citation itself (reference-list entries, bare links).
fn context_for(text: &str, span: SourceSpan, raw: &str) -> Option<String> {
    let (start, end) = sentence_bounds(text, span);
    let (start, end) = if end - start > MAX_CONTEXT_BYTES {
        let half = MAX_CONTEXT_BYTES / 2;
        (
            floor_boundary(text, span.start.saturating_sub(half).max(start)),
            floor_boundary(text, (span.end + half).min(end)),
        )
    } else {
        (start, end)
    };

    let sentence = text[start..end].trim();
    let remainder = sentence.replace(raw, " ");
    remainder
        .chars()
        .any(char::is_alphabetic)
        .then(|| sentence.to_string())
}

fn floor_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn sentence_bounds(text: &str, span: SourceSpan) -> (usize, usize) {
    let start = text[..span.start]
        .char_indices()
        .rev()
        .find(|&(i, c)| c == '\n' || is_sentence_end(text, i, c))
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);

    let end = text[span.end..]
        .char_indices()
        .find(|&(i, c)| c == '\n' || is_sentence_end(text, span.end + i, c))
        .map(|(i, c)| {
            if c == '\n' {
                span.end + i
            } else {
                span.end + i + c.len_utf8()
            }
        })
        .unwrap_or(text.len());

    (start, end)
}

/// Abbreviations whose trailing period does not end a sentence.
const ABBREVIATIONS: &[&str] = &[
    "al", "e.g", "i.e", "etc", "vs", "cf", "fig", "figs", "no", "vol", "pp", "p", "eq", "dr",
    "mr", "ms", "prof",
];

fn is_sentence_end(text: &str, idx: usize, c: char) -> bool {
    if !matches!(c, '.' | '!' | '?') {
        return false;
    }
    let after = &text[idx + c.len_utf8()..];
    if !(after.is_empty() || after.starts_with(char::is_whitespace)) {
        return false;
    }
    if c != '.' {
        return true;
    }

    let word = text[..idx]
        .rsplit(|ch: char| ch.is_whitespace() || ch == '(')
        .next()
        .unwrap_or("");
    let is_initial = word.chars().count() == 1 && word.chars().all(char::is_uppercase);
    !is_initial && !ABBREVIATIONS.contains(&word.to_lowercase().as_str())
}

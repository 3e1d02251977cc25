//! Content alignment between the citing sentence and the cited page.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{LayerKind, LayerResult, VerificationLayer};
use crate::citation::CitationCandidate;
use crate::constants::{MAX_ALIGNMENT_CHARS, MIN_ALIGNABLE_CONTENT_CHARS};
use crate::fetch::{ContentFetcher, FetchError};
use crate::similarity::{content_terms, numeric_tokens, term_coverage};

pub const PASS_COVERAGE: f64 = 0.5;
pub const FAIL_COVERAGE: f64 = 0.2;

/// Multiplier applied when the claim cites numbers the source never mentions.
pub const STATISTIC_MISMATCH_PENALTY: f64 = 0.8;

/// Score for pages with too little readable text to judge.
pub const THIN_CONTENT_SCORE: f64 = 0.5;

/// Alignment of a claim against source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub coverage: f64,
    pub score: f64,
    pub shared_terms: usize,
    pub claim_terms: usize,
    pub missing_numbers: Vec<String>,
}

/// Scores how well `source` supports `claim`.
///
/// The score is the share of claim terms found in the source, reduced by
/// [`STATISTIC_MISMATCH_PENALTY`] when numbers in the claim are absent from
/// the source. `ignore_numbers` (for example the citation's own year) are not
/// treated as claims.
pub fn align(claim: &str, source: &str, ignore_numbers: &[String]) -> Option<Alignment> {
    let claim = truncate_chars(claim, MAX_ALIGNMENT_CHARS);
    let source = truncate_chars(source, MAX_ALIGNMENT_CHARS);

    let claim_terms = content_terms(claim);
    if claim_terms.is_empty() {
        return None;
    }
    let source_terms = content_terms(source);
    let coverage = term_coverage(&claim_terms, &source_terms);

    let source_numbers = numeric_tokens(source);
    let missing_numbers: Vec<String> = numeric_tokens(claim)
        .into_iter()
        .filter(|n| !ignore_numbers.contains(n))
        .filter(|n| !number_present(n, &source_numbers))
        .collect();

    let score = if missing_numbers.is_empty() {
        coverage
    } else {
        coverage * STATISTIC_MISMATCH_PENALTY
    };

    Some(Alignment {
        coverage,
        score,
        shared_terms: claim_terms.intersection(&source_terms).count(),
        claim_terms: claim_terms.len(),
        missing_numbers,
    })
}

/// `95%` in a claim is supported by `95` or `95%` in the source.
fn number_present(number: &str, source_numbers: &BTreeSet<String>) -> bool {
    let bare = number.trim_end_matches('%');
    source_numbers.contains(number)
        || source_numbers.contains(bare)
        || source_numbers.contains(&format!("{}%", bare))
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub struct ContentLayer {
    fetcher: Arc<dyn ContentFetcher>,
    timeout: Duration,
}

impl ContentLayer {
    pub fn new(fetcher: Arc<dyn ContentFetcher>, timeout: Duration) -> Self {
        Self { fetcher, timeout }
    }
}

#[async_trait]
impl VerificationLayer for ContentLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Content
    }

    async fn check(&self, candidate: &CitationCandidate) -> LayerResult {
        let Some(context) = candidate.context() else {
            return LayerResult::unavailable(LayerKind::Content, "no context text to align");
        };
        let Some(url) = candidate.fields().url.as_deref() else {
            return LayerResult::unavailable(LayerKind::Content, "no URL to fetch content from");
        };

        let page = match self.fetcher.fetch(url).await {
            Ok(page) => page,
            Err(FetchError::Timeout) => {
                return LayerResult::timed_out(LayerKind::Content, self.timeout.as_millis() as u64);
            }
            Err(err) => {
                return LayerResult::unavailable(
                    LayerKind::Content,
                    format!("content not retrievable: {}", err),
                );
            }
        };

        let page_chars = page.text.chars().count();
        if page_chars < MIN_ALIGNABLE_CONTENT_CHARS {
            return LayerResult::inconclusive(
                LayerKind::Content,
                THIN_CONTENT_SCORE,
                format!("only {} characters of readable text", page_chars),
            );
        }

        let claim = context.replace(candidate.raw(), " ");
        let ignore: Vec<String> = candidate
            .fields()
            .year
            .map(|y| vec![y.to_string()])
            .unwrap_or_default();

        let Some(alignment) = align(&claim, &page.text, &ignore) else {
            return LayerResult::unavailable(LayerKind::Content, "context has no content terms");
        };

        debug!(
            candidate = candidate.id(),
            coverage = alignment.coverage,
            missing_numbers = alignment.missing_numbers.len(),
            "Content aligned"
        );

        let mut evidence = format!(
            "{}/{} claim terms found in source",
            alignment.shared_terms, alignment.claim_terms
        );
        if !alignment.missing_numbers.is_empty() {
            evidence.push_str(&format!(
                "; statistic mismatch: {} not found in source",
                alignment.missing_numbers.join(", ")
            ));
        }

        if alignment.score >= PASS_COVERAGE {
            LayerResult::passed(LayerKind::Content, alignment.score, evidence)
        } else if alignment.score < FAIL_COVERAGE {
            LayerResult::failed(LayerKind::Content, alignment.score, evidence)
        } else {
            LayerResult::inconclusive(LayerKind::Content, alignment.score, evidence)
        }
    }
}

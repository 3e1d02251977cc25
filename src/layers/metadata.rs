//! Bibliographic metadata lookup and comparison.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{LayerKind, LayerResult, VerificationLayer};
use crate::citation::{CitationCandidate, CitationFields};
use crate::retry::RetryPolicy;
use crate::similarity::{fuzzy_eq, normalize, similarity_ratio};
use crate::sources::{BibRecord, MetadataQuery, MetadataSource};

pub const AUTHOR_MATCH_THRESHOLD: f64 = 0.8;
pub const TITLE_MATCH_THRESHOLD: f64 = 0.85;
pub const VENUE_MATCH_THRESHOLD: f64 = 0.8;

/// Match ratio at or above which the layer passes.
pub const PASS_RATIO: f64 = 0.75;
/// Match ratio at or below which the layer fails.
pub const FAIL_RATIO: f64 = 0.25;

/// Score when the work exists but the citation has no field to compare.
pub const UNCOMPARED_SCORE: f64 = 0.6;

/// Titles at least this long may match by containment (dropped subtitle).
const MIN_CONTAINED_TITLE_CHARS: usize = 20;

/// Per-field outcome of comparing a citation with a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldComparison {
    pub matched: Vec<&'static str>,
    pub mismatched: Vec<&'static str>,
}

impl FieldComparison {
    fn record(&mut self, field: &'static str, matched: bool) {
        if matched {
            self.matched.push(field);
        } else {
            self.mismatched.push(field);
        }
    }

    pub fn compared(&self) -> usize {
        self.matched.len() + self.mismatched.len()
    }

    /// Share of compared fields that matched, or `None` if nothing was compared.
    pub fn ratio(&self) -> Option<f64> {
        (self.compared() > 0).then(|| self.matched.len() as f64 / self.compared() as f64)
    }
}

/// Compares the fields a citation states against a canonical record.
///
/// Only fields present on both sides are compared.
pub fn compare_fields(fields: &CitationFields, record: &BibRecord) -> FieldComparison {
    let mut cmp = FieldComparison::default();

    let surnames = fields.author_surnames();
    if !surnames.is_empty() && !record.authors.is_empty() {
        let all_found = surnames.iter().take(3).all(|cited| {
            record
                .authors
                .iter()
                .any(|actual| fuzzy_eq(cited, actual, AUTHOR_MATCH_THRESHOLD))
        });
        cmp.record("author", all_found);
    }

    if let (Some(cited), Some(actual)) = (fields.year, record.year) {
        cmp.record("year", cited == actual);
    }

    if let (Some(cited), Some(actual)) = (&fields.title, &record.title) {
        cmp.record("title", titles_match(cited, actual));
    }

    if let (Some(cited), Some(actual)) = (&fields.venue, &record.venue) {
        cmp.record(
            "venue",
            fuzzy_eq(cited, actual, VENUE_MATCH_THRESHOLD) || contains_either(cited, actual),
        );
    }

    cmp
}

fn titles_match(cited: &str, actual: &str) -> bool {
    if similarity_ratio(cited, actual) >= TITLE_MATCH_THRESHOLD {
        return true;
    }
    let (a, b) = (normalize(cited), normalize(actual));
    a.chars().count().min(b.chars().count()) >= MIN_CONTAINED_TITLE_CHARS && contains_either(&a, &b)
}

fn contains_either(a: &str, b: &str) -> bool {
    let (a, b) = (normalize(a), normalize(b));
    !a.is_empty() && !b.is_empty() && (a.contains(&b) || b.contains(&a))
}

pub struct MetadataLayer {
    sources: Vec<Arc<dyn MetadataSource>>,
    retry: RetryPolicy,
}

impl MetadataLayer {
    pub fn new(sources: Vec<Arc<dyn MetadataSource>>, retry: RetryPolicy) -> Self {
        Self { sources, retry }
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    fn score(source: &str, record: &BibRecord, cmp: &FieldComparison) -> LayerResult {
        let Some(ratio) = cmp.ratio() else {
            return LayerResult::inconclusive(
                LayerKind::Metadata,
                UNCOMPARED_SCORE,
                format!("{}: record found, no fields to compare", source),
            );
        };

        let mut evidence = format!(
            "{}: {}/{} fields match",
            source,
            cmp.matched.len(),
            cmp.compared()
        );
        if !cmp.matched.is_empty() {
            evidence.push_str(&format!(" (matched {})", cmp.matched.join(", ")));
        }
        if !cmp.mismatched.is_empty() {
            evidence.push_str(&format!(" (mismatched {})", cmp.mismatched.join(", ")));
            if let Some(title) = &record.title {
                evidence.push_str(&format!("; record title: {}", title));
            }
        }

        if ratio >= PASS_RATIO {
            LayerResult::passed(LayerKind::Metadata, ratio, evidence)
        } else if ratio <= FAIL_RATIO {
            LayerResult::failed(LayerKind::Metadata, ratio, evidence)
        } else {
            LayerResult::inconclusive(LayerKind::Metadata, ratio, evidence)
        }
    }
}

#[async_trait]
impl VerificationLayer for MetadataLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Metadata
    }

    async fn check(&self, candidate: &CitationCandidate) -> LayerResult {
        let Some(query) = MetadataQuery::from_fields(candidate.fields()) else {
            return LayerResult::unavailable(
                LayerKind::Metadata,
                "no DOI, arXiv id, or author+year+title to look up",
            );
        };

        let Some(source) = self.sources.iter().find(|s| s.supports(&query)) else {
            return LayerResult::unavailable(
                LayerKind::Metadata,
                format!("no source handles {} lookups", query.kind()),
            );
        };

        let source: &dyn MetadataSource = source.as_ref();
        let query_ref = &query;
        let lookup = self
            .retry
            .run(source.name(), move || source.lookup(query_ref))
            .await;

        match lookup {
            Ok(Some(record)) => {
                let cmp = compare_fields(candidate.fields(), &record);
                debug!(
                    candidate = candidate.id(),
                    source = source.name(),
                    matched = cmp.matched.len(),
                    compared = cmp.compared(),
                    "Metadata compared"
                );
                Self::score(source.name(), &record, &cmp)
            }
            Ok(None) => LayerResult::failed(
                LayerKind::Metadata,
                0.0,
                format!("{}: {} not found", source.name(), query),
            ),
            Err(err) => LayerResult::from_error(LayerKind::Metadata, &err),
        }
    }
}

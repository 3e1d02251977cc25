//! Red-flag detection for citations.
//!
//! Cheap, offline checks for patterns that fabricated citations tend to show:
//! publication years in the future, identifiers that cannot exist, placeholder
//! hosts. Flags are evidence for the AI judge and for the reader; they never
//! change an aggregate score.

use std::sync::LazyLock;

use chrono::Datelike;
use regex::Regex;
use serde::Serialize;

use crate::citation::CitationCandidate;

/// Years before this are suspicious for machine-learning topics.
pub const MODERN_TOPIC_CUTOFF_YEAR: i32 = 1950;

static DOI_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^10\.\d{4,9}/\S+$").expect("doi regex is valid"));

static ARXIV_NEW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2})(\d{2})\.\d{4,5}(v\d+)?$").expect("arxiv regex is valid")
});

static ARXIV_OLD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z]+(-[a-z]+)?(\.[A-Z]{2})?/\d{7}(v\d+)?$").expect("arxiv regex is valid")
});

static MODERN_TOPIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(ai|artificial intelligence|deep learning|neural networks?|gpt(-\d+)?|large language models?|llms?|machine learning)\b")
        .expect("topic regex is valid")
});

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(19|20)\d{2}\b").expect("year regex is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    FutureYear,
    TimeTravel,
    Anachronism,
    MalformedDoi,
    MalformedArxivId,
    PlaceholderUrl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedFlag {
    pub kind: FlagKind,
    pub severity: Severity,
    pub detail: String,
}

impl RedFlag {
    fn new(kind: FlagKind, severity: Severity, detail: String) -> Self {
        Self {
            kind,
            severity,
            detail,
        }
    }
}

impl std::fmt::Display for RedFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.detail)
    }
}

/// Runs every check against the current calendar year.
pub fn detect(candidate: &CitationCandidate) -> Vec<RedFlag> {
    detect_at(candidate, chrono::Utc::now().year())
}

/// Runs every check as if the current year were `current_year`.
pub fn detect_at(candidate: &CitationCandidate, current_year: i32) -> Vec<RedFlag> {
    let fields = candidate.fields();
    let mut flags = Vec::new();

    if let Some(year) = fields.year {
        if year > current_year {
            flags.push(RedFlag::new(
                FlagKind::FutureYear,
                Severity::High,
                format!("publication year {} is in the future", year),
            ));
        }

        let topic_text = format!(
            "{} {}",
            fields.title.as_deref().unwrap_or(""),
            candidate.raw()
        );
        if year < MODERN_TOPIC_CUTOFF_YEAR && MODERN_TOPIC.is_match(&topic_text) {
            flags.push(RedFlag::new(
                FlagKind::Anachronism,
                Severity::Medium,
                format!("machine-learning work dated {}", year),
            ));
        }

        if let Some(context) = candidate.context() {
            let surrounding = context.replace(candidate.raw(), " ");
            if let Some(citing_year) = YEAR
                .find(&surrounding)
                .and_then(|m| m.as_str().parse::<i32>().ok())
                && year > citing_year
            {
                flags.push(RedFlag::new(
                    FlagKind::TimeTravel,
                    Severity::Low,
                    format!("text dated {} cites work from {}", citing_year, year),
                ));
            }
        }
    }

    if let Some(doi) = fields.doi.as_deref()
        && !DOI_SHAPE.is_match(doi)
    {
        flags.push(RedFlag::new(
            FlagKind::MalformedDoi,
            Severity::Medium,
            format!("'{}' is not a well-formed DOI", doi),
        ));
    }

    if let Some(id) = fields.arxiv_id.as_deref()
        && !is_valid_arxiv_id(id)
    {
        flags.push(RedFlag::new(
            FlagKind::MalformedArxivId,
            Severity::High,
            format!("'{}' is not a valid arXiv identifier", id),
        ));
    }

    if let Some(url) = fields.url.as_deref()
        && let Some(host) = url_host(url)
        && is_placeholder_host(&host)
    {
        flags.push(RedFlag::new(
            FlagKind::PlaceholderUrl,
            Severity::High,
            format!("'{}' is a placeholder host", host),
        ));
    }

    flags
}

/// New-style ids (`YYMM.NNNNN`) must have a real month; old-style ids are
/// `archive/YYMMNNN`.
pub fn is_valid_arxiv_id(id: &str) -> bool {
    if let Some(caps) = ARXIV_NEW.captures(id) {
        let month: u32 = caps
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        return (1..=12).contains(&month);
    }
    ARXIV_OLD.is_match(id)
}

fn url_host(url: &str) -> Option<String> {
    let rest = url.split_once("://").map_or(url, |(_, r)| r);
    let authority = rest.split(['/', '?', '#']).next()?;
    let host = authority.rsplit('@').next()?.split(':').next()?;
    (!host.is_empty()).then(|| host.to_lowercase())
}

fn is_placeholder_host(host: &str) -> bool {
    const PLACEHOLDERS: &[&str] = &[
        "example.com",
        "example.org",
        "example.net",
        "test.com",
        "test.org",
        "localhost",
    ];
    const RESERVED_TLDS: &[&str] = &[".example", ".invalid", ".localhost"];

    let host = host.strip_prefix("www.").unwrap_or(host);
    PLACEHOLDERS
        .iter()
        .any(|p| host == *p || host.ends_with(&format!(".{}", p)))
        || RESERVED_TLDS.iter().any(|tld| host.ends_with(tld))
        || host.split(['.', '-']).any(|label| label == "fake")
}

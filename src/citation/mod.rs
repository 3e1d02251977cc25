//! Citation candidates: the parsed, not-yet-verified citations the pipeline works on.


use serde::{Deserialize, Serialize};

use crate::hashing::candidate_id;

/// How the input text should be read by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextFormat {
    #[default]
    Plain,
    Markdown,
}

impl std::str::FromStr for TextFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "plain" | "text" | "txt" => Ok(Self::Plain),
            "markdown" | "md" => Ok(Self::Markdown),
            other => Err(format!("Unknown text format: {}", other)),
        }
    }
}

/// Byte offsets of a citation inside the source text (`start..end`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: start.min(end),
            end: end.max(start),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both `self` and `other`.
    pub fn union(&self, other: &SourceSpan) -> SourceSpan {
        SourceSpan::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// Bibliographic fields parsed out of a citation. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CitationFields {
    pub author: Option<String>,
    pub year: Option<i32>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
    pub venue: Option<String>,
}

impl CitationFields {
    /// Trims whitespace, drops empty strings and canonicalizes the DOI.
    pub fn normalized(mut self) -> Self {
        fn clean(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }

        self.author = clean(self.author);
        self.title = clean(self.title).map(|t| {
            t.trim_matches(|c: char| c == '"' || c == '\'' || c == '.')
                .trim()
                .to_string()
        });
        self.url = clean(self.url);
        self.doi = clean(self.doi).map(|d| normalize_doi(&d));
        self.arxiv_id = clean(self.arxiv_id).map(|a| {
            a.trim_start_matches("arXiv:")
                .trim_start_matches("arxiv:")
                .to_string()
        });
        self.venue = clean(self.venue);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.author.is_none()
            && self.year.is_none()
            && self.title.is_none()
            && self.url.is_none()
            && self.doi.is_none()
            && self.arxiv_id.is_none()
            && self.venue.is_none()
    }

    /// True when author, year and title are all known.
    pub fn has_strong_tuple(&self) -> bool {
        self.author.is_some() && self.year.is_some() && self.title.is_some()
    }

    /// Family names mentioned in the author field, in order.
    ///
    /// Handles `Smith et al.`, `Smith & Lee`, `Smith and Lee`, `Smith, J., Lee, K.`.
    pub fn author_surnames(&self) -> Vec<String> {
        let Some(author) = self.author.as_deref() else {
            return Vec::new();
        };

        let without_etal = author
            .replace("et al.", "")
            .replace("et al", "")
            .replace(" and ", " & ");

        without_etal
            .split(['&', ',', ';'])
            .map(str::trim)
            .filter(|part| {
                // Initials such as "J." or "J. K." are not surnames.
                !part.is_empty()
                    && !part
                        .split_whitespace()
                        .all(|w| w.trim_end_matches('.').chars().count() <= 1)
            })
            .filter_map(|part| {
                part.split_whitespace()
                    .rev()
                    .find(|w| w.trim_end_matches('.').chars().count() > 1)
                    .map(|w| w.trim_end_matches('.').to_string())
            })
            .collect()
    }

    /// Deduplication key: normalized (first author surname, year, URL).
    ///
    /// Without a URL the DOI or arXiv id takes its place, so identifier-only
    /// citations do not collapse into one.
    pub fn dedup_key(&self) -> (String, Option<i32>, String) {
        let author = self
            .author_surnames()
            .first()
            .map(|s| s.to_lowercase())
            .unwrap_or_default();
        let locator = match (&self.url, &self.doi, &self.arxiv_id) {
            (Some(url), _, _) => normalize_url(url),
            (None, Some(doi), _) => format!("doi:{}", normalize_doi(doi)),
            (None, None, Some(id)) => format!("arxiv:{}", id.trim().to_lowercase()),
            (None, None, None) => String::new(),
        };
        (author, self.year, locator)
    }
}

/// Lowercases a DOI and strips resolver prefixes (`https://doi.org/`, `doi:`).
pub fn normalize_doi(doi: &str) -> String {
    let lower = doi.trim().to_lowercase();
    let stripped = [
        "https://doi.org/",
        "http://doi.org/",
        "https://dx.doi.org/",
        "http://dx.doi.org/",
        "doi.org/",
        "doi:",
    ]
    .iter()
    .find_map(|p| lower.strip_prefix(p))
    .unwrap_or(&lower);

    stripped
        .trim()
        .trim_end_matches(['.', ',', ';', ')'])
        .to_string()
}

/// Lowercases scheme and host, drops the fragment and any trailing slash.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    let url = url.split('#').next().unwrap_or(url);
    let (scheme, rest) = match url.split_once("://") {
        Some((s, r)) => (s.to_lowercase(), r),
        None => (String::new(), url),
    };
    let (host, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    };
    let host = host.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let path = path.trim_end_matches('/');
    if scheme.is_empty() {
        format!("{}{}", host, path)
    } else {
        format!("{}://{}{}", scheme, host, path)
    }
}

/// A citation found in (or supplied alongside) the input text.
///
/// Created once by the extractor (or from caller-supplied fields) and never
/// mutated afterwards; all accessors are read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitationCandidate {
    id: String,
    raw: String,
    fields: CitationFields,
    span: SourceSpan,
    context: Option<String>,
}

impl CitationCandidate {
    pub fn new(
        raw: impl Into<String>,
        fields: CitationFields,
        span: SourceSpan,
        context: Option<String>,
    ) -> Self {
        let raw = raw.into();
        let fields = fields.normalized();
        let context = context
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        let id = candidate_id(&raw, &fields, span);
        Self {
            id,
            raw,
            fields,
            span,
            context,
        }
    }

    /// Builds a candidate from caller-supplied fields (no source text).
    pub fn from_fields(fields: CitationFields, context: Option<String>) -> Self {
        let raw = render_fields(&fields);
        let span = SourceSpan::new(0, raw.len());
        Self::new(raw, fields, span, context)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn fields(&self) -> &CitationFields {
        &self.fields
    }

    pub fn span(&self) -> SourceSpan {
        self.span
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }
}

/// Human-readable one-line rendering of a set of fields.
pub fn render_fields(fields: &CitationFields) -> String {
    let mut parts = Vec::new();
    if let Some(author) = &fields.author {
        parts.push(author.trim().to_string());
    }
    if let Some(year) = fields.year {
        parts.push(format!("({})", year));
    }
    if let Some(title) = &fields.title {
        parts.push(title.trim().to_string());
    }
    if let Some(venue) = &fields.venue {
        parts.push(venue.trim().to_string());
    }
    if let Some(doi) = &fields.doi {
        parts.push(format!("doi:{}", normalize_doi(doi)));
    }
    if let Some(arxiv) = &fields.arxiv_id {
        parts.push(format!("arXiv:{}", arxiv.trim()));
    }
    if let Some(url) = &fields.url {
        parts.push(url.trim().to_string());
    }
    parts.join(" ")
}

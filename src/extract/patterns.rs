//! Citation-shaped fragments and the regexes that find them.

use std::sync::LazyLock;

use regex::Regex;

use crate::citation::{CitationFields, SourceSpan, TextFormat};

/// A single capitalized surname, Unicode aware.
const NAME: &str = r"\p{Lu}[\p{L}'\-]+";

/// `Smith`, `Smith et al.`, `Smith & Lee`, `Smith and Lee`.
static AUTHOR: LazyLock<String> = LazyLock::new(|| {
    format!(r"{NAME}(?:\s+et\s+al\.?|\s*&\s*{NAME}|\s+and\s+{NAME})?")
});

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s<>()\[\]{}"'`|]+"#).expect("url regex is valid")
});

static MARKDOWN_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]\n]{1,300})\]\((https?://[^\s)]+)\)").expect("markdown link regex is valid")
});

static DOI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:doi:\s*)?(10\.\d{4,9}/[^\s"'<>\[\]]+)"#).expect("doi regex is valid")
});

static DOI_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:dx\.)?doi\.org/(10\.\d{4,9}/\S+)").expect("doi url regex is valid")
});

const ARXIV_ID: &str = r"(?:\d{4}\.\d{4,5}|[a-z\-]+(?:\.[a-z]{2})?/\d{7})(?:v\d+)?";

static ARXIV_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\barxiv:\s*({ARXIV_ID})")).expect("arxiv regex is valid")
});

static ARXIV_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)arxiv\.org/(?:abs|pdf)/({ARXIV_ID})"))
        .expect("arxiv url regex is valid")
});

static PAREN_GROUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^()\n]{4,300})\)").expect("paren regex is valid"));

/// One entry of a parenthetical group: `Smith et al., 2020`, `see Lee 2019, p. 4`.
static PAREN_PART_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^\s*(?:(?:see|cf\.|e\.g\.,?)\s+)?({}),?\s+((?:19|20)\d{{2}})[a-z]?(?:,\s*pp?\.\s*\d+(?:[-–]\d+)?)?\s*$",
        *AUTHOR
    ))
    .expect("parenthetical regex is valid")
});

/// `Smith et al. (2020)`.
static NARRATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b({})\s+\(((?:19|20)\d{{2}})[a-z]?\)",
        *AUTHOR
    ))
    .expect("narrative regex is valid")
});

/// `[1] Smith, J., & Lee, K. (2020). Title. Venue, 1(2), 3-4.`
static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:\[\d+\][ \t]*|\d+\.[ \t]+|[-*•][ \t]+)?(\p{Lu}[^()\n]{0,300}?)[ \t]*\(((?:19|20)\d{2})[a-z]?\)\.[ \t]+([^\n]+)$",
    )
    .expect("reference regex is valid")
});

static TITLE_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.?!](?:\s|$)").expect("title end regex is valid"));

static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```|`[^`\n]+`").expect("code regex is valid"));

pub(crate) static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").expect("year regex is valid"));

pub(crate) static QUOTED_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["“]([^"”\n]{10,300})["”]"#).expect("quoted title regex is valid")
});

/// Capitalized words that precede a year without being an author.
const NOT_AUTHORS: &[&str] = &[
    "After", "Also", "Appendix", "Before", "Between", "Chapter", "During", "Figure", "From",
    "In", "Section", "See", "Since", "Table", "The", "Until", "Version", "Year",
];

/// A citation-shaped piece of text with whatever fields it yields.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Fragment {
    pub span: SourceSpan,
    pub fields: CitationFields,
}

impl Fragment {
    fn new(start: usize, end: usize, fields: CitationFields) -> Self {
        Self {
            span: SourceSpan::new(start, end),
            fields,
        }
    }
}

fn within(span: SourceSpan, spans: &[SourceSpan]) -> bool {
    spans.iter().any(|s| s.start <= span.start && span.end <= s.end)
}

fn overlaps(span: SourceSpan, spans: &[SourceSpan]) -> bool {
    spans.iter().any(|s| s.start < span.end && span.start < s.end)
}

/// Drops trailing sentence punctuation and unbalanced closing brackets.
fn trim_trailing(candidate: &str) -> &str {
    let mut s = candidate;
    loop {
        let before = s;
        s = s.trim_end_matches(['.', ',', ';', ':', '!', '?', '"', '\'']);
        if s.ends_with(')') && s.matches('(').count() < s.matches(')').count() {
            s = &s[..s.len() - 1];
        }
        if s.ends_with(']') && s.matches('[').count() < s.matches(']').count() {
            s = &s[..s.len() - 1];
        }
        if s == before {
            return s;
        }
    }
}

fn is_author(author: &str) -> bool {
    author
        .split_whitespace()
        .next()
        .is_some_and(|first| !NOT_AUTHORS.contains(&first))
}

/// Fields implied by a URL: DOI resolver links and arXiv abstract pages.
pub(crate) fn url_fields(url: &str) -> CitationFields {
    let mut fields = CitationFields {
        url: Some(url.to_string()),
        ..Default::default()
    };
    if let Some(caps) = DOI_URL_RE.captures(url) {
        fields.doi = Some(trim_trailing(&caps[1]).to_string());
    }
    if let Some(caps) = ARXIV_URL_RE.captures(url) {
        fields.arxiv_id = Some(caps[1].trim_end_matches(".pdf").to_string());
    }
    fields
}

/// Splits the text after `(YEAR).` in a reference entry into title and venue.
pub(crate) fn split_reference_rest(rest: &str) -> (Option<String>, Option<String>) {
    let cut = ["http://", "https://", "doi:", "arXiv:", "arxiv:"]
        .iter()
        .filter_map(|marker| rest.find(marker))
        .min()
        .unwrap_or(rest.len());
    let rest = rest[..cut].trim();

    let (title, remainder) = match TITLE_END_RE.find(rest) {
        Some(m) => {
            let terminal = &rest[m.start()..m.start() + 1];
            let keep = if terminal == "." { m.start() } else { m.start() + 1 };
            (&rest[..keep], &rest[m.end()..])
        }
        None => (rest, ""),
    };

    let title = title.trim();
    let title = (title.chars().count() >= 3).then(|| title.to_string());

    let venue = remainder
        .split([',', '.'])
        .next()
        .map(str::trim)
        .map(|v| v.strip_prefix("In ").unwrap_or(v).trim())
        .filter(|v| v.chars().count() >= 3)
        .filter(|v| !v.starts_with(|c: char| c.is_ascii_digit()))
        .map(str::to_string);

    (title, venue)
}

fn reference_lines(text: &str) -> Vec<Fragment> {
    REFERENCE_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let authors = caps.get(1)?;
            let author = authors.as_str().trim().trim_end_matches(',').trim();
            let looks_like_authors = author.contains(',')
                || author.contains('&')
                || author.contains("et al");
            if !looks_like_authors || author.contains("http") {
                return None;
            }

            let year = caps[2].parse().ok()?;
            let rest = caps.get(3)?;
            let (title, venue) = split_reference_rest(rest.as_str());
            let end = rest.start() + rest.as_str().trim_end().len();

            Some(Fragment::new(
                authors.start(),
                end,
                CitationFields {
                    author: Some(author.to_string()),
                    year: Some(year),
                    title,
                    venue,
                    ..Default::default()
                },
            ))
        })
        .collect()
}

fn parenthetical(text: &str, skip: &[SourceSpan]) -> Vec<Fragment> {
    let mut out = Vec::new();
    for caps in PAREN_GROUP_RE.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let whole_span = SourceSpan::new(whole.start(), whole.end());
        if overlaps(whole_span, skip) {
            continue;
        }

        let parts: Vec<(usize, &str)> = {
            let mut offset = inner.start();
            inner
                .as_str()
                .split(';')
                .map(|part| {
                    let start = offset;
                    offset += part.len() + 1;
                    (start, part)
                })
                .collect()
        };
        let single = parts.len() == 1;

        for (start, part) in parts {
            let Some(m) = PAREN_PART_RE.captures(part) else {
                continue;
            };
            let author = m[1].trim();
            let Ok(year) = m[2].parse::<i32>() else {
                continue;
            };
            if !is_author(author) {
                continue;
            }
            let fields = CitationFields {
                author: Some(author.to_string()),
                year: Some(year),
                ..Default::default()
            };
            if single {
                out.push(Fragment::new(whole.start(), whole.end(), fields));
            } else {
                let lead = part.len() - part.trim_start().len();
                let end = start + part.trim_end().len();
                out.push(Fragment::new(start + lead, end, fields));
            }
        }
    }
    out
}

/// Every citation-shaped fragment in `text`, unordered.
pub(crate) fn find_fragments(text: &str, format: TextFormat) -> Vec<Fragment> {
    let code: Vec<SourceSpan> = match format {
        TextFormat::Markdown => CODE_RE
            .find_iter(text)
            .map(|m| SourceSpan::new(m.start(), m.end()))
            .collect(),
        TextFormat::Plain => Vec::new(),
    };
    let usable = |span: SourceSpan| !overlaps(span, &code);

    let mut fragments: Vec<Fragment> = reference_lines(text)
        .into_iter()
        .filter(|f| usable(f.span))
        .collect();
    let reference_spans: Vec<SourceSpan> = fragments.iter().map(|f| f.span).collect();

    let mut link_spans = Vec::new();
    if format == TextFormat::Markdown {
        for caps in MARKDOWN_LINK_RE.captures_iter(text) {
            let (Some(whole), Some(title), Some(url)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            let span = SourceSpan::new(whole.start(), whole.end());
            if !usable(span) {
                continue;
            }
            let mut fields = url_fields(trim_trailing(url.as_str()));
            let title = title.as_str().trim();
            // Link text that is just the URL again says nothing about the title.
            if !title.starts_with("http") {
                fields.title = Some(title.to_string());
            }
            link_spans.push(span);
            fragments.push(Fragment::new(span.start, span.end, fields));
        }
    }

    let mut url_spans = link_spans.clone();
    for m in URL_RE.find_iter(text) {
        let url = trim_trailing(m.as_str());
        let span = SourceSpan::new(m.start(), m.start() + url.len());
        if !usable(span) || within(span, &link_spans) {
            continue;
        }
        url_spans.push(span);
        fragments.push(Fragment::new(span.start, span.end, url_fields(url)));
    }

    for caps in DOI_RE.captures_iter(text) {
        let (Some(whole), Some(doi)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let doi = trim_trailing(doi.as_str());
        let span = SourceSpan::new(whole.start(), doi_end(whole.start(), whole.as_str(), doi));
        if !usable(span) || overlaps(span, &url_spans) {
            continue;
        }
        fragments.push(Fragment::new(
            span.start,
            span.end,
            CitationFields {
                doi: Some(doi.to_string()),
                ..Default::default()
            },
        ));
    }

    for caps in ARXIV_RE.captures_iter(text) {
        let (Some(whole), Some(id)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let span = SourceSpan::new(whole.start(), whole.end());
        if !usable(span) || overlaps(span, &url_spans) {
            continue;
        }
        fragments.push(Fragment::new(
            span.start,
            span.end,
            CitationFields {
                arxiv_id: Some(id.as_str().to_string()),
                ..Default::default()
            },
        ));
    }

    let mut narrative_spans = Vec::new();
    for caps in NARRATIVE_RE.captures_iter(text) {
        let (Some(whole), Some(author)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let span = SourceSpan::new(whole.start(), whole.end());
        if !usable(span) || overlaps(span, &reference_spans) || !is_author(author.as_str()) {
            continue;
        }
        let Ok(year) = caps[2].parse::<i32>() else {
            continue;
        };
        narrative_spans.push(span);
        fragments.push(Fragment::new(
            span.start,
            span.end,
            CitationFields {
                author: Some(author.as_str().trim().to_string()),
                year: Some(year),
                ..Default::default()
            },
        ));
    }

    let mut skip = reference_spans;
    skip.extend(narrative_spans);
    skip.extend(url_spans);
    fragments.extend(
        parenthetical(text, &skip)
            .into_iter()
            .filter(|f| usable(f.span)),
    );

    fragments
}

/// End offset of a DOI match once trailing punctuation is dropped.
fn doi_end(start: usize, whole: &str, doi: &str) -> usize {
    match whole.rfind(doi) {
        Some(idx) => start + idx + doi.len(),
        None => start + whole.len(),
    }
}

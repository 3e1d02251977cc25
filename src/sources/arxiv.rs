//! arXiv export API (Atom feed).

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, instrument};

use super::{BibRecord, LookupConfig, MetadataQuery, MetadataSource, classify_status, transport_error};
use crate::constants::USER_AGENT;
use crate::layers::LayerError;

const SOURCE_NAME: &str = "arxiv";

static ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<entry>(.*?)</entry>").expect("entry regex is valid"));
static ENTRY_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<id>(.*?)</id>").expect("id regex is valid"));
static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<title[^>]*>(.*?)</title>").expect("title regex is valid"));
static PUBLISHED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<published>\s*(\d{4})-").expect("published regex is valid")
});
static AUTHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<author>\s*<name>(.*?)</name>").expect("author regex is valid")
});
static JOURNAL_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<arxiv:journal_ref[^>]*>(.*?)</arxiv:journal_ref>")
        .expect("journal_ref regex is valid")
});
static DOI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<arxiv:doi[^>]*>(.*?)</arxiv:doi>").expect("doi regex is valid")
});

#[derive(Debug, Clone)]
pub struct ArxivSource {
    client: reqwest::Client,
    base_url: String,
}

impl ArxivSource {
    pub fn new(config: &LookupConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: config.arxiv_url.clone(),
        })
    }
}

#[async_trait]
impl MetadataSource for ArxivSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn supports(&self, query: &MetadataQuery) -> bool {
        matches!(query, MetadataQuery::Arxiv(_))
    }

    #[instrument(skip(self), fields(source = SOURCE_NAME))]
    async fn lookup(&self, query: &MetadataQuery) -> Result<Option<BibRecord>, LayerError> {
        let MetadataQuery::Arxiv(id) = query else {
            return Err(LayerError::unavailable(
                "arxiv only resolves arXiv identifiers",
            ));
        };

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("id_list", id.as_str()), ("max_results", "1")])
            .send()
            .await
            .map_err(|e| transport_error(SOURCE_NAME, e))?;

        if !classify_status(SOURCE_NAME, response.status())? {
            return Ok(None);
        }

        let feed = response
            .text()
            .await
            .map_err(|e| transport_error(SOURCE_NAME, e))?;
        let record = parse_feed(&feed);
        if record.is_none() {
            debug!(id, "arXiv id not found");
        }
        Ok(record)
    }
}

/// First real entry of an arXiv Atom feed, if any.
///
/// Unknown ids come back as a single entry pointing at `/api/errors`; that is
/// reported as not found.
pub fn parse_feed(feed: &str) -> Option<BibRecord> {
    let entry = ENTRY.captures(feed)?.get(1)?.as_str();

    let id = capture(&ENTRY_ID, entry).unwrap_or_default();
    let title = capture(&TITLE, entry);
    if id.contains("/api/errors") || title.as_deref() == Some("Error") {
        return None;
    }

    let authors = AUTHOR
        .captures_iter(entry)
        .filter_map(|c| c.get(1))
        .filter_map(|m| {
            m.as_str()
                .split_whitespace()
                .last()
                .map(str::to_string)
        })
        .collect();

    let year = PUBLISHED
        .captures(entry)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok());

    Some(BibRecord {
        title,
        authors,
        year,
        venue: capture(&JOURNAL_REF, entry).or_else(|| Some("arXiv".to_string())),
        doi: capture(&DOI, entry).map(|d| d.to_lowercase()),
        url: (!id.is_empty()).then_some(id),
        source: SOURCE_NAME.to_string(),
    })
}

fn capture(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty())
}

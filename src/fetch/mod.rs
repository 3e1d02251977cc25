//! Outbound HTTP for the URL and content layers.
//!
//! [`HttpProbe`] answers "does this URL resolve?", [`ContentFetcher`] answers
//! "what does the page say?". Both are implemented by [`ReqwestHttp`]; tests
//! use [`MockHttp`].

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;


pub use error::FetchError;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockHttp, MockRoute};

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::StatusCode;
use reqwest::redirect::Policy;
use tracing::debug;

use crate::constants::USER_AGENT;

/// Response bodies are read up to this many bytes.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Result of probing a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub status: u16,
    pub final_url: String,
    pub redirected: bool,
}

/// A fetched page reduced to plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub final_url: String,
    pub content_type: Option<String>,
    pub text: String,
}

#[async_trait]
pub trait HttpProbe: Send + Sync {
    /// Resolves `url` (following redirects) and reports the final status.
    ///
    /// Any status code is a successful probe; only transport problems are errors.
    async fn probe(&self, url: &str) -> Result<ProbeOutcome, FetchError>;
}

#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetches `url` and returns its readable text. Non-2xx is [`FetchError::Status`].
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// `reqwest`-backed implementation of both collaborators.
#[derive(Debug, Clone)]
pub struct ReqwestHttp {
    client: reqwest::Client,
    max_redirects: usize,
}

impl ReqwestHttp {
    pub fn new(timeout: Duration, max_redirects: usize) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(Policy::limited(max_redirects))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            max_redirects,
        })
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        FetchError::from_reqwest(err, self.max_redirects)
    }
}

#[async_trait]
impl HttpProbe for ReqwestHttp {
    async fn probe(&self, url: &str) -> Result<ProbeOutcome, FetchError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        let mut response = self
            .client
            .head(parsed.clone())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        // Some servers refuse HEAD outright.
        if matches!(
            response.status(),
            StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
        ) {
            debug!(url, status = response.status().as_u16(), "HEAD refused, retrying with GET");
            response = self
                .client
                .get(parsed.clone())
                .send()
                .await
                .map_err(|e| self.classify(e))?;
        }

        let final_url = response.url().to_string();
        Ok(ProbeOutcome {
            status: response.status().as_u16(),
            redirected: response.url() != &parsed,
            final_url,
        })
    }
}

#[async_trait]
impl ContentFetcher for ReqwestHttp {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        let mut response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase());

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.classify(e))? {
            let room = MAX_BODY_BYTES.saturating_sub(body.len());
            body.extend_from_slice(&chunk[..chunk.len().min(room)]);
            if body.len() >= MAX_BODY_BYTES {
                debug!(url, limit = MAX_BODY_BYTES, "Body truncated");
                break;
            }
        }
        let raw = String::from_utf8_lossy(&body);

        Ok(FetchedPage {
            text: page_text(content_type.as_deref(), &raw),
            final_url,
            content_type,
        })
    }
}

/// Readable text for a body of the given content type.
///
/// HTML is reduced with [`html_to_text`], other text types are kept as-is, and
/// binary types (PDF, images) yield no text.
pub fn page_text(content_type: Option<&str>, body: &str) -> String {
    match content_type {
        Some(ct) if ct.contains("html") => html_to_text(body),
        Some(ct) if ct.starts_with("text/") || ct.contains("json") || ct.contains("xml") => {
            collapse_whitespace(body)
        }
        Some(_) => String::new(),
        None if body.trim_start().starts_with('<') => html_to_text(body),
        None => collapse_whitespace(body),
    }
}

static DROPPED_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|nav|header|footer|aside|form)\b[^>]*>.*?</\s*(?:script|style|noscript|nav|header|footer|aside|form)\s*>")
        .expect("block regex is valid")
});

static MAIN_REGION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(article|main)\b[^>]*>(.*?)</\s*(?:article|main)\s*>")
        .expect("region regex is valid")
});

static ABSTRACT_META: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<meta\s+[^>]*(?:name|property)\s*=\s*["'](?:citation_abstract|dc\.description|og:description|description)["'][^>]*content\s*=\s*["']([^"']*)["']"#)
        .expect("meta regex is valid")
});

static COMMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--.*?-->").expect("comment regex is valid")
});

static TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex is valid"));

/// Strips markup from an HTML document.
///
/// Scripts, styles and page chrome (nav, header, footer, aside, forms) are
/// dropped. When the page has `<article>` or `<main>` regions only those are
/// kept. An abstract or description `<meta>` tag is prepended, since academic
/// landing pages often carry the abstract only there.
pub fn html_to_text(html: &str) -> String {
    let without_comments = COMMENTS.replace_all(html, " ");
    let cleaned = DROPPED_BLOCKS.replace_all(&without_comments, " ");

    let regions: Vec<&str> = MAIN_REGION
        .captures_iter(&cleaned)
        .filter_map(|c| c.get(2).map(|m| m.as_str()))
        .collect();
    let body = if regions.is_empty() {
        cleaned.to_string()
    } else {
        regions.join(" ")
    };

    let mut text = String::new();
    if let Some(meta) = ABSTRACT_META
        .captures(&without_comments)
        .and_then(|c| c.get(1))
    {
        text.push_str(meta.as_str());
        text.push(' ');
    }
    text.push_str(&TAGS.replace_all(&body, " "));

    collapse_whitespace(&decode_entities(&text))
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

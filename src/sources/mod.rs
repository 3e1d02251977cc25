//! Bibliographic lookup backends.
//!
//! A [`MetadataSource`] resolves a [`MetadataQuery`] (DOI, arXiv id, or an
//! author/year/title search) to a [`BibRecord`]. `Ok(None)` means the source
//! answered and the work does not exist; errors mean the source could not be
//! asked.

pub mod arxiv;
pub mod cache;
pub mod config;
pub mod crossref;
#[cfg(any(test, feature = "mock"))]
pub mod mock;


pub use arxiv::ArxivSource;
pub use cache::CachedSource;
pub use config::LookupConfig;
pub use crossref::CrossrefSource;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockMetadataSource;

use async_trait::async_trait;
use serde::Serialize;

use crate::citation::CitationFields;
use crate::hashing::cache_key;
use crate::layers::LayerError;

/// DataCite prefix under which arXiv registers its DOIs.
const ARXIV_DOI_PREFIX: &str = "10.48550/arxiv.";

/// What to look up, strongest identifier first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetadataQuery {
    Doi(String),
    Arxiv(String),
    Bibliographic {
        author: String,
        year: i32,
        title: String,
    },
}

impl MetadataQuery {
    /// Picks the strongest query the fields allow, or `None` if there is nothing
    /// precise enough to look up.
    pub fn from_fields(fields: &CitationFields) -> Option<Self> {
        if let Some(doi) = fields.doi.as_deref() {
            if let Some(id) = doi.strip_prefix(ARXIV_DOI_PREFIX) {
                return Some(Self::Arxiv(id.to_string()));
            }
            return Some(Self::Doi(doi.to_string()));
        }
        if let Some(id) = fields.arxiv_id.as_deref() {
            return Some(Self::Arxiv(id.to_string()));
        }
        if !fields.has_strong_tuple() {
            return None;
        }
        Some(Self::Bibliographic {
            author: fields.author.clone()?,
            year: fields.year?,
            title: fields.title.clone()?,
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Doi(_) => "doi",
            Self::Arxiv(_) => "arxiv",
            Self::Bibliographic { .. } => "bibliographic",
        }
    }

    /// Stable cache key for this query.
    pub fn cache_key(&self) -> String {
        match self {
            Self::Doi(doi) => cache_key("doi", &[doi]),
            Self::Arxiv(id) => cache_key("arxiv", &[id]),
            Self::Bibliographic {
                author,
                year,
                title,
            } => cache_key("bib", &[author, &year.to_string(), title]),
        }
    }
}

impl std::fmt::Display for MetadataQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Doi(doi) => write!(f, "doi:{}", doi),
            Self::Arxiv(id) => write!(f, "arXiv:{}", id),
            Self::Bibliographic {
                author,
                year,
                title,
            } => write!(f, "{} ({}) {}", author, year, title),
        }
    }
}

/// Canonical metadata for a work, as reported by a source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct BibRecord {
    pub title: Option<String>,
    /// Family names, in author order.
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub venue: Option<String>,
    pub doi: Option<String>,
    pub url: Option<String>,
    /// Name of the source that produced the record.
    pub source: String,
}

#[async_trait]
pub trait MetadataSource: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this source can answer `query` at all.
    fn supports(&self, query: &MetadataQuery) -> bool;

    /// Resolves `query`. Network and 5xx failures are [`LayerError::Transient`].
    async fn lookup(&self, query: &MetadataQuery) -> Result<Option<BibRecord>, LayerError>;
}

/// Maps an HTTP status from a lookup API to a lookup outcome.
///
/// 404 is "not found"; 429 and 5xx are transient; other non-2xx codes mean the
/// request itself was bad and retrying will not help.
pub(crate) fn classify_status(source: &str, status: reqwest::StatusCode) -> Result<bool, LayerError> {
    if status.is_success() {
        Ok(true)
    } else if status == reqwest::StatusCode::NOT_FOUND {
        Ok(false)
    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Err(LayerError::transient(format!(
            "{} returned {}",
            source,
            status.as_u16()
        )))
    } else {
        Err(LayerError::unavailable(format!(
            "{} rejected the query ({})",
            source,
            status.as_u16()
        )))
    }
}

pub(crate) fn transport_error(source: &str, err: reqwest::Error) -> LayerError {
    LayerError::transient(format!("{}: {}", source, err))
}

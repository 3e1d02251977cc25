//! Crossref REST API (`/works`).

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{BibRecord, LookupConfig, MetadataQuery, MetadataSource, classify_status, transport_error};
use crate::constants::USER_AGENT;
use crate::layers::LayerError;

const SOURCE_NAME: &str = "crossref";

#[derive(Debug, Clone)]
pub struct CrossrefSource {
    client: reqwest::Client,
    base_url: String,
    mailto: Option<String>,
}

impl CrossrefSource {
    pub fn new(config: &LookupConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: config.crossref_url.trim_end_matches('/').to_string(),
            mailto: config.contact_email.clone(),
        })
    }

    fn with_mailto(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.mailto {
            Some(mailto) => builder.query(&[("mailto", mailto.as_str())]),
            None => builder,
        }
    }

    /// `/works/{doi}` with every DOI path segment percent-encoded.
    pub(crate) fn work_url(&self, doi: &str) -> Result<reqwest::Url, LayerError> {
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            LayerError::unavailable(format!("{}: invalid base URL: {}", SOURCE_NAME, e))
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                LayerError::unavailable(format!("{}: base URL cannot carry a path", SOURCE_NAME))
            })?
            .pop_if_empty()
            .push("works")
            .extend(doi.split('/'));
        Ok(url)
    }

    async fn work_by_doi(&self, doi: &str) -> Result<Option<BibRecord>, LayerError> {
        let url = self.work_url(doi)?;
        let response = self
            .with_mailto(self.client.get(url))
            .send()
            .await
            .map_err(|e| transport_error(SOURCE_NAME, e))?;

        if !classify_status(SOURCE_NAME, response.status())? {
            debug!(doi, "DOI not registered");
            return Ok(None);
        }

        let envelope: WorkEnvelope = response
            .json()
            .await
            .map_err(|e| transport_error(SOURCE_NAME, e))?;
        Ok(Some(envelope.message.into_record()))
    }

    async fn search(&self, author: &str, year: i32, title: &str) -> Result<Option<BibRecord>, LayerError> {
        let url = format!("{}/works", self.base_url);
        let bibliographic = format!("{} {} {}", title, author, year);
        let response = self
            .with_mailto(
                self.client
                    .get(&url)
                    .query(&[("query.bibliographic", bibliographic.as_str()), ("rows", "1")]),
            )
            .send()
            .await
            .map_err(|e| transport_error(SOURCE_NAME, e))?;

        if !classify_status(SOURCE_NAME, response.status())? {
            return Ok(None);
        }

        let envelope: SearchEnvelope = response
            .json()
            .await
            .map_err(|e| transport_error(SOURCE_NAME, e))?;
        Ok(envelope
            .message
            .items
            .into_iter()
            .next()
            .map(Work::into_record))
    }
}

#[async_trait]
impl MetadataSource for CrossrefSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn supports(&self, query: &MetadataQuery) -> bool {
        matches!(
            query,
            MetadataQuery::Doi(_) | MetadataQuery::Bibliographic { .. }
        )
    }

    #[instrument(skip(self), fields(source = SOURCE_NAME))]
    async fn lookup(&self, query: &MetadataQuery) -> Result<Option<BibRecord>, LayerError> {
        match query {
            MetadataQuery::Doi(doi) => self.work_by_doi(doi).await,
            MetadataQuery::Bibliographic {
                author,
                year,
                title,
            } => self.search(author, *year, title).await,
            MetadataQuery::Arxiv(_) => Err(LayerError::unavailable(
                "crossref does not resolve arXiv identifiers",
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkEnvelope {
    pub(crate) message: Work,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchEnvelope {
    pub(crate) message: SearchMessage,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchMessage {
    #[serde(default)]
    pub(crate) items: Vec<Work>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub(crate) struct Work {
    title: Vec<String>,
    author: Vec<Author>,
    issued: Option<DateParts>,
    published_print: Option<DateParts>,
    published_online: Option<DateParts>,
    container_title: Vec<String>,
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "URL")]
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Author {
    family: Option<String>,
    /// Organizational authors carry only a name.
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DateParts {
    #[serde(rename = "date-parts")]
    date_parts: Vec<Vec<Option<i32>>>,
}

impl DateParts {
    fn year(&self) -> Option<i32> {
        self.date_parts.first()?.first().copied().flatten()
    }
}

impl Work {
    pub(crate) fn into_record(self) -> BibRecord {
        let year = [&self.issued, &self.published_print, &self.published_online]
            .into_iter()
            .flatten()
            .find_map(DateParts::year);

        BibRecord {
            title: self.title.into_iter().next(),
            authors: self
                .author
                .into_iter()
                .filter_map(|a| a.family.or(a.name))
                .collect(),
            year,
            venue: self.container_title.into_iter().next(),
            doi: self.doi.map(|d| d.to_lowercase()),
            url: self.url,
            source: SOURCE_NAME.to_string(),
        }
    }
}

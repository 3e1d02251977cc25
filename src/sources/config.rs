use std::time::Duration;

use crate::config::{ConfigError, parse_u64_from_env, string_from_env};
use crate::constants::{
    DEFAULT_LAYER_TIMEOUT, DEFAULT_METADATA_CACHE_CAPACITY, DEFAULT_METADATA_CACHE_TTL,
};

const ENV_CROSSREF_URL: &str = "HALLUX_CROSSREF_URL";
const ENV_ARXIV_URL: &str = "HALLUX_ARXIV_URL";
const ENV_CONTACT_EMAIL: &str = "HALLUX_CONTACT_EMAIL";
const ENV_CACHE_TTL_SECS: &str = "HALLUX_METADATA_CACHE_TTL_SECS";
const ENV_CACHE_CAPACITY: &str = "HALLUX_METADATA_CACHE_CAPACITY";

pub const DEFAULT_CROSSREF_URL: &str = "https://api.crossref.org";
pub const DEFAULT_ARXIV_URL: &str = "https://export.arxiv.org/api/query";

/// Endpoints and caching for the bibliographic sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupConfig {
    pub crossref_url: String,
    pub arxiv_url: String,
    /// Sent as `mailto` so Crossref routes requests to its polite pool.
    pub contact_email: Option<String>,
    pub timeout: Duration,
    /// Zero disables the cache.
    pub cache_ttl: Duration,
    pub cache_capacity: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            crossref_url: DEFAULT_CROSSREF_URL.to_string(),
            arxiv_url: DEFAULT_ARXIV_URL.to_string(),
            contact_email: None,
            timeout: DEFAULT_LAYER_TIMEOUT,
            cache_ttl: DEFAULT_METADATA_CACHE_TTL,
            cache_capacity: DEFAULT_METADATA_CACHE_CAPACITY,
        }
    }
}

impl LookupConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let crossref_url = string_from_env(ENV_CROSSREF_URL).unwrap_or(defaults.crossref_url);
        let arxiv_url = string_from_env(ENV_ARXIV_URL).unwrap_or(defaults.arxiv_url);
        let contact_email = string_from_env(ENV_CONTACT_EMAIL);

        let cache_ttl = parse_u64_from_env(ENV_CACHE_TTL_SECS)?
            .map(Duration::from_secs)
            .unwrap_or(defaults.cache_ttl);
        let cache_capacity =
            parse_u64_from_env(ENV_CACHE_CAPACITY)?.unwrap_or(defaults.cache_capacity);

        let config = Self {
            crossref_url,
            arxiv_url,
            contact_email,
            timeout: defaults.timeout,
            cache_ttl,
            cache_capacity,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            (ENV_CROSSREF_URL, &self.crossref_url),
            (ENV_ARXIV_URL, &self.arxiv_url),
        ] {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.clone(),
                    reason: "must be an http(s) URL".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn cache_enabled(&self) -> bool {
        !self.cache_ttl.is_zero() && self.cache_capacity > 0
    }
}

use std::time::Duration;

use crate::config::{ConfigError, parse_from_env, parse_millis_from_env};
use crate::constants::{
    DEFAULT_LAYER_TIMEOUT, DEFAULT_MAX_CITATIONS, DEFAULT_MAX_IN_FLIGHT, DEFAULT_MAX_REDIRECTS,
    DEFAULT_MAX_TEXT_BYTES, DEFAULT_REQUEST_DEADLINE, DEFAULT_RETRY_BACKOFF, DEFAULT_RETRY_MAX,
};
use crate::extract::ExtractionLimits;
use crate::retry::RetryPolicy;

const ENV_MAX_TEXT_BYTES: &str = "HALLUX_MAX_TEXT_BYTES";
const ENV_MAX_CITATIONS: &str = "HALLUX_MAX_CITATIONS";
const ENV_LAYER_TIMEOUT_MS: &str = "HALLUX_LAYER_TIMEOUT_MS";
const ENV_REQUEST_DEADLINE_MS: &str = "HALLUX_REQUEST_DEADLINE_MS";
const ENV_MAX_IN_FLIGHT: &str = "HALLUX_MAX_IN_FLIGHT";
const ENV_RETRY_MAX: &str = "HALLUX_RETRY_MAX";
const ENV_RETRY_BACKOFF_MS: &str = "HALLUX_RETRY_BACKOFF_MS";
const ENV_MAX_REDIRECTS: &str = "HALLUX_MAX_REDIRECTS";

/// Floor for a single metadata lookup attempt.
const MIN_LOOKUP_ATTEMPT: Duration = Duration::from_millis(50);

/// Limits and timing for one verification request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub max_text_bytes: usize,
    pub max_citations: usize,
    /// Budget for each technical layer call.
    pub layer_timeout: Duration,
    /// Hard stop for a whole request; anything still running becomes `timed_out`.
    pub request_deadline: Duration,
    /// Concurrent external operations across all candidates of a request.
    pub max_in_flight: usize,
    pub retry: RetryPolicy,
    pub max_redirects: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_text_bytes: DEFAULT_MAX_TEXT_BYTES,
            max_citations: DEFAULT_MAX_CITATIONS,
            layer_timeout: DEFAULT_LAYER_TIMEOUT,
            request_deadline: DEFAULT_REQUEST_DEADLINE,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            retry: RetryPolicy::new(DEFAULT_RETRY_MAX, DEFAULT_RETRY_BACKOFF),
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let retry = RetryPolicy::new(
            parse_from_env(ENV_RETRY_MAX)?.unwrap_or(defaults.retry.max_retries),
            parse_millis_from_env(ENV_RETRY_BACKOFF_MS)?.unwrap_or(defaults.retry.backoff),
        );

        let config = Self {
            max_text_bytes: parse_from_env(ENV_MAX_TEXT_BYTES)?
                .unwrap_or(defaults.max_text_bytes),
            max_citations: parse_from_env(ENV_MAX_CITATIONS)?.unwrap_or(defaults.max_citations),
            layer_timeout: parse_millis_from_env(ENV_LAYER_TIMEOUT_MS)?
                .unwrap_or(defaults.layer_timeout),
            request_deadline: parse_millis_from_env(ENV_REQUEST_DEADLINE_MS)?
                .unwrap_or(defaults.request_deadline),
            max_in_flight: parse_from_env(ENV_MAX_IN_FLIGHT)?.unwrap_or(defaults.max_in_flight),
            retry,
            max_redirects: parse_from_env(ENV_MAX_REDIRECTS)?.unwrap_or(defaults.max_redirects),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            (ENV_MAX_TEXT_BYTES, self.max_text_bytes as u128),
            (ENV_MAX_CITATIONS, self.max_citations as u128),
            (ENV_LAYER_TIMEOUT_MS, self.layer_timeout.as_millis()),
            (ENV_REQUEST_DEADLINE_MS, self.request_deadline.as_millis()),
            (ENV_MAX_IN_FLIGHT, self.max_in_flight as u128),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if self.request_deadline < self.layer_timeout {
            return Err(ConfigError::InvalidValue {
                key: ENV_REQUEST_DEADLINE_MS.to_string(),
                value: self.request_deadline.as_millis().to_string(),
                reason: format!(
                    "must be at least the layer timeout ({} ms)",
                    self.layer_timeout.as_millis()
                ),
            });
        }

        Ok(())
    }

    /// Timeout for one metadata lookup attempt.
    ///
    /// Every attempt plus the backoff between them has to fit in nine tenths of
    /// `layer_timeout`, otherwise a hanging upstream eats the whole layer before
    /// a retry starts.
    pub fn lookup_attempt_timeout(&self) -> Duration {
        let retries = self.retry.max_retries;
        let backoff: Duration = (1..=retries).map(|n| self.retry.delay_for(n)).sum();
        let usable = (self.layer_timeout * 9 / 10).saturating_sub(backoff);
        let per_attempt = usable / (retries + 1);
        per_attempt.max(MIN_LOOKUP_ATTEMPT).min(self.layer_timeout)
    }

    pub fn extraction_limits(&self) -> ExtractionLimits {
        ExtractionLimits {
            max_text_bytes: self.max_text_bytes,
            max_citations: self.max_citations,
        }
    }
}

//! URL reachability.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{LayerKind, LayerResult, VerificationLayer};
use crate::citation::CitationCandidate;
use crate::fetch::{FetchError, HttpProbe, ProbeOutcome};

/// Score for a URL that resolves only after a redirect.
pub const REDIRECTED_SCORE: f64 = 0.9;

/// Score for an ambiguous redirect chain (too long or looping).
pub const AMBIGUOUS_REDIRECT_SCORE: f64 = 0.5;

pub struct UrlLayer {
    probe: Arc<dyn HttpProbe>,
    timeout: Duration,
}

impl UrlLayer {
    pub fn new(probe: Arc<dyn HttpProbe>, timeout: Duration) -> Self {
        Self { probe, timeout }
    }

    fn classify(outcome: &ProbeOutcome) -> LayerResult {
        let status = outcome.status;
        match status {
            200..=399 if outcome.redirected => LayerResult::passed(
                LayerKind::Url,
                REDIRECTED_SCORE,
                format!("HTTP {} after redirect to {}", status, outcome.final_url),
            ),
            200..=399 => LayerResult::passed(LayerKind::Url, 1.0, format!("HTTP {}", status)),
            _ => LayerResult::failed(LayerKind::Url, 0.0, format!("HTTP {}", status)),
        }
    }

    fn classify_error(&self, error: &FetchError) -> LayerResult {
        match error {
            FetchError::Timeout => {
                LayerResult::timed_out(LayerKind::Url, self.timeout.as_millis() as u64)
            }
            FetchError::TooManyRedirects { .. } => LayerResult::inconclusive(
                LayerKind::Url,
                AMBIGUOUS_REDIRECT_SCORE,
                error.to_string(),
            ),
            FetchError::Connect(_) | FetchError::InvalidUrl(_) => {
                LayerResult::failed(LayerKind::Url, 0.0, error.to_string())
            }
            FetchError::Status(code) => {
                LayerResult::failed(LayerKind::Url, 0.0, format!("HTTP {}", code))
            }
            FetchError::Other(reason) => {
                LayerResult::unavailable(LayerKind::Url, format!("probe failed: {}", reason))
            }
        }
    }
}

#[async_trait]
impl VerificationLayer for UrlLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Url
    }

    async fn check(&self, candidate: &CitationCandidate) -> LayerResult {
        let Some(url) = candidate.fields().url.as_deref() else {
            return LayerResult::unavailable(LayerKind::Url, "no URL to check");
        };

        match self.probe.probe(url).await {
            Ok(outcome) => {
                debug!(
                    candidate = candidate.id(),
                    status = outcome.status,
                    redirected = outcome.redirected,
                    "URL probed"
                );
                Self::classify(&outcome)
            }
            Err(err) => {
                debug!(candidate = candidate.id(), error = %err, "URL probe failed");
                self.classify_error(&err)
            }
        }
    }
}

//! The four verification layers and the result type they share.
//!
//! Each layer is an independent check over one [`CitationCandidate`]:
//!
//! | Layer | Needs | Collaborator |
//! |-------|-------|--------------|
//! | [`UrlLayer`] | a URL | [`HttpProbe`](crate::fetch::HttpProbe) |
//! | [`MetadataLayer`] | a DOI, arXiv id, or author+year+title | [`MetadataSource`](crate::sources::MetadataSource) |
//! | [`ContentLayer`] | a URL and context text | [`ContentFetcher`](crate::fetch::ContentFetcher) |
//! | [`AiLayer`] | results of the three layers above | [`JudgeChain`](crate::judge::JudgeChain) |
//!
//! Layers never return errors. Whatever happens inside, the runner hands back a
//! [`LayerResult`] whose [`LayerStatus`] records the outcome; a missing
//! precondition is `unavailable`, not `failed`.

pub mod ai;
pub mod content;
pub mod error;
pub mod metadata;
pub mod url;


pub use ai::AiLayer;
pub use content::ContentLayer;
pub use error::LayerError;
pub use metadata::MetadataLayer;
pub use url::UrlLayer;

use async_trait::async_trait;
use serde::Serialize;

use crate::citation::CitationCandidate;

/// Identifies a layer. The declaration order is the canonical output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Url,
    Metadata,
    Content,
    Ai,
}

impl LayerKind {
    /// All layers in canonical order.
    pub const ALL: [LayerKind; 4] = [
        LayerKind::Url,
        LayerKind::Metadata,
        LayerKind::Content,
        LayerKind::Ai,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Url => "url",
            LayerKind::Metadata => "metadata",
            LayerKind::Content => "content",
            LayerKind::Ai => "ai",
        }
    }

    /// Position in the canonical order.
    pub fn index(&self) -> usize {
        match self {
            LayerKind::Url => 0,
            LayerKind::Metadata => 1,
            LayerKind::Content => 2,
            LayerKind::Ai => 3,
        }
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerStatus {
    Passed,
    Failed,
    Inconclusive,
    Unavailable,
    TimedOut,
}

impl LayerStatus {
    /// Returns `true` for statuses that carry a score.
    pub fn is_scored(&self) -> bool {
        matches!(
            self,
            LayerStatus::Passed | LayerStatus::Failed | LayerStatus::Inconclusive
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerStatus::Passed => "passed",
            LayerStatus::Failed => "failed",
            LayerStatus::Inconclusive => "inconclusive",
            LayerStatus::Unavailable => "unavailable",
            LayerStatus::TimedOut => "timed_out",
        }
    }
}

impl std::fmt::Display for LayerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one layer for one candidate.
///
/// The score is present exactly when the status is scored, and always lies in
/// `[0, 1]` (out-of-range inputs are clamped, NaN becomes `0.0`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerResult {
    layer: LayerKind,
    status: LayerStatus,
    score: Option<f64>,
    evidence: String,
    elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    backend: Option<String>,
}

impl LayerResult {
    fn scored(layer: LayerKind, status: LayerStatus, score: f64, evidence: String) -> Self {
        Self {
            layer,
            status,
            score: Some(clamp_score(score)),
            evidence,
            elapsed_ms: 0,
            backend: None,
        }
    }

    pub fn passed(layer: LayerKind, score: f64, evidence: impl Into<String>) -> Self {
        Self::scored(layer, LayerStatus::Passed, score, evidence.into())
    }

    pub fn failed(layer: LayerKind, score: f64, evidence: impl Into<String>) -> Self {
        Self::scored(layer, LayerStatus::Failed, score, evidence.into())
    }

    pub fn inconclusive(layer: LayerKind, score: f64, evidence: impl Into<String>) -> Self {
        Self::scored(layer, LayerStatus::Inconclusive, score, evidence.into())
    }

    pub fn unavailable(layer: LayerKind, reason: impl Into<String>) -> Self {
        Self {
            layer,
            status: LayerStatus::Unavailable,
            score: None,
            evidence: reason.into(),
            elapsed_ms: 0,
            backend: None,
        }
    }

    pub fn timed_out(layer: LayerKind, budget_ms: u64) -> Self {
        Self {
            layer,
            status: LayerStatus::TimedOut,
            score: None,
            evidence: format!("no result within {} ms", budget_ms),
            elapsed_ms: budget_ms,
            backend: None,
        }
    }

    /// Folds a runner error into the matching unscored status.
    pub fn from_error(layer: LayerKind, error: &LayerError) -> Self {
        match error {
            LayerError::Unavailable { reason } => Self::unavailable(layer, reason.clone()),
            LayerError::Timeout { budget_ms } => Self::timed_out(layer, *budget_ms),
            LayerError::Transient { reason } => {
                Self::unavailable(layer, format!("upstream unreachable: {}", reason))
            }
        }
    }

    pub fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    pub fn layer(&self) -> LayerKind {
        self.layer
    }

    pub fn status(&self) -> LayerStatus {
        self.status
    }

    pub fn score(&self) -> Option<f64> {
        self.score
    }

    pub fn evidence(&self) -> &str {
        &self.evidence
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn backend(&self) -> Option<&str> {
        self.backend.as_deref()
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// A technical check that looks only at the candidate itself.
#[async_trait]
pub trait VerificationLayer: Send + Sync {
    fn kind(&self) -> LayerKind;

    /// Runs the check. Must not panic and must not block past its own timeout.
    async fn check(&self, candidate: &CitationCandidate) -> LayerResult;
}

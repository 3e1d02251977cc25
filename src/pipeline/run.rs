use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::aggregate::{VerdictLabel, VerificationVerdict};
use crate::citation::CitationCandidate;
use crate::layers::LayerKind;

/// Where a run is in its lifecycle. Only extraction can fail a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Received,
    Extracting,
    RunningLayers,
    Aggregating,
    Complete,
    Failed,
}

impl RunState {
    /// Whether `self -> next` is a legal step.
    pub fn can_advance_to(self, next: RunState) -> bool {
        matches!(
            (self, next),
            (RunState::Received, RunState::Extracting)
                | (RunState::Received, RunState::RunningLayers)
                | (RunState::Extracting, RunState::RunningLayers)
                | (RunState::Extracting, RunState::Failed)
                | (RunState::RunningLayers, RunState::Aggregating)
                | (RunState::Aggregating, RunState::Complete)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Complete | RunState::Failed)
    }
}

/// Verdict counts per label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub verified: usize,
    pub suspicious: usize,
    pub unverifiable: usize,
}

impl RunSummary {
    pub fn from_verdicts(verdicts: &[VerificationVerdict]) -> Self {
        verdicts.iter().fold(Self::default(), |mut acc, v| {
            acc.total += 1;
            match v.label() {
                VerdictLabel::Verified => acc.verified += 1,
                VerdictLabel::Suspicious => acc.suspicious += 1,
                VerdictLabel::Unverifiable => acc.unverifiable += 1,
            }
            acc
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetadata {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub enabled_layers: Vec<LayerKind>,
    pub state: RunState,
}

/// Result of verifying one document: a verdict per candidate plus the
/// document-level confidence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationRun {
    verdicts: Vec<VerificationVerdict>,
    confidence: Option<f64>,
    summary: RunSummary,
    metadata: RunMetadata,
}

impl VerificationRun {
    pub(crate) fn new(verdicts: Vec<VerificationVerdict>, metadata: RunMetadata) -> Self {
        let confidence = document_confidence(&verdicts);
        let summary = RunSummary::from_verdicts(&verdicts);
        Self {
            verdicts,
            confidence,
            summary,
            metadata,
        }
    }

    /// Candidates in document order.
    pub fn candidates(&self) -> impl Iterator<Item = &CitationCandidate> {
        self.verdicts.iter().map(|v| v.candidate())
    }

    pub fn verdicts(&self) -> &[VerificationVerdict] {
        &self.verdicts
    }

    /// Mean of the defined verdict scores; `None` if no verdict has one.
    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    pub fn metadata(&self) -> &RunMetadata {
        &self.metadata
    }
}

pub fn document_confidence(verdicts: &[VerificationVerdict]) -> Option<f64> {
    let scores: Vec<f64> = verdicts.iter().filter_map(|v| v.score()).collect();
    if scores.is_empty() {
        return None;
    }
    let min = scores.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    Some((scores.iter().sum::<f64>() / scores.len() as f64).clamp(min, max))
}

//! Combines per-layer results into one verdict per citation.
//!
//! Aggregation is a pure function of the layer results and the
//! [`AggregationPolicy`]:
//!
//! - Only scored layers (`passed`, `failed`, `inconclusive`) contribute. Missing,
//!   `unavailable` and `timed_out` layers are absent, not zero: their weight is
//!   redistributed over the layers that scored.
//! - The score is the weighted mean of the scored layers, so it always lies
//!   between the lowest and highest contributing score.
//! - With no scored layer the score is undefined and the label `unverifiable`.
//! - With fewer than `min_scored_layers` scored layers the label is
//!   `unverifiable` whatever the score.
//!
//! Inputs are canonicalized (url, metadata, content, ai) before summing, so
//! the same results in any order yield bit-identical verdicts.

pub mod policy;


pub use policy::{AggregationPolicy, LayerWeights, PolicyError};

use serde::Serialize;

use crate::citation::CitationCandidate;
use crate::heuristics::RedFlag;
use crate::layers::{LayerKind, LayerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictLabel {
    Verified,
    Suspicious,
    Unverifiable,
}

impl VerdictLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictLabel::Verified => "verified",
            VerdictLabel::Suspicious => "suspicious",
            VerdictLabel::Unverifiable => "unverifiable",
        }
    }
}

impl std::fmt::Display for VerdictLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One layer slot per [`LayerKind`], in canonical order.
pub type LayerSlots = [Option<LayerResult>; 4];

/// Final, immutable verdict for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationVerdict {
    candidate: CitationCandidate,
    layers: LayerSlots,
    score: Option<f64>,
    label: VerdictLabel,
    explanation: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    flags: Vec<RedFlag>,
}

impl VerificationVerdict {
    pub fn candidate(&self) -> &CitationCandidate {
        &self.candidate
    }

    pub fn layers(&self) -> &LayerSlots {
        &self.layers
    }

    pub fn layer(&self, kind: LayerKind) -> Option<&LayerResult> {
        self.layers[kind.index()].as_ref()
    }

    /// Present results in canonical order.
    pub fn results(&self) -> impl Iterator<Item = &LayerResult> {
        self.layers.iter().flatten()
    }

    /// `None` when no layer produced a score.
    pub fn score(&self) -> Option<f64> {
        self.score
    }

    pub fn label(&self) -> VerdictLabel {
        self.label
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn flags(&self) -> &[RedFlag] {
        &self.flags
    }
}

/// Puts results into their canonical slots. If a layer appears twice the
/// first result wins.
pub fn canonicalize(results: impl IntoIterator<Item = LayerResult>) -> LayerSlots {
    let mut slots: LayerSlots = Default::default();
    for result in results {
        let slot = &mut slots[result.layer().index()];
        if slot.is_none() {
            *slot = Some(result);
        }
    }
    slots
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator {
    policy: AggregationPolicy,
}

impl Aggregator {
    pub fn new(policy: AggregationPolicy) -> Result<Self, PolicyError> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &AggregationPolicy {
        &self.policy
    }

    /// Weighted mean over scored layers, or `None` if none scored.
    pub fn score(&self, slots: &LayerSlots) -> Option<f64> {
        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for result in slots.iter().flatten() {
            if !result.status().is_scored() {
                continue;
            }
            let Some(score) = result.score() else {
                continue;
            };
            let weight = self.policy.weights.get(result.layer());
            weighted += weight * score;
            total_weight += weight;
            min = min.min(score);
            max = max.max(score);
        }

        if total_weight <= 0.0 {
            return None;
        }
        // Keeps rounding from stepping outside the contributing range.
        Some((weighted / total_weight).clamp(min, max))
    }

    pub fn label(&self, score: Option<f64>, scored_layers: usize) -> VerdictLabel {
        match score {
            Some(_) if scored_layers < self.policy.min_scored_layers => VerdictLabel::Unverifiable,
            Some(score) => self.policy.label_for_score(score),
            None => VerdictLabel::Unverifiable,
        }
    }

    pub fn aggregate(
        &self,
        candidate: CitationCandidate,
        results: impl IntoIterator<Item = LayerResult>,
        flags: Vec<RedFlag>,
    ) -> VerificationVerdict {
        let layers = canonicalize(results);
        let scored_layers = layers
            .iter()
            .flatten()
            .filter(|r| r.status().is_scored())
            .count();
        let score = self.score(&layers);
        let label = self.label(score, scored_layers);
        let explanation = self.explain(&layers, score, label, scored_layers, &flags);

        VerificationVerdict {
            candidate,
            layers,
            score,
            label,
            explanation,
            flags,
        }
    }

    /// `"{label} ({score}): {layer} {status}: {evidence} | ..."`.
    fn explain(
        &self,
        layers: &LayerSlots,
        score: Option<f64>,
        label: VerdictLabel,
        scored_layers: usize,
        flags: &[RedFlag],
    ) -> String {
        let header = match score {
            Some(score) => format!("{} ({:.2})", label, score),
            None => format!("{} (no layer produced a score)", label),
        };

        let mut parts: Vec<String> = layers
            .iter()
            .flatten()
            .map(|r| format!("{} {}: {}", r.layer(), r.status(), r.evidence()))
            .collect();

        if score.is_some() && scored_layers < self.policy.min_scored_layers {
            parts.push(format!(
                "only {} of {} required layers scored",
                scored_layers, self.policy.min_scored_layers
            ));
        }
        if !flags.is_empty() {
            let details: Vec<&str> = flags.iter().map(|f| f.detail.as_str()).collect();
            parts.push(format!("red flags: {}", details.join("; ")));
        }

        if parts.is_empty() {
            header
        } else {
            format!("{}: {}", header, parts.join(" | "))
        }
    }
}

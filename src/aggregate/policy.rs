use serde::Serialize;
use thiserror::Error;

use crate::config::{ConfigError, parse_f64_from_env, parse_from_env};
use crate::constants::{
    DEFAULT_AI_WEIGHT, DEFAULT_CONTENT_WEIGHT, DEFAULT_HIGH_THRESHOLD, DEFAULT_LOW_THRESHOLD,
    DEFAULT_METADATA_WEIGHT, DEFAULT_MIN_SCORED_LAYERS, DEFAULT_URL_WEIGHT,
};
use crate::layers::LayerKind;

use super::VerdictLabel;

const ENV_THRESHOLD_HIGH: &str = "HALLUX_THRESHOLD_HIGH";
const ENV_THRESHOLD_LOW: &str = "HALLUX_THRESHOLD_LOW";
const ENV_WEIGHT_URL: &str = "HALLUX_WEIGHT_URL";
const ENV_WEIGHT_METADATA: &str = "HALLUX_WEIGHT_METADATA";
const ENV_WEIGHT_CONTENT: &str = "HALLUX_WEIGHT_CONTENT";
const ENV_WEIGHT_AI: &str = "HALLUX_WEIGHT_AI";
const ENV_MIN_SCORED_LAYERS: &str = "HALLUX_MIN_SCORED_LAYERS";

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PolicyError {
    #[error("thresholds must satisfy 0 <= low < high <= 1 (low={low}, high={high})")]
    Thresholds { low: f64, high: f64 },

    #[error("weight for {layer} must be a positive finite number, got {weight}")]
    Weight { layer: LayerKind, weight: f64 },

    #[error("ai weight {ai} must be at least the {layer} weight {weight}")]
    AiWeightTooLow {
        ai: f64,
        layer: LayerKind,
        weight: f64,
    },

    #[error("min_scored_layers must be between 1 and 4, got {0}")]
    MinScoredLayers(usize),
}

/// Relative layer weights. Only ratios matter; they need not sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayerWeights {
    pub url: f64,
    pub metadata: f64,
    pub content: f64,
    pub ai: f64,
}

impl Default for LayerWeights {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL_WEIGHT,
            metadata: DEFAULT_METADATA_WEIGHT,
            content: DEFAULT_CONTENT_WEIGHT,
            ai: DEFAULT_AI_WEIGHT,
        }
    }
}

impl LayerWeights {
    pub fn get(&self, layer: LayerKind) -> f64 {
        match layer {
            LayerKind::Url => self.url,
            LayerKind::Metadata => self.metadata,
            LayerKind::Content => self.content,
            LayerKind::Ai => self.ai,
        }
    }
}

/// Weights, label thresholds and the corroboration rule.
///
/// # Invariants
///
/// Enforced by [`AggregationPolicy::validate`]:
///
/// 1. `0 <= low < high <= 1`, so the three labels partition `[0, 1]`
/// 2. every weight is positive and finite
/// 3. the AI weight is at least each technical weight
/// 4. `1 <= min_scored_layers <= 4`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregationPolicy {
    pub weights: LayerWeights,
    /// Scores at or above this are `verified`.
    pub high: f64,
    /// Scores at or below this are `suspicious`.
    pub low: f64,
    /// Fewer scored layers than this always yields `unverifiable`.
    pub min_scored_layers: usize,
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self {
            weights: LayerWeights::default(),
            high: DEFAULT_HIGH_THRESHOLD,
            low: DEFAULT_LOW_THRESHOLD,
            min_scored_layers: DEFAULT_MIN_SCORED_LAYERS,
        }
    }
}

impl AggregationPolicy {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let policy = Self {
            weights: LayerWeights {
                url: parse_f64_from_env(ENV_WEIGHT_URL)?.unwrap_or(defaults.weights.url),
                metadata: parse_f64_from_env(ENV_WEIGHT_METADATA)?
                    .unwrap_or(defaults.weights.metadata),
                content: parse_f64_from_env(ENV_WEIGHT_CONTENT)?
                    .unwrap_or(defaults.weights.content),
                ai: parse_f64_from_env(ENV_WEIGHT_AI)?.unwrap_or(defaults.weights.ai),
            },
            high: parse_f64_from_env(ENV_THRESHOLD_HIGH)?.unwrap_or(defaults.high),
            low: parse_f64_from_env(ENV_THRESHOLD_LOW)?.unwrap_or(defaults.low),
            min_scored_layers: parse_from_env(ENV_MIN_SCORED_LAYERS)?
                .unwrap_or(defaults.min_scored_layers),
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        let thresholds_ok = self.low.is_finite()
            && self.high.is_finite()
            && 0.0 <= self.low
            && self.low < self.high
            && self.high <= 1.0;
        if !thresholds_ok {
            return Err(PolicyError::Thresholds {
                low: self.low,
                high: self.high,
            });
        }

        for layer in LayerKind::ALL {
            let weight = self.weights.get(layer);
            if !(weight.is_finite() && weight > 0.0) {
                return Err(PolicyError::Weight { layer, weight });
            }
        }

        for layer in [LayerKind::Url, LayerKind::Metadata, LayerKind::Content] {
            let weight = self.weights.get(layer);
            if self.weights.ai < weight {
                return Err(PolicyError::AiWeightTooLow {
                    ai: self.weights.ai,
                    layer,
                    weight,
                });
            }
        }

        if !(1..=LayerKind::ALL.len()).contains(&self.min_scored_layers) {
            return Err(PolicyError::MinScoredLayers(self.min_scored_layers));
        }

        Ok(())
    }

    /// Label for a defined score, ignoring the corroboration rule.
    ///
    /// Exactly one label per score: `[0, low]`, `(low, high)`, `[high, 1]`.
    pub fn label_for_score(&self, score: f64) -> VerdictLabel {
        if score >= self.high {
            VerdictLabel::Verified
        } else if score <= self.low {
            VerdictLabel::Suspicious
        } else {
            VerdictLabel::Unverifiable
        }
    }
}

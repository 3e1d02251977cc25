//! AI plausibility scoring.

use tracing::debug;

use super::{LayerKind, LayerResult};
use crate::citation::CitationCandidate;
use crate::heuristics::RedFlag;
use crate::judge::{JudgeChain, build_prompt};

/// Reasoning longer than this is cut in the layer evidence.
pub const MAX_REASONING_CHARS: usize = 600;

/// Runs after the technical layers and consumes their results.
#[derive(Debug, Clone)]
pub struct AiLayer {
    chain: JudgeChain,
}

impl AiLayer {
    pub fn new(chain: JudgeChain) -> Self {
        Self { chain }
    }

    pub fn chain(&self) -> &JudgeChain {
        &self.chain
    }

    pub async fn check(
        &self,
        candidate: &CitationCandidate,
        prior: &[LayerResult],
        flags: &[RedFlag],
    ) -> LayerResult {
        if !self.chain.any_configured() {
            return LayerResult::unavailable(LayerKind::Ai, "no judge configured");
        }

        let prompt = build_prompt(candidate, prior, flags);
        match self.chain.evaluate(&prompt).await {
            Ok(verdict) => {
                debug!(
                    candidate = candidate.id(),
                    backend = %verdict.backend,
                    score = verdict.reply.score,
                    "AI judge scored citation"
                );
                LayerResult::passed(
                    LayerKind::Ai,
                    verdict.reply.score,
                    shorten(&verdict.reply.reasoning, MAX_REASONING_CHARS),
                )
                .with_backend(verdict.backend)
            }
            Err(err) => LayerResult::unavailable(LayerKind::Ai, err.to_string()),
        }
    }
}

fn shorten(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &flat[..idx]),
        None => flat,
    }
}

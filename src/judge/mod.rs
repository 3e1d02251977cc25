//! Language-model judges and the ordered fallback chain.
//!
//! A [`Judge`] turns a [`JudgePrompt`] into raw reply text. The [`JudgeChain`]
//! tries its judges in order, each under its own timeout, and returns the
//! first reply that parses into a score. Judges without credentials are skipped
//! without a network call.

pub mod config;
pub mod genai_backend;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod openai;
pub mod prompt;


pub use config::{JudgeBackend, JudgeConfig};
pub use genai_backend::GenaiJudge;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockJudge;
pub use openai::OpenAiJudge;
pub use prompt::{JudgePrompt, JudgeReply, build_prompt, parse_reply};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JudgeError {
    #[error("{backend}: not configured")]
    NotConfigured { backend: String },

    #[error("{backend}: no reply within {budget_ms} ms")]
    Timeout { backend: String, budget_ms: u64 },

    #[error("{backend}: request failed: {reason}")]
    Request { backend: String, reason: String },

    #[error("{backend}: reply has no confidence score")]
    Unparseable { backend: String },

    #[error("no judge answered ({})", .attempts.join("; "))]
    Exhausted { attempts: Vec<String> },
}

impl JudgeError {
    pub fn request(backend: &str, reason: impl std::fmt::Display) -> Self {
        Self::Request {
            backend: backend.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
pub trait Judge: Send + Sync {
    /// Backend name reported on the AI layer result.
    fn name(&self) -> &str;

    /// `false` when credentials are missing; the chain skips such judges.
    fn is_configured(&self) -> bool {
        true
    }

    /// Sends the prompt and returns the raw reply text.
    async fn complete(&self, prompt: &JudgePrompt) -> Result<String, JudgeError>;
}

/// A parsed answer together with the judge that gave it.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeVerdict {
    pub backend: String,
    pub reply: JudgeReply,
}

/// Configuration state of one judge, as shown on the readiness endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JudgeStatus {
    pub name: String,
    pub configured: bool,
}

/// Ordered primary/fallback judges.
#[derive(Clone)]
pub struct JudgeChain {
    judges: Vec<Arc<dyn Judge>>,
    timeout: Duration,
}

impl std::fmt::Debug for JudgeChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JudgeChain")
            .field(
                "judges",
                &self.judges.iter().map(|j| j.name()).collect::<Vec<_>>(),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl JudgeChain {
    pub fn new(judges: Vec<Arc<dyn Judge>>, timeout: Duration) -> Self {
        Self { judges, timeout }
    }

    /// Builds the backends listed in `config.order`, in that order.
    pub fn from_config(config: &JudgeConfig) -> Result<Self, reqwest::Error> {
        let mut judges: Vec<Arc<dyn Judge>> = Vec::with_capacity(config.order.len());
        for backend in &config.order {
            match backend {
                JudgeBackend::OpenAi => judges.push(Arc::new(OpenAiJudge::new(config)?)),
                JudgeBackend::Genai => judges.push(Arc::new(GenaiJudge::new(config))),
            }
        }
        Ok(Self::new(judges, config.timeout))
    }

    pub fn is_empty(&self) -> bool {
        self.judges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.judges.len()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// True if at least one judge could be asked.
    pub fn any_configured(&self) -> bool {
        self.judges.iter().any(|j| j.is_configured())
    }

    pub fn statuses(&self) -> Vec<JudgeStatus> {
        self.judges
            .iter()
            .map(|j| JudgeStatus {
                name: j.name().to_string(),
                configured: j.is_configured(),
            })
            .collect()
    }

    /// Asks each judge in order until one returns a parseable reply.
    pub async fn evaluate(&self, prompt: &JudgePrompt) -> Result<JudgeVerdict, JudgeError> {
        let mut attempts = Vec::new();

        for judge in &self.judges {
            match self.ask(judge.as_ref(), prompt).await {
                Ok(reply) => {
                    debug!(
                        backend = judge.name(),
                        score = reply.score,
                        skipped = attempts.len(),
                        "Judge answered"
                    );
                    return Ok(JudgeVerdict {
                        backend: judge.name().to_string(),
                        reply,
                    });
                }
                Err(err) => {
                    if matches!(err, JudgeError::NotConfigured { .. }) {
                        debug!(backend = judge.name(), "Judge not configured, skipping");
                    } else {
                        warn!(backend = judge.name(), error = %err, "Judge failed, trying next");
                    }
                    attempts.push(err.to_string());
                }
            }
        }

        Err(JudgeError::Exhausted { attempts })
    }

    async fn ask(&self, judge: &dyn Judge, prompt: &JudgePrompt) -> Result<JudgeReply, JudgeError> {
        if !judge.is_configured() {
            return Err(JudgeError::NotConfigured {
                backend: judge.name().to_string(),
            });
        }

        let text = tokio::time::timeout(self.timeout, judge.complete(prompt))
            .await
            .map_err(|_| JudgeError::Timeout {
                backend: judge.name().to_string(),
                budget_ms: self.timeout.as_millis() as u64,
            })??;

        parse_reply(&text).ok_or_else(|| JudgeError::Unparseable {
            backend: judge.name().to_string(),
        })
    }
}

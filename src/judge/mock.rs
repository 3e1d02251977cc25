//! Scripted judge for tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{Judge, JudgeError, JudgePrompt};

#[derive(Debug, Clone)]
enum Script {
    Reply(String),
    Fail(String),
}

/// Replies with fixed text (or a fixed failure), optionally after a delay.
#[derive(Debug, Clone)]
pub struct MockJudge {
    name: String,
    script: Script,
    delay: Duration,
    configured: bool,
    calls: Arc<AtomicUsize>,
}

impl MockJudge {
    /// Answers `Confidence Score: {score}` with a short reasoning line.
    pub fn scoring(name: impl Into<String>, score: f64) -> Self {
        Self::replying(
            name,
            format!("Confidence Score: {}\n\nReasoning: scripted answer", score),
        )
    }

    pub fn replying(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Script::Reply(text.into()),
            delay: Duration::ZERO,
            configured: true,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            script: Script::Fail(reason.into()),
            ..Self::replying(name, "")
        }
    }

    pub fn unconfigured(name: impl Into<String>) -> Self {
        Self {
            configured: false,
            ..Self::failing(name, "not configured")
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Judge for MockJudge {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn complete(&self, _prompt: &JudgePrompt) -> Result<String, JudgeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.script {
            Script::Reply(text) => Ok(text.clone()),
            Script::Fail(reason) => Err(JudgeError::request(&self.name, reason)),
        }
    }
}

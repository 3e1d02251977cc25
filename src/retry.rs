//! Bounded retry for transient upstream failures.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::constants::{DEFAULT_RETRY_BACKOFF, DEFAULT_RETRY_MAX};
use crate::layers::LayerError;

/// Retry count and base backoff. Backoff doubles on every further attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_RETRY_MAX,
            backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Upper bound on retries regardless of configuration.
    pub const MAX_RETRIES_CAP: u32 = 5;

    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries: max_retries.min(Self::MAX_RETRIES_CAP),
            backoff,
        }
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(16);
        self.backoff.saturating_mul(factor)
    }

    /// Runs `op`, retrying only [`LayerError::Transient`] failures.
    ///
    /// Returns the last error once retries are exhausted. Other error kinds are
    /// returned immediately.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, LayerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LayerError>>,
    {
        let mut retry = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && retry < self.max_retries => {
                    retry += 1;
                    let delay = self.delay_for(retry);
                    debug!(
                        label,
                        retry,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(LayerError::Transient { reason }) => {
                    return Err(LayerError::transient(format!(
                        "{} (after {} attempts)",
                        reason,
                        retry + 1
                    )));
                }
                Err(err) => return Err(err),
            }
        }
    }
}

use thiserror::Error;

/// Why a layer could not produce a scored result.
///
/// These never escape a layer runner: they are folded into a
/// [`LayerResult`](super::LayerResult) status at the runner boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LayerError {
    /// A precondition was not met (no URL, no DOI, layer disabled). A skip, not a failure.
    #[error("unavailable: {reason}")]
    Unavailable { reason: String },

    /// The operation exceeded its time budget.
    #[error("timed out after {budget_ms} ms")]
    Timeout { budget_ms: u64 },

    /// Network or upstream API error that may succeed on retry.
    #[error("transient failure: {reason}")]
    Transient { reason: String },
}

impl LayerError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the retry policy applies to this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

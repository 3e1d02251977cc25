use thiserror::Error;

use crate::aggregate::PolicyError;
use crate::extract::ExtractionError;

#[derive(Debug, Error)]
pub enum VerifyError {
    /// The only way a text request fails; layer problems end up in verdicts.
    #[error("citation extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("invalid aggregation policy: {0}")]
    Policy(#[from] PolicyError),
}

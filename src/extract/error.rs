use thiserror::Error;

/// Reasons a text is rejected before any layer runs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("input is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("input contains control character U+{code:04X} at byte {offset}; binary data is not accepted")]
    Binary { offset: usize, code: u32 },

    #[error("found {found} citations, limit is {limit}")]
    TooManyCitations { found: usize, limit: usize },
}

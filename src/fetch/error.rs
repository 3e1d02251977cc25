use thiserror::Error;

/// Outbound HTTP failures, classified the way the layers need them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("connection refused or host unreachable: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("redirect chain exceeded {limit} hops or looped")]
    TooManyRedirects { limit: usize },

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("http error: {0}")]
    Other(String),
}

impl FetchError {
    pub fn from_reqwest(err: reqwest::Error, redirect_limit: usize) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_redirect() {
            FetchError::TooManyRedirects {
                limit: redirect_limit,
            }
        } else if err.is_builder() {
            FetchError::InvalidUrl(err.to_string())
        } else if err.is_connect() {
            FetchError::Connect(err.to_string())
        } else {
            FetchError::Other(err.to_string())
        }
    }
}

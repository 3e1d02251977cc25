use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::constants::HALLUX_STATUS_HEADER;
use crate::extract::ExtractionError;
use crate::pipeline::VerifyError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<VerifyError> for GatewayError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::Extraction(e) => GatewayError::Extraction(e),
            other => GatewayError::InternalError(other.to_string()),
        }
    }
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, hallux_status) = match &self {
            GatewayError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            GatewayError::Extraction(_) => (StatusCode::UNPROCESSABLE_ENTITY, "extraction_error"),
            GatewayError::InternalError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            HALLUX_STATUS_HEADER,
            HeaderValue::from_str(hallux_status).unwrap_or(HeaderValue::from_static("error")),
        );

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        });

        (status, headers, body).into_response()
    }
}

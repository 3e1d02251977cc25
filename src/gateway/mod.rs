//! HTTP gateway (Axum) over the verification pipeline.
//!
//! This module is primarily used by the `hallux` server binary.

pub mod error;
pub mod handler;
pub mod state;


use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use error::GatewayError;
pub use handler::{verify_batch_handler, verify_citation_handler, verify_text_handler};
pub use state::HandlerState;

use crate::constants::{
    HALLUX_STATUS_ERROR, HALLUX_STATUS_HEADER, HALLUX_STATUS_HEALTHY, HALLUX_STATUS_READY,
};
use crate::judge::JudgeStatus;

pub fn create_router_with_state(state: HandlerState) -> Router {
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/v1/verify/citation", post(verify_citation_handler))
        .route("/v1/verify/text", post(verify_text_handler))
        .route("/v1/verify/batch", post(verify_batch_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(serde::Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub judges: Vec<JudgeStatus>,
    pub sources: Vec<String>,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        HALLUX_STATUS_HEADER,
        HeaderValue::from_static(HALLUX_STATUS_HEALTHY),
    );

    (
        StatusCode::OK,
        headers,
        Json(HealthResponse { status: "ok" }),
    )
        .into_response()
}

/// Always 200. The status header is `error` when no judge is configured.
#[tracing::instrument(skip(state))]
pub async fn ready_handler(State(state): State<HandlerState>) -> Response {
    let judges = state.verifier.judge_statuses();
    let sources = state.verifier.source_names();

    let status = if judges.iter().any(|j| j.configured) {
        HALLUX_STATUS_READY
    } else {
        HALLUX_STATUS_ERROR
    };

    let mut headers = HeaderMap::new();
    headers.insert(HALLUX_STATUS_HEADER, HeaderValue::from_static(status));

    (
        StatusCode::OK,
        headers,
        Json(ReadyResponse {
            status: "ok",
            judges,
            sources,
        }),
    )
        .into_response()
}

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::citation::CitationFields;
use crate::constants::{HALLUX_STATUS_HEADER, MAX_BATCH_CITATIONS};
use crate::extract::parse_citation;
use crate::gateway::error::GatewayError;
use crate::gateway::state::HandlerState;
use crate::pipeline::VerifyOptions;

/// Body of `POST /v1/verify/citation`. Either `citation` or `fields` is required;
/// a raw `citation` string wins when both are present.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CitationRequest {
    #[serde(default)]
    pub citation: Option<String>,
    #[serde(default)]
    pub fields: Option<CitationFields>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub options: VerifyOptions,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextRequest {
    pub text: String,
    #[serde(default)]
    pub options: VerifyOptions,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchRequest {
    pub citations: Vec<String>,
    #[serde(default)]
    pub options: VerifyOptions,
}

#[derive(Debug, serde::Serialize)]
pub struct BatchResponse {
    pub verdicts: Vec<crate::aggregate::VerificationVerdict>,
}

fn parse_body<T: DeserializeOwned>(body: serde_json::Value) -> Result<T, GatewayError> {
    serde_json::from_value(body)
        .map_err(|e| GatewayError::InvalidRequest(format!("Invalid request schema: {}", e)))
}

fn make_response<T: serde::Serialize>(status: &str, body: T) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        HALLUX_STATUS_HEADER,
        HeaderValue::from_str(status).unwrap_or(HeaderValue::from_static("error")),
    );
    (StatusCode::OK, headers, Json(body)).into_response()
}

/// Resolves the fields to verify from a citation request.
pub fn citation_fields(request: &CitationRequest) -> Result<CitationFields, GatewayError> {
    if let Some(raw) = request.citation.as_deref()
        && !raw.trim().is_empty()
    {
        return Ok(parse_citation(raw));
    }

    match request.fields.clone().map(CitationFields::normalized) {
        Some(fields) if !fields.is_empty() => Ok(fields),
        _ => Err(GatewayError::InvalidRequest(
            "either a non-empty `citation` or `fields` is required".to_string(),
        )),
    }
}

#[instrument(skip(state, body))]
pub async fn verify_citation_handler(
    State(state): State<HandlerState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, GatewayError> {
    let request: CitationRequest = parse_body(body)?;
    let fields = citation_fields(&request)?;
    let context = request.context.filter(|c| !c.trim().is_empty());

    let verdict = state
        .verifier
        .verify_citation(fields, context, &request.options)
        .await;

    debug!(
        label = %verdict.label(),
        score = ?verdict.score(),
        "Citation verified"
    );
    Ok(make_response(verdict.label().as_str(), verdict))
}

#[instrument(skip(state, body))]
pub async fn verify_text_handler(
    State(state): State<HandlerState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, GatewayError> {
    let request: TextRequest = parse_body(body)?;

    let run = state
        .verifier
        .verify_text(&request.text, &request.options)
        .await?;

    Ok(make_response("complete", run))
}

#[instrument(skip(state, body))]
pub async fn verify_batch_handler(
    State(state): State<HandlerState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, GatewayError> {
    let request: BatchRequest = parse_body(body)?;

    if request.citations.is_empty() {
        return Err(GatewayError::InvalidRequest(
            "`citations` must not be empty".to_string(),
        ));
    }
    if request.citations.len() > MAX_BATCH_CITATIONS {
        return Err(GatewayError::InvalidRequest(format!(
            "at most {} citations per batch, got {}",
            MAX_BATCH_CITATIONS,
            request.citations.len()
        )));
    }

    let verdicts = state
        .verifier
        .verify_batch(&request.citations, &request.options)
        .await;

    info!(citations = verdicts.len(), "Batch verified");
    Ok(make_response("complete", BatchResponse { verdicts }))
}

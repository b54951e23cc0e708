//! Forward handler: relay one inbound request to a caller-chosen target.
//!
//! # Flow
//! ```text
//! ANY /api/forward?url=<target>&k=v
//!     → target_url()            (missing → 400, no outbound call)
//!     → filter_request_headers  (drop Host, X-*, framing)
//!     → passthrough_params      (drop `url`)
//!     → Forwarder::forward      (one attempt, TLS verification off)
//!     → ForwardResult           (status/headers/body verbatim, or 500 envelope)
//! ```
//!
//! Non-2xx target responses are relayed as-is. Only transport failures
//! produce the synthetic 500. Nothing is retried here.

use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use relay_sdk::error_chain;
use reqwest::Client;
use serde_json::{json, Value};

use crate::http::headers::{filter_request_headers, filter_response_headers, is_json};
use crate::http::server::AppState;
use crate::observability::metrics;

/// Query parameter carrying the target URL.
pub const TARGET_PARAM: &str = "url";

/// Body to send to the target. Both variants carry the inbound bytes
/// untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    /// Declared JSON and well-formed.
    Json(Bytes),
    Raw(Bytes),
}

impl RequestBody {
    /// JSON when the inbound content type says so and the bytes parse,
    /// raw bytes otherwise.
    pub fn from_inbound(headers: &HeaderMap, body: Bytes) -> Self {
        if body.is_empty() {
            return RequestBody::Empty;
        }
        if is_json(headers) && serde_json::from_slice::<serde::de::IgnoredAny>(&body).is_ok() {
            return RequestBody::Json(body);
        }
        RequestBody::Raw(body)
    }
}

/// Everything needed to issue the outbound call.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub url: String,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub params: Vec<(String, String)>,
}

/// Target response, ready to relay.
#[derive(Debug, Clone)]
pub struct RelayedResponse {
    pub status: StatusCode,
    /// Already stripped of framing headers.
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Decoded view of a relayed body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    Json(Value),
    Text(String),
}

impl RelayedResponse {
    pub fn data(&self) -> ResponseData {
        if is_json(&self.headers) {
            if let Ok(value) = serde_json::from_slice(&self.body) {
                return ResponseData::Json(value);
            }
        }
        ResponseData::Text(String::from_utf8_lossy(&self.body).into_owned())
    }
}

/// Outcome of a forward.
#[derive(Debug, Clone)]
pub enum ForwardResult {
    Relayed(RelayedResponse),
    /// Transport failure; rendered as a 500 envelope.
    Failed { message: String },
}

impl ForwardResult {
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardResult::Relayed(response) => response.status,
            ForwardResult::Failed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ForwardResult {
    fn into_response(self) -> Response {
        match self {
            ForwardResult::Relayed(relayed) => {
                let mut response = Response::new(Body::from(relayed.body));
                *response.status_mut() = relayed.status;
                *response.headers_mut() = relayed.headers;
                response
            }
            ForwardResult::Failed { message } => {
                error_envelope(StatusCode::INTERNAL_SERVER_ERROR, &message)
            }
        }
    }
}

/// Outbound HTTP client for forwards.
///
/// Certificate verification is disabled: targets are arbitrary and often
/// self-signed. Callers relying on target authenticity must not use the relay.
pub struct Forwarder {
    client: Client,
}

impl Forwarder {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self { client })
    }

    /// Issue exactly one outbound call.
    pub async fn forward(&self, request: ForwardRequest) -> ForwardResult {
        tracing::info!(method = %request.method, url = %request.url, "Forwarding request");
        tracing::debug!(headers = ?request.headers, body = ?request.body, params = ?request.params, "Forward details");

        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(bytes) | RequestBody::Raw(bytes) => builder.body(bytes),
        };

        match Self::execute(builder).await {
            Ok(relayed) => {
                tracing::info!(status = %relayed.status, url = %request.url, "Target responded");
                ForwardResult::Relayed(relayed)
            }
            Err(e) => {
                let message = error_chain(&e);
                tracing::error!(url = %request.url, error = %message, "Forward failed");
                ForwardResult::Failed { message }
            }
        }
    }

    async fn execute(builder: reqwest::RequestBuilder) -> Result<RelayedResponse, reqwest::Error> {
        let response = builder.send().await?;
        let status = response.status();
        let headers = filter_response_headers(response.headers());
        let body = response.bytes().await?;
        Ok(RelayedResponse {
            status,
            headers,
            body,
        })
    }
}

/// `{"status_code": <status>, "error": <message>}`
fn error_envelope(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({
            "status_code": status.as_u16(),
            "error": message,
        })),
    )
        .into_response()
}

/// Decode the query string into ordered pairs.
pub fn query_pairs(uri: &Uri) -> Vec<(String, String)> {
    uri.query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// First `url` value, if present and non-empty.
pub fn target_url(pairs: &[(String, String)]) -> Option<&str> {
    pairs
        .iter()
        .find(|(key, _)| key == TARGET_PARAM)
        .map(|(_, value)| value.as_str())
        .filter(|value| !value.is_empty())
}

/// All pairs except the target parameter (matched case-insensitively).
pub fn passthrough_params(pairs: Vec<(String, String)>) -> Vec<(String, String)> {
    pairs
        .into_iter()
        .filter(|(key, _)| !key.eq_ignore_ascii_case(TARGET_PARAM))
        .collect()
}

/// `ANY /api/forward`
pub async fn forward_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let start_time = Instant::now();
    let pairs = query_pairs(&uri);

    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            let status = rejection.status();
            tracing::warn!(method = %method, status = %status, error = %rejection, "Forward rejected: unreadable body");
            metrics::record_forward(method.as_str(), status.as_u16(), start_time);
            return error_envelope(status, &rejection.body_text());
        }
    };

    let Some(target) = target_url(&pairs).map(str::to_string) else {
        tracing::warn!(method = %method, "Forward rejected: missing target URL");
        metrics::record_forward(method.as_str(), StatusCode::BAD_REQUEST.as_u16(), start_time);
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing target URL" })),
        )
            .into_response();
    };

    let request = ForwardRequest {
        url: target,
        method: method.clone(),
        body: RequestBody::from_inbound(&headers, body),
        headers: filter_request_headers(&headers),
        params: passthrough_params(pairs),
    };

    // Detached so a caller disconnect does not cancel the outbound call.
    let forwarder = state.forwarder.clone();
    let result = match tokio::spawn(async move { forwarder.forward(request).await }).await {
        Ok(result) => result,
        Err(e) => ForwardResult::Failed {
            message: format!("forward task failed: {}", e),
        },
    };

    metrics::record_forward(method.as_str(), result.status().as_u16(), start_time);
    result.into_response()
}

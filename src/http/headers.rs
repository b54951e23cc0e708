//! Header filtering between the caller, the relay and the target.
//!
//! # Request side
//! - `Host` and every `X-*` header address the relay itself and are dropped
//! - Framing and encoding negotiation headers are dropped; the outbound
//!   client sets its own
//!
//! # Response side
//! - `Content-Length`, `Content-Encoding` and hop-by-hop framing headers are
//!   dropped; the relay re-frames the (already decoded) body
//! - Everything else, `X-*` included, is copied through

use axum::http::header::{
    ACCEPT_ENCODING, CONNECTION, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, HOST,
    TRANSFER_ENCODING,
};
use axum::http::{HeaderMap, HeaderName};

const REQUEST_FRAMING: [HeaderName; 4] = [CONTENT_LENGTH, TRANSFER_ENCODING, CONNECTION, ACCEPT_ENCODING];
const RESPONSE_FRAMING: [HeaderName; 4] = [CONTENT_LENGTH, CONTENT_ENCODING, TRANSFER_ENCODING, CONNECTION];

/// True for headers that only mean something to the relay.
pub fn is_relay_header(name: &HeaderName) -> bool {
    // HeaderName is always lowercase.
    name == HOST || name.as_str().starts_with("x-")
}

/// Headers to send to the target.
pub fn filter_request_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut outbound = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if is_relay_header(name) || REQUEST_FRAMING.contains(name) {
            continue;
        }
        outbound.append(name.clone(), value.clone());
    }
    outbound
}

/// Headers to return to the caller.
pub fn filter_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut relayed = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if RESPONSE_FRAMING.contains(name) {
            continue;
        }
        relayed.append(name.clone(), value.clone());
    }
    relayed
}

/// Whether the `Content-Type` declares a JSON payload (`application/json`,
/// `application/problem+json`, ...).
pub fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            let essence = v.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
            essence == "application/json" || essence.ends_with("+json")
        })
        .unwrap_or(false)
}

//! Decoding and classification of gateway responses
//!
//! The gateway is inconsistent about how it reports failure: transport-level
//! problems arrive as HTTP error statuses (often with an HTML body), RPC
//! faults arrive as a JSON `error` member, and a handful of discovery methods
//! reply with a bare JSON value instead of an envelope. This module funnels
//! all of those shapes into `PorticoError` so callers only ever see the
//! domain taxonomy.
//!
//! HTTP error bodies are preserved verbatim in `RpcFailure::data["body"]`.
//! Tryton renders validation messages as HTML error pages, and upper layers
//! mine that body for a human-readable message.

use portico_domain::{PorticoError, Result, RpcFailure};
use reqwest::StatusCode;
use serde_json::{json, Value};

/// Decodes a raw gateway response into its result value
///
/// `method` is only used to annotate errors.
pub fn decode_response(method: &str, status: StatusCode, body: &str) -> Result<Value> {
    if !status.is_success() {
        return Err(classify_http_failure(method, status, body));
    }

    let payload: Value = serde_json::from_str(body).map_err(|err| {
        PorticoError::Rpc(
            RpcFailure::new(format!("Gateway returned invalid JSON: {err}"))
                .with_data(json!({ "method": method, "body": body })),
        )
    })?;

    match payload {
        Value::Object(mut envelope) => {
            if let Some(error) = envelope.get("error").filter(|error| !error.is_null()) {
                return Err(classify_error_envelope(error));
            }
            Ok(envelope.remove("result").unwrap_or(Value::Null))
        }
        // Some discovery methods answer with a bare value, no envelope.
        bare => Ok(bare),
    }
}

/// Maps a non-2xx HTTP status to a domain error
///
/// 401 and 403 mean the session is missing or stale and are surfaced as
/// authentication failures so the dispatcher can re-login. Everything else
/// keeps the status code and response body for diagnosis.
pub fn classify_http_failure(method: &str, status: StatusCode, body: &str) -> PorticoError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return PorticoError::Auth(format!(
            "Gateway rejected the request with HTTP {}",
            status.as_u16()
        ));
    }

    PorticoError::Rpc(
        RpcFailure::new(format!("Gateway returned HTTP {}", status.as_u16()))
            .with_code(i64::from(status.as_u16()))
            .with_data(json!({ "method": method, "body": body })),
    )
}

/// Maps a JSON-RPC `error` member to a domain error
fn classify_error_envelope(error: &Value) -> PorticoError {
    let code = error.get("code").and_then(Value::as_i64);
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("Gateway RPC call failed")
        .to_string();

    if matches!(code, Some(401) | Some(403)) {
        return PorticoError::Auth(message);
    }

    let mut failure = RpcFailure::new(message);
    if let Some(code) = code {
        failure = failure.with_code(code);
    }
    if let Some(data) = error.get("data").filter(|data| !data.is_null()) {
        failure = failure.with_data(data.clone());
    }
    PorticoError::Rpc(failure)
}

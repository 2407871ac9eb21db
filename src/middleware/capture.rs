//! Response body capture shared by the deduplication and response cache layers.

use axum::{
    body::{to_bytes, Body, HttpBody},
    http::Response,
    response::IntoResponse,
};
use serde_json::Value;
use tracing::warn;

use crate::error::CacheError;

/// Largest body (request or response) the middlewares will buffer
pub const MAX_CAPTURE_BYTES: usize = 1024 * 1024; // 1 MB

/// Buffers a response body and parses it as JSON.
///
/// The returned response carries the same status, headers and bytes as the
/// original. The payload is `None` when the body is not JSON or its size is
/// unknown or above [`MAX_CAPTURE_BYTES`]; such responses are passed through
/// without being buffered.
pub(crate) async fn capture_json(response: Response<Body>) -> (Response<Body>, Option<Value>) {
    let (parts, body) = response.into_parts();

    let bounded = body
        .size_hint()
        .upper()
        .is_some_and(|upper| upper <= MAX_CAPTURE_BYTES as u64);
    if !bounded {
        return (Response::from_parts(parts, body), None);
    }

    match to_bytes(body, MAX_CAPTURE_BYTES).await {
        Ok(bytes) => {
            let payload = serde_json::from_slice::<Value>(&bytes).ok();
            (Response::from_parts(parts, Body::from(bytes)), payload)
        }
        Err(err) => {
            warn!("Failed to read response body for capture: {}", err);
            let response =
                CacheError::Internal("failed to read response body".to_string()).into_response();
            (response, None)
        }
    }
}

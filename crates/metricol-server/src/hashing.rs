//! Request hash verification and response signing.
//!
//! Active only when a key is configured. A request carrying a `HashSHA256`
//! header must match the HMAC of its body; a request without one passes.
//! Every response body is signed into the same header.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use metricol_proto::{hash, HASH_HEADER};
use tracing::debug;

use crate::error::AppError;
use crate::AppState;

/// Largest body the hash layer will buffer.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Verify the request hash and sign the response.
pub async fn verify_and_sign(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(key) = state.key.clone() else {
        return Ok(next.run(request).await);
    };

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| AppError::BadRequest(format!("failed to read body: {}", e)))?;

    if let Some(signature) = parts.headers.get(HASH_HEADER) {
        let signature = signature
            .to_str()
            .map_err(|_| AppError::BadRequest("hash header is not text".into()))?;
        if !hash::verify(key.as_bytes(), &bytes, signature) {
            debug!(uri = %parts.uri, "Rejected request with mismatched hash");
            return Err(AppError::BadRequest("hash mismatch".into()));
        }
    }

    let response = next.run(Request::from_parts(parts, Body::from(bytes))).await;

    let (mut parts, body) = response.into_parts();
    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| AppError::Internal(format!("failed to read response: {}", e)))?;
    let signature = hash::sign(key.as_bytes(), &bytes);
    let value = HeaderValue::from_str(&signature)
        .map_err(|e| AppError::Internal(format!("invalid signature header: {}", e)))?;
    parts.headers.insert(HASH_HEADER, value);

    Ok(Response::from_parts(parts, Body::from(bytes)))
}

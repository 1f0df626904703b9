//! HTTP route handlers.

pub mod listing;
pub mod ping;
pub mod update;
pub mod value;

use axum::body::Bytes;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Parse a JSON body, reporting any failure as a bad request.
fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    Ok(serde_json::from_slice(body)?)
}

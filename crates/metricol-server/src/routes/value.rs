//! Metric reads.

use axum::{
    body::Bytes,
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use metricol_core::MetricKind;
use metricol_proto::MetricRecord;

use super::parse_json;
use crate::error::AppError;
use crate::AppState;

/// Value routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/value/", post(value_json))
        .route("/value/:kind/:name", get(value_text))
}

/// Plain-text value. Unknown kinds read as missing metrics.
async fn value_text(
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
) -> Result<String, AppError> {
    let kind: MetricKind = kind
        .parse()
        .map_err(|_| AppError::NotFound(format!("metric not found: {} ({})", name, kind)))?;

    let value = state
        .with_store(move |store| store.get_metric(kind, &name))
        .await?;
    Ok(value.to_string())
}

/// Fill in the current value of the requested record.
async fn value_json(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<MetricRecord>, AppError> {
    let request: MetricRecord = parse_json(&body)?;
    let (kind, name) = (request.kind, request.id.clone());

    let value = state
        .with_store(move |store| store.get_metric(kind, &name))
        .await?;

    Ok(Json(MetricRecord::new(request.id, kind).with_scalar(value)))
}

//! Metric updates.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use metricol_core::{Metric, MetricKind};
use metricol_proto::MetricRecord;
use tracing::debug;

use super::parse_json;
use crate::error::AppError;
use crate::AppState;

/// Update routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/update/", post(update_json))
        .route("/updates/", post(update_batch))
        .route("/update/:kind/:name/:value", post(update_text))
}

/// Update from path parameters; the value is parsed by kind.
async fn update_text(
    State(state): State<AppState>,
    Path((kind, name, value)): Path<(String, String, String)>,
) -> Result<StatusCode, AppError> {
    let kind: MetricKind = kind.parse()?;
    let value = kind.parse_value(&value)?;

    state
        .with_store(move |store| store.update_metric(kind, &name, value))
        .await?;
    Ok(StatusCode::OK)
}

/// Update from one JSON record; responds with the stored value.
async fn update_json(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<MetricRecord>, AppError> {
    let record: MetricRecord = parse_json(&body)?;
    let value = record.scalar()?;
    let (kind, name) = (record.kind, record.id.clone());

    let stored = state
        .with_store(move |store| {
            store.update_metric(kind, &name, value)?;
            store.get_metric(kind, &name)
        })
        .await?;

    Ok(Json(MetricRecord::new(record.id, kind).with_scalar(stored)))
}

/// Apply a JSON array of records as one batch.
async fn update_batch(State(state): State<AppState>, body: Bytes) -> Result<StatusCode, AppError> {
    let records: Vec<MetricRecord> = parse_json(&body)?;
    let metrics = records
        .into_iter()
        .map(Metric::from_record)
        .collect::<Result<Vec<_>, _>>()?;

    debug!(metrics = metrics.len(), "Applying batch update");
    let cancel = state.cancel.clone();
    state
        .with_store(move |store| store.update_metrics(&metrics, &cancel))
        .await?;
    Ok(StatusCode::OK)
}

//! Metric listing.

use axum::{extract::State, response::Html, routing::get, Router};
use metricol_core::Metric;

use crate::error::AppError;
use crate::AppState;

/// Listing routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list_metrics))
}

/// One line per metric, sorted by kind then name.
async fn list_metrics(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let mut metrics = state.with_store(|store| store.get_all_metrics()).await?;
    metrics.sort_by(|a, b| (a.kind(), a.name()).cmp(&(b.kind(), b.name())));
    Ok(Html(render(&metrics)))
}

fn render(metrics: &[Metric]) -> String {
    metrics
        .iter()
        .map(|m| format!("{:>10} ({:>5}): {}\n", m.name(), m.kind().as_str(), m.value()))
        .collect()
}

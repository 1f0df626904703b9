//! Database connectivity check.

use axum::{extract::State, http::StatusCode, routing::get, Router};

use crate::error::AppError;
use crate::AppState;

/// Ping routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/ping", get(ping))
}

/// 200 when the database answers, 400 when the store is not a database.
async fn ping(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    let checked = state
        .with_store(|store| store.ping().transpose())
        .await?;

    match checked {
        Some(()) => Ok(StatusCode::OK),
        None => Err(AppError::BadRequest(format!(
            "{} store has no database",
            state.store.backend()
        ))),
    }
}

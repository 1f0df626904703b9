//! metricol collector server.
//!
//! An HTTP surface over a [`Collector`]. The active store is chosen once at
//! start-up and handed to every route through [`AppState`].

pub mod config;
pub mod error;
pub mod hashing;
pub mod routes;

pub use config::{Args, Backend, ServerConfig};
pub use error::AppError;

use std::sync::Arc;

use axum::middleware;
use axum::Router;
use metricol_core::{CancelToken, Collector, DatabaseStore, FileStore, MemoryStore};
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Active metric store.
    pub store: Arc<dyn Collector>,
    /// Shared HMAC key; `None` disables hash checks.
    pub key: Option<Arc<str>>,
    /// Fired on shutdown; stops in-flight batch updates.
    pub cancel: CancelToken,
}

impl AppState {
    /// Create new application state.
    pub fn new(store: Arc<dyn Collector>) -> Self {
        Self {
            store,
            key: None,
            cancel: CancelToken::new(),
        }
    }

    /// Check request hashes and sign responses with `key`.
    pub fn with_key(mut self, key: Option<String>) -> Self {
        self.key = key.map(Arc::from);
        self
    }

    /// Use `cancel` as the shutdown signal.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run a store operation on the blocking pool.
    pub async fn with_store<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&dyn Collector) -> metricol_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| AppError::Internal(format!("store task failed: {}", e)))?;
        Ok(result?)
    }
}

/// Open the store selected by `config`.
pub fn open_store(config: &ServerConfig) -> metricol_core::Result<Arc<dyn Collector>> {
    let store: Arc<dyn Collector> = match config.backend() {
        Backend::Database(dsn) => Arc::new(DatabaseStore::open(&dsn)?),
        Backend::File(file) => {
            info!(
                path = %file.path.display(),
                restore = file.restore,
                store_interval_s = file.store_interval.as_secs(),
                "Opening file store"
            );
            Arc::new(FileStore::open(file)?)
        }
        Backend::Memory => Arc::new(MemoryStore::new()),
    };
    info!(backend = store.backend(), "Store ready");
    Ok(store)
}

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::listing::routes())
        .merge(routes::value::routes())
        .merge(routes::update::routes())
        .merge(routes::ping::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            hashing::verify_and_sign,
        ))
        .layer(RequestDecompressionLayer::new())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

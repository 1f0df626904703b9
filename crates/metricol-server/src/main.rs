//! metricol server binary.

use clap::Parser;
use metricol_core::{shutdown_signal, CancelToken};
use metricol_server::{create_router, open_store, AppState, Args, ServerConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(format!("metricol_server={}", args.log_level)))
                .unwrap_or_else(|_| "metricol_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from(&args);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        address = %config.address,
        hashing = config.key.is_some(),
        "starting metricol server"
    );

    let store = open_store(&config)?;
    let cancel = CancelToken::new();
    let state = AppState::new(store.clone())
        .with_key(config.key.clone())
        .with_cancel(cancel.clone());
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.address).await?;
    info!("server listening on {}", config.address);

    let signal = shutdown_signal();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            info!("received shutdown signal");
            cancel.cancel();
        })
        .await;

    store.close();
    info!("server shutdown complete");
    served?;
    Ok(())
}

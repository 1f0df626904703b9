//! metricol agent binary.

use clap::Parser;
use metricol_agent::{Agent, AgentConfig, Args};
use metricol_core::{shutdown_signal, CancelToken};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(format!("metricol_agent={}", args.log_level)))
                .unwrap_or_else(|_| "metricol_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AgentConfig::try_from(&args)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        address = %config.address,
        signed = config.key.is_some(),
        "starting metricol agent"
    );

    let agent = Agent::new(config)?;

    let cancel = CancelToken::new();
    let signal = shutdown_signal();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            signal.await;
            info!("received shutdown signal");
            cancel.cancel();
        }
    });

    agent.run(cancel).await;
    Ok(())
}

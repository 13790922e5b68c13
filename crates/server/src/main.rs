//! Churn prediction server
//!
//! Loads the trained artifacts, serves the prediction API and reloads
//! the artifacts on SIGHUP.

use anyhow::Result;
use churn_server::{api, build_state, config::ServerConfig, reload_artifacts};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting churn-server");

    let config = ServerConfig::load()?;
    info!(
        instance = %config.instance_name,
        port = config.port,
        models_dir = %config.models_dir.display(),
        "Server configured"
    );

    let state = build_state(&config).await?;
    let model_version = state
        .service
        .registry()
        .snapshot()
        .map(|a| a.manifest.model_version.clone());
    state
        .logger
        .log_startup(SERVICE_VERSION, config.port, model_version.as_deref());

    #[cfg(unix)]
    spawn_reload_on_hangup(Arc::clone(&state))?;

    let logger = state.logger.clone();
    api::serve(config.port, state, async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        logger.log_shutdown("SIGINT received");
    })
    .await?;

    info!("Shutting down");
    Ok(())
}

#[cfg(unix)]
fn spawn_reload_on_hangup(state: Arc<api::AppState>) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangups = signal(SignalKind::hangup())?;
    tokio::spawn(async move {
        while hangups.recv().await.is_some() {
            info!("SIGHUP received, reloading artifacts");
            reload_artifacts(&state).await;
        }
    });
    Ok(())
}

//! Churn prediction HTTP service
//!
//! Wires the prediction pipeline, history store and notification
//! dispatcher from `churn-lib` behind an axum router.

pub mod api;
pub mod config;
pub mod error;

use anyhow::{Context, Result};
use api::AppState;
use churn_lib::{
    artifacts::ArtifactRegistry,
    health::{components, HealthRegistry},
    notify::{LogSink, NotificationDispatcher, NotificationRegistry},
    observability::{ChurnMetrics, StructuredLogger},
    store::{InMemoryStore, PredictionStore},
    PredictionService,
};
use crate::config::ServerConfig;
use std::sync::Arc;
use tracing::info;

/// Build the shared state and attempt the initial artifact load.
///
/// Missing artifacts do not abort startup: the service stays up,
/// reports not-ready and answers predictions with 503 until a reload
/// succeeds.
pub async fn build_state(config: &ServerConfig) -> Result<Arc<AppState>> {
    let logger = StructuredLogger::new(&config.instance_name);
    let metrics = ChurnMetrics::new();

    let health_registry = HealthRegistry::for_service().await;

    let store: Arc<dyn PredictionStore> = match &config.store_path {
        Some(path) => Arc::new(
            InMemoryStore::open(path)
                .await
                .with_context(|| format!("Failed to open prediction store {}", path.display()))?,
        ),
        None => {
            health_registry
                .set_degraded(components::STORE, "in-memory only, history is not persisted")
                .await;
            Arc::new(InMemoryStore::new())
        }
    };

    let notifications = Arc::new(NotificationRegistry::new(config.alert_threshold));
    let dispatcher = NotificationDispatcher::new(notifications.clone(), logger.clone())
        .with_sink(Arc::new(LogSink));

    let registry = Arc::new(ArtifactRegistry::new(config.artifact_paths()));
    let service = PredictionService::new(registry, store, logger.clone())
        .with_notifier(Arc::new(dispatcher));

    let state = Arc::new(AppState {
        service: Arc::new(service),
        health_registry,
        notifications,
        metrics,
        logger,
        high_risk_threshold: config.high_risk_threshold,
    });

    reload_artifacts(&state).await;
    Ok(state)
}

/// Re-run the artifact loader and publish the outcome to health,
/// metrics and the event log. Returns whether the load succeeded.
pub async fn reload_artifacts(state: &AppState) -> bool {
    let registry = Arc::clone(state.service.registry());
    let old_version = registry
        .snapshot()
        .map(|a| a.manifest.model_version.clone());

    let loader = Arc::clone(&registry);
    let outcome = tokio::task::spawn_blocking(move || loader.reload()).await;

    let loaded = match outcome {
        Ok(Ok(artifacts)) => {
            state.metrics.set_artifacts(&artifacts.manifest);
            state.logger.log_artifacts_loaded(&artifacts.manifest);
            if old_version.is_some() {
                state.logger.log_artifact_reload(
                    old_version.as_deref(),
                    Some(artifacts.manifest.model_version.as_str()),
                    true,
                );
            }
            true
        }
        Ok(Err(_)) => {
            if old_version.is_some() {
                state
                    .logger
                    .log_artifact_reload(old_version.as_deref(), None, false);
            }
            false
        }
        Err(e) => {
            tracing::error!(error = %e, "Artifact loader task panicked");
            false
        }
    };

    state
        .health_registry
        .apply_artifact_status(registry.status())
        .await;
    info!(ready = registry.is_ready(), "Artifact status updated");
    loaded
}

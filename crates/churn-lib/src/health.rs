//! Health check infrastructure for the prediction service
//!
//! Provides component health tracking and status reporting for
//! liveness and readiness probes.

use crate::artifacts::ArtifactStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Component is functioning normally
    Healthy,
    /// Component is experiencing issues but still operational
    Degraded,
    /// Component has failed
    Unhealthy,
}

impl ComponentStatus {
    /// Returns true if the component is at least partially operational
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

/// Information about a component's health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    pub fn healthy() -> Self {
        Self {
            status: ComponentStatus::Healthy,
            message: None,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Degraded,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Unhealthy,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status across all components
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        let mut has_degraded = false;
        for health in components.values() {
            match health.status {
                ComponentStatus::Unhealthy => return ComponentStatus::Unhealthy,
                ComponentStatus::Degraded => has_degraded = true,
                ComponentStatus::Healthy => {}
            }
        }

        if has_degraded {
            ComponentStatus::Degraded
        } else {
            ComponentStatus::Healthy
        }
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const ARTIFACTS: &str = "artifacts";
    pub const STORE: &str = "store";
    pub const NOTIFIER: &str = "notifier";

    /// Components that must not be unhealthy for the service to take
    /// predictions. Alert delivery is best-effort and never gates readiness.
    pub const CRITICAL: [&str; 2] = [ARTIFACTS, STORE];
}

/// Health registry for tracking component health
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            components: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Registry with the artifact, store and notifier components
    /// registered. Not ready until artifacts are applied.
    pub async fn for_service() -> Self {
        let registry = Self::new();
        for name in [components::ARTIFACTS, components::STORE, components::NOTIFIER] {
            registry.register(name).await;
        }
        registry
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.components.write().await.insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    /// Reflect the artifact registry's state.
    ///
    /// Missing classifier or encoder is unhealthy and clears readiness;
    /// a missing scaler only degrades.
    pub async fn apply_artifact_status(&self, status: ArtifactStatus) {
        if !status.is_ready() {
            let mut missing = Vec::new();
            if !status.model_loaded {
                missing.push("classifier");
            }
            if !status.encoder_loaded {
                missing.push("encoder");
            }
            self.set_unhealthy(
                components::ARTIFACTS,
                format!("not loaded: {}", missing.join(", ")),
            )
            .await;
            self.set_ready(false).await;
        } else if !status.scaler_loaded {
            self.set_degraded(components::ARTIFACTS, "scaler not loaded, scoring unscaled")
                .await;
            self.set_ready(true).await;
        } else {
            self.set_healthy(components::ARTIFACTS).await;
            self.set_ready(true).await;
        }
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    /// Ready once artifacts are loaded and no critical component is
    /// unhealthy
    pub async fn readiness(&self) -> ReadinessResponse {
        if !*self.ready.read().await {
            return ReadinessResponse {
                ready: false,
                reason: Some("ML models not loaded".to_string()),
            };
        }

        let current = self.components.read().await;
        let failed: Vec<&str> = components::CRITICAL
            .into_iter()
            .filter(|name| {
                current
                    .get(*name)
                    .is_some_and(|h| h.status == ComponentStatus::Unhealthy)
            })
            .collect();

        if failed.is_empty() {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        } else {
            ReadinessResponse {
                ready: false,
                reason: Some(format!("unhealthy: {}", failed.join(", "))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(scaler_loaded: bool) -> ArtifactStatus {
        ArtifactStatus {
            model_loaded: true,
            encoder_loaded: true,
            scaler_loaded,
        }
    }

    #[tokio::test]
    async fn test_service_components_registered_but_not_ready() {
        let registry = HealthRegistry::for_service().await;
        let health = registry.health().await;

        assert_eq!(health.components.len(), 3);
        assert!(health.components.contains_key(components::NOTIFIER));
        assert_eq!(health.status, ComponentStatus::Healthy);

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("ML models not loaded"));
    }

    #[tokio::test]
    async fn test_in_memory_store_degrades_but_serves() {
        let registry = HealthRegistry::for_service().await;
        registry
            .set_degraded(components::STORE, "in-memory only, history is not persisted")
            .await;
        registry.apply_artifact_status(loaded(true)).await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(health.components[components::ARTIFACTS].status, ComponentStatus::Healthy);
        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_notifier_outage_does_not_block_predictions() {
        let registry = HealthRegistry::for_service().await;
        registry.apply_artifact_status(loaded(true)).await;
        registry
            .set_unhealthy(components::NOTIFIER, "smtp relay unreachable")
            .await;

        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);
        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_store_outage_blocks_predictions() {
        let registry = HealthRegistry::for_service().await;
        registry.apply_artifact_status(loaded(true)).await;
        registry.set_unhealthy(components::STORE, "journal not writable").await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("unhealthy: store"));
    }

    #[tokio::test]
    async fn test_artifact_status_drives_readiness() {
        let registry = HealthRegistry::for_service().await;
        registry.apply_artifact_status(loaded(false)).await;
        assert!(registry.readiness().await.ready);
        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);

        registry
            .apply_artifact_status(ArtifactStatus {
                model_loaded: true,
                encoder_loaded: false,
                scaler_loaded: false,
            })
            .await;
        assert!(!registry.readiness().await.ready);
        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Unhealthy);
        assert_eq!(
            health.components[components::ARTIFACTS].message.as_deref(),
            Some("not loaded: encoder")
        );
    }

    #[tokio::test]
    async fn test_successful_reload_clears_artifact_failure() {
        let registry = HealthRegistry::for_service().await;
        registry
            .apply_artifact_status(ArtifactStatus {
                model_loaded: false,
                encoder_loaded: false,
                scaler_loaded: false,
            })
            .await;
        assert_eq!(
            registry.health().await.components[components::ARTIFACTS].message.as_deref(),
            Some("not loaded: classifier, encoder")
        );

        registry.apply_artifact_status(loaded(true)).await;
        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components[components::ARTIFACTS].message.is_none());
        assert!(registry.readiness().await.ready);
    }
}

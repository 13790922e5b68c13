//! Process-wide handle to the loaded artifacts
//!
//! Requests take an `Arc` snapshot and keep using it for the whole
//! inference, so a reload never mixes artifacts from two generations.

use super::loader::{load_artifacts, ArtifactPaths, ModelArtifacts};
use crate::error::ArtifactError;
use arc_swap::ArcSwapOption;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Which artifacts are currently available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArtifactStatus {
    pub model_loaded: bool,
    pub encoder_loaded: bool,
    pub scaler_loaded: bool,
}

impl ArtifactStatus {
    /// Inference needs both the classifier and the encoder
    pub fn is_ready(&self) -> bool {
        self.model_loaded && self.encoder_loaded
    }
}

pub struct ArtifactRegistry {
    paths: ArtifactPaths,
    current: ArcSwapOption<ModelArtifacts>,
}

impl ArtifactRegistry {
    /// Create an empty registry that will load from `paths`
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            paths,
            current: ArcSwapOption::empty(),
        }
    }

    /// Create a registry around artifacts that are already loaded
    pub fn with_artifacts(artifacts: ModelArtifacts) -> Self {
        let registry = Self::new(ArtifactPaths::default());
        registry.install(artifacts);
        registry
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// Load from the configured paths and swap in the result.
    ///
    /// On failure the previously installed artifacts, if any, stay active.
    pub fn reload(&self) -> Result<Arc<ModelArtifacts>, ArtifactError> {
        match load_artifacts(&self.paths) {
            Ok(artifacts) => Ok(self.install(artifacts)),
            Err(e) => {
                error!(error = %e, keeping_previous = self.is_ready(), "Failed to load ML artifacts");
                Err(e)
            }
        }
    }

    /// Atomically replace the active artifacts
    pub fn install(&self, artifacts: ModelArtifacts) -> Arc<ModelArtifacts> {
        let artifacts = Arc::new(artifacts);
        let previous = self.current.swap(Some(artifacts.clone()));
        if let Some(previous) = previous {
            info!(
                old_version = %previous.manifest.model_version,
                new_version = %artifacts.manifest.model_version,
                "ML artifacts swapped"
            );
        }
        artifacts
    }

    /// Consistent view of the active artifacts, if loaded
    pub fn snapshot(&self) -> Option<Arc<ModelArtifacts>> {
        self.current.load_full()
    }

    pub fn status(&self) -> ArtifactStatus {
        match &*self.current.load() {
            Some(artifacts) => ArtifactStatus {
                model_loaded: true,
                encoder_loaded: true,
                scaler_loaded: artifacts.scaler.is_some(),
            },
            None => ArtifactStatus {
                model_loaded: false,
                encoder_loaded: false,
                scaler_loaded: false,
            },
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status().is_ready()
    }
}

//! Server configuration

use anyhow::{Context, Result};
use churn_lib::artifacts::ArtifactPaths;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Server configuration, read from `CHURN_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Name attached to structured log events
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory searched for the default artifact file names
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    /// Explicit artifact locations, tried before `models_dir`
    #[serde(default)]
    pub model_path: Option<PathBuf>,
    #[serde(default)]
    pub encoder_path: Option<PathBuf>,
    #[serde(default)]
    pub scaler_path: Option<PathBuf>,

    /// JSON-lines journal for prediction history; in-memory only when unset
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    /// Default notification threshold for users without settings
    #[serde(default = "default_threshold")]
    pub alert_threshold: f64,

    /// Dashboard "high risk" cut
    #[serde(default = "default_threshold")]
    pub high_risk_threshold: f64,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "churn-server".to_string())
}

fn default_port() -> u16 {
    5000
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("./models")
}

fn default_threshold() -> f64 {
    0.7
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            port: default_port(),
            models_dir: default_models_dir(),
            model_path: None,
            encoder_path: None,
            scaler_path: None,
            store_path: None,
            alert_threshold: default_threshold(),
            high_risk_threshold: default_threshold(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self> {
        Self::build(None)
    }

    /// Load configuration from an explicit variable map instead of the
    /// process environment
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        Self::build(Some(vars))
    }

    fn build(vars: Option<HashMap<String, String>>) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("CHURN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()
            .context("Failed to read CHURN_* environment")?;

        let parsed: Self = config
            .try_deserialize()
            .context("Invalid CHURN_* configuration")?;
        parsed.validate()?;
        Ok(parsed)
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("CHURN_ALERT_THRESHOLD", self.alert_threshold),
            ("CHURN_HIGH_RISK_THRESHOLD", self.high_risk_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("{} must be between 0 and 1, got {}", name, value);
            }
        }
        Ok(())
    }

    /// Candidate artifact paths in priority order
    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths::from_models_dir(&self.models_dir).with_overrides(
            self.model_path.clone(),
            self.encoder_path.clone(),
            self.scaler_path.clone(),
        )
    }
}

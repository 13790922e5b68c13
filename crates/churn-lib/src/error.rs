//! Error types for the prediction pipeline

use std::path::PathBuf;
use thiserror::Error;

/// The kind of artifact a loader error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Classifier,
    Encoder,
    Scaler,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Classifier => write!(f, "classifier"),
            ArtifactKind::Encoder => write!(f, "encoder"),
            ArtifactKind::Scaler => write!(f, "scaler"),
        }
    }
}

/// Failure to make trained artifacts available at startup or reload
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("{kind} artifact not found in any of {searched:?}")]
    Missing {
        kind: ArtifactKind,
        searched: Vec<PathBuf>,
    },

    #[error("failed to load {kind} artifact from {path:?}: {reason}")]
    Load {
        kind: ArtifactKind,
        path: PathBuf,
        reason: String,
    },
}

/// Request-time prediction failures
#[derive(Debug, Error, PartialEq)]
pub enum PredictError {
    /// Classifier or encoder not loaded
    #[error("ML models not loaded")]
    ModelNotReady,

    /// Required input fields absent; lists every missing field
    #[error("Missing required fields: {}", .missing.join(", "))]
    Validation { missing: Vec<String> },

    /// The classifier itself failed to run
    #[error("inference failed: {0}")]
    Inference(String),
}

impl PredictError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, PredictError::Validation { .. })
    }
}

/// Storage collaborator failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize prediction record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_all_fields() {
        let err = PredictError::Validation {
            missing: vec!["tenure".to_string(), "contract".to_string()],
        };
        assert_eq!(err.to_string(), "Missing required fields: tenure, contract");
        assert!(err.is_client_error());
        assert!(!PredictError::ModelNotReady.is_client_error());
    }
}

//! Artifact discovery and loading
//!
//! Each artifact has an ordered list of candidate paths; the first path
//! that exists wins. Classifier and encoder are required, the scaler is
//! optional.

use super::classifier::{ChurnClassifier, LogisticClassifier, OnnxClassifier};
use super::encoder::LabelEncoder;
use super::scaler::StandardScaler;
use crate::error::{ArtifactError, ArtifactKind};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default classifier file names, in priority order
pub const DEFAULT_MODEL_FILES: &[&str] = &[
    "final_xgboost_top10_model.onnx",
    "xgboost_model.onnx",
    "model.json",
];
pub const DEFAULT_ENCODER_FILE: &str = "encoder.json";
pub const DEFAULT_SCALER_FILE: &str = "scaler.json";

/// Candidate locations for each artifact
#[derive(Debug, Clone, Default)]
pub struct ArtifactPaths {
    pub model: Vec<PathBuf>,
    pub encoder: Vec<PathBuf>,
    pub scaler: Vec<PathBuf>,
}

impl ArtifactPaths {
    /// Standard file names inside a models directory
    pub fn from_models_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            model: DEFAULT_MODEL_FILES.iter().map(|f| dir.join(f)).collect(),
            encoder: vec![dir.join(DEFAULT_ENCODER_FILE)],
            scaler: vec![dir.join(DEFAULT_SCALER_FILE)],
        }
    }

    /// Put explicit paths ahead of the defaults
    pub fn with_overrides(
        mut self,
        model: Option<PathBuf>,
        encoder: Option<PathBuf>,
        scaler: Option<PathBuf>,
    ) -> Self {
        if let Some(path) = model {
            self.model.insert(0, path);
        }
        if let Some(path) = encoder {
            self.encoder.insert(0, path);
        }
        if let Some(path) = scaler {
            self.scaler.insert(0, path);
        }
        self
    }
}

/// Where an artifact was loaded from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadedArtifact {
    pub path: PathBuf,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactManifest {
    pub model: LoadedArtifact,
    pub model_version: String,
    pub encoder: LoadedArtifact,
    pub scaler: Option<LoadedArtifact>,
}

/// Immutable set of loaded artifacts shared by all requests
pub struct ModelArtifacts {
    pub classifier: Box<dyn ChurnClassifier>,
    pub encoder: LabelEncoder,
    pub scaler: Option<StandardScaler>,
    pub manifest: ArtifactManifest,
}

impl ModelArtifacts {
    /// Assemble artifacts that were built in memory rather than read from disk
    pub fn in_memory(
        classifier: Box<dyn ChurnClassifier>,
        encoder: LabelEncoder,
        scaler: Option<StandardScaler>,
    ) -> Self {
        let synthetic = |name: &str| LoadedArtifact {
            path: PathBuf::from(name),
            sha256: String::new(),
        };
        let manifest = ArtifactManifest {
            model: synthetic("<memory>"),
            model_version: classifier.version().to_string(),
            encoder: synthetic("<memory>"),
            scaler: scaler.as_ref().map(|_| synthetic("<memory>")),
        };
        Self {
            classifier,
            encoder,
            scaler,
            manifest,
        }
    }
}

impl std::fmt::Debug for ModelArtifacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelArtifacts")
            .field("manifest", &self.manifest)
            .finish_non_exhaustive()
    }
}

/// Load all artifacts from their candidate paths
pub fn load_artifacts(paths: &ArtifactPaths) -> Result<ModelArtifacts, ArtifactError> {
    let model_path = resolve(ArtifactKind::Classifier, &paths.model)?;
    let encoder_path = resolve(ArtifactKind::Encoder, &paths.encoder)?;

    let (classifier, model) = load_classifier(&model_path)?;

    let encoder_bytes = read(ArtifactKind::Encoder, &encoder_path)?;
    let encoder = LabelEncoder::from_json(&encoder_bytes)
        .map_err(|e| load_error(ArtifactKind::Encoder, &encoder_path, e))?;
    let encoder_artifact = LoadedArtifact {
        path: encoder_path,
        sha256: fingerprint(&encoder_bytes),
    };

    let (scaler, scaler_artifact) = match first_existing(&paths.scaler) {
        Some(path) => {
            let bytes = read(ArtifactKind::Scaler, &path)?;
            let scaler = StandardScaler::from_json(&bytes)
                .map_err(|e| load_error(ArtifactKind::Scaler, &path, e))?;
            let artifact = LoadedArtifact {
                path,
                sha256: fingerprint(&bytes),
            };
            (Some(scaler), Some(artifact))
        }
        None => {
            warn!(searched = ?paths.scaler, "Scaler not found, proceeding without scaling");
            (None, None)
        }
    };

    let manifest = ArtifactManifest {
        model,
        model_version: classifier.version().to_string(),
        encoder: encoder_artifact,
        scaler: scaler_artifact,
    };

    info!(
        model = ?manifest.model.path,
        model_version = %manifest.model_version,
        encoder = ?manifest.encoder.path,
        scaler_loaded = scaler.is_some(),
        "ML artifacts loaded"
    );

    Ok(ModelArtifacts {
        classifier,
        encoder,
        scaler,
        manifest,
    })
}

fn load_classifier(
    path: &Path,
) -> Result<(Box<dyn ChurnClassifier>, LoadedArtifact), ArtifactError> {
    let bytes = read(ArtifactKind::Classifier, path)?;
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let classifier: Box<dyn ChurnClassifier> = if is_json {
        Box::new(
            LogisticClassifier::from_json(&bytes)
                .map_err(|e| load_error(ArtifactKind::Classifier, path, format!("{:#}", e)))?,
        )
    } else {
        Box::new(
            OnnxClassifier::from_path(path)
                .map_err(|e| load_error(ArtifactKind::Classifier, path, format!("{:#}", e)))?,
        )
    };

    let artifact = LoadedArtifact {
        path: path.to_path_buf(),
        sha256: fingerprint(&bytes),
    };
    Ok((classifier, artifact))
}

fn first_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates
        .iter()
        .find(|p| {
            let exists = p.is_file();
            debug!(path = ?p, exists, "Probing artifact path");
            exists
        })
        .cloned()
}

fn resolve(kind: ArtifactKind, candidates: &[PathBuf]) -> Result<PathBuf, ArtifactError> {
    first_existing(candidates).ok_or_else(|| ArtifactError::Missing {
        kind,
        searched: candidates.to_vec(),
    })
}

fn read(kind: ArtifactKind, path: &Path) -> Result<Vec<u8>, ArtifactError> {
    std::fs::read(path).map_err(|e| load_error(kind, path, e))
}

fn load_error(kind: ArtifactKind, path: &Path, reason: impl std::fmt::Display) -> ArtifactError {
    ArtifactError::Load {
        kind,
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Compute SHA256 fingerprint of artifact bytes
pub fn fingerprint(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

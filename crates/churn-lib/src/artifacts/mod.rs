//! Trained artifacts: classifier, categorical encoder and optional scaler

mod classifier;
mod encoder;
mod loader;
mod registry;
mod scaler;

pub use classifier::{ChurnClassifier, LogisticClassifier, OnnxClassifier};
pub use encoder::{EncodeError, LabelEncoder};
pub use loader::{
    fingerprint, load_artifacts, ArtifactManifest, ArtifactPaths, LoadedArtifact, ModelArtifacts,
    DEFAULT_ENCODER_FILE, DEFAULT_MODEL_FILES, DEFAULT_SCALER_FILE,
};
pub use registry::{ArtifactRegistry, ArtifactStatus};
pub use scaler::{ScaleError, StandardScaler};

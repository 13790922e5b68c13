//! Trained churn classifiers
//!
//! Two artifact formats are accepted: an ONNX graph run through tract, or
//! a JSON logistic model. Both expose the positive-class probability for
//! a single positional feature row.

use crate::models::FEATURE_COUNT;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// A trained binary classifier over the positional feature row
pub trait ChurnClassifier: Send + Sync {
    /// Probability of the positive (churn) class
    fn predict_proba(&self, row: &[f32; FEATURE_COUNT]) -> Result<f64>;

    /// Version string of the loaded model
    fn version(&self) -> &str;
}

/// ONNX classifier executed with tract
///
/// The graph must take `f32[1, 10]` and emit class probabilities as an
/// f32 tensor (export tree ensembles with ZipMap disabled).
pub struct OnnxClassifier {
    model: TractModel,
    version: String,
}

impl OnnxClassifier {
    pub fn from_path(path: &Path) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, FEATURE_COUNT]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;

        let version = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());

        Ok(Self { model, version })
    }

    fn row_to_tensor(row: &[f32; FEATURE_COUNT]) -> Result<Tensor> {
        let array = tract_ndarray::Array2::from_shape_vec((1, FEATURE_COUNT), row.to_vec())
            .context("Failed to shape feature row")?;
        Ok(array.into())
    }
}

impl ChurnClassifier for OnnxClassifier {
    fn predict_proba(&self, row: &[f32; FEATURE_COUNT]) -> Result<f64> {
        let start = Instant::now();
        let input = Self::row_to_tensor(row)?;
        let outputs = self.model.run(tvec!(input.into()))?;

        // Tree-ensemble exports emit the label tensor first, so pick the
        // first f32 output rather than output 0.
        let probabilities: Vec<f32> = outputs
            .iter()
            .find_map(|t| t.to_array_view::<f32>().ok().map(|v| v.iter().copied().collect()))
            .context("Model produced no f32 probability output")?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        match probabilities.as_slice() {
            [_, positive, ..] => Ok(f64::from(*positive)),
            [single] => Ok(f64::from(*single)),
            [] => anyhow::bail!("Model output is empty"),
        }
    }

    fn version(&self) -> &str {
        &self.version
    }
}

/// Logistic regression classifier loaded from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct LogisticClassifier {
    #[serde(default = "default_logistic_version")]
    version: String,
    bias: f64,
    weights: Vec<f64>,
}

fn default_logistic_version() -> String {
    "logistic".to_string()
}

impl LogisticClassifier {
    pub fn new(bias: f64, weights: Vec<f64>) -> Result<Self> {
        let model = Self {
            version: default_logistic_version(),
            bias,
            weights,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let model: Self = serde_json::from_slice(bytes).context("Failed to parse logistic model")?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        if self.weights.len() != FEATURE_COUNT {
            anyhow::bail!(
                "Logistic model has {} weights, expected {}",
                self.weights.len(),
                FEATURE_COUNT
            );
        }
        if !self.bias.is_finite() || self.weights.iter().any(|w| !w.is_finite()) {
            anyhow::bail!("Logistic model has non-finite coefficients");
        }
        Ok(())
    }
}

impl ChurnClassifier for LogisticClassifier {
    fn predict_proba(&self, row: &[f32; FEATURE_COUNT]) -> Result<f64> {
        // Missing slots (NaN) contribute nothing
        let z = row
            .iter()
            .zip(&self.weights)
            .filter(|(x, _)| !x.is_nan())
            .fold(self.bias, |acc, (x, w)| acc + f64::from(*x) * w);
        Ok(sigmoid(z))
    }

    fn version(&self) -> &str {
        &self.version
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logistic_zero_weights_is_half() {
        let model = LogisticClassifier::new(0.0, vec![0.0; FEATURE_COUNT]).unwrap();
        let p = model.predict_proba(&[1.0; FEATURE_COUNT]).unwrap();
        assert!((p - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_logistic_skips_missing_slots() {
        let mut weights = vec![0.0; FEATURE_COUNT];
        weights[0] = 10.0;
        let model = LogisticClassifier::new(0.0, weights).unwrap();

        let mut row = [0.0; FEATURE_COUNT];
        row[0] = f32::NAN;
        let p = model.predict_proba(&row).unwrap();
        assert!((p - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_logistic_rejects_wrong_width() {
        assert!(LogisticClassifier::new(0.0, vec![1.0; 3]).is_err());
        let json = br#"{"bias": 0.1, "weights": [1, 2]}"#;
        assert!(LogisticClassifier::from_json(json).is_err());
    }

    #[test]
    fn test_logistic_from_json_reads_version() {
        let json = br#"{"version": "v3", "bias": -1.0, "weights": [0,0,0,0,0,0,0,0,0,0]}"#;
        let model = LogisticClassifier::from_json(json).unwrap();
        assert_eq!(model.version(), "v3");
        let p = model.predict_proba(&[0.0; FEATURE_COUNT]).unwrap();
        assert!(p < 0.5);
    }

    #[test]
    fn test_onnx_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.onnx");
        std::fs::write(&path, b"not a protobuf").unwrap();
        assert!(OnnxClassifier::from_path(&path).is_err());
    }
}

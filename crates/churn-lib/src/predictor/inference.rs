//! Classifier invocation

use super::output::{label_for, risk_level_for};
use crate::artifacts::ChurnClassifier;
use crate::error::PredictError;
use crate::models::{PredictionLabel, RiskLevel, FEATURE_COUNT};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Outcome of a single inference
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inference {
    pub label: PredictionLabel,
    pub probability: f64,
    pub risk_level: RiskLevel,
}

impl Inference {
    pub fn from_probability(probability: f64) -> Self {
        Self {
            label: label_for(probability),
            probability,
            risk_level: risk_level_for(probability),
        }
    }
}

/// Inference statistics
#[derive(Debug, Clone)]
pub struct InferenceStats {
    pub total_inferences: u64,
    pub failed_inferences: u64,
}

#[derive(Debug, Default)]
pub struct InferenceEngine {
    inference_count: AtomicU64,
    failure_count: AtomicU64,
}

impl InferenceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn predict(
        &self,
        classifier: &dyn ChurnClassifier,
        row: &[f32; FEATURE_COUNT],
    ) -> Result<Inference, PredictError> {
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        let raw = classifier.predict_proba(row).map_err(|e| {
            self.failure_count.fetch_add(1, Ordering::Relaxed);
            PredictError::Inference(format!("{:#}", e))
        })?;

        if raw.is_nan() {
            self.failure_count.fetch_add(1, Ordering::Relaxed);
            return Err(PredictError::Inference("classifier returned NaN".to_string()));
        }

        let probability = raw.clamp(0.0, 1.0);
        if probability != raw {
            warn!(raw, model_version = classifier.version(), "Classifier probability outside [0, 1], clamped");
        }

        Ok(Inference::from_probability(probability))
    }

    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_inferences: self.inference_count.load(Ordering::Relaxed),
            failed_inferences: self.failure_count.load(Ordering::Relaxed),
        }
    }
}

//! Observability for the churn prediction service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, outcomes, degradations, artifact info)
//! - Structured JSON logging with tracing

use crate::artifacts::ArtifactManifest;
use crate::models::PredictionRecord;
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    Encoder, GaugeVec, Histogram, IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Latency buckets in seconds
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

static GLOBAL_METRICS: OnceLock<ChurnMetricsInner> = OnceLock::new();

struct ChurnMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    validation_errors: IntCounter,
    model_not_ready: IntCounter,
    inference_errors: IntCounter,
    encoding_fallbacks: IntCounterVec,
    scaling_fallbacks: IntCounter,
    explanation_factor_failures: IntCounterVec,
    persistence_failures: IntCounter,
    alerts_dispatched: IntCounterVec,
    artifact_info: GaugeVec,
}

impl ChurnMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "churn_prediction_latency_seconds",
                "Time spent mapping, scoring and explaining one customer record",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "churn_predictions_total",
                "Predictions served, by label",
                &["prediction"]
            )
            .expect("Failed to register predictions_total"),

            validation_errors: register_int_counter!(
                "churn_validation_errors_total",
                "Requests rejected for missing required fields"
            )
            .expect("Failed to register validation_errors"),

            model_not_ready: register_int_counter!(
                "churn_model_not_ready_total",
                "Requests rejected because artifacts were not loaded"
            )
            .expect("Failed to register model_not_ready"),

            inference_errors: register_int_counter!(
                "churn_inference_errors_total",
                "Classifier failures at run time"
            )
            .expect("Failed to register inference_errors"),

            encoding_fallbacks: register_int_counter_vec!(
                "churn_encoding_fallbacks_total",
                "Unknown categories replaced by the fallback code",
                &["column"]
            )
            .expect("Failed to register encoding_fallbacks"),

            scaling_fallbacks: register_int_counter!(
                "churn_scaling_fallbacks_total",
                "Rows scored unscaled after a scaler error"
            )
            .expect("Failed to register scaling_fallbacks"),

            explanation_factor_failures: register_int_counter_vec!(
                "churn_explanation_factor_failures_total",
                "Explanation factors omitted after failing",
                &["factor"]
            )
            .expect("Failed to register explanation_factor_failures"),

            persistence_failures: register_int_counter!(
                "churn_persistence_failures_total",
                "Prediction records that could not be stored"
            )
            .expect("Failed to register persistence_failures"),

            alerts_dispatched: register_int_counter_vec!(
                "churn_alerts_dispatched_total",
                "High churn risk alerts handed to a sink",
                &["channel"]
            )
            .expect("Failed to register alerts_dispatched"),

            artifact_info: register_gauge_vec!(
                "churn_artifact_info",
                "Information about the currently loaded classifier",
                &["model_version", "sha256", "scaled"]
            )
            .expect("Failed to register artifact_info"),
        }
    }
}

/// Lightweight handle to the process-wide metrics.
/// Clones share the same underlying collectors.
#[derive(Clone)]
pub struct ChurnMetrics {
    _private: (),
}

impl Default for ChurnMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ChurnMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ChurnMetrics")
    }
}

impl ChurnMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ChurnMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ChurnMetricsInner {
        GLOBAL_METRICS.get_or_init(ChurnMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self, label: &str) {
        self.inner().predictions_total.with_label_values(&[label]).inc();
    }

    pub fn inc_validation_errors(&self) {
        self.inner().validation_errors.inc();
    }

    pub fn inc_model_not_ready(&self) {
        self.inner().model_not_ready.inc();
    }

    pub fn inc_inference_errors(&self) {
        self.inner().inference_errors.inc();
    }

    pub fn inc_encoding_fallback(&self, column: &str) {
        self.inner().encoding_fallbacks.with_label_values(&[column]).inc();
    }

    pub fn inc_scaling_fallbacks(&self) {
        self.inner().scaling_fallbacks.inc();
    }

    pub fn inc_explanation_factor_failure(&self, factor: &str) {
        self.inner()
            .explanation_factor_failures
            .with_label_values(&[factor])
            .inc();
    }

    pub fn inc_persistence_failures(&self) {
        self.inner().persistence_failures.inc();
    }

    pub fn inc_alerts_dispatched(&self, channel: &str) {
        self.inner().alerts_dispatched.with_label_values(&[channel]).inc();
    }

    /// Replace the artifact info series with the given manifest
    pub fn set_artifacts(&self, manifest: &ArtifactManifest) {
        let info = &self.inner().artifact_info;
        info.reset();
        let scaled = if manifest.scaler.is_some() { "true" } else { "false" };
        info.with_label_values(&[
            manifest.model_version.as_str(),
            manifest.model.sha256.as_str(),
            scaled,
        ])
        .set(1.0);
    }
}

/// Render every registered metric in the Prometheus text format
pub fn render_metrics() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Structured logger for service events
///
/// Emits one JSON event per significant occurrence, each tagged with
/// `event` and the service instance name.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn log_startup(&self, version: &str, port: u16, model_version: Option<&str>) {
        info!(
            event = "service_started",
            instance = %self.instance,
            service_version = %version,
            port = port,
            model_version = model_version.unwrap_or("none"),
            "Churn prediction service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Churn prediction service shutting down"
        );
    }

    pub fn log_artifacts_loaded(&self, manifest: &ArtifactManifest) {
        info!(
            event = "artifacts_loaded",
            instance = %self.instance,
            model_path = %manifest.model.path.display(),
            model_version = %manifest.model_version,
            model_sha256 = %manifest.model.sha256,
            encoder_path = %manifest.encoder.path.display(),
            encoder_sha256 = %manifest.encoder.sha256,
            scaler_path = ?manifest.scaler.as_ref().map(|s| s.path.display().to_string()),
            "ML artifacts loaded"
        );
    }

    pub fn log_artifact_reload(&self, old_version: Option<&str>, new_version: Option<&str>, success: bool) {
        if success {
            info!(
                event = "artifact_reload",
                instance = %self.instance,
                old_version = old_version.unwrap_or("none"),
                new_version = new_version.unwrap_or("none"),
                "ML artifacts reloaded"
            );
        } else {
            warn!(
                event = "artifact_reload",
                instance = %self.instance,
                old_version = old_version.unwrap_or("none"),
                "ML artifact reload failed, keeping previous artifacts"
            );
        }
    }

    pub fn log_prediction(&self, record: &PredictionRecord, model_version: &str, latency_secs: f64) {
        info!(
            event = "prediction_generated",
            instance = %self.instance,
            prediction_id = %record.id,
            user_id = %record.user_id,
            prediction = %record.prediction,
            probability = record.probability,
            risk_level = %record.risk_level,
            top_factor = record.shap_values.first().map(|f| f.feature.as_str()).unwrap_or("none"),
            model_version = %model_version,
            latency_secs = latency_secs,
            "Generated churn prediction"
        );
    }

    pub fn log_high_risk_alert(&self, record: &PredictionRecord, threshold: f64, channels: &[&str]) {
        warn!(
            event = "high_risk_alert",
            instance = %self.instance,
            prediction_id = %record.id,
            user_id = %record.user_id,
            probability = record.probability,
            threshold = threshold,
            channels = ?channels,
            "High churn risk detected"
        );
    }
}

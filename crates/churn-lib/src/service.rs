//! Prediction orchestration
//!
//! Runs the readiness guard, schema mapping, encoding/scaling, inference
//! and explanation for one request, then hands the finished record to
//! storage and notification on a detached task.

use crate::artifacts::ArtifactRegistry;
use crate::error::PredictError;
use crate::models::{CustomerRecord, PredictionRecord};
use crate::notify::NotificationDispatcher;
use crate::observability::{ChurnMetrics, StructuredLogger};
use crate::predictor::{Explainer, FeatureTransformer, InferenceEngine, InferenceStats, SchemaMapper};
use crate::store::PredictionStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

pub struct PredictionService {
    registry: Arc<ArtifactRegistry>,
    mapper: SchemaMapper,
    transformer: FeatureTransformer,
    engine: InferenceEngine,
    explainer: Explainer,
    store: Arc<dyn PredictionStore>,
    notifier: Option<Arc<NotificationDispatcher>>,
    metrics: ChurnMetrics,
    logger: StructuredLogger,
}

impl PredictionService {
    pub fn new(
        registry: Arc<ArtifactRegistry>,
        store: Arc<dyn PredictionStore>,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            registry,
            mapper: SchemaMapper::new(),
            transformer: FeatureTransformer::new(),
            engine: InferenceEngine::new(),
            explainer: Explainer::new(),
            store,
            notifier: None,
            metrics: ChurnMetrics::new(),
            logger,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<NotificationDispatcher>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_explainer(mut self, explainer: Explainer) -> Self {
        self.explainer = explainer;
        self
    }

    pub fn registry(&self) -> &Arc<ArtifactRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn PredictionStore> {
        &self.store
    }

    pub fn notifier(&self) -> Option<&Arc<NotificationDispatcher>> {
        self.notifier.as_ref()
    }

    pub fn inference_stats(&self) -> InferenceStats {
        self.engine.stats()
    }

    /// Score one customer record for `user_id`.
    ///
    /// Only `ModelNotReady`, `Validation` and a run-time classifier
    /// failure are returned as errors. Persistence happens after this
    /// returns and its failure is only logged.
    pub async fn predict(
        &self,
        user_id: &str,
        customer: CustomerRecord,
    ) -> Result<PredictionRecord, PredictError> {
        let (record, _persisted) = self.predict_detached(user_id, customer)?;
        Ok(record)
    }

    /// Same as [`Self::predict`] but also returns the handle of the
    /// storage and notification task.
    pub fn predict_detached(
        &self,
        user_id: &str,
        customer: CustomerRecord,
    ) -> Result<(PredictionRecord, JoinHandle<()>), PredictError> {
        let started = Instant::now();

        let Some(artifacts) = self.registry.snapshot() else {
            self.metrics.inc_model_not_ready();
            return Err(PredictError::ModelNotReady);
        };

        let vector = self.mapper.map(&customer).map_err(|e| {
            self.metrics.inc_validation_errors();
            e
        })?;

        let row = self
            .transformer
            .transform(&vector, &artifacts.encoder, artifacts.scaler.as_ref());
        for column in &row.encoding_fallbacks {
            self.metrics.inc_encoding_fallback(column);
        }
        if row.scaling_fallback {
            self.metrics.inc_scaling_fallbacks();
        }

        let inference = self
            .engine
            .predict(artifacts.classifier.as_ref(), &row.values)
            .map_err(|e| {
                self.metrics.inc_inference_errors();
                e
            })?;

        let explanation = self.explainer.explain_detailed(&customer);
        for factor in &explanation.failed {
            self.metrics.inc_explanation_factor_failure(factor);
        }
        if explanation.fallback {
            warn!(user_id = %user_id, "Every explanation factor failed, returning neutral factors");
        }

        let record = PredictionRecord {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            customer_data: customer,
            prediction: inference.label,
            probability: inference.probability,
            risk_level: inference.risk_level,
            shap_values: explanation.factors,
            user_id: user_id.to_string(),
        };

        let latency = started.elapsed().as_secs_f64();
        self.metrics.observe_prediction_latency(latency);
        self.metrics.inc_predictions(record.prediction.as_str());
        self.logger
            .log_prediction(&record, &artifacts.manifest.model_version, latency);

        let handle = self.spawn_followups(record.clone());
        Ok((record, handle))
    }

    fn spawn_followups(&self, record: PredictionRecord) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let notifier = self.notifier.clone();
        let metrics = self.metrics.clone();

        tokio::spawn(async move {
            match store.save(&record).await {
                Ok(()) => debug!(prediction_id = %record.id, "Prediction persisted"),
                Err(e) => {
                    metrics.inc_persistence_failures();
                    warn!(
                        prediction_id = %record.id,
                        user_id = %record.user_id,
                        error = %e,
                        "Failed to persist prediction"
                    );
                }
            }

            if let Some(notifier) = notifier {
                notifier.notify_if_high_risk(&record).await;
            }
        })
    }
}

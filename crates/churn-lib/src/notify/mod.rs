//! High churn risk notifications
//!
//! Handles:
//! - Per-user channel settings and thresholds
//! - Building email and SMS alert content from a stored prediction
//! - Handing alerts to pluggable delivery sinks

mod alerter;
mod settings;

pub use alerter::{percent, ChurnAlert, ChurnAlerter, EmailAlert, SmsAlert};
pub use settings::{
    NotificationRegistry, NotificationSettings, SettingsError, DEFAULT_ALERT_THRESHOLD,
};

use crate::models::PredictionRecord;
use crate::observability::{ChurnMetrics, StructuredLogger};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Delivery backend for alerts
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(&self, alert: &ChurnAlert) -> Result<()>;
}

/// Sink that records alerts in the service log instead of sending them
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, alert: &ChurnAlert) -> Result<()> {
        if let Some(email) = &alert.email {
            info!(
                prediction_id = %alert.prediction_id,
                to = %email.to,
                subject = %email.subject,
                "Email alert recorded"
            );
        }
        if let Some(sms) = &alert.sms {
            info!(
                prediction_id = %alert.prediction_id,
                to = %sms.to,
                message = %sms.message,
                "SMS alert recorded"
            );
        }
        Ok(())
    }
}

/// Looks up the owner's settings, builds the alert and fans it out to
/// every sink. Sink failures are logged and never propagated.
pub struct NotificationDispatcher {
    registry: Arc<NotificationRegistry>,
    alerter: ChurnAlerter,
    sinks: Vec<Arc<dyn NotificationSink>>,
    metrics: ChurnMetrics,
    logger: StructuredLogger,
}

impl NotificationDispatcher {
    pub fn new(registry: Arc<NotificationRegistry>, logger: StructuredLogger) -> Self {
        Self {
            registry,
            alerter: ChurnAlerter::new(),
            sinks: Vec::new(),
            metrics: ChurnMetrics::new(),
            logger,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn registry(&self) -> &Arc<NotificationRegistry> {
        &self.registry
    }

    /// Returns the alert when one was raised for `record`
    pub async fn notify_if_high_risk(&self, record: &PredictionRecord) -> Option<ChurnAlert> {
        let settings = self.registry.get(&record.user_id);
        let alert = self.alerter.build(record, &settings)?;

        let channels = alert.channels();
        self.logger
            .log_high_risk_alert(record, settings.threshold, &channels);

        if !alert.has_channels() {
            debug!(prediction_id = %record.id, "No notification channel enabled");
            return Some(alert);
        }

        for sink in &self.sinks {
            match sink.deliver(&alert).await {
                Ok(()) => {
                    for channel in &channels {
                        self.metrics.inc_alerts_dispatched(channel);
                    }
                }
                Err(e) => warn!(
                    sink = sink.name(),
                    prediction_id = %record.id,
                    error = %e,
                    "Failed to deliver churn alert"
                ),
            }
        }

        Some(alert)
    }
}

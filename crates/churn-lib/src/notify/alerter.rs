//! High churn risk alert construction
//!
//! Builds channel-specific messages from a stored prediction and the
//! owner's settings. Delivery is left to a [`super::NotificationSink`].

use super::NotificationSettings;
use crate::models::PredictionRecord;
use crate::predictor::coerce;
use serde::{Deserialize, Serialize};

const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailAlert {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmsAlert {
    pub to: String,
    pub message: String,
}

/// Alert for one prediction, with a part per enabled channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChurnAlert {
    pub prediction_id: String,
    pub user_id: String,
    pub probability: f64,
    pub threshold: f64,
    pub email: Option<EmailAlert>,
    pub sms: Option<SmsAlert>,
}

impl ChurnAlert {
    pub fn has_channels(&self) -> bool {
        self.email.is_some() || self.sms.is_some()
    }

    pub fn channels(&self) -> Vec<&'static str> {
        let mut channels = Vec::new();
        if self.email.is_some() {
            channels.push("email");
        }
        if self.sms.is_some() {
            channels.push("sms");
        }
        channels
    }
}

/// `0.8234` as `82.3%`
pub fn percent(probability: f64) -> String {
    format!("{:.1}%", probability * 100.0)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChurnAlerter;

impl ChurnAlerter {
    pub fn new() -> Self {
        Self
    }

    /// `None` when the probability is below the user's threshold
    pub fn build(&self, record: &PredictionRecord, settings: &NotificationSettings) -> Option<ChurnAlert> {
        if record.probability < settings.threshold {
            return None;
        }

        let email = settings.email_destination().map(|to| EmailAlert {
            to: to.to_string(),
            subject: format!("High Churn Risk Alert - {} probability", percent(record.probability)),
            body: email_body(record),
        });

        let sms = settings.sms_destination().map(|to| SmsAlert {
            to: to.to_string(),
            message: format!(
                "High churn risk alert: {} probability. Check dashboard for details.",
                percent(record.probability)
            ),
        });

        Some(ChurnAlert {
            prediction_id: record.id.clone(),
            user_id: record.user_id.clone(),
            probability: record.probability,
            threshold: settings.threshold,
            email,
            sms,
        })
    }
}

fn email_body(record: &PredictionRecord) -> String {
    let field = |key: &str| {
        coerce::as_text(record.customer_data.get(key)).unwrap_or_else(|| NOT_AVAILABLE.to_string())
    };

    format!(
        "High churn risk detected for customer:\n\
         \n\
         Churn Probability: {probability}\n\
         Risk Level: {risk}\n\
         Tenure: {tenure} months\n\
         Monthly Charges: ${monthly}\n\
         Total Charges: ${total}\n\
         Contract: {contract}\n\
         Payment Method: {payment}\n\
         Internet Service: {internet}\n\
         \n\
         Immediate action recommended for customer retention.\n",
        probability = percent(record.probability),
        risk = record.risk_level,
        tenure = field("tenure"),
        monthly = field("monthlyCharges"),
        total = field("totalCharges"),
        contract = field("contract"),
        payment = field("paymentMethod"),
        internet = field("internetService"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CustomerRecord, PredictionLabel, RiskLevel};
    use chrono::Utc;
    use serde_json::json;

    fn record(probability: f64) -> PredictionRecord {
        PredictionRecord {
            id: "p-1".to_string(),
            timestamp: Utc::now(),
            customer_data: CustomerRecord::try_from(json!({
                "tenure": 3,
                "monthlyCharges": 85,
                "contract": "Month-to-month"
            }))
            .unwrap(),
            prediction: PredictionLabel::Churn,
            probability,
            risk_level: RiskLevel::VeryHigh,
            shap_values: Vec::new(),
            user_id: "alice".to_string(),
        }
    }

    fn both_channels() -> NotificationSettings {
        NotificationSettings {
            email_enabled: true,
            email_address: Some("ops@example.com".to_string()),
            sms_enabled: true,
            phone_number: Some("+15550100".to_string()),
            threshold: 0.7,
        }
    }

    #[test]
    fn test_below_threshold_is_silent() {
        assert!(ChurnAlerter::new().build(&record(0.69), &both_channels()).is_none());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        assert!(ChurnAlerter::new().build(&record(0.7), &both_channels()).is_some());
    }

    #[test]
    fn test_email_and_sms_content() {
        let alert = ChurnAlerter::new().build(&record(0.8234), &both_channels()).unwrap();

        let email = alert.email.as_ref().unwrap();
        assert_eq!(email.to, "ops@example.com");
        assert_eq!(email.subject, "High Churn Risk Alert - 82.3% probability");
        assert!(email.body.contains("Tenure: 3 months"));
        assert!(email.body.contains("Monthly Charges: $85"));
        assert!(email.body.contains("Contract: Month-to-month"));
        assert!(email.body.contains("Payment Method: N/A"));

        let sms = alert.sms.as_ref().unwrap();
        assert_eq!(
            sms.message,
            "High churn risk alert: 82.3% probability. Check dashboard for details."
        );
        assert_eq!(alert.channels(), vec!["email", "sms"]);
    }

    #[test]
    fn test_disabled_channels_are_omitted() {
        let settings = NotificationSettings {
            email_enabled: false,
            ..both_channels()
        };
        let alert = ChurnAlerter::new().build(&record(0.95), &settings).unwrap();
        assert!(alert.email.is_none());
        assert!(alert.sms.is_some());

        let silent = ChurnAlerter::new()
            .build(&record(0.95), &NotificationSettings::default())
            .unwrap();
        assert!(!silent.has_channels());
    }
}

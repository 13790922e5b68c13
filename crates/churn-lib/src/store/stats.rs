//! Dashboard aggregates over a user's prediction history

use crate::models::{PredictionLabel, PredictionRecord};
use serde::{Deserialize, Serialize};

/// Default probability above which a customer counts as high risk
pub const DEFAULT_HIGH_RISK_THRESHOLD: f64 = 0.7;

/// Offline evaluation figures of the deployed classifier, in percent
pub const MODEL_ACCURACY: f64 = 84.0;
pub const MODEL_PRECISION: f64 = 69.0;
pub const MODEL_RECALL: f64 = 72.2;
pub const MODEL_F1: f64 = 70.5;
pub const MODEL_AUC: f64 = 90.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_predictions: usize,
    /// Percentage of "Churn" predictions, one decimal
    pub churn_rate: f64,
    /// Three decimals
    pub avg_probability: f64,
    pub high_risk_customers: usize,
    pub prediction_accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub auc: f64,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

impl DashboardStats {
    pub fn from_records(records: &[PredictionRecord], high_risk_threshold: f64) -> Self {
        let total = records.len();
        let (churn_rate, avg_probability, high_risk) = if total == 0 {
            (0.0, 0.0, 0)
        } else {
            let churned = records
                .iter()
                .filter(|r| r.prediction == PredictionLabel::Churn)
                .count();
            let probability_sum: f64 = records.iter().map(|r| r.probability).sum();
            let high_risk = records
                .iter()
                .filter(|r| r.probability > high_risk_threshold)
                .count();
            (
                round_to(churned as f64 / total as f64 * 100.0, 1),
                round_to(probability_sum / total as f64, 3),
                high_risk,
            )
        };

        Self {
            total_predictions: total,
            churn_rate,
            avg_probability,
            high_risk_customers: high_risk,
            prediction_accuracy: MODEL_ACCURACY,
            precision: MODEL_PRECISION,
            recall: MODEL_RECALL,
            f1_score: MODEL_F1,
            auc: MODEL_AUC,
        }
    }
}

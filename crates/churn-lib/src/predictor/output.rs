//! Label and risk tier derivation from a churn probability

use crate::models::{PredictionLabel, RiskLevel};

/// Probability above which a customer is labelled as churning.
/// Exactly 0.5 resolves to "No Churn".
pub const CHURN_THRESHOLD: f64 = 0.5;

/// Lower bounds of the risk bands, evaluated high to low
pub const VERY_HIGH_RISK_FROM: f64 = 0.8;
pub const HIGH_RISK_FROM: f64 = 0.6;
pub const MEDIUM_RISK_FROM: f64 = 0.4;

pub fn label_for(probability: f64) -> PredictionLabel {
    if probability > CHURN_THRESHOLD {
        PredictionLabel::Churn
    } else {
        PredictionLabel::NoChurn
    }
}

pub fn risk_level_for(probability: f64) -> RiskLevel {
    if probability >= VERY_HIGH_RISK_FROM {
        RiskLevel::VeryHigh
    } else if probability >= HIGH_RISK_FROM {
        RiskLevel::High
    } else if probability >= MEDIUM_RISK_FROM {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_boundary() {
        assert_eq!(label_for(0.5), PredictionLabel::NoChurn);
        assert_eq!(label_for(0.500_000_1), PredictionLabel::Churn);
        assert_eq!(label_for(0.0), PredictionLabel::NoChurn);
        assert_eq!(label_for(1.0), PredictionLabel::Churn);
    }

    #[test]
    fn test_risk_band_boundaries() {
        assert_eq!(risk_level_for(0.8), RiskLevel::VeryHigh);
        assert_eq!(risk_level_for(0.6), RiskLevel::High);
        assert_eq!(risk_level_for(0.4), RiskLevel::Medium);
        assert_eq!(risk_level_for(0.399_999), RiskLevel::Low);
        assert_eq!(risk_level_for(0.799_999), RiskLevel::High);
        assert_eq!(risk_level_for(0.599_999), RiskLevel::Medium);
        assert_eq!(risk_level_for(0.0), RiskLevel::Low);
        assert_eq!(risk_level_for(1.0), RiskLevel::VeryHigh);
    }

    #[test]
    fn test_risk_is_monotonic() {
        let mut previous = RiskLevel::Low;
        for step in 0..=100 {
            let level = risk_level_for(step as f64 / 100.0);
            assert!(level >= previous);
            previous = level;
        }
    }
}

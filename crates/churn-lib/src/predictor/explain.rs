//! Heuristic churn factor attribution
//!
//! These scores are a fixed hand-authored approximation of feature
//! influence computed from the caller's original record. They are not
//! derived from the classifier and are not Shapley values.

use super::coerce::{number_or, text_or};
use crate::models::{CustomerRecord, FeatureContribution, Impact};
use thiserror::Error;
use tracing::warn;

/// Maximum number of factors returned
pub const MAX_FACTORS: usize = 6;

pub const DEFAULT_MONTHLY_CHARGES: f64 = 50.0;
pub const DEFAULT_TENURE: f64 = 12.0;

#[derive(Debug, Error, PartialEq)]
pub enum FactorError {
    #[error("factor {factor} produced a non-finite value")]
    NonFinite { factor: &'static str },

    #[error("factor {factor} failed: {reason}")]
    Failed { factor: &'static str, reason: String },
}

pub type FactorFn = fn(&CustomerRecord) -> Result<FeatureContribution, FactorError>;

/// A named, independently fallible contribution heuristic
#[derive(Clone, Copy)]
pub struct Factor {
    pub name: &'static str,
    pub compute: FactorFn,
}

impl std::fmt::Debug for Factor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Factor").field("name", &self.name).finish()
    }
}

/// Ranked explanation plus the factors that could not be computed
#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    pub factors: Vec<FeatureContribution>,
    pub failed: Vec<&'static str>,
    /// True when every factor failed and the neutral set was substituted
    pub fallback: bool,
}

/// Returned when no factor could be computed
pub fn neutral_fallback() -> Vec<FeatureContribution> {
    vec![
        FeatureContribution::new("Monthly Charges", 0.0, Impact::Neutral),
        FeatureContribution::new("Tenure", 0.0, Impact::Neutral),
        FeatureContribution::new("Contract Type", 0.0, Impact::Neutral),
    ]
}

fn contribution(
    factor: &'static str,
    value: f64,
    positive: bool,
) -> Result<FeatureContribution, FactorError> {
    if !value.is_finite() {
        return Err(FactorError::NonFinite { factor });
    }
    let impact = if positive { Impact::Positive } else { Impact::Negative };
    Ok(FeatureContribution::new(factor, value, impact))
}

fn monthly_charges(record: &CustomerRecord) -> Result<FeatureContribution, FactorError> {
    let charges = number_or(record.get("monthlyCharges"), DEFAULT_MONTHLY_CHARGES);
    contribution("Monthly Charges", (charges - 50.0) * 0.01, charges > 70.0)
}

fn tenure(record: &CustomerRecord) -> Result<FeatureContribution, FactorError> {
    let months = number_or(record.get("tenure"), DEFAULT_TENURE);
    contribution("Tenure", (50.0 - months) * 0.008, months < 12.0)
}

/// Factor that scores `hit` when `key` equals `trigger`, `miss` otherwise
fn categorical(
    record: &CustomerRecord,
    factor: &'static str,
    key: &str,
    trigger: &str,
    hit: f64,
    miss: f64,
) -> Result<FeatureContribution, FactorError> {
    let matched = text_or(record.get(key), "") == trigger;
    contribution(factor, if matched { hit } else { miss }, matched)
}

fn contract_type(record: &CustomerRecord) -> Result<FeatureContribution, FactorError> {
    categorical(record, "Contract Type", "contract", "Month-to-month", 0.15, -0.12)
}

fn internet_service(record: &CustomerRecord) -> Result<FeatureContribution, FactorError> {
    categorical(record, "Internet Service", "internetService", "Fiber optic", 0.08, -0.05)
}

fn payment_method(record: &CustomerRecord) -> Result<FeatureContribution, FactorError> {
    categorical(record, "Payment Method", "paymentMethod", "Electronic check", 0.12, -0.08)
}

fn online_security(record: &CustomerRecord) -> Result<FeatureContribution, FactorError> {
    categorical(record, "Online Security", "onlineSecurity", "No", 0.06, -0.04)
}

/// The six standard factors in definition order (the tie-break order)
pub fn standard_factors() -> Vec<Factor> {
    vec![
        Factor { name: "Monthly Charges", compute: monthly_charges },
        Factor { name: "Tenure", compute: tenure },
        Factor { name: "Contract Type", compute: contract_type },
        Factor { name: "Internet Service", compute: internet_service },
        Factor { name: "Payment Method", compute: payment_method },
        Factor { name: "Online Security", compute: online_security },
    ]
}

#[derive(Debug, Clone)]
pub struct Explainer {
    factors: Vec<Factor>,
    top_n: usize,
}

impl Default for Explainer {
    fn default() -> Self {
        Self::new()
    }
}

impl Explainer {
    pub fn new() -> Self {
        Self::with_factors(standard_factors())
    }

    pub fn with_factors(factors: Vec<Factor>) -> Self {
        Self {
            factors,
            top_n: MAX_FACTORS,
        }
    }

    /// Ranked factors, never empty
    pub fn explain(&self, record: &CustomerRecord) -> Vec<FeatureContribution> {
        self.explain_detailed(record).factors
    }

    pub fn explain_detailed(&self, record: &CustomerRecord) -> Explanation {
        let mut failed = Vec::new();
        let mut factors: Vec<FeatureContribution> = self
            .factors
            .iter()
            .filter_map(|factor| match (factor.compute)(record) {
                Ok(c) => Some(c),
                Err(e) => {
                    warn!(factor = factor.name, error = %e, "Explanation factor failed, omitting");
                    failed.push(factor.name);
                    None
                }
            })
            .collect();

        if factors.is_empty() {
            return Explanation {
                factors: neutral_fallback(),
                failed,
                fallback: true,
            };
        }

        // Stable sort keeps definition order for equal magnitudes
        factors.sort_by(|a, b| {
            b.value
                .abs()
                .partial_cmp(&a.value.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        factors.truncate(self.top_n);

        Explanation {
            factors,
            failed,
            fallback: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn record(value: Value) -> CustomerRecord {
        CustomerRecord::try_from(value).unwrap()
    }

    fn find<'a>(factors: &'a [FeatureContribution], name: &str) -> &'a FeatureContribution {
        factors.iter().find(|f| f.feature == name).unwrap()
    }

    fn failing(_: &CustomerRecord) -> Result<FeatureContribution, FactorError> {
        Err(FactorError::Failed {
            factor: "Broken",
            reason: "boom".to_string(),
        })
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_month_to_month_scenario() {
        let input = record(json!({
            "contract": "Month-to-month",
            "monthlyCharges": 85,
            "numReferrals": 2,
            "dependents": "No",
            "totalCharges": 20,
            "tenure": 3,
            "paymentMethod": "Electronic check",
            "onlineBackup": "No",
            "onlineSecurity": "No",
            "techSupport": "No"
        }));
        let factors = Explainer::new().explain(&input);

        let contract = find(&factors, "Contract Type");
        assert!(approx(contract.value, 0.15));
        assert_eq!(contract.impact, Impact::Positive);

        let charges = find(&factors, "Monthly Charges");
        assert!(approx(charges.value, 0.35));
        assert_eq!(charges.impact, Impact::Positive);

        let charges_rank = factors.iter().position(|f| f.feature == "Monthly Charges");
        let contract_rank = factors.iter().position(|f| f.feature == "Contract Type");
        assert!(charges_rank < contract_rank);

        // tenure (50 - 3) * 0.008 = 0.376 is the largest
        assert_eq!(factors[0].feature, "Tenure");
        assert!(approx(factors[0].value, 0.376));
        assert_eq!(factors[0].impact, Impact::Positive);
    }

    #[test]
    fn test_defaults_apply_when_fields_absent() {
        let factors = Explainer::new().explain(&CustomerRecord::default());
        assert_eq!(factors.len(), MAX_FACTORS);

        let charges = find(&factors, "Monthly Charges");
        assert!(approx(charges.value, 0.0));
        assert_eq!(charges.impact, Impact::Negative);

        let tenure = find(&factors, "Tenure");
        assert!(approx(tenure.value, 0.304));
        assert_eq!(tenure.impact, Impact::Negative);

        assert!(approx(find(&factors, "Internet Service").value, -0.05));
        assert!(approx(find(&factors, "Online Security").value, -0.04));
    }

    #[test]
    fn test_loose_shapes_unwrapped() {
        let input = record(json!({
            "monthlyCharges": ["90"],
            "tenure": "not a number",
            "internetService": ["Fiber optic"]
        }));
        let factors = Explainer::new().explain(&input);

        assert!(approx(find(&factors, "Monthly Charges").value, 0.4));
        // unconvertible tenure uses the default of 12
        assert!(approx(find(&factors, "Tenure").value, 0.304));
        let internet = find(&factors, "Internet Service");
        assert!(approx(internet.value, 0.08));
        assert_eq!(internet.impact, Impact::Positive);
    }

    #[test]
    fn test_top_factor_has_max_magnitude() {
        let inputs = [
            json!({"monthlyCharges": 200, "tenure": 40}),
            json!({"monthlyCharges": 20, "tenure": 70, "contract": "Two year"}),
            json!({"tenure": 50, "paymentMethod": "Electronic check"}),
        ];
        for input in inputs {
            let factors = Explainer::new().explain(&record(input));
            let max = factors.iter().map(|f| f.value.abs()).fold(0.0, f64::max);
            assert!(approx(factors[0].value.abs(), max));
            assert!(!factors.is_empty() && factors.len() <= MAX_FACTORS);
        }
    }

    #[test]
    fn test_ties_keep_definition_order() {
        // monthly charges 62 -> 0.12, payment method electronic check -> 0.12
        let input = record(json!({
            "monthlyCharges": 62,
            "tenure": 50,
            "paymentMethod": "Electronic check"
        }));
        let factors = Explainer::new().explain(&input);
        let charges = factors.iter().position(|f| f.feature == "Monthly Charges").unwrap();
        let payment = factors.iter().position(|f| f.feature == "Payment Method").unwrap();
        assert!(charges < payment);
    }

    #[test]
    fn test_failed_factor_is_omitted() {
        let mut factors = standard_factors();
        factors.insert(1, Factor { name: "Broken", compute: failing });
        let explanation = Explainer::with_factors(factors).explain_detailed(&CustomerRecord::default());

        assert_eq!(explanation.failed, vec!["Broken"]);
        assert!(!explanation.fallback);
        assert_eq!(explanation.factors.len(), MAX_FACTORS);
        assert!(explanation.factors.iter().all(|f| f.feature != "Broken"));
    }

    #[test]
    fn test_total_failure_returns_neutral_set() {
        let explainer = Explainer::with_factors(vec![
            Factor { name: "Broken", compute: failing },
            Factor { name: "Broken", compute: failing },
        ]);
        let explanation = explainer.explain_detailed(&CustomerRecord::default());

        assert!(explanation.fallback);
        assert_eq!(explanation.factors, neutral_fallback());
        assert_eq!(explanation.factors.len(), 3);
        assert!(explanation.factors.iter().all(|f| f.impact == Impact::Neutral));
    }

    #[test]
    fn test_non_finite_rejected() {
        assert_eq!(
            contribution("Tenure", f64::INFINITY, true),
            Err(FactorError::NonFinite { factor: "Tenure" })
        );
    }
}

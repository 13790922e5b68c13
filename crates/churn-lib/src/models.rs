//! Core data models for churn prediction

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Number of feature slots the classifier was trained on
pub const FEATURE_COUNT: usize = 10;

/// Raw customer attributes as sent by the caller.
///
/// Kept as a loosely-typed JSON object: numeric fields may arrive as
/// strings or single-element arrays, and any key may be absent. The
/// record is stored verbatim alongside the prediction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerRecord(Map<String, Value>);

impl CustomerRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for CustomerRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl TryFrom<Value> for CustomerRecord {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(other),
        }
    }
}

/// A single slot of the feature vector before encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Category(String),
    /// No usable value was supplied; encoded as the fallback code
    Missing,
}

impl FeatureValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, FeatureValue::Missing)
    }
}

/// Feature vector in the classifier's positional column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: [FeatureValue; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn new(values: [FeatureValue; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[FeatureValue; FEATURE_COUNT] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&FeatureValue> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        FEATURE_COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Binary churn label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredictionLabel {
    #[serde(rename = "Churn")]
    Churn,
    #[serde(rename = "No Churn")]
    NoChurn,
}

impl PredictionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionLabel::Churn => "Churn",
            PredictionLabel::NoChurn => "No Churn",
        }
    }
}

impl std::fmt::Display for PredictionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PredictionLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Churn" => Ok(PredictionLabel::Churn),
            "No Churn" => Ok(PredictionLabel::NoChurn),
            other => Err(format!("unknown prediction label: {}", other)),
        }
    }
}

/// Discretized churn risk, ordered from lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::VeryHigh => "Very High",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a factor's effect on churn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Positive,
    Negative,
    Neutral,
}

/// One ranked entry of a prediction's explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature: String,
    pub value: f64,
    pub impact: Impact,
}

impl FeatureContribution {
    pub fn new(feature: impl Into<String>, value: f64, impact: Impact) -> Self {
        Self {
            feature: feature.into(),
            value,
            impact,
        }
    }
}

/// Persisted result of a single prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub customer_data: CustomerRecord,
    pub prediction: PredictionLabel,
    pub probability: f64,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub shap_values: Vec<FeatureContribution>,
    pub user_id: String,
}

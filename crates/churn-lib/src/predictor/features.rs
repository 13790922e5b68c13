//! Schema mapping from caller records to the classifier's feature layout
//!
//! The classifier is positional: column order here must match the order
//! used at training time exactly.

use super::coerce;
use crate::error::PredictError;
use crate::models::{CustomerRecord, FeatureValue, FeatureVector, FEATURE_COUNT};
use serde_json::Value;

/// Feature column definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureColumn {
    /// Key in the caller's record
    pub source: &'static str,
    /// Column name the classifier was trained with
    pub name: &'static str,
    pub kind: ColumnKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

/// Training-time column order
pub const FEATURE_COLUMNS: [FeatureColumn; FEATURE_COUNT] = [
    FeatureColumn { source: "contract", name: "Contract", kind: ColumnKind::Categorical },
    FeatureColumn { source: "monthlyCharges", name: "Monthly Charge", kind: ColumnKind::Numeric },
    FeatureColumn { source: "numReferrals", name: "Number of Referrals", kind: ColumnKind::Numeric },
    FeatureColumn { source: "dependents", name: "Dependents", kind: ColumnKind::Categorical },
    FeatureColumn { source: "totalCharges", name: "Avg Monthly GB Download", kind: ColumnKind::Numeric },
    FeatureColumn { source: "tenure", name: "Tenure in Months", kind: ColumnKind::Numeric },
    FeatureColumn { source: "paymentMethod", name: "Payment Method", kind: ColumnKind::Categorical },
    FeatureColumn { source: "onlineBackup", name: "Online Backup", kind: ColumnKind::Categorical },
    FeatureColumn { source: "onlineSecurity", name: "Online Security", kind: ColumnKind::Categorical },
    FeatureColumn { source: "techSupport", name: "Premium Tech Support", kind: ColumnKind::Categorical },
];

/// Caller keys that must be present, in reporting order
pub const REQUIRED_FIELDS: [&str; FEATURE_COUNT] = [
    "contract",
    "monthlyCharges",
    "numReferrals",
    "dependents",
    "totalCharges",
    "tenure",
    "paymentMethod",
    "onlineBackup",
    "onlineSecurity",
    "techSupport",
];

/// Maps a [`CustomerRecord`] onto a [`FeatureVector`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaMapper;

impl SchemaMapper {
    pub fn new() -> Self {
        Self
    }

    /// Every required key absent from the record
    pub fn missing_fields(&self, record: &CustomerRecord) -> Vec<String> {
        REQUIRED_FIELDS
            .iter()
            .filter(|field| !record.contains_key(field))
            .map(|field| field.to_string())
            .collect()
    }

    pub fn map(&self, record: &CustomerRecord) -> Result<FeatureVector, PredictError> {
        let missing = self.missing_fields(record);
        if !missing.is_empty() {
            return Err(PredictError::Validation { missing });
        }

        let values = FEATURE_COLUMNS.map(|column| slot_value(column, record.get(column.source)));
        Ok(FeatureVector::new(values))
    }
}

/// Convert one raw value into a feature slot.
///
/// Numbers stay numeric in any column. Strings become categories unless
/// the column is numeric and the string parses. Anything unusable as a
/// number is left as a category so the encoder's fallback handles it.
fn slot_value(column: FeatureColumn, raw: Option<&Value>) -> FeatureValue {
    let raw = match raw {
        None | Some(Value::Null) => return FeatureValue::Missing,
        Some(raw) => raw,
    };

    let is_json_number = matches!(raw, Value::Number(_))
        || matches!(raw, Value::Array(items) if items.len() == 1 && items[0].is_number());

    if is_json_number || column.kind == ColumnKind::Numeric {
        if let Some(n) = coerce::as_number(Some(raw)) {
            return FeatureValue::Number(n);
        }
    }

    match coerce::as_text(Some(raw)) {
        Some(text) => FeatureValue::Category(text),
        None => FeatureValue::Category(raw.to_string()),
    }
}

/// Index of a column by its training-time name
pub fn column_index(name: &str) -> Option<usize> {
    FEATURE_COLUMNS.iter().position(|c| c.name == name)
}

//! Churn prediction pipeline stages
//!
//! A request flows through [`SchemaMapper`], [`FeatureTransformer`],
//! [`InferenceEngine`] and [`Explainer`] in that order.

pub mod coerce;
mod explain;
mod features;
mod inference;
mod output;
mod transform;

pub use explain::{
    neutral_fallback, standard_factors, Explainer, Explanation, Factor, FactorError, FactorFn,
    DEFAULT_MONTHLY_CHARGES, DEFAULT_TENURE, MAX_FACTORS,
};
pub use features::{
    column_index, ColumnKind, FeatureColumn, SchemaMapper, FEATURE_COLUMNS, REQUIRED_FIELDS,
};
pub use inference::{Inference, InferenceEngine, InferenceStats};
pub use output::{
    label_for, risk_level_for, CHURN_THRESHOLD, HIGH_RISK_FROM, MEDIUM_RISK_FROM,
    VERY_HIGH_RISK_FROM,
};
pub use transform::{FeatureTransformer, TransformedRow, UNKNOWN_CATEGORY_CODE};

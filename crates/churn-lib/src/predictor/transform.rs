//! Encoding and scaling of mapped features into the classifier's input row
//!
//! This stage never fails a request. Unknown categories and null slots
//! collapse to code 0 and a scaler error leaves the row unscaled; all of
//! these are logged.

use super::features::FEATURE_COLUMNS;
use crate::artifacts::{LabelEncoder, StandardScaler};
use crate::models::{FeatureValue, FeatureVector, FEATURE_COUNT};
use tracing::warn;

/// Code substituted for categories the encoder has never seen
pub const UNKNOWN_CATEGORY_CODE: f64 = 0.0;

/// Result of transforming one feature vector
#[derive(Debug, Clone)]
pub struct TransformedRow {
    pub values: [f32; FEATURE_COUNT],
    /// Columns that fell back to [`UNKNOWN_CATEGORY_CODE`], including
    /// null slots
    pub encoding_fallbacks: Vec<&'static str>,
    /// Whether the scaler was configured but could not be applied
    pub scaling_fallback: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureTransformer;

impl FeatureTransformer {
    pub fn new() -> Self {
        Self
    }

    pub fn transform(
        &self,
        vector: &FeatureVector,
        encoder: &LabelEncoder,
        scaler: Option<&StandardScaler>,
    ) -> TransformedRow {
        let mut encoding_fallbacks = Vec::new();
        let mut numeric = [f64::NAN; FEATURE_COUNT];

        for (slot, (value, column)) in vector.values().iter().zip(FEATURE_COLUMNS.iter()).enumerate() {
            numeric[slot] = match value {
                FeatureValue::Number(n) => *n,
                FeatureValue::Missing => {
                    warn!(
                        column = column.name,
                        "No value supplied, falling back to code {}",
                        UNKNOWN_CATEGORY_CODE
                    );
                    encoding_fallbacks.push(column.name);
                    UNKNOWN_CATEGORY_CODE
                }
                FeatureValue::Category(category) => match encoder.encode(column.name, category) {
                    Ok(code) => f64::from(code),
                    Err(e) => {
                        warn!(
                            column = column.name,
                            value = %category,
                            error = %e,
                            "Unknown category, falling back to code {}",
                            UNKNOWN_CATEGORY_CODE
                        );
                        encoding_fallbacks.push(column.name);
                        UNKNOWN_CATEGORY_CODE
                    }
                },
            };
        }

        let mut scaling_fallback = false;
        if let Some(scaler) = scaler {
            match scaler.transform(&numeric) {
                Ok(scaled) => {
                    for (slot, v) in scaled.into_iter().enumerate() {
                        numeric[slot] = v;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Scaling failed, using unscaled features");
                    scaling_fallback = true;
                }
            }
        }

        TransformedRow {
            values: numeric.map(|v| v as f32),
            encoding_fallbacks,
            scaling_fallback,
        }
    }
}

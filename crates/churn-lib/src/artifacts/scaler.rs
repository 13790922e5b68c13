//! Standard (z-score) scaler for numeric columns

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ScaleError {
    #[error("scaler fitted on {expected} columns, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("scaling produced a non-finite value in column {column}")]
    NonFinite { column: usize },
}

#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Self {
        Self { mean, scale }
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }

    /// Apply `(x - mean) / scale` column-wise. NaN inputs pass through.
    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ScaleError> {
        if row.len() != self.mean.len() || row.len() != self.scale.len() {
            return Err(ScaleError::ShapeMismatch {
                expected: self.mean.len().min(self.scale.len()),
                actual: row.len(),
            });
        }

        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .enumerate()
            .map(|(column, (x, (mean, scale)))| {
                // sklearn treats zero-variance columns as unit scale
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                let scaled = (x - mean) / scale;
                if scaled.is_infinite() {
                    Err(ScaleError::NonFinite { column })
                } else {
                    Ok(scaled)
                }
            })
            .collect()
    }
}

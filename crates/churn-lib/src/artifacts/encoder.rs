//! Categorical label encoder

use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum EncodeError {
    #[error("unknown category {value:?} for column {column:?}")]
    UnknownCategory { column: String, value: String },
}

/// Maps category strings to the integer codes seen at training time.
///
/// A value's code is its index in the class list. Columns listed under
/// `columns` use their own class list; every other column uses the
/// shared `classes`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelEncoder {
    #[serde(default)]
    classes: Vec<String>,
    #[serde(default)]
    columns: HashMap<String, Vec<String>>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Self {
        Self {
            classes,
            columns: HashMap::new(),
        }
    }

    pub fn with_column(mut self, column: impl Into<String>, classes: Vec<String>) -> Self {
        self.columns.insert(column.into(), classes);
        self
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn encode(&self, column: &str, value: &str) -> Result<u32, EncodeError> {
        let classes = self.columns.get(column).unwrap_or(&self.classes);
        classes
            .iter()
            .position(|c| c == value)
            .map(|i| i as u32)
            .ok_or_else(|| EncodeError::UnknownCategory {
                column: column.to_string(),
                value: value.to_string(),
            })
    }

    pub fn class_count(&self) -> usize {
        self.classes.len() + self.columns.values().map(Vec::len).sum::<usize>()
    }
}

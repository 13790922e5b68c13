//! History query parameters and paging

use crate::models::{PredictionLabel, PredictionRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("invalid {field}: {value} is not an RFC 3339 timestamp")]
    InvalidDate { field: &'static str, value: String },

    #[error("invalid prediction filter: {0}")]
    InvalidPrediction(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Timestamp,
    Probability,
    Prediction,
}

impl SortField {
    /// Unrecognised names sort by timestamp
    pub fn parse(name: &str) -> Self {
        match name {
            "probability" => SortField::Probability,
            "prediction" => SortField::Prediction,
            _ => SortField::Timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Anything other than `desc` is ascending
    pub fn parse(name: &str) -> Self {
        if name == "desc" {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }
}

/// Filter, sort and page selection for a user's history
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryQuery {
    pub prediction: Option<PredictionLabel>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub min_probability: Option<f64>,
    pub max_probability: Option<f64>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    /// 1-based
    pub page: usize,
    pub limit: usize,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            prediction: None,
            start_date: None,
            end_date: None,
            min_probability: None,
            max_probability: None,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl HistoryQuery {
    pub fn matches(&self, record: &PredictionRecord) -> bool {
        if self.prediction.is_some_and(|p| p != record.prediction) {
            return false;
        }
        if self.start_date.is_some_and(|start| record.timestamp < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| record.timestamp > end) {
            return false;
        }
        if self.min_probability.is_some_and(|min| record.probability < min) {
            return false;
        }
        if self.max_probability.is_some_and(|max| record.probability > max) {
            return false;
        }
        true
    }

    /// Ordering for the selected sort; ties fall back to timestamp then id
    pub fn compare(&self, a: &PredictionRecord, b: &PredictionRecord) -> Ordering {
        let primary = match self.sort_by {
            SortField::Timestamp => a.timestamp.cmp(&b.timestamp),
            SortField::Probability => a
                .probability
                .partial_cmp(&b.probability)
                .unwrap_or(Ordering::Equal),
            SortField::Prediction => a.prediction.as_str().cmp(b.prediction.as_str()),
        };
        let ordering = primary
            .then_with(|| a.timestamp.cmp(&b.timestamp))
            .then_with(|| a.id.cmp(&b.id));

        match self.sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }

    pub fn page(&self) -> usize {
        self.page.max(1)
    }

    pub fn limit(&self) -> usize {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> usize {
        (self.page() - 1).saturating_mul(self.limit())
    }

    /// Filter, sort and slice `records` into a page
    pub fn apply(&self, mut records: Vec<PredictionRecord>) -> HistoryPage {
        records.retain(|r| self.matches(r));
        let total = records.len();
        records.sort_by(|a, b| self.compare(a, b));
        let predictions = records
            .into_iter()
            .skip(self.offset())
            .take(self.limit())
            .collect();
        HistoryPage { predictions, total }
    }
}

/// Raw query-string parameters, as sent by HTTP callers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub prediction: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub min_probability: Option<f64>,
    pub max_probability: Option<f64>,
}

fn parse_date(field: &'static str, value: Option<String>) -> Result<Option<DateTime<Utc>>, QueryError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|d| Some(d.with_timezone(&Utc)))
            .map_err(|_| QueryError::InvalidDate {
                field,
                value: raw.to_string(),
            }),
    }
}

impl TryFrom<HistoryParams> for HistoryQuery {
    type Error = QueryError;

    fn try_from(params: HistoryParams) -> Result<Self, Self::Error> {
        let prediction = match params.prediction.as_deref() {
            None | Some("") | Some("All") => None,
            Some(label) => Some(
                label
                    .parse::<PredictionLabel>()
                    .map_err(|_| QueryError::InvalidPrediction(label.to_string()))?,
            ),
        };

        Ok(Self {
            prediction,
            start_date: parse_date("startDate", params.start_date)?,
            end_date: parse_date("endDate", params.end_date)?,
            min_probability: params.min_probability,
            max_probability: params.max_probability,
            sort_by: params
                .sort_by
                .as_deref()
                .map(SortField::parse)
                .unwrap_or_default(),
            sort_order: params
                .sort_order
                .as_deref()
                .map(SortOrder::parse)
                .unwrap_or_default(),
            page: params.page.unwrap_or(1),
            limit: params.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        })
    }
}

/// One page of history plus the unpaged match count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub predictions: Vec<PredictionRecord>,
    pub total: usize,
}

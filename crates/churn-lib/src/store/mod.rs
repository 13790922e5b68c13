//! Prediction record storage
//!
//! The prediction pipeline only ever calls [`PredictionStore::save`];
//! history, dashboard and purge operations serve the HTTP surface.

mod memory;
mod query;
mod stats;

pub use memory::InMemoryStore;
pub use query::{
    HistoryPage, HistoryParams, HistoryQuery, QueryError, SortField, SortOrder,
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use stats::{DashboardStats, DEFAULT_HIGH_RISK_THRESHOLD};

use crate::error::StoreError;
use crate::models::PredictionRecord;
use async_trait::async_trait;

#[async_trait]
pub trait PredictionStore: Send + Sync {
    /// Durably record a prediction
    async fn save(&self, record: &PredictionRecord) -> Result<(), StoreError>;

    /// Filtered, sorted and paged history of one user
    async fn find_by_user(&self, user_id: &str, query: &HistoryQuery)
        -> Result<HistoryPage, StoreError>;

    /// Every record of one user, newest first
    async fn all_for_user(&self, user_id: &str) -> Result<Vec<PredictionRecord>, StoreError>;

    /// Delete every record of every user, returning how many were removed
    async fn purge(&self) -> Result<u64, StoreError>;

    /// Number of records currently held
    async fn count(&self) -> Result<usize, StoreError>;
}

//! Churn prediction library
//!
//! This crate provides the core functionality for:
//! - Loading and hot-swapping the classifier, encoder and scaler artifacts
//! - Mapping loosely-typed customer records onto the training schema
//! - Scoring, risk banding and heuristic factor attribution
//! - Prediction history storage and dashboard aggregates
//! - High-risk notifications
//! - Health checks and observability

pub mod artifacts;
pub mod error;
pub mod health;
pub mod models;
pub mod notify;
pub mod observability;
pub mod predictor;
pub mod service;
pub mod store;

pub use error::{ArtifactError, ArtifactKind, PredictError, StoreError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ChurnMetrics, StructuredLogger};
pub use service::PredictionService;

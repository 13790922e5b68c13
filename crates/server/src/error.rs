//! API error handling and the response envelope

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use churn_lib::notify::SettingsError;
use churn_lib::store::QueryError;
use churn_lib::{PredictError, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Body shape shared by every `/api` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(error.into()),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("ML models not loaded")]
    ModelNotReady,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Admin access required")]
    Forbidden,

    #[error("Endpoint not found")]
    NotFound,

    #[error("{public}")]
    Internal { public: &'static str, detail: String },
}

impl ApiError {
    pub fn internal(public: &'static str, detail: impl std::fmt::Display) -> Self {
        ApiError::Internal {
            public,
            detail: detail.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ModelNotReady => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal { public, detail } = &self {
            tracing::error!(error = %detail, "{}", public);
        }
        let status = self.status();
        (status, ApiResponse::failure(self.to_string())).into_response()
    }
}

impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::ModelNotReady => ApiError::ModelNotReady,
            PredictError::Validation { .. } => ApiError::BadRequest(err.to_string()),
            PredictError::Inference(detail) => ApiError::internal("Prediction failed", detail),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::internal("Storage error occurred", err)
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<SettingsError> for ApiError {
    fn from(err: SettingsError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(PredictError::ModelNotReady).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        let validation = ApiError::from(PredictError::Validation {
            missing: vec!["tenure".to_string()],
        });
        assert_eq!(validation.status(), StatusCode::BAD_REQUEST);
        assert_eq!(validation.to_string(), "Missing required fields: tenure");
        assert_eq!(
            ApiError::from(PredictError::Inference("nan".to_string())).to_string(),
            "Prediction failed"
        );
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_envelope_skips_empty_fields() {
        let body = serde_json::to_value(ApiResponse::failure("nope")).unwrap();
        assert_eq!(body, serde_json::json!({"success": false, "error": "nope"}));

        let body = serde_json::to_value(ApiResponse::ok(3).with_message("done")).unwrap();
        assert_eq!(body, serde_json::json!({"success": true, "data": 3, "message": "done"}));
    }
}

//! Error handling

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use perf_predict_core::ServiceError;
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Artifacts are not loaded yet
    #[error("Model components not loaded. Please check server logs.")]
    NotReady,

    /// Request omits schema features
    #[error("Missing required features: {}", .0.join(", "))]
    MissingFeatures(Vec<String>),

    /// Schema features present but not numbers
    #[error("Features must be numbers: {}", .0.join(", "))]
    NonNumeric(Vec<String>),

    /// Body is not a JSON object
    #[error("{}", .0.body_text())]
    Json(#[from] JsonRejection),

    #[error("Prediction failed: {0}")]
    Prediction(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            AppError::MissingFeatures(_) | AppError::NonNumeric(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Json(rejection) => rejection.status(),
            AppError::Prediction(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            AppError::Prediction(msg) => tracing::error!("Prediction error: {}", msg),
            AppError::Internal(msg) => tracing::error!("Internal error: {}", msg),
            _ => {}
        }

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotReady => AppError::NotReady,
            other => AppError::Prediction(other.to_string()),
        }
    }
}

impl From<prometheus::Error> for AppError {
    fn from(err: prometheus::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_mapping() {
        assert_eq!(AppError::from(ServiceError::NotReady).status(), StatusCode::SERVICE_UNAVAILABLE);

        let err = AppError::from(ServiceError::MissingFeature("feat3".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Prediction failed: missing feature 'feat3'");
    }

    #[test]
    fn test_missing_features_message() {
        let err = AppError::MissingFeatures(vec!["feat2".into(), "feat9".into()]);
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.to_string(), "Missing required features: feat2, feat9");
    }
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use multiplex_core::AppError;

use crate::dto::ErrorResponse;

/// Wrapper so we can implement `IntoResponse` for `AppError`.
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self.0 {
            AppError::SerializationError(_) => (StatusCode::BAD_REQUEST, "serialization_error"),
            AppError::InvalidJobId(_) => (StatusCode::BAD_REQUEST, "invalid_job_id"),
            err if err.is_validation() => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::RateLimitExceeded => (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::StorageError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let message = match &self.0 {
            AppError::SerializationError(e) => {
                format!("Request body should be a JSON encoded array of strings: {e}")
            }
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}

//! HTTP error handling.
//!
//! Wraps [`AppError`] in a newtype implementing `IntoResponse` so handlers
//! can use `?` and still produce structured JSON error bodies. Response
//! shape and status codes come from the error's [`ErrorMetadata`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use conveyor_core::{AppError, ErrorMetadata, LogLevel, ValidationError};
use conveyor_storage::StorageError;

/// Structured error payload returned to clients.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,

    /// Detailed error information including the cause chain.
    /// Hidden in production for sensitive errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// Error type name for programmatic handling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,

    /// Machine-readable error code (e.g. "FILE_TOO_LARGE")
    pub code: String,

    /// Whether retrying the request may succeed
    pub recoverable: bool,

    /// Suggested next step for the client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// Newtype wrapper so we can implement `IntoResponse` for `AppError`
/// (orphan rule: both the trait and the error type live in other crates).
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::from(err))
    }
}

impl From<ValidationError> for HttpAppError {
    fn from(err: ValidationError) -> Self {
        HttpAppError(AppError::Validation(err))
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        let app_error = match err {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::InvalidName(msg) => AppError::InvalidInput(msg),
            StorageError::IoError(e) => AppError::Internal(format!("IO error: {}", e)),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
            other => AppError::Storage(other.to_string()),
        };
        HttpAppError(app_error)
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => tracing::debug!(error = %error, error_type, "Request failed"),
        LogLevel::Warn => tracing::warn!(error = %error, error_type, "Request failed"),
        LogLevel::Error => tracing::error!(error = %error, error_type, "Request failed"),
    }
}

fn is_production_env() -> bool {
    let environment = std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
        .to_lowercase();
    matches!(environment.as_str(), "production" | "prod")
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let HttpAppError(app_error) = self;

        log_error(&app_error);

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let hide_details = is_production_env() && app_error.is_sensitive();
        let details = if hide_details {
            None
        } else {
            Some(app_error.detailed_message())
        };

        let body = ErrorResponse {
            error: app_error.client_message(),
            details,
            error_type: Some(app_error.error_type().to_string()),
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
            suggested_action: app_error.suggested_action().map(String::from),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_storage_not_found() {
        let storage_err = StorageError::NotFound("object missing".to_string());
        let HttpAppError(app_err) = storage_err.into();
        assert!(matches!(app_err, AppError::NotFound(_)));
        assert_eq!(app_err.http_status_code(), 404);
    }

    #[test]
    fn test_from_storage_invalid_name() {
        let storage_err = StorageError::InvalidName("bad name".to_string());
        let HttpAppError(app_err) = storage_err.into();
        assert!(matches!(app_err, AppError::InvalidInput(_)));
        assert_eq!(app_err.http_status_code(), 400);
    }

    #[test]
    fn test_from_storage_upload_failed() {
        let storage_err = StorageError::UploadFailed("connection reset".to_string());
        let HttpAppError(app_err) = storage_err.into();
        assert!(matches!(app_err, AppError::Storage(_)));
        assert_eq!(app_err.http_status_code(), 500);
        assert!(app_err.is_recoverable());
    }

    #[test]
    fn test_from_validation_error_preserves_status() {
        let err = ValidationError::FileTooLarge { size: 10, max: 5 };
        let HttpAppError(app_err) = err.into();
        assert_eq!(app_err.http_status_code(), 413);
    }

    #[test]
    fn test_error_response_shape() {
        let response = ErrorResponse {
            error: "File not found".to_string(),
            details: None,
            error_type: Some("NotFound".to_string()),
            code: "NOT_FOUND".to_string(),
            recoverable: false,
            suggested_action: Some("Verify the resource ID exists".to_string()),
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["error"], "File not found");
        assert_eq!(value["code"], "NOT_FOUND");
        assert_eq!(value["recoverable"], false);
        // None fields are omitted entirely
        assert!(value.get("details").is_none());
    }
}

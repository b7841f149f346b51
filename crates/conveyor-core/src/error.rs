//! Unified error taxonomy.
//!
//! Every fallible path in the service funnels into [`AppError`]. The
//! [`ErrorMetadata`] trait lets each variant describe its own HTTP status,
//! machine code, and logging treatment, so the HTTP layer never matches on
//! variants directly.

use std::io;

use sqlx::Error as SqlxError;

use crate::validation::ValidationError;

/// Severity used when an error is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected client mistakes (validation, missing resources).
    Debug,
    /// Degraded but tolerable conditions.
    Warn,
    /// Unexpected failures that need attention.
    Error,
}

/// How an error presents itself to clients and logs.
pub trait ErrorMetadata {
    /// HTTP status code to respond with.
    fn http_status_code(&self) -> u16;

    /// Stable machine-readable code, e.g. `"FILE_TOO_LARGE"`.
    fn error_code(&self) -> &'static str;

    /// Whether a retry of the same request could succeed.
    fn is_recoverable(&self) -> bool;

    /// Optional hint for the client's next step.
    fn suggested_action(&self) -> Option<&'static str>;

    /// Message safe to show to clients.
    fn client_message(&self) -> String;

    /// Whether internals must be stripped from production responses.
    fn is_sensitive(&self) -> bool;

    /// Severity to log this error at.
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}

/// Per-variant presentation facts, resolved once per error.
/// `client_message` stays on the trait impl because it needs the payload.
struct Presentation {
    status: u16,
    code: &'static str,
    recoverable: bool,
    action: Option<&'static str>,
    sensitive: bool,
    level: LogLevel,
}

fn presentation(err: &AppError) -> Presentation {
    match err {
        AppError::Database(_) => Presentation {
            status: 500,
            code: "DATABASE_ERROR",
            recoverable: true,
            action: Some("Retry after a short delay"),
            sensitive: true,
            level: LogLevel::Error,
        },
        AppError::Storage(_) => Presentation {
            status: 500,
            code: "STORAGE_ERROR",
            recoverable: true,
            action: Some("Retry after a short delay"),
            sensitive: true,
            level: LogLevel::Error,
        },
        AppError::Validation(ValidationError::FileTooLarge { .. }) => Presentation {
            status: 413,
            code: "FILE_TOO_LARGE",
            recoverable: false,
            action: Some("Reduce the file size and try again"),
            sensitive: false,
            level: LogLevel::Debug,
        },
        AppError::Validation(ValidationError::ExtensionNotAllowed { .. }) => Presentation {
            status: 400,
            code: "EXTENSION_NOT_ALLOWED",
            recoverable: false,
            action: Some("Upload one of the allowed file types"),
            sensitive: false,
            level: LogLevel::Debug,
        },
        AppError::Validation(_) => Presentation {
            status: 400,
            code: "INVALID_FILENAME",
            recoverable: false,
            action: Some("Provide a filename with an allowed extension"),
            sensitive: false,
            level: LogLevel::Debug,
        },
        AppError::InvalidInput(_) => Presentation {
            status: 400,
            code: "INVALID_INPUT",
            recoverable: false,
            action: Some("Check the request body and try again"),
            sensitive: false,
            level: LogLevel::Debug,
        },
        AppError::InvalidQuery(_) => Presentation {
            status: 422,
            code: "INVALID_QUERY",
            recoverable: false,
            action: Some("Check query parameters and try again"),
            sensitive: false,
            level: LogLevel::Debug,
        },
        AppError::NotFound(_) => Presentation {
            status: 404,
            code: "NOT_FOUND",
            recoverable: false,
            action: Some("Verify the resource ID exists"),
            sensitive: false,
            level: LogLevel::Debug,
        },
        AppError::Internal(_) | AppError::InternalWithSource { .. } => Presentation {
            status: 500,
            code: "INTERNAL_ERROR",
            recoverable: true,
            action: Some("Retry after a short delay"),
            sensitive: true,
            level: LogLevel::Error,
        },
    }
}

impl AppError {
    /// Variant name, for structured log fields and error bodies.
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::Validation(_) => "Validation",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::InvalidQuery(_) => "InvalidQuery",
            AppError::NotFound(_) => "NotFound",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Render the error with its cause chain, deepest last.
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(cause) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", cause));
            source = cause.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        presentation(self).status
    }

    fn error_code(&self) -> &'static str {
        presentation(self).code
    }

    fn is_recoverable(&self) -> bool {
        presentation(self).recoverable
    }

    fn suggested_action(&self) -> Option<&'static str> {
        presentation(self).action
    }

    fn is_sensitive(&self) -> bool {
        presentation(self).sensitive
    }

    fn log_level(&self) -> LogLevel {
        presentation(self).level
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Validation(err) => err.to_string(),
            AppError::InvalidInput(msg)
            | AppError::InvalidQuery(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_error_presentation() {
        let err = AppError::from(sqlx::Error::PoolClosed);
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Failed to access database");
        assert!(err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_file_too_large_presentation() {
        let err = AppError::from(ValidationError::FileTooLarge {
            size: 200,
            max: 100,
        });
        assert_eq!(err.http_status_code(), 413);
        assert_eq!(err.error_code(), "FILE_TOO_LARGE");
        assert!(!err.is_recoverable());
        assert!(err.client_message().contains("200"));
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_extension_not_allowed_shows_extension() {
        let err = AppError::from(ValidationError::ExtensionNotAllowed {
            extension: "exe".to_string(),
            allowed: vec!["jpg".to_string()],
        });
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "EXTENSION_NOT_ALLOWED");
        assert!(err.client_message().contains("exe"));
        assert!(!err.is_sensitive());
    }

    #[test]
    fn test_not_found_passes_message_through() {
        let err = AppError::NotFound("File not found".to_string());
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "File not found");
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_invalid_query_maps_to_422() {
        let err = AppError::InvalidQuery("page must be >= 1".to_string());
        assert_eq!(err.http_status_code(), 422);
        assert_eq!(err.error_code(), "INVALID_QUERY");
        assert_eq!(err.client_message(), "page must be >= 1");
    }

    #[test]
    fn test_internal_hides_details_from_client() {
        let err = AppError::Internal("connection refused on 10.0.0.3".to_string());
        assert_eq!(err.client_message(), "Internal server error");
        assert!(err.is_sensitive());
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let source = anyhow::anyhow!("disk full").context("staging write failed");
        let err = AppError::InternalWithSource {
            message: "upload admission failed".to_string(),
            source,
        };
        let details = err.detailed_message();
        assert!(details.contains("Caused by:"));
        assert!(details.contains("staging write failed"));
    }
}

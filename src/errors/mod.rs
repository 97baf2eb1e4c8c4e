//! Error handling module for the journal query layer.
//!
//! Provides the caller-facing error type with mapping to HTTP status codes and
//! response envelopes, plus the error type collaborators report.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const COLLABORATOR_UNAVAILABLE: &str = "COLLABORATOR_UNAVAILABLE";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed input: blank identifiers, bad page bounds, unknown locale syntax.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),
    /// A collaborator failed and the failure policy says to surface it.
    #[error("{operation} failed: {message}")]
    CollaboratorUnavailable {
        operation: &'static str,
        message: String,
    },
    /// Database error outside of a collaborator call (pool setup, writes)
    #[error("database error: {0}")]
    Database(String),
    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::CollaboratorUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidArgument(_) => codes::INVALID_ARGUMENT,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::CollaboratorUnavailable { .. } => codes::COLLABORATOR_UNAVAILABLE,
            AppError::Database(_) => codes::DATABASE_ERROR,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::InvalidArgument(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::CollaboratorUnavailable { operation, message } => {
                format!("{} failed: {}", operation, message)
            }
            AppError::Database(msg) => msg.clone(),
            AppError::Internal(msg) => msg.clone(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        AppError::InvalidArgument(msg.into())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Database(format!("Database error: {}", err))
    }
}

/// Failure reported by a repository, tagging or locale collaborator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CollaboratorError {
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
    #[error("{operation} cancelled")]
    Cancelled { operation: &'static str },
    #[error("{0}")]
    Unavailable(String),
}

impl CollaboratorError {
    /// Timeouts and cancellations stop the rest of the query; plain failures don't.
    pub fn is_interruption(&self) -> bool {
        matches!(
            self,
            CollaboratorError::Timeout { .. } | CollaboratorError::Cancelled { .. }
        )
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        CollaboratorError::Unavailable(msg.into())
    }
}

impl From<sqlx::Error> for CollaboratorError {
    fn from(err: sqlx::Error) -> Self {
        CollaboratorError::Unavailable(format!("database error: {}", err))
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::new(&self);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_argument_maps_to_bad_request() {
        let err = AppError::invalid("groupId must be positive");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), codes::INVALID_ARGUMENT);
        assert_eq!(err.message(), "groupId must be positive");
    }

    #[test]
    fn collaborator_message_names_operation() {
        let err = AppError::CollaboratorUnavailable {
            operation: "fetch_matching",
            message: "connection refused".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.message(), "fetch_matching failed: connection refused");
    }

    #[test]
    fn only_timeouts_and_cancellations_interrupt() {
        let timeout = CollaboratorError::Timeout {
            operation: "find_tags_by_name",
            after: Duration::from_millis(10),
        };
        assert!(timeout.is_interruption());
        assert!(CollaboratorError::Cancelled { operation: "fetch_all" }.is_interruption());
        assert!(!CollaboratorError::unavailable("boom").is_interruption());
    }
}

//! # HTTP API Errors
//!
//! Every refusal leaves the API as `{error, code, kind}`: the message, the
//! HTTP status and the error kind from the core taxonomy.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::error::{ErrorKind, LibraryError};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// HTTP API errors
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The core refused the operation
    #[error("{details}")]
    Rejected { kind: ErrorKind, details: String },

    // ==================
    // Request shape
    // ==================
    /// Body missing, not JSON, or the wrong JSON type
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Path id list with a non-integer entry
    #[error("Invalid id list '{0}'")]
    InvalidIds(String),

    // ==================
    // Lookups
    // ==================
    #[error("No songs found for book {0}")]
    NoSongs(String),

    /// Book grouping only exists for songs
    #[error("{0} are not grouped by book")]
    NotGrouped(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Rejected { kind, .. } => *kind,
            ApiError::InvalidBody(_) | ApiError::InvalidIds(_) => ErrorKind::ValidationFailed,
            ApiError::NoSongs(_) | ApiError::NotGrouped(_) => ErrorKind::NotFound,
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::ValidationFailed => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::DuplicateKey => StatusCode::CONFLICT,
            ErrorKind::StorageUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Count and log a request refused before it reached the core
    pub fn reject(self, metrics: &MetricsRegistry) -> Self {
        metrics.increment_requests_rejected();
        log_event_with_fields(
            Event::RequestRejected,
            &[("kind", self.kind().as_str()), ("details", &self.to_string())],
        );
        self
    }
}

impl From<LibraryError> for ApiError {
    fn from(err: LibraryError) -> Self {
        ApiError::Rejected {
            kind: err.kind(),
            details: err.to_string(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    pub kind: ErrorKind,
}

impl From<ApiError> for ErrorResponse {
    fn from(err: ApiError) -> Self {
        Self {
            code: err.status_code().as_u16(),
            kind: err.kind(),
            error: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse::from(self));
        (status, body).into_response()
    }
}

//! # Library Errors
//!
//! The four-way error taxonomy shared by the allocator, the record stores,
//! the bulk runner and the reporter.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::records::EntityKind;

/// Result type for library operations
pub type LibraryResult<T> = Result<T, LibraryError>;

/// Coarse classification of a failure.
///
/// This is what bulk reports carry per failed item and what the HTTP layer
/// maps to a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Missing or malformed input; the caller can fix and retry
    ValidationFailed,
    /// Target id absent
    NotFound,
    /// Natural key, unique field or id collision
    DuplicateKey,
    /// Backing store unreachable; aborts the in-flight call
    StorageUnavailable,
}

impl ErrorKind {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationFailed => "VALIDATION_FAILED",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::DuplicateKey => "DUPLICATE_KEY",
            ErrorKind::StorageUnavailable => "STORAGE_UNAVAILABLE",
        }
    }

    /// Whether this kind aborts the rest of a batch
    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorKind::StorageUnavailable)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Library errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LibraryError {
    /// Missing or malformed required field
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// No record with this id
    #[error("{} {} not found", .kind.singular(), .id)]
    NotFound { kind: EntityKind, id: u64 },

    /// Unique constraint violated
    #[error("Duplicate record: {field} '{value}' already exists")]
    DuplicateKey { field: String, value: String },

    /// Backing store cannot be reached
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl LibraryError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationFailed(msg.into())
    }

    /// Create a storage error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::StorageUnavailable(msg.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationFailed(_) => ErrorKind::ValidationFailed,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            Self::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            LibraryError::validation("title is required").kind(),
            ErrorKind::ValidationFailed
        );
        assert_eq!(
            LibraryError::NotFound {
                kind: EntityKind::Songs,
                id: 3
            }
            .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            LibraryError::unavailable("lock poisoned").kind(),
            ErrorKind::StorageUnavailable
        );
    }

    #[test]
    fn test_only_storage_is_fatal() {
        assert!(ErrorKind::StorageUnavailable.is_fatal());
        assert!(!ErrorKind::DuplicateKey.is_fatal());
        assert!(!ErrorKind::NotFound.is_fatal());
        assert!(!ErrorKind::ValidationFailed.is_fatal());
    }

    #[test]
    fn test_display() {
        let err = LibraryError::NotFound {
            kind: EntityKind::Books,
            id: 12,
        };
        assert_eq!(err.to_string(), "Book 12 not found");

        let err = LibraryError::DuplicateKey {
            field: "title".to_string(),
            value: "Amazing Grace".to_string(),
        };
        assert!(err.to_string().contains("title 'Amazing Grace'"));
    }

    #[test]
    fn test_kind_serializes_screaming() {
        let json = serde_json::to_value(ErrorKind::DuplicateKey).unwrap();
        assert_eq!(json, "DUPLICATE_KEY");
    }
}

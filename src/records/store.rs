//! # Record Store
//!
//! Persistence interface consumed by the core, one store per entity kind.
//!
//! Raw storage failures are classified into `StoreError` here and converted
//! to the library taxonomy exactly once, via `From<StoreError>`. Nothing above
//! this layer inspects storage-specific error details.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use thiserror::Error;

use super::kind::EntityKind;
use super::record::{NewRecord, Record};
use crate::error::LibraryError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store boundary errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Unique constraint violated
    #[error("duplicate {field} '{value}'")]
    Duplicate { field: String, value: String },

    /// Attempt to change a field the store never rewrites
    #[error("{0} is immutable")]
    ImmutableField(String),

    /// Backing storage cannot be reached
    #[error("{0}")]
    Unavailable(String),
}

impl From<StoreError> for LibraryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { field, value } => LibraryError::DuplicateKey { field, value },
            StoreError::ImmutableField(field) => {
                LibraryError::ValidationFailed(format!("{} is immutable", field))
            }
            StoreError::Unavailable(msg) => LibraryError::StorageUnavailable(msg),
        }
    }
}

/// Record store trait for one entity kind
pub trait RecordStore: Send + Sync {
    /// Kind this store holds
    fn kind(&self) -> EntityKind;

    /// Get a single record by id
    fn find_by_key(&self, id: u64) -> StoreResult<Option<Record>>;

    /// Get every record whose id is in `ids`, ordered by id.
    /// Missing ids are omitted.
    fn find_by_key_set(&self, ids: &BTreeSet<u64>) -> StoreResult<Vec<Record>>;

    /// Get every record whose `field` equals one of `values`, ordered by id
    fn find_by_field(&self, field: &str, values: &[Value]) -> StoreResult<Vec<Record>>;

    /// Fail with `Duplicate` when a unique field in `fields` is already
    /// owned by a stored record, using the same comparison as `insert`
    fn check_unique(&self, fields: &Map<String, Value>) -> StoreResult<()>;

    /// All records, ordered by id
    fn list(&self) -> StoreResult<Vec<Record>>;

    /// Insert a record, stamping `created` and `updated`.
    ///
    /// Fails with `Duplicate` when the id or any unique field collides.
    fn insert(&self, record: NewRecord) -> StoreResult<Record>;

    /// Merge `partial` into record `id`, stamping `updated`.
    ///
    /// `Ok(None)` means the record does not exist.
    fn update_by_key(&self, id: u64, partial: Map<String, Value>) -> StoreResult<Option<Record>>;

    /// Delete record `id`; returns the number of records removed (0 or 1)
    fn delete_by_key(&self, id: u64) -> StoreResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_classification_at_boundary() {
        let dup: LibraryError = StoreError::Duplicate {
            field: "title".to_string(),
            value: "A".to_string(),
        }
        .into();
        assert_eq!(dup.kind(), ErrorKind::DuplicateKey);

        let immutable: LibraryError = StoreError::ImmutableField("songId".to_string()).into();
        assert_eq!(immutable.kind(), ErrorKind::ValidationFailed);

        let down: LibraryError = StoreError::Unavailable("lock poisoned".to_string()).into();
        assert_eq!(down.kind(), ErrorKind::StorageUnavailable);
    }
}

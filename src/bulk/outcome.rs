//! # Bulk Outcomes
//!
//! Per-item results of a bulk run and the aggregate that holds them.

use std::fmt;

use serde_json::{json, Value};

use crate::error::{ErrorKind, LibraryError, LibraryResult};
use crate::records::{EntityKind, Record};

/// Which mutation a batch applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOperation {
    Create,
    Update,
    Delete,
}

impl BulkOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkOperation::Create => "create",
            BulkOperation::Update => "update",
            BulkOperation::Delete => "delete",
        }
    }
}

impl fmt::Display for BulkOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a successful item did
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// Record created or updated
    Stored(Record),
    /// Record removed
    Deleted { kind: EntityKind, id: u64 },
}

impl Applied {
    pub fn record(&self) -> Option<&Record> {
        match self {
            Applied::Stored(record) => Some(record),
            Applied::Deleted { .. } => None,
        }
    }

    pub fn into_record(self) -> Option<Record> {
        match self {
            Applied::Stored(record) => Some(record),
            Applied::Deleted { .. } => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Applied::Stored(record) => record.to_json(),
            Applied::Deleted { kind, id } => json!({ kind.id_field(): id, "deleted": true }),
        }
    }
}

/// Outcome of one input item
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutcome {
    /// Position in the input batch
    pub index: usize,
    /// Target id, when the item named or was assigned one
    pub id: Option<u64>,
    pub result: LibraryResult<Applied>,
}

impl ItemOutcome {
    pub fn success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.result.as_ref().err().map(LibraryError::kind)
    }
}

/// Every item outcome of one batch, in input order
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOutcome {
    pub kind: EntityKind,
    pub operation: BulkOperation,
    pub outcomes: Vec<ItemOutcome>,
    /// Reason the batch stopped early, if storage went away
    pub aborted: Option<String>,
}

impl BulkOutcome {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Successful items, in input order
    pub fn succeeded(&self) -> impl Iterator<Item = &Applied> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    /// Failed items as `(index, kind)`, in input order
    pub fn failed(&self) -> Vec<(usize, ErrorKind)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.error_kind().map(|kind| (o.index, kind)))
            .collect()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.len() - self.success_count()
    }

    /// Collapse a one-item batch to that item's result
    pub fn into_single(self) -> LibraryResult<Applied> {
        match self.outcomes.into_iter().next() {
            Some(outcome) => outcome.result,
            None => Err(LibraryError::validation("empty batch")),
        }
    }
}

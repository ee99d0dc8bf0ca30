//! # Bulk Operation Runner
//!
//! Applies an ordered batch of creates, updates or deletes for one kind.
//!
//! Items run one at a time, in input order. A bad item yields a failed
//! outcome and the loop moves on.
//!
//! Creates check the kind's unique fields against the store before taking
//! an id, so a known duplicate leaves the counter alone. The store's own
//! constraint still decides; an insert that loses a race after allocation
//! keeps its id consumed. Only `StorageUnavailable` stops the loop:
//! every item not yet processed then gets that same failure, while outcomes
//! already produced stay as they are. Nothing is rolled back.

use serde_json::Value;

use super::outcome::{Applied, BulkOperation, BulkOutcome, ItemOutcome};
use crate::error::{LibraryError, LibraryResult};
use crate::records::{EntityKind, NewRecord, RecordStore};
use crate::sequence::SequenceAllocator;

/// One item of a bulk update
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    /// Target id; `None` when the payload did not carry a usable one
    pub id: Option<u64>,
    pub fields: Value,
}

impl UpdateRequest {
    pub fn new(id: u64, fields: Value) -> Self {
        Self {
            id: Some(id),
            fields,
        }
    }

    /// Split a bulk-update payload into target id and fields.
    ///
    /// The kind's id field is taken out of the payload; a missing or
    /// non-integer id leaves `id` empty for the runner to reject.
    pub fn from_payload(kind: EntityKind, mut payload: Value) -> Self {
        let id = payload
            .as_object_mut()
            .and_then(|obj| obj.remove(kind.id_field()))
            .and_then(|v| v.as_u64());
        Self {
            id,
            fields: payload,
        }
    }
}

/// Runs batches against one kind's store and the shared allocator
pub struct BulkOperationRunner<'a> {
    kind: EntityKind,
    allocator: &'a SequenceAllocator,
    store: &'a dyn RecordStore,
}

impl<'a> BulkOperationRunner<'a> {
    pub fn new(
        kind: EntityKind,
        allocator: &'a SequenceAllocator,
        store: &'a dyn RecordStore,
    ) -> Self {
        Self {
            kind,
            allocator,
            store,
        }
    }

    /// Create one record per payload
    pub fn create(&self, items: Vec<Value>) -> BulkOutcome {
        self.run(BulkOperation::Create, items, |_| None, |item| self.create_item(item))
    }

    /// Apply each partial update to its target id
    pub fn update(&self, items: Vec<UpdateRequest>) -> BulkOutcome {
        self.run(
            BulkOperation::Update,
            items,
            |item| item.id,
            |item| self.update_item(item),
        )
    }

    /// Delete each id
    pub fn delete(&self, ids: Vec<u64>) -> BulkOutcome {
        self.run(BulkOperation::Delete, ids, |id| Some(*id), |id| self.delete_item(id))
    }

    fn run<T, K, F>(
        &self,
        operation: BulkOperation,
        items: Vec<T>,
        target: K,
        mut apply: F,
    ) -> BulkOutcome
    where
        K: Fn(&T) -> Option<u64>,
        F: FnMut(T) -> LibraryResult<Applied>,
    {
        let mut outcomes = Vec::with_capacity(items.len());
        let mut aborted: Option<String> = None;

        for (index, item) in items.into_iter().enumerate() {
            let id = target(&item);

            let result = match &aborted {
                Some(reason) => Err(LibraryError::unavailable(reason.clone())),
                None => apply(item),
            };

            if aborted.is_none() {
                if let Err(LibraryError::StorageUnavailable(reason)) = &result {
                    aborted = Some(reason.clone());
                }
            }

            let id = match &result {
                Ok(Applied::Stored(record)) => Some(record.id()),
                _ => id,
            };
            outcomes.push(ItemOutcome { index, id, result });
        }

        BulkOutcome {
            kind: self.kind,
            operation,
            outcomes,
            aborted,
        }
    }

    fn create_item(&self, payload: Value) -> LibraryResult<Applied> {
        let fields = self.kind.schema().prepare_create(payload)?;
        self.store.check_unique(&fields)?;
        let id = self.allocator.allocate(self.kind)?;
        let record = self.store.insert(NewRecord::new(self.kind, id, fields))?;
        Ok(Applied::Stored(record))
    }

    fn update_item(&self, item: UpdateRequest) -> LibraryResult<Applied> {
        let id = self.require_id(item.id)?;
        let fields = self.kind.schema().prepare_update(id, item.fields)?;
        self.store
            .update_by_key(id, fields)?
            .map(Applied::Stored)
            .ok_or(LibraryError::NotFound {
                kind: self.kind,
                id,
            })
    }

    fn delete_item(&self, id: u64) -> LibraryResult<Applied> {
        let id = self.require_id(Some(id))?;
        match self.store.delete_by_key(id)? {
            0 => Err(LibraryError::NotFound {
                kind: self.kind,
                id,
            }),
            _ => Ok(Applied::Deleted {
                kind: self.kind,
                id,
            }),
        }
    }

    fn require_id(&self, id: Option<u64>) -> LibraryResult<u64> {
        match id {
            Some(id) if id > 0 => Ok(id),
            _ => Err(LibraryError::validation(format!(
                "{} must be a positive integer",
                self.kind.id_field()
            ))),
        }
    }
}

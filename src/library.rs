//! # Library Service
//!
//! The operations the request layer calls. One `Library` owns the id
//! allocator, one record store per kind and the metrics registry.
//!
//! Single-item writes run as a one-element batch through the bulk runner
//! and are collapsed to that item's result, so both paths share the same
//! validation, id policy and error classification.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde_json::Value;

use crate::bulk::{
    Applied, BulkOperation, BulkOperationRunner, BulkOutcome, ItemOutcome, UpdateRequest,
};
use crate::clock::{Clock, SystemClock};
use crate::error::{ErrorKind, LibraryError, LibraryResult};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::records::{EntityKind, InMemoryRecordStore, Record, RecordStore};
use crate::sequence::{CounterSnapshot, CounterStore, InMemoryCounterStore, SequenceAllocator};

/// Field on songs naming the book they belong to
const SONG_BOOK_FIELD: &str = "book";

/// Record service over per-kind stores
pub struct Library {
    allocator: SequenceAllocator,
    stores: HashMap<EntityKind, Arc<dyn RecordStore>>,
    metrics: Arc<MetricsRegistry>,
}

impl Library {
    /// Build a library from a counter store and the record stores to serve.
    ///
    /// Kinds without a store answer every call with `StorageUnavailable`.
    pub fn new(counters: Arc<dyn CounterStore>, stores: Vec<Arc<dyn RecordStore>>) -> Self {
        let metrics = Arc::new(MetricsRegistry::new());
        Self {
            allocator: SequenceAllocator::new(counters).with_metrics(Arc::clone(&metrics)),
            stores: stores.into_iter().map(|s| (s.kind(), s)).collect(),
            metrics,
        }
    }

    /// All seven kinds held in memory, stamped by the wall clock
    pub fn in_memory() -> Self {
        Self::in_memory_with_clock(Arc::new(SystemClock))
    }

    pub fn in_memory_with_clock(clock: Arc<dyn Clock>) -> Self {
        let stores = EntityKind::ALL
            .iter()
            .map(|kind| {
                Arc::new(InMemoryRecordStore::with_clock(*kind, Arc::clone(&clock)))
                    as Arc<dyn RecordStore>
            })
            .collect();
        Self::new(Arc::new(InMemoryCounterStore::new()), stores)
    }

    /// Share an existing registry instead of the library's own
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.allocator = self.allocator.with_metrics(Arc::clone(&metrics));
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    fn store(&self, kind: EntityKind) -> LibraryResult<&dyn RecordStore> {
        self.stores
            .get(&kind)
            .map(|s| s.as_ref())
            .ok_or_else(|| LibraryError::unavailable(format!("no store configured for {}", kind)))
    }

    fn runner(&self, kind: EntityKind) -> LibraryResult<BulkOperationRunner<'_>> {
        Ok(BulkOperationRunner::new(kind, &self.allocator, self.store(kind)?))
    }

    // ==================================================================
    // Writes
    // ==================================================================

    /// Create one record; its id is allocated here
    pub fn create_one(&self, kind: EntityKind, fields: Value) -> LibraryResult<Record> {
        let outcome = self.create_batch(kind, vec![fields]);
        self.settle_single(outcome)?.into_record().ok_or_else(|| {
            LibraryError::unavailable(format!("{} create returned no record", kind))
        })
    }

    /// Create one record per payload, in order
    pub fn create_many(&self, kind: EntityKind, items: Vec<Value>) -> BulkOutcome {
        let outcome = self.create_batch(kind, items);
        self.settle_bulk(&outcome);
        outcome
    }

    /// Apply a partial update to `id`
    pub fn update_one(&self, kind: EntityKind, id: u64, fields: Value) -> LibraryResult<Record> {
        let outcome = self.update_batch(kind, vec![UpdateRequest::new(id, fields)]);
        self.settle_single(outcome)?.into_record().ok_or_else(|| {
            LibraryError::unavailable(format!("{} update returned no record", kind))
        })
    }

    pub fn update_many(&self, kind: EntityKind, items: Vec<UpdateRequest>) -> BulkOutcome {
        let outcome = self.update_batch(kind, items);
        self.settle_bulk(&outcome);
        outcome
    }

    pub fn delete_one(&self, kind: EntityKind, id: u64) -> LibraryResult<()> {
        let outcome = self.delete_batch(kind, vec![id]);
        self.settle_single(outcome).map(|_| ())
    }

    pub fn delete_many(&self, kind: EntityKind, ids: Vec<u64>) -> BulkOutcome {
        let outcome = self.delete_batch(kind, ids);
        self.settle_bulk(&outcome);
        outcome
    }

    /// Delete every song of `book` as one bulk batch.
    ///
    /// A book without songs is `NotFound`; the book record itself is left
    /// alone.
    pub fn delete_songs_by_book(&self, book: u64) -> LibraryResult<BulkOutcome> {
        let ids: Vec<u64> = self
            .songs_by_books(&[book])?
            .iter()
            .map(Record::id)
            .collect();
        if ids.is_empty() {
            return Err(LibraryError::NotFound {
                kind: EntityKind::Books,
                id: book,
            });
        }
        Ok(self.delete_many(EntityKind::Songs, ids))
    }

    fn create_batch(&self, kind: EntityKind, items: Vec<Value>) -> BulkOutcome {
        match self.runner(kind) {
            Ok(runner) => runner.create(items),
            Err(err) => unavailable_batch(kind, BulkOperation::Create, items.len(), &err),
        }
    }

    fn update_batch(&self, kind: EntityKind, items: Vec<UpdateRequest>) -> BulkOutcome {
        match self.runner(kind) {
            Ok(runner) => runner.update(items),
            Err(err) => unavailable_batch(kind, BulkOperation::Update, items.len(), &err),
        }
    }

    fn delete_batch(&self, kind: EntityKind, ids: Vec<u64>) -> BulkOutcome {
        match self.runner(kind) {
            Ok(runner) => runner.delete(ids),
            Err(err) => unavailable_batch(kind, BulkOperation::Delete, ids.len(), &err),
        }
    }

    // ==================================================================
    // Reads
    // ==================================================================

    pub fn get_one(&self, kind: EntityKind, id: u64) -> LibraryResult<Record> {
        self.store(kind)?
            .find_by_key(id)?
            .ok_or(LibraryError::NotFound { kind, id })
    }

    /// Records for a set of ids, ordered by id; missing ids are skipped
    pub fn get_many(&self, kind: EntityKind, ids: &BTreeSet<u64>) -> LibraryResult<Vec<Record>> {
        Ok(self.store(kind)?.find_by_key_set(ids)?)
    }

    pub fn list(&self, kind: EntityKind) -> LibraryResult<Vec<Record>> {
        Ok(self.store(kind)?.list()?)
    }

    /// Songs whose `book` is any of `books`, ordered by song id
    pub fn songs_by_books(&self, books: &[u64]) -> LibraryResult<Vec<Record>> {
        let values: Vec<Value> = books.iter().map(|b| Value::from(*b)).collect();
        Ok(self
            .store(EntityKind::Songs)?
            .find_by_field(SONG_BOOK_FIELD, &values)?)
    }

    // ==================================================================
    // Counters
    // ==================================================================

    /// The id the next create of `kind` would get
    pub fn next_id(&self, kind: EntityKind) -> LibraryResult<u64> {
        self.allocator.peek(kind)
    }

    /// Raise each counter to its floor; stops at the first refusal
    pub fn seed_counters(&self, floors: &[(EntityKind, u64)]) -> LibraryResult<()> {
        for (kind, floor) in floors {
            self.allocator.seed(*kind, *floor)?;
        }
        Ok(())
    }

    pub fn counters(&self) -> LibraryResult<Vec<CounterSnapshot>> {
        self.allocator.snapshot()
    }

    // ==================================================================
    // Accounting
    // ==================================================================

    fn settle_single(&self, outcome: BulkOutcome) -> LibraryResult<Applied> {
        self.count(&outcome);

        let kind = outcome.kind;
        let event = match outcome.operation {
            BulkOperation::Create => Event::RecordCreated,
            BulkOperation::Update => Event::RecordUpdated,
            BulkOperation::Delete => Event::RecordDeleted,
        };
        let id = outcome.outcomes.first().and_then(|o| o.id);

        let result = outcome.into_single();
        match &result {
            Ok(_) => {
                let id = id.unwrap_or_default().to_string();
                log_event_with_fields(event, &[("kind", kind.as_str()), ("id", &id)]);
            }
            Err(err) if err.kind() == ErrorKind::StorageUnavailable => {
                log_event_with_fields(
                    Event::StorageUnavailable,
                    &[("kind", kind.as_str()), ("reason", &err.to_string())],
                );
            }
            Err(_) => {}
        }
        result
    }

    fn settle_bulk(&self, outcome: &BulkOutcome) {
        self.count(outcome);
        self.metrics.increment_bulk_batches();

        let succeeded = outcome.success_count().to_string();
        let failed = outcome.failure_count().to_string();
        let fields = [
            ("kind", outcome.kind.as_str()),
            ("operation", outcome.operation.as_str()),
            ("succeeded", succeeded.as_str()),
            ("failed", failed.as_str()),
        ];

        match &outcome.aborted {
            Some(reason) => {
                self.metrics.increment_bulk_aborted();
                let mut fields = fields.to_vec();
                fields.push(("reason", reason.as_str()));
                log_event_with_fields(Event::BulkAborted, &fields);
            }
            None => log_event_with_fields(Event::BulkComplete, &fields),
        }
    }

    fn count(&self, outcome: &BulkOutcome) {
        let succeeded = outcome.success_count() as u64;
        match outcome.operation {
            BulkOperation::Create => self.metrics.add_created(succeeded),
            BulkOperation::Update => self.metrics.add_updated(succeeded),
            BulkOperation::Delete => self.metrics.add_deleted(succeeded),
        }
        self.metrics.add_failures(outcome.failure_count() as u64);
    }
}

/// Every item failed because the kind's store is missing
fn unavailable_batch(
    kind: EntityKind,
    operation: BulkOperation,
    len: usize,
    err: &LibraryError,
) -> BulkOutcome {
    BulkOutcome {
        kind,
        operation,
        outcomes: (0..len)
            .map(|index| ItemOutcome {
                index,
                id: None,
                result: Err(err.clone()),
            })
            .collect(),
        aborted: Some(err.to_string()),
    }
}

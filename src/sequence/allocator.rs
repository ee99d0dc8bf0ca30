//! # Sequence Allocator
//!
//! Hands out kind-scoped integer ids. Every allocation is one atomic
//! increment on the injected counter store; ids are consumed even when the
//! insert that follows fails, so gaps are expected and never reclaimed.

use std::sync::Arc;

use serde::Serialize;

use super::counter_store::CounterStore;
use crate::error::{LibraryError, LibraryResult};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::records::EntityKind;

/// Current value of one counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub kind: String,
    pub seq: u64,
}

/// Allocates ids from per-kind counters
pub struct SequenceAllocator {
    store: Arc<dyn CounterStore>,
    metrics: Arc<MetricsRegistry>,
}

impl SequenceAllocator {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self {
            store,
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    /// Count allocations in a shared registry
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    /// The id the next `allocate` would return, without consuming it
    pub fn peek(&self, kind: EntityKind) -> LibraryResult<u64> {
        let seq = self.store.current(kind.as_str())?;
        Ok(seq.saturating_add(1))
    }

    /// Consume and return the next id for `kind`
    pub fn allocate(&self, kind: EntityKind) -> LibraryResult<u64> {
        let id = self.store.increment_and_fetch(kind.as_str()).map_err(|e| {
            log_event_with_fields(
                Event::AllocationFailed,
                &[("kind", kind.as_str()), ("reason", &e.to_string())],
            );
            LibraryError::from(e)
        })?;
        self.metrics.increment_ids_allocated();
        Ok(id)
    }

    /// Raise the counter for `kind` to `floor`.
    ///
    /// Used to line counters up with records that already exist. A floor
    /// below the current value is refused.
    pub fn seed(&self, kind: EntityKind, floor: u64) -> LibraryResult<u64> {
        let current = self.store.current(kind.as_str())?;
        if floor < current {
            return Err(LibraryError::validation(format!(
                "counter '{}' is at {}, cannot lower it to {}",
                kind, current, floor
            )));
        }

        let seq = self.store.raise_to(kind.as_str(), floor)?;
        log_event_with_fields(
            Event::CounterSeeded,
            &[("kind", kind.as_str()), ("seq", &seq.to_string())],
        );
        Ok(seq)
    }

    /// All counters the store knows about
    pub fn snapshot(&self) -> LibraryResult<Vec<CounterSnapshot>> {
        Ok(self
            .store
            .snapshot()?
            .into_iter()
            .map(|(kind, seq)| CounterSnapshot { kind, seq })
            .collect())
    }
}

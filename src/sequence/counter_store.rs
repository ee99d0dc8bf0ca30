//! # Counter Store
//!
//! Backing storage for the per-kind sequence counters. The store owns the
//! atomicity contract: `increment_and_fetch` is a single read-modify-write
//! that creates a missing counter in the same step.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::records::{StoreError, StoreResult};

/// Counter storage keyed by entity kind string
pub trait CounterStore: Send + Sync {
    /// Atomically add one and return the new value.
    ///
    /// A missing counter is created at 1. On error the counter is unchanged.
    fn increment_and_fetch(&self, key: &str) -> StoreResult<u64>;

    /// Current value, creating the counter at 0 when absent
    fn current(&self, key: &str) -> StoreResult<u64>;

    /// Atomically raise the counter to at least `floor`; returns the value
    /// after the call. Never lowers a counter.
    fn raise_to(&self, key: &str, floor: u64) -> StoreResult<u64>;

    /// Every counter and its value, sorted by key
    fn snapshot(&self) -> StoreResult<Vec<(String, u64)>>;
}

/// In-process counter store.
///
/// Each counter is an `AtomicU64`; the map lock is only held long enough to
/// find or create the counter, never across the increment.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    counters: RwLock<HashMap<String, Arc<AtomicU64>>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, key: &str) -> StoreResult<Arc<AtomicU64>> {
        {
            let counters = self
                .counters
                .read()
                .map_err(|_| StoreError::Unavailable("Lock poisoned".to_string()))?;
            if let Some(counter) = counters.get(key) {
                return Ok(Arc::clone(counter));
            }
        }

        let mut counters = self
            .counters
            .write()
            .map_err(|_| StoreError::Unavailable("Lock poisoned".to_string()))?;
        Ok(Arc::clone(counters.entry(key.to_string()).or_default()))
    }
}

impl CounterStore for InMemoryCounterStore {
    fn increment_and_fetch(&self, key: &str) -> StoreResult<u64> {
        let counter = self.counter(key)?;
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |seq| seq.checked_add(1))
            .map(|previous| previous + 1)
            .map_err(|_| StoreError::Unavailable(format!("counter '{}' exhausted", key)))
    }

    fn current(&self, key: &str) -> StoreResult<u64> {
        Ok(self.counter(key)?.load(Ordering::SeqCst))
    }

    fn raise_to(&self, key: &str, floor: u64) -> StoreResult<u64> {
        let previous = self.counter(key)?.fetch_max(floor, Ordering::SeqCst);
        Ok(previous.max(floor))
    }

    fn snapshot(&self) -> StoreResult<Vec<(String, u64)>> {
        let counters = self
            .counters
            .read()
            .map_err(|_| StoreError::Unavailable("Lock poisoned".to_string()))?;
        let mut values: Vec<(String, u64)> = counters
            .iter()
            .map(|(key, seq)| (key.clone(), seq.load(Ordering::SeqCst)))
            .collect();
        values.sort();
        Ok(values)
    }
}

//! Metrics registry
//!
//! - Counters only, monotonic
//! - Reset only on process start
//! - Relaxed atomics; exact per counter, not a consistent cut across them

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for the record service
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Records stored by a create
    records_created: AtomicU64,
    /// Records changed by an update
    records_updated: AtomicU64,
    /// Records removed by a delete
    records_deleted: AtomicU64,
    /// Items that failed, bulk or single
    item_failures: AtomicU64,
    /// Ids handed out by the allocator
    ids_allocated: AtomicU64,
    /// Bulk batches run
    bulk_batches: AtomicU64,
    /// Bulk batches stopped by a storage failure
    bulk_aborted: AtomicU64,
    /// Requests refused before reaching the core
    requests_rejected: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_created(&self, count: u64) {
        self.records_created.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_updated(&self, count: u64) {
        self.records_updated.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_deleted(&self, count: u64) {
        self.records_deleted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_failures(&self, count: u64) {
        self.item_failures.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_ids_allocated(&self) {
        self.ids_allocated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_bulk_batches(&self) {
        self.bulk_batches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_bulk_aborted(&self) {
        self.bulk_aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_requests_rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_created: self.records_created.load(Ordering::Relaxed),
            records_updated: self.records_updated.load(Ordering::Relaxed),
            records_deleted: self.records_deleted.load(Ordering::Relaxed),
            item_failures: self.item_failures.load(Ordering::Relaxed),
            ids_allocated: self.ids_allocated.load(Ordering::Relaxed),
            bulk_batches: self.bulk_batches.load(Ordering::Relaxed),
            bulk_aborted: self.bulk_aborted.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub records_created: u64,
    pub records_updated: u64,
    pub records_deleted: u64,
    pub item_failures: u64,
    pub ids_allocated: u64,
    pub bulk_batches: u64,
    pub bulk_aborted: u64,
    pub requests_rejected: u64,
}

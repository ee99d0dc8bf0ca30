//! # Sequence Module
//!
//! Per-kind monotonic id counters and the allocator built on them.

mod allocator;
mod counter_store;

pub use allocator::{CounterSnapshot, SequenceAllocator};
pub use counter_store::{CounterStore, InMemoryCounterStore};

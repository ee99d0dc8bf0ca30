//! # Bulk Module
//!
//! Sequential, order-preserving batch mutation with per-item failure
//! isolation.

mod outcome;
mod runner;

pub use outcome::{Applied, BulkOperation, BulkOutcome, ItemOutcome};
pub use runner::{BulkOperationRunner, UpdateRequest};

//! # Records Module
//!
//! Entity kinds, their field rules, the record type and the per-kind
//! record store interface with its in-memory implementation.

pub mod kind;
pub mod memory;
pub mod record;
pub mod store;

pub use kind::{EntityKind, FieldDefault, KindSchema, MAX_STRING_LEN};
pub use memory::InMemoryRecordStore;
pub use record::{NewRecord, Record};
pub use store::{RecordStore, StoreError, StoreResult};

//! songlib - record-management backend for a song and book library
//!
//! Seven entity kinds (books, songs, drafts, edits, listings, organisations,
//! users), each with its own integer id space. Ids come from per-kind atomic
//! counters; writes go through a sequential bulk runner that isolates
//! per-item failures.

pub mod bulk;
pub mod cli;
pub mod clock;
pub mod error;
pub mod http_server;
pub mod library;
pub mod observability;
pub mod records;
pub mod report;
pub mod sequence;

pub use error::{ErrorKind, LibraryError, LibraryResult};
pub use library::Library;
pub use records::{EntityKind, Record};

//! Observable events
//!
//! Every log line names one of these events. Names are stable strings so
//! log consumers can match on them.

use std::fmt;

use super::logger::Severity;

/// Observable events in songlib
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Process startup begins
    BootStart,
    /// Configuration file loaded and validated
    ConfigLoaded,
    /// Counter raised to a configured floor
    CounterSeeded,
    /// HTTP listener bound, ready for requests
    Serving,
    /// Shutdown signal received
    ShutdownStart,
    /// Listener drained
    ShutdownComplete,

    // Single-record writes
    RecordCreated,
    RecordUpdated,
    RecordDeleted,

    // Bulk writes
    /// Batch finished, with or without item failures
    BulkComplete,
    /// Batch stopped early because storage went away
    BulkAborted,

    // Failures
    /// Id allocation failed; no id was consumed
    AllocationFailed,
    /// Request refused before reaching the core
    RequestRejected,
    /// Store reported an infrastructure failure
    StorageUnavailable,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BootStart => "SONGLIB_STARTUP_BEGIN",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::CounterSeeded => "COUNTER_SEEDED",
            Event::Serving => "SONGLIB_SERVING",
            Event::ShutdownStart => "SHUTDOWN_START",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",

            Event::RecordCreated => "RECORD_CREATED",
            Event::RecordUpdated => "RECORD_UPDATED",
            Event::RecordDeleted => "RECORD_DELETED",

            Event::BulkComplete => "BULK_COMPLETE",
            Event::BulkAborted => "BULK_ABORTED",

            Event::AllocationFailed => "SEQUENCE_ALLOCATION_FAILED",
            Event::RequestRejected => "REQUEST_REJECTED",
            Event::StorageUnavailable => "STORAGE_UNAVAILABLE",
        }
    }

    /// Severity this event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::RecordCreated | Event::RecordUpdated | Event::RecordDeleted => Severity::Trace,
            Event::RequestRejected => Severity::Warn,
            Event::BulkAborted | Event::AllocationFailed | Event::StorageUnavailable => {
                Severity::Error
            }
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

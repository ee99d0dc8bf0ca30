//! Observability for songlib
//!
//! - Structured logging (JSON lines)
//! - Monotonic counters
//! - Named lifecycle and write events
//!
//! Observability is read-only: nothing here changes the outcome of an
//! operation, and a failed log write is dropped.
//!
//! ```ignore
//! use songlib::observability::{log_event_with_fields, Event, MetricsRegistry};
//!
//! log_event_with_fields(Event::BulkComplete, &[("kind", "songs"), ("failed", "0")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.add_created(2);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log an event at its own severity
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log an event with fields at its own severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    match event.severity() {
        Severity::Error => Logger::error(event.as_str(), fields),
        severity => Logger::log(severity, event.as_str(), fields),
    }
}

//! Observability subsystem
//!
//! - Structured logging (JSON, one line per event)
//! - Relaxed atomic query counters
//! - Typed query lifecycle events
//!
//! # Principles
//!
//! 1. Observability is read-only: it never changes a query's outcome
//! 2. Synchronous, no background threads
//! 3. Deterministic output: fields are written in key order

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsSnapshot, QueryMetrics};

/// Logs a lifecycle event at its own severity
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

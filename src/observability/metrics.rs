//! Query counters
//!
//! - Counters only, monotonic
//! - Relaxed atomics; a snapshot is not a consistent cut

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters shared by every execution of one executor
#[derive(Debug, Default)]
pub struct QueryMetrics {
    executions: AtomicU64,
    failures: AtomicU64,
    records_scanned: AtomicU64,
    records_returned: AtomicU64,
    index_pruned: AtomicU64,
}

impl QueryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_executions(&self) {
        self.executions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failures(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_scanned(&self, count: u64) {
        self.records_scanned.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_returned(&self, count: u64) {
        self.records_returned.fetch_add(count, Ordering::Relaxed);
    }

    /// Counts an execution whose scan the optimizer restricted
    pub fn increment_index_pruned(&self) {
        self.index_pruned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn executions(&self) -> u64 {
        self.executions.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            executions: self.executions.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            records_scanned: self.records_scanned.load(Ordering::Relaxed),
            records_returned: self.records_returned.load(Ordering::Relaxed),
            index_pruned: self.index_pruned.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`QueryMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub executions: u64,
    pub failures: u64,
    pub records_scanned: u64,
    pub records_returned: u64,
    pub index_pruned: u64,
}

impl MetricsSnapshot {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

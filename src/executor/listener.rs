//! Result delivery

use serde::Serialize;

use crate::errors::QueryResult;
use crate::storage::Record;

/// Counters of one execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionStats {
    /// Records read from the source
    pub scanned: u64,
    /// Records that passed the filter, skipped ones included
    pub tested: u64,
    /// Records handed to the caller
    pub returned: u64,
    /// The search optimizer restricted the scan
    pub index_used: bool,
    pub limit_reached: bool,
    pub stopped_by_listener: bool,
}

/// Receives the results of one execution
pub trait ResultListener {
    fn begin(&mut self) {}

    /// Receives one result; returning false stops the execution
    fn on_result(&mut self, record: Record) -> QueryResult<bool>;

    /// Called every `progress_interval` scanned records
    fn progress(&mut self, _scanned: u64) {}

    fn end(&mut self, _stats: &ExecutionStats) {}
}

/// Collects every result, optionally stopping after `stop_after`
#[derive(Debug, Default)]
pub struct CollectingListener {
    pub records: Vec<Record>,
    pub stop_after: Option<usize>,
    pub progress_calls: Vec<u64>,
    pub stats: Option<ExecutionStats>,
}

impl CollectingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stopping_after(count: usize) -> Self {
        Self {
            stop_after: Some(count),
            ..Self::default()
        }
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

impl ResultListener for CollectingListener {
    fn on_result(&mut self, record: Record) -> QueryResult<bool> {
        self.records.push(record);
        Ok(self
            .stop_after
            .map(|limit| self.records.len() < limit)
            .unwrap_or(true))
    }

    fn progress(&mut self, scanned: u64) {
        self.progress_calls.push(scanned);
    }

    fn end(&mut self, stats: &ExecutionStats) {
        self.stats = Some(*stats);
    }
}

impl<F> ResultListener for F
where
    F: FnMut(Record) -> bool,
{
    fn on_result(&mut self, record: Record) -> QueryResult<bool> {
        Ok(self(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_listener_stops() {
        let mut listener = CollectingListener::stopping_after(2);
        assert!(listener.on_result(Record::new()).unwrap());
        assert!(!listener.on_result(Record::new()).unwrap());
        assert_eq!(listener.records.len(), 2);
    }

    #[test]
    fn test_closure_listener() {
        let mut seen = 0;
        let mut listener = |_record: Record| {
            seen += 1;
            seen < 3
        };
        assert!(listener.on_result(Record::new()).unwrap());
        assert!(listener.on_result(Record::new()).unwrap());
        assert!(!listener.on_result(Record::new()).unwrap());
    }
}

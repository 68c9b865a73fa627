//! Query lifecycle events

use std::fmt;

use super::logger::Severity;

/// Observable events of one query execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Execution started
    QueryBegin,
    /// Execution finished, possibly stopped early
    QueryComplete,
    /// Execution aborted with an error
    QueryFailed,
    /// The search optimizer restricted the scan
    IndexPruned,
    /// Every record of the target is scanned
    FullScan,
    /// The result listener asked to stop
    ListenerStop,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::QueryBegin => "QUERY_BEGIN",
            Event::QueryComplete => "QUERY_COMPLETE",
            Event::QueryFailed => "QUERY_FAILED",
            Event::IndexPruned => "INDEX_PRUNED",
            Event::FullScan => "FULL_SCAN",
            Event::ListenerStop => "LISTENER_STOP",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Event::QueryFailed => Severity::Error,
            Event::IndexPruned | Event::FullScan => Severity::Trace,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(Event::QueryBegin.as_str(), "QUERY_BEGIN");
        assert_eq!(Event::IndexPruned.to_string(), "INDEX_PRUNED");
    }

    #[test]
    fn test_failures_are_errors() {
        assert_eq!(Event::QueryFailed.severity(), Severity::Error);
        assert_eq!(Event::QueryComplete.severity(), Severity::Info);
    }
}

//! Engine Configuration
//!
//! Tuning knobs of the query executor. Every field has a default, so a
//! partial JSON document is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::errors::{QueryError, QueryResult};

/// What ORDER BY does with two values it cannot compare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparatorFallback {
    /// Treat them as equal and keep their relative order
    Tie,
    /// Abort the execution with an incomparable error
    Fail,
}

/// Query engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// ORDER BY behaviour on incomparable values (default: tie)
    #[serde(default = "default_comparator_fallback")]
    pub comparator_fallback: ComparatorFallback,

    /// Reduce OR of two index lookups by union (default: false)
    #[serde(default)]
    pub optimize_or: bool,

    /// Consult the search optimizer for class targets (default: true)
    #[serde(default = "default_use_indexes")]
    pub use_indexes: bool,

    /// Scanned records between listener progress calls (default: 1000)
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,

    /// Log the lifecycle of every execution (default: false)
    #[serde(default)]
    pub log_queries: bool,
}

fn default_comparator_fallback() -> ComparatorFallback {
    ComparatorFallback::Tie
}

fn default_use_indexes() -> bool {
    true
}

fn default_progress_interval() -> u64 {
    1000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            comparator_fallback: default_comparator_fallback(),
            optimize_or: false,
            use_indexes: default_use_indexes(),
            progress_interval: default_progress_interval(),
            log_queries: false,
        }
    }
}

impl EngineConfig {
    /// Parses a JSON configuration document
    pub fn from_json(json: &str) -> QueryResult<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| QueryError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> QueryResult<()> {
        if self.progress_interval == 0 {
            return Err(QueryError::Config("progress_interval must be > 0".into()));
        }
        Ok(())
    }

    pub fn with_comparator_fallback(mut self, fallback: ComparatorFallback) -> Self {
        self.comparator_fallback = fallback;
        self
    }

    pub fn with_optimize_or(mut self, optimize_or: bool) -> Self {
        self.optimize_or = optimize_or;
        self
    }

    pub fn with_indexes(mut self, use_indexes: bool) -> Self {
        self.use_indexes = use_indexes;
        self
    }

    pub fn with_logging(mut self, log_queries: bool) -> Self {
        self.log_queries = log_queries;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.comparator_fallback, ComparatorFallback::Tie);
        assert!(!config.optimize_or);
        assert!(config.use_indexes);
        assert_eq!(config.progress_interval, 1000);
        assert!(!config.log_queries);
    }

    #[test]
    fn test_partial_json() {
        let config = EngineConfig::from_json(r#"{"comparator_fallback": "fail", "optimize_or": true}"#).unwrap();
        assert_eq!(config.comparator_fallback, ComparatorFallback::Fail);
        assert!(config.optimize_or);
        assert!(config.use_indexes);
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_invalid_config() {
        let bad_value = EngineConfig::from_json(r#"{"comparator_fallback": "panic"}"#).unwrap_err();
        assert_eq!(bad_value.code(), "AERO_QUERY_CONFIG");
        assert!(EngineConfig::from_json(r#"{"progress_interval": 0}"#).is_err());
    }
}

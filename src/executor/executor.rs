//! Query executor
//!
//! Execution flow:
//! 1. Take a working copy of the query, resolving parameters
//! 2. Simplify the filter and consult the search optimizer
//! 3. Open the source: identities, class, clusters, dictionary or sub-query
//! 4. Stream, or buffer for grouping and ordering
//! 5. Deliver rows to the listener until exhausted, limited or stopped

use std::sync::Arc;

use super::listener::{CollectingListener, ExecutionStats, ResultListener};
use super::query::SelectQuery;
use super::stream::{Env, Prepared, SelectStream};
use crate::config::EngineConfig;
use crate::errors::QueryResult;
use crate::index::{IndexProvider, NoIndexes};
use crate::observability::{log_event, Event, QueryMetrics};
use crate::storage::{Record, RecordStore};
use crate::visitor::Parameters;

static NO_INDEXES: NoIndexes = NoIndexes;

/// Executes SELECT queries against a record store
pub struct QueryExecutor<'a> {
    store: &'a dyn RecordStore,
    indexes: &'a dyn IndexProvider,
    config: EngineConfig,
    metrics: Arc<QueryMetrics>,
}

impl<'a> QueryExecutor<'a> {
    /// Creates an executor without indexes and with the default configuration
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self {
            store,
            indexes: &NO_INDEXES,
            config: EngineConfig::default(),
            metrics: Arc::new(QueryMetrics::new()),
        }
    }

    pub fn with_indexes(mut self, indexes: &'a dyn IndexProvider) -> Self {
        self.indexes = indexes;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares counters with other executors
    pub fn with_metrics(mut self, metrics: Arc<QueryMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &QueryMetrics {
        &self.metrics
    }

    fn env(&self) -> Env<'a> {
        Env::new(self.store, self.indexes, &self.config)
    }

    /// Opens a lazy result stream. Nothing is scanned until the first pull.
    pub fn stream(&self, query: &SelectQuery, params: &Parameters) -> QueryResult<SelectStream<'a>> {
        let prepared = Prepared::new(query, params)?;
        SelectStream::open(self.env(), prepared)
    }

    /// Executes a query, delivering every row to the listener
    pub fn execute(
        &self,
        query: &SelectQuery,
        params: &Parameters,
        listener: &mut dyn ResultListener,
    ) -> QueryResult<ExecutionStats> {
        self.metrics.increment_executions();
        let text = if self.config.log_queries { query.to_string() } else { String::new() };
        if self.config.log_queries {
            log_event(Event::QueryBegin, &[("query", text.as_str())]);
        }

        match self.run(query, params, listener) {
            Ok(stats) => {
                self.metrics.add_scanned(stats.scanned);
                self.metrics.add_returned(stats.returned);
                if stats.index_used {
                    self.metrics.increment_index_pruned();
                }
                if self.config.log_queries {
                    if stats.stopped_by_listener {
                        log_event(Event::ListenerStop, &[("query", text.as_str())]);
                    }
                    log_event(
                        Event::QueryComplete,
                        &[
                            ("query", text.as_str()),
                            ("returned", stats.returned.to_string().as_str()),
                            ("scanned", stats.scanned.to_string().as_str()),
                        ],
                    );
                }
                Ok(stats)
            }
            Err(e) => {
                self.metrics.increment_failures();
                log_event(
                    Event::QueryFailed,
                    &[
                        ("code", e.code()),
                        ("error", e.to_string().as_str()),
                        ("query", query.to_string().as_str()),
                    ],
                );
                Err(e)
            }
        }
    }

    fn run(
        &self,
        query: &SelectQuery,
        params: &Parameters,
        listener: &mut dyn ResultListener,
    ) -> QueryResult<ExecutionStats> {
        let mut stream = self.stream(query, params)?;
        let interval = self.config.progress_interval.max(1);
        let mut next_progress = interval;
        let mut stopped = false;

        listener.begin();
        while let Some(record) = stream.next() {
            let record = record?;
            report_progress(listener, stream.stats().scanned, interval, &mut next_progress);
            if !listener.on_result(record)? {
                stopped = true;
                break;
            }
        }
        report_progress(listener, stream.stats().scanned, interval, &mut next_progress);

        let mut stats = *stream.stats();
        stats.stopped_by_listener = stopped;
        listener.end(&stats);
        Ok(stats)
    }

    /// Executes a query and collects every row
    pub fn execute_collect(&self, query: &SelectQuery, params: &Parameters) -> QueryResult<Vec<Record>> {
        let mut listener = CollectingListener::new();
        self.execute(query, params, &mut listener)?;
        Ok(listener.into_records())
    }
}

fn report_progress(listener: &mut dyn ResultListener, scanned: u64, interval: u64, next: &mut u64) {
    if scanned >= *next {
        listener.progress(scanned);
        *next = (scanned / interval + 1) * interval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{SortDirection, Target};
    use crate::expr::Expr;
    use crate::storage::MemoryStore;
    use crate::value::Value;
    use serde_json::json;

    fn cars() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert_json("Car", &json!({"name": "tempo", "size": 250})).unwrap();
        store.insert_json("Car", &json!({"name": "fiesta", "size": 160})).unwrap();
        store.insert_json("Car", &json!({"name": null, "size": 260})).unwrap();
        store.insert_json("Car", &json!({"name": "supreme", "size": 310})).unwrap();
        store
    }

    fn names(records: &[Record]) -> Vec<Value> {
        records
            .iter()
            .map(|r| r.field("name").cloned().unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_streaming_filter_keeps_source_order() {
        let store = cars();
        let executor = QueryExecutor::new(&store);
        let query = SelectQuery::from_class("Car").filter(Expr::gt(Expr::name("size"), Expr::literal(200)));
        let rows = executor.execute_collect(&query, &Parameters::new()).unwrap();
        assert_eq!(names(&rows), vec![Value::from("tempo"), Value::Null, Value::from("supreme")]);
        assert_eq!(rows[0].field("size"), Some(&Value::Integer(250)));
    }

    #[test]
    fn test_listener_stop_is_not_an_error() {
        let store = cars();
        let executor = QueryExecutor::new(&store);
        let mut listener = CollectingListener::stopping_after(1);
        let stats = executor
            .execute(&SelectQuery::from_class("Car"), &Parameters::new(), &mut listener)
            .unwrap();
        assert!(stats.stopped_by_listener);
        assert_eq!(stats.scanned, 1);
        assert_eq!(listener.records.len(), 1);
        assert_eq!(listener.stats, Some(stats));
    }

    #[test]
    fn test_progress_every_interval() {
        let mut store = MemoryStore::new();
        for i in 0..25 {
            store.insert_json("Item", &json!({"n": i})).unwrap();
        }
        let config = EngineConfig {
            progress_interval: 10,
            ..EngineConfig::default()
        };
        let executor = QueryExecutor::new(&store).with_config(config);
        let mut listener = CollectingListener::new();
        executor
            .execute(&SelectQuery::from_class("Item"), &Parameters::new(), &mut listener)
            .unwrap();
        assert_eq!(listener.progress_calls, vec![10, 20]);
    }

    #[test]
    fn test_metrics_count_executions_and_failures() {
        let store = cars();
        let executor = QueryExecutor::new(&store);
        executor
            .execute_collect(&SelectQuery::from_class("Car"), &Parameters::new())
            .unwrap();
        assert!(executor
            .execute_collect(&SelectQuery::from_class("Missing"), &Parameters::new())
            .is_err());
        let snapshot = executor.metrics().snapshot();
        assert_eq!(snapshot.executions, 2);
        assert_eq!(snapshot.failures, 1);
        assert_eq!(snapshot.records_returned, 4);
    }

    #[test]
    fn test_stream_is_lazy() {
        let store = cars();
        let executor = QueryExecutor::new(&store);
        let query = SelectQuery::from_class("Car").order_by(Expr::name("size"), SortDirection::Desc);
        let mut stream = executor.stream(&query, &Parameters::new()).unwrap();
        assert_eq!(stream.stats().scanned, 0);
        let first = stream.next().unwrap().unwrap();
        assert_eq!(first.field("name"), Some(&Value::from("supreme")));
        assert_eq!(stream.stats().scanned, 4);
        assert_eq!(stream.count(), 3);
    }

    #[test]
    fn test_record_target_in_given_order() {
        let store = cars();
        let rids: Vec<_> = store.browse_class("Car").unwrap().map(|r| r.unwrap()).collect();
        let executor = QueryExecutor::new(&store);
        let query = SelectQuery::from(Target::Records(vec![rids[3], rids[0]]));
        let rows = executor.execute_collect(&query, &Parameters::new()).unwrap();
        assert_eq!(names(&rows), vec![Value::from("supreme"), Value::from("tempo")]);
    }
}

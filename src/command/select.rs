//! SELECT as a dispatchable command

use std::sync::Arc;

use super::{CommandExecutor, CommandFactory};
use crate::config::EngineConfig;
use crate::errors::QueryResult;
use crate::executor::{ExecutionStats, QueryExecutor, ResultListener, SelectQuery};
use crate::index::IndexProvider;
use crate::observability::QueryMetrics;
use crate::storage::RecordStore;
use crate::visitor::Parameters;

/// Runs a built query against shared collaborators
#[derive(Clone)]
pub struct SelectCommand {
    query: Arc<SelectQuery>,
    store: Arc<dyn RecordStore + Send + Sync>,
    indexes: Option<Arc<dyn IndexProvider + Send + Sync>>,
    config: EngineConfig,
    metrics: Arc<QueryMetrics>,
}

impl SelectCommand {
    pub fn new(query: Arc<SelectQuery>, store: Arc<dyn RecordStore + Send + Sync>) -> Self {
        Self {
            query,
            store,
            indexes: None,
            config: EngineConfig::default(),
            metrics: Arc::new(QueryMetrics::new()),
        }
    }

    pub fn with_indexes(mut self, indexes: Arc<dyn IndexProvider + Send + Sync>) -> Self {
        self.indexes = Some(indexes);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<QueryMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn query(&self) -> &SelectQuery {
        &self.query
    }

    /// A factory handing out a fresh command per dispatch; the text is ignored
    pub fn factory(self) -> Arc<dyn CommandFactory> {
        Arc::new(move |_text: &str| -> QueryResult<Box<dyn CommandExecutor>> { Ok(Box::new(self.clone())) })
    }
}

impl CommandExecutor for SelectCommand {
    fn execute(&mut self, params: &Parameters, listener: &mut dyn ResultListener) -> QueryResult<ExecutionStats> {
        let mut executor = QueryExecutor::new(&*self.store)
            .with_config(self.config.clone())
            .with_metrics(Arc::clone(&self.metrics));
        if let Some(indexes) = &self.indexes {
            executor = executor.with_indexes(&**indexes);
        }
        executor.execute(&self.query, params, listener)
    }
}

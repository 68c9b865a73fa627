//! # Command Registry

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{CommandExecutor, CommandFactory};
use crate::errors::{QueryError, QueryResult};

/// Registry of command factories keyed by normalized name
#[derive(Default)]
pub struct CommandRegistry {
    factories: RwLock<HashMap<String, Arc<dyn CommandFactory>>>,
}

/// Uppercase words joined by single spaces
fn normalize(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_uppercase)
        .collect::<Vec<_>>()
        .join(" ")
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory; a name can only be registered once
    pub fn register(&self, name: &str, factory: Arc<dyn CommandFactory>) -> QueryResult<()> {
        let key = normalize(name);
        if key.is_empty() {
            return Err(QueryError::UnknownCommand(name.to_string()));
        }
        let mut factories = self.factories.write().map_err(|_| QueryError::poisoned())?;
        if factories.contains_key(&key) {
            return Err(QueryError::DuplicateCommand(key));
        }
        factories.insert(key, factory);
        Ok(())
    }

    pub fn unregister(&self, name: &str) -> QueryResult<bool> {
        let mut factories = self.factories.write().map_err(|_| QueryError::poisoned())?;
        Ok(factories.remove(&normalize(name)).is_some())
    }

    /// Registered names, sorted
    pub fn names(&self) -> QueryResult<Vec<String>> {
        let factories = self.factories.read().map_err(|_| QueryError::poisoned())?;
        let mut names: Vec<String> = factories.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Finds the longest registered name prefixing `text`, word by word.
    ///
    /// Words are added while the candidate is no longer than the longest
    /// registered name.
    pub fn resolve(&self, text: &str) -> QueryResult<(String, Arc<dyn CommandFactory>)> {
        let factories = self.factories.read().map_err(|_| QueryError::poisoned())?;
        let longest = factories.keys().map(String::len).max().unwrap_or(0);

        let mut candidate = String::new();
        let mut best = None;
        for word in text.split_whitespace() {
            if !candidate.is_empty() {
                candidate.push(' ');
            }
            candidate.push_str(&word.to_uppercase());
            if candidate.len() > longest {
                break;
            }
            if let Some(factory) = factories.get(&candidate) {
                best = Some((candidate.clone(), Arc::clone(factory)));
            }
        }

        best.ok_or_else(|| {
            let keyword = text.split_whitespace().next().unwrap_or_default();
            QueryError::UnknownCommand(keyword.to_string())
        })
    }

    /// Instantiates the executor for a command text
    pub fn create(&self, text: &str) -> QueryResult<Box<dyn CommandExecutor>> {
        let (_, factory) = self.resolve(text)?;
        factory.create(text)
    }
}

//! Evaluation context
//!
//! Carries what an expression may read besides the candidate record:
//! context variables and the record store used to dereference links.

use std::collections::{BTreeMap, HashMap};

use crate::errors::QueryResult;
use crate::storage::{Record, RecordStore};
use crate::value::{RecordId, Value};

/// Per-execution evaluation context
#[derive(Default)]
pub struct EvalContext<'a> {
    variables: HashMap<String, Value>,
    store: Option<&'a dyn RecordStore>,
}

impl<'a> EvalContext<'a> {
    /// A context without a store; links evaluate to null when dereferenced
    pub fn new() -> Self {
        Self {
            variables: HashMap::new(),
            store: None,
        }
    }

    pub fn with_store(store: &'a dyn RecordStore) -> Self {
        Self {
            variables: HashMap::new(),
            store: Some(store),
        }
    }

    /// Sets a context variable, read as `$name`
    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn store(&self) -> Option<&'a dyn RecordStore> {
        self.store
    }

    /// Loads a record through the store; `None` without a store
    pub fn load(&self, rid: RecordId) -> QueryResult<Option<Record>> {
        match self.store {
            Some(store) => store.load(rid),
            None => Ok(None),
        }
    }

    /// Reads a field of a value, dereferencing links first.
    ///
    /// Lists map the lookup over their items. Anything without fields
    /// yields null.
    pub fn field_of(&self, value: &Value, name: &str) -> QueryResult<Value> {
        match value {
            Value::Document(doc) => Ok(record_field(doc, name)),
            Value::Map(map) => Ok(map.get(name).cloned().unwrap_or_default()),
            Value::Link(rid) => Ok(self
                .load(*rid)?
                .map(|record| record_field(&record, name))
                .unwrap_or_default()),
            Value::List(items) => Ok(Value::List(
                items
                    .iter()
                    .map(|item| self.field_of(item, name))
                    .collect::<QueryResult<Vec<_>>>()?,
            )),
            _ => Ok(Value::Null),
        }
    }

    /// Turns a collection element into a record usable as a candidate
    pub(crate) fn element_record(&self, value: &Value) -> QueryResult<Option<Record>> {
        Ok(match value {
            Value::Document(doc) => Some((**doc).clone()),
            Value::Map(map) => Some(record_from_map(map)),
            Value::Link(rid) => self.load(*rid)?,
            _ => None,
        })
    }
}

/// Field lookup honouring the special names `@rid`, `@class`, `@this` and `*`
pub fn record_field(record: &Record, name: &str) -> Value {
    match name {
        "@rid" => record.id().map(Value::Link).unwrap_or_default(),
        "@class" => record.class().map(Value::from).unwrap_or_default(),
        "@this" | "*" => Value::Document(Box::new(record.clone())),
        _ => record.field(name).cloned().unwrap_or_default(),
    }
}

pub(crate) fn record_from_map(map: &BTreeMap<String, Value>) -> Record {
    let mut record = Record::new();
    for (name, value) in map {
        record.set(name.clone(), value.clone());
    }
    record
}

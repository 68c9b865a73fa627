//! Index Manager
//!
//! Maintains in-memory single-field indexes.
//!
//! # API
//!
//! - `define(class, field, kind)` - Declare an index
//! - `rebuild_from_store(store)` - Rebuild all indexes from records
//! - `apply_write(store, record)` - Update indexes after a record is stored
//! - `apply_delete(store, record)` - Update indexes after a record is removed
//!
//! An index on a class also covers the records of its subclasses, as the
//! store reports them.

use std::collections::BTreeSet;

use super::btree::{IndexKey, IndexTree};
use super::{IndexKind, IndexProvider, RecordIndex};
use crate::errors::{QueryError, QueryResult};
use crate::storage::{Record, RecordStore};
use crate::value::{RecordId, Value};

/// One index on `class.field`
#[derive(Debug)]
pub struct FieldIndex {
    name: String,
    class: String,
    field: String,
    kind: IndexKind,
    tree: IndexTree,
}

impl FieldIndex {
    fn covers<S: RecordStore + ?Sized>(&self, store: &S, record: &Record) -> bool {
        record
            .class()
            .map(|c| store.is_subclass_of(c, &self.class))
            .unwrap_or(false)
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    /// Number of indexed identities
    pub fn len(&self) -> usize {
        self.tree.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordIndex for FieldIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> IndexKind {
        self.kind
    }

    fn field(&self) -> &str {
        &self.field
    }

    fn lookup(&self, keys: &[Value]) -> QueryResult<BTreeSet<RecordId>> {
        let mut result = BTreeSet::new();
        for key in keys.iter().filter_map(IndexKey::from_value) {
            result.extend(self.tree.lookup_eq(&key).iter().copied());
        }
        Ok(result)
    }
}

/// Index Manager that maintains in-memory indexes
#[derive(Debug, Default)]
pub struct IndexManager {
    indexes: Vec<FieldIndex>,
}

impl IndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an index named `Class.field`
    pub fn define(&mut self, class: &str, field: &str, kind: IndexKind) -> QueryResult<()> {
        let name = format!("{}.{}", class, field);
        if self.indexes.iter().any(|i| i.name.eq_ignore_ascii_case(&name)) {
            return Err(QueryError::Storage(format!("Index '{}' already exists", name)));
        }
        self.indexes.push(FieldIndex {
            name,
            class: class.to_string(),
            field: field.to_string(),
            kind,
            tree: IndexTree::new(),
        });
        Ok(())
    }

    /// Rebuilds every index from the store.
    ///
    /// Deterministic: follows the store's class iteration order.
    pub fn rebuild_from_store<S: RecordStore + ?Sized>(&mut self, store: &S) -> QueryResult<()> {
        for index in &mut self.indexes {
            index.tree.clear();
        }

        let classes: BTreeSet<String> = self.indexes.iter().map(|i| i.class.to_lowercase()).collect();
        for class in classes {
            for rid in store.browse_class(&class)? {
                if let Some(record) = store.load(rid?)? {
                    self.apply_write(store, &record)?;
                }
            }
        }
        Ok(())
    }

    /// Indexes a stored record.
    ///
    /// All unique constraints are checked before any index is touched, so a
    /// rejected record leaves every index unchanged.
    pub fn apply_write<S: RecordStore + ?Sized>(&mut self, store: &S, record: &Record) -> QueryResult<()> {
        let rid = match record.id() {
            Some(rid) => rid,
            None => return Ok(()),
        };

        for index in self.indexes.iter().filter(|i| i.covers(store, record) && i.kind == IndexKind::Unique) {
            if let Some(key) = record.field(&index.field).and_then(IndexKey::from_value) {
                if index.tree.lookup_eq(&key).iter().any(|r| *r != rid) {
                    return Err(QueryError::DuplicateKey {
                        index: index.name.clone(),
                        key: record.field(&index.field).map(|v| v.to_string()).unwrap_or_default(),
                    });
                }
            }
        }

        for index in self.indexes.iter_mut().filter(|i| i.covers(store, record)) {
            if let Some(key) = record.field(&index.field).and_then(IndexKey::from_value) {
                index.tree.insert(key, rid);
            }
        }
        Ok(())
    }

    /// Removes a record from every covering index
    pub fn apply_delete<S: RecordStore + ?Sized>(&mut self, store: &S, record: &Record) {
        let rid = match record.id() {
            Some(rid) => rid,
            None => return,
        };
        for index in self.indexes.iter_mut().filter(|i| i.covers(store, record)) {
            if let Some(key) = record.field(&index.field).and_then(IndexKey::from_value) {
                index.tree.remove(&key, rid);
            }
        }
    }

    /// Returns an index by name
    pub fn index(&self, name: &str) -> Option<&FieldIndex> {
        self.indexes.iter().find(|i| i.name.eq_ignore_ascii_case(name))
    }

    /// Number of defined indexes
    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }
}

impl IndexProvider for IndexManager {
    fn find_index(&self, class: &str, field: &str) -> Option<&dyn RecordIndex> {
        self.indexes
            .iter()
            .find(|i| i.class.eq_ignore_ascii_case(class) && i.field == field)
            .map(|i| i as &dyn RecordIndex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn cars() -> MemoryStore {
        let mut store = MemoryStore::new();
        for (name, size) in [("tempo", 250), ("fiesta", 160), ("supreme", 310)] {
            store
                .insert_json("Car", &json!({"name": name, "size": size}))
                .unwrap();
        }
        store
    }

    #[test]
    fn test_rebuild_and_lookup() {
        let store = cars();
        let mut manager = IndexManager::new();
        manager.define("Car", "name", IndexKind::Unique).unwrap();
        manager.rebuild_from_store(&store).unwrap();

        let index = manager.find_index("car", "name").unwrap();
        assert_eq!(index.kind(), IndexKind::Unique);
        let hits = index.lookup(&[Value::from("fiesta")]).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(index.lookup(&[Value::from("pinto")]).unwrap().is_empty());
    }

    #[test]
    fn test_unique_violation_rejected() {
        let mut store = cars();
        let mut manager = IndexManager::new();
        manager.define("Car", "name", IndexKind::Unique).unwrap();
        manager.rebuild_from_store(&store).unwrap();

        let rid = store.insert_json("Car", &json!({"name": "tempo"})).unwrap();
        let duplicate = store.load(rid).unwrap().unwrap();
        let err = manager.apply_write(&store, &duplicate).unwrap_err();
        assert_eq!(err.code(), "AERO_QUERY_DUPLICATE_KEY");
        assert_eq!(manager.index("Car.name").unwrap().len(), 3);
    }

    #[test]
    fn test_not_unique_allows_duplicates() {
        let mut store = cars();
        store.insert_json("Car", &json!({"name": "other", "size": 250})).unwrap();
        let mut manager = IndexManager::new();
        manager.define("Car", "size", IndexKind::NotUnique).unwrap();
        manager.rebuild_from_store(&store).unwrap();

        let index = manager.find_index("Car", "size").unwrap();
        assert_eq!(index.lookup(&[Value::Integer(250)]).unwrap().len(), 2);
        assert_eq!(
            index.lookup(&[Value::Integer(250), Value::Integer(160)]).unwrap().len(),
            3
        );
    }

    #[test]
    fn test_apply_delete() {
        let store = cars();
        let mut manager = IndexManager::new();
        manager.define("Car", "name", IndexKind::Unique).unwrap();
        manager.rebuild_from_store(&store).unwrap();

        let rid = store.browse_class("Car").unwrap().next().unwrap().unwrap();
        let record = store.load(rid).unwrap().unwrap();
        manager.apply_delete(&store, &record);
        assert!(manager
            .find_index("Car", "name")
            .unwrap()
            .lookup(&[Value::from("tempo")])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_duplicate_definition_rejected() {
        let mut manager = IndexManager::new();
        manager.define("Car", "name", IndexKind::Unique).unwrap();
        assert!(manager.define("car", "name", IndexKind::NotUnique).is_err());
    }

    #[test]
    fn test_index_covers_subclasses() {
        let mut store = MemoryStore::new();
        store.create_class("Vehicle", None).unwrap();
        store.create_class("Car", Some("Vehicle")).unwrap();
        store.insert_json("Vehicle", &json!({"name": "cart"})).unwrap();
        store.insert_json("Car", &json!({"name": "tempo"})).unwrap();

        let mut manager = IndexManager::new();
        manager.define("Vehicle", "name", IndexKind::Unique).unwrap();
        manager.rebuild_from_store(&store).unwrap();
        let index = manager.find_index("Vehicle", "name").unwrap();
        assert_eq!(index.lookup(&[Value::from("tempo")]).unwrap().len(), 1);
        assert_eq!(manager.index("Vehicle.name").unwrap().len(), 2);
    }
}

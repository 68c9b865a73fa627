//! In-memory record store
//!
//! One cluster per class, positions assigned sequentially, deleted records
//! leave a hole so identities stay stable.

use std::collections::BTreeMap;

use super::record::Record;
use super::{RecordStore, RidIter};
use crate::errors::{QueryError, QueryResult};
use crate::value::RecordId;

#[derive(Debug, Clone)]
struct ClassDef {
    name: String,
    superclass: Option<String>,
    cluster: u32,
}

#[derive(Debug, Clone)]
struct Cluster {
    name: String,
    records: Vec<Option<Record>>,
}

/// In-memory [`RecordStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    classes: Vec<ClassDef>,
    clusters: Vec<Cluster>,
    dictionary: BTreeMap<String, RecordId>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines a class and its cluster, returning the cluster id.
    ///
    /// The cluster is named after the class, lowercased.
    pub fn create_class(&mut self, name: &str, superclass: Option<&str>) -> QueryResult<u32> {
        if self.class_def(name).is_some() {
            return Err(QueryError::Storage(format!("Class '{}' already exists", name)));
        }
        let superclass = match superclass {
            Some(parent) => Some(
                self.class_def(parent)
                    .map(|c| c.name.clone())
                    .ok_or_else(|| QueryError::Storage(format!("Class '{}' not found", parent)))?,
            ),
            None => None,
        };
        let cluster = self.clusters.len() as u32;
        self.clusters.push(Cluster {
            name: name.to_lowercase(),
            records: Vec::new(),
        });
        self.classes.push(ClassDef {
            name: name.to_string(),
            superclass,
            cluster,
        });
        Ok(cluster)
    }

    /// Stores a record in the class cluster, creating the class on first use
    pub fn insert(&mut self, class: &str, record: Record) -> QueryResult<RecordId> {
        let (class_name, cluster) = match self.class_def(class) {
            Some(def) => (def.name.clone(), def.cluster),
            None => {
                let cluster = self.create_class(class, None)?;
                (class.to_string(), cluster)
            }
        };

        let mut stored = Record::of_class(class_name);
        for (name, value) in record.fields() {
            stored.set(name, value.clone());
        }

        let records = &mut self.clusters[cluster as usize].records;
        let rid = RecordId::new(cluster, records.len() as u64);
        stored.set_id(rid);
        records.push(Some(stored));
        Ok(rid)
    }

    /// Stores a JSON object as a record of the class
    pub fn insert_json(&mut self, class: &str, json: &serde_json::Value) -> QueryResult<RecordId> {
        self.insert(class, Record::from_json(None, json))
    }

    /// Deletes a record, returning whether it existed
    pub fn delete(&mut self, rid: RecordId) -> bool {
        self.clusters
            .get_mut(rid.cluster as usize)
            .and_then(|c| c.records.get_mut(rid.position as usize))
            .and_then(Option::take)
            .is_some()
    }

    /// Binds a dictionary key to a record
    pub fn put_dictionary(&mut self, key: impl Into<String>, rid: RecordId) {
        self.dictionary.insert(key.into(), rid);
    }

    /// Number of live records in a class, subclasses excluded
    pub fn count_class(&self, class: &str) -> usize {
        self.class_def(class)
            .map(|def| {
                self.clusters[def.cluster as usize]
                    .records
                    .iter()
                    .filter(|r| r.is_some())
                    .count()
            })
            .unwrap_or(0)
    }

    fn class_def(&self, name: &str) -> Option<&ClassDef> {
        self.classes.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    fn live_ids(&self, cluster: u32) -> impl Iterator<Item = QueryResult<RecordId>> + '_ {
        self.clusters[cluster as usize]
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_some())
            .map(move |(pos, _)| Ok(RecordId::new(cluster, pos as u64)))
    }
}

impl RecordStore for MemoryStore {
    fn browse_class(&self, class: &str) -> QueryResult<RidIter<'_>> {
        if self.class_def(class).is_none() {
            return Err(QueryError::Storage(format!("Class '{}' not found", class)));
        }
        let clusters: Vec<u32> = self
            .classes
            .iter()
            .filter(|c| self.is_subclass_of(&c.name, class))
            .map(|c| c.cluster)
            .collect();
        Ok(Box::new(
            clusters.into_iter().flat_map(move |cluster| self.live_ids(cluster)),
        ))
    }

    fn browse_cluster(&self, cluster: &str) -> QueryResult<RidIter<'_>> {
        let id = self
            .clusters
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(cluster))
            .ok_or_else(|| QueryError::Storage(format!("Cluster '{}' not found", cluster)))?;
        Ok(Box::new(self.live_ids(id as u32)))
    }

    fn load(&self, rid: RecordId) -> QueryResult<Option<Record>> {
        Ok(self
            .clusters
            .get(rid.cluster as usize)
            .and_then(|c| c.records.get(rid.position as usize))
            .and_then(|r| r.clone()))
    }

    fn dictionary_get(&self, key: &str) -> QueryResult<Option<RecordId>> {
        Ok(self.dictionary.get(key).copied())
    }

    fn is_subclass_of(&self, class: &str, parent: &str) -> bool {
        let mut current = self.class_def(class);
        while let Some(def) = current {
            if def.name.eq_ignore_ascii_case(parent) {
                return true;
            }
            current = def.superclass.as_deref().and_then(|s| self.class_def(s));
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(iter: RidIter<'_>) -> Vec<RecordId> {
        iter.collect::<QueryResult<Vec<_>>>().unwrap()
    }

    #[test]
    fn test_insert_assigns_sequential_positions() {
        let mut store = MemoryStore::new();
        let a = store.insert_json("Car", &json!({"name": "tempo"})).unwrap();
        let b = store.insert_json("Car", &json!({"name": "fiesta"})).unwrap();
        assert_eq!(a.cluster, b.cluster);
        assert_eq!(b.position, a.position + 1);

        let loaded = store.load(b).unwrap().unwrap();
        assert_eq!(loaded.id(), Some(b));
        assert_eq!(loaded.class(), Some("Car"));
    }

    #[test]
    fn test_browse_class_is_polymorphic() {
        let mut store = MemoryStore::new();
        store.create_class("Vehicle", None).unwrap();
        store.create_class("Car", Some("Vehicle")).unwrap();
        store.insert_json("Vehicle", &json!({"name": "bus"})).unwrap();
        store.insert_json("Car", &json!({"name": "tempo"})).unwrap();

        assert_eq!(ids(store.browse_class("vehicle").unwrap()).len(), 2);
        assert_eq!(ids(store.browse_class("Car").unwrap()).len(), 1);
        assert!(store.is_subclass_of("Car", "Vehicle"));
        assert!(!store.is_subclass_of("Vehicle", "Car"));
    }

    #[test]
    fn test_delete_leaves_hole() {
        let mut store = MemoryStore::new();
        let a = store.insert_json("Car", &json!({"name": "tempo"})).unwrap();
        let b = store.insert_json("Car", &json!({"name": "fiesta"})).unwrap();
        assert!(store.delete(a));
        assert!(!store.delete(a));
        assert_eq!(ids(store.browse_cluster("car").unwrap()), vec![b]);
        assert_eq!(store.load(a).unwrap(), None);
    }

    #[test]
    fn test_unknown_class_is_error() {
        let store = MemoryStore::new();
        assert!(store.browse_class("Nope").is_err());
        assert!(store.browse_cluster("nope").is_err());
    }

    #[test]
    fn test_dictionary() {
        let mut store = MemoryStore::new();
        let rid = store.insert_json("Car", &json!({"name": "tempo"})).unwrap();
        store.put_dictionary("favourite", rid);
        assert_eq!(store.dictionary_get("favourite").unwrap(), Some(rid));
        assert_eq!(store.dictionary_get("missing").unwrap(), None);
    }
}

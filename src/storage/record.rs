//! Document record type
//!
//! A record is an ordered list of named fields plus an optional identity and
//! class. Projections produce records without identity.

use serde::{Serialize, Serializer};

use crate::value::{RecordId, Value};

/// A document as seen by the query engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Record {
    id: Option<RecordId>,
    class: Option<String>,
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Creates an empty record with no identity and no class
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty record of the given class
    pub fn of_class(class: impl Into<String>) -> Self {
        Self {
            class: Some(class.into()),
            ..Self::default()
        }
    }

    /// Builds a record from a JSON object; non-object input gives an empty record
    pub fn from_json(class: Option<&str>, json: &serde_json::Value) -> Self {
        let mut record = Self {
            class: class.map(str::to_string),
            ..Self::default()
        };
        if let serde_json::Value::Object(map) = json {
            for (name, value) in map {
                record.fields.push((name.clone(), Value::from_json(value)));
            }
        }
        record
    }

    /// Sets the identity
    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    /// Adds or replaces a field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// Returns a field value by exact name
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// True if the field is present (even when null)
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    /// Sets a field, keeping its position if it already exists
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Removes a field, returning its value
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let pos = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(pos).1)
    }

    /// Iterates fields in insertion order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Converts to a JSON object; identity and class appear as `@rid`/`@class`
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        if let Some(id) = self.id {
            map.insert("@rid".to_string(), serde_json::Value::String(id.to_string()));
        }
        if let Some(class) = &self.class {
            map.insert("@class".to_string(), serde_json::Value::String(class.clone()));
        }
        for (name, value) in &self.fields {
            map.insert(name.clone(), value.to_json());
        }
        serde_json::Value::Object(map)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_order_preserved() {
        let record = Record::from_json(Some("Car"), &json!({"name": "tempo", "size": 250}));
        assert_eq!(record.class(), Some("Car"));
        assert_eq!(record.field("size"), Some(&Value::Integer(250)));
        assert!(record.field("color").is_none());
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut record = Record::new().with_field("a", 1).with_field("b", 2);
        record.set("a", 10);
        assert_eq!(record.field_names(), vec!["a", "b"]);
        assert_eq!(record.field("a"), Some(&Value::Integer(10)));
        assert_eq!(record.remove("a"), Some(Value::Integer(10)));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_null_field_is_present() {
        let record = Record::new().with_field("name", Value::Null);
        assert!(record.has_field("name"));
        assert_eq!(record.to_json(), json!({"name": null}));
    }

    #[test]
    fn test_to_json_includes_identity() {
        let record = Record::of_class("Car")
            .with_id(RecordId::new(9, 0))
            .with_field("name", "tempo");
        let json = record.to_json();
        assert_eq!(json["@rid"], "#9:0");
        assert_eq!(json["@class"], "Car");
        assert_eq!(json["name"], "tempo");
    }
}

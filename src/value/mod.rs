//! Value model
//!
//! Values flowing through expression evaluation: scalars, identity links,
//! collections and embedded documents.
//!
//! Two notions of equality coexist:
//!
//! - `PartialEq`/`Eq`/`Hash` are structural (floats by bit pattern) and are
//!   what group-by keys use.
//! - [`loose_eq`] coerces numbers and links and is what predicates use.

mod compare;

pub use compare::{compare_numeric, loose_eq, natural_cmp};

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::Record;

/// Record identity: `#cluster:position`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId {
    pub cluster: u32,
    pub position: u64,
}

impl RecordId {
    pub fn new(cluster: u32, position: u64) -> Self {
        Self { cluster, position }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.cluster, self.position)
    }
}

impl FromStr for RecordId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.strip_prefix('#').unwrap_or(s);
        let (cluster, position) = body
            .split_once(':')
            .ok_or_else(|| format!("invalid record id '{}'", s))?;
        let cluster = cluster
            .parse()
            .map_err(|_| format!("invalid cluster in record id '{}'", s))?;
        let position = position
            .parse()
            .map_err(|_| format!("invalid position in record id '{}'", s))?;
        Ok(RecordId { cluster, position })
    }
}

/// A value produced or consumed by expression evaluation
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Date(DateTime<Utc>),
    Link(RecordId),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Document(Box<Record>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    /// True only for `Bool(true)`; predicates treat everything else as a miss
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Identity of a link or of an embedded document that has one
    pub fn as_record_id(&self) -> Option<RecordId> {
        match self {
            Value::Link(rid) => Some(*rid),
            Value::Document(doc) => doc.id(),
            _ => None,
        }
    }

    /// Name of the value's type, as reported by the `type()` method
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Integer(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::String(_) => "STRING",
            Value::Date(_) => "DATETIME",
            Value::Link(_) => "LINK",
            Value::List(_) => "LIST",
            Value::Map(_) => "MAP",
            Value::Document(_) => "DOCUMENT",
        }
    }

    /// Flattens a collection into its items; a scalar becomes one item and
    /// null becomes none.
    pub fn into_items(self) -> Vec<Value> {
        match self {
            Value::Null => Vec::new(),
            Value::List(items) => items,
            Value::Map(map) => map.into_values().collect(),
            other => vec![other],
        }
    }

    /// String form used by concatenation and `asString()`
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Converts a JSON value; integral numbers become `Integer`
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Converts to JSON; links and dates become strings
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Date(d) => serde_json::Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Value::Link(rid) => serde_json::Value::String(rid.to_string()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Document(doc) => doc.to_json(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Link(a), Value::Link(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Document(a), Value::Document(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::String(s) => s.hash(state),
            Value::Date(d) => d.hash(state),
            Value::Link(rid) => rid.hash(state),
            Value::List(items) => items.hash(state),
            Value::Map(map) => map.hash(state),
            Value::Document(doc) => doc.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            Value::Date(d) => write!(f, "{}", d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Value::Link(rid) => write!(f, "{}", rid),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{}': {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Document(doc) => write!(f, "{}", doc.to_json()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<RecordId> for Value {
    fn from(v: RecordId) -> Self {
        Value::Link(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Document(Box::new(v))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::from_json(&v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_record_id_round_trip() {
        let rid: RecordId = "#12:7".parse().unwrap();
        assert_eq!(rid, RecordId::new(12, 7));
        assert_eq!(rid.to_string(), "#12:7");
        assert!("12-7".parse::<RecordId>().is_err());
    }

    #[test]
    fn test_from_json_keeps_integers() {
        let v = Value::from_json(&json!({"size": 250, "ratio": 0.5, "tags": ["a"]}));
        match v {
            Value::Map(map) => {
                assert_eq!(map["size"], Value::Integer(250));
                assert_eq!(map["ratio"], Value::Float(0.5));
                assert_eq!(map["tags"], Value::List(vec![Value::from("a")]));
            }
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_structural_hash_for_group_keys() {
        let mut keys = HashSet::new();
        keys.insert(vec![Value::from("tempo"), Value::Null]);
        keys.insert(vec![Value::from("tempo"), Value::Null]);
        keys.insert(vec![Value::from("tempo"), Value::Integer(1)]);
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_structural_eq_is_strict_on_numbers() {
        assert_ne!(Value::Integer(5), Value::Float(5.0));
        assert!(loose_eq(&Value::Integer(5), &Value::Float(5.0)));
    }

    #[test]
    fn test_into_items() {
        assert!(Value::Null.into_items().is_empty());
        assert_eq!(Value::from(3).into_items(), vec![Value::Integer(3)]);
        assert_eq!(Value::from(vec![1, 2]).into_items().len(), 2);
    }
}

//! BTreeMap-based index structures
//!
//! Indexes use BTreeMap<IndexKey, Vec<RecordId>> for deterministic ordering.
//! Identities under one key are always sorted ascending.

use std::collections::BTreeMap;

use crate::value::{RecordId, Value};

/// Index key representing a single field value.
///
/// Ordering is deterministic: Bool < Int < Float < String < Date < Link.
/// Integral floats are keyed as integers so `5` and `5.0` find each other.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKey {
    Bool(bool),
    Int(i64),
    /// f64 bits rearranged for total ordering
    Float(u64),
    String(String),
    /// Seconds since epoch and the sub-second nanoseconds
    Date(i64, u32),
    Link(RecordId),
}

impl IndexKey {
    /// Create a key from a float, using bit representation for total ordering
    pub fn from_float(v: f64) -> Self {
        if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
            return IndexKey::Int(v as i64);
        }
        let bits = v.to_bits();
        let ordered = if (bits >> 63) == 1 {
            !bits
        } else {
            bits ^ (1 << 63)
        };
        IndexKey::Float(ordered)
    }

    /// Create a key from a value; null and collections are not indexed
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(IndexKey::Bool(*b)),
            Value::Integer(i) => Some(IndexKey::Int(*i)),
            Value::Float(f) => Some(IndexKey::from_float(*f)),
            Value::String(s) => Some(IndexKey::String(s.clone())),
            Value::Date(d) => Some(IndexKey::Date(d.timestamp(), d.timestamp_subsec_nanos())),
            Value::Link(rid) => Some(IndexKey::Link(*rid)),
            Value::Document(doc) => doc.id().map(IndexKey::Link),
            Value::Null | Value::List(_) | Value::Map(_) => None,
        }
    }

    /// Key for a point lookup, only when key equality agrees with predicate
    /// equality for every stored value.
    ///
    /// Numbers at or beyond 2^53 compare through `f64` in predicates and
    /// may equal a different integer key, NaN never equals itself, and a
    /// document compares structurally rather than by identity. None of
    /// these can be answered from the index.
    pub fn exact(value: &Value) -> Option<Self> {
        let exact_float = |f: f64| !f.is_nan() && f.abs() < EXACT_LIMIT;
        match value {
            Value::Integer(i) if !exact_float(*i as f64) => None,
            Value::Float(f) if !exact_float(*f) => None,
            Value::Document(_) => None,
            other => Self::from_value(other),
        }
    }
}

/// 2^53, the end of the range where every integer is an exact `f64`
const EXACT_LIMIT: f64 = 9_007_199_254_740_992.0;

/// A single field index
#[derive(Debug, Default)]
pub struct IndexTree {
    tree: BTreeMap<IndexKey, Vec<RecordId>>,
}

impl IndexTree {
    pub fn new() -> Self {
        Self {
            tree: BTreeMap::new(),
        }
    }

    /// Insert an identity for a key, keeping identities sorted
    pub fn insert(&mut self, key: IndexKey, rid: RecordId) {
        let rids = self.tree.entry(key).or_default();
        if let Err(pos) = rids.binary_search(&rid) {
            rids.insert(pos, rid);
        }
    }

    /// Remove an identity for a key; drops the key once empty
    pub fn remove(&mut self, key: &IndexKey, rid: RecordId) {
        if let Some(rids) = self.tree.get_mut(key) {
            if let Ok(pos) = rids.binary_search(&rid) {
                rids.remove(pos);
            }
            if rids.is_empty() {
                self.tree.remove(key);
            }
        }
    }

    /// All identities for an exact key, sorted ascending
    pub fn lookup_eq(&self, key: &IndexKey) -> &[RecordId] {
        self.tree.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Number of distinct keys
    pub fn key_count(&self) -> usize {
        self.tree.len()
    }

    /// Total number of indexed identities
    pub fn entry_count(&self) -> usize {
        self.tree.values().map(Vec::len).sum()
    }
}

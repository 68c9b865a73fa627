//! Index collaborator
//!
//! The search optimizer only needs "find the index on (class, field)" and
//! "look up the identities for these keys". [`IndexManager`] provides both
//! over in-memory BTreeMap trees.
//!
//! # Design Principles
//!
//! - Derived state: indexes mirror the record store, never the source of truth
//! - Deterministic: BTreeMap iteration order, sorted identities
//! - Unique indexes reject a second identity for the same key

mod btree;
mod manager;

pub use btree::{IndexKey, IndexTree};
pub use manager::{FieldIndex, IndexManager};

use std::collections::BTreeSet;
use std::fmt;

use crate::errors::QueryResult;
use crate::value::{RecordId, Value};

/// Index uniqueness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Unique,
    NotUnique,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Unique => write!(f, "UNIQUE"),
            IndexKind::NotUnique => write!(f, "NOTUNIQUE"),
        }
    }
}

/// A single-field index over one class
pub trait RecordIndex {
    fn name(&self) -> &str;

    fn kind(&self) -> IndexKind;

    fn field(&self) -> &str;

    /// Identities matching any of the keys. Unindexable keys match nothing.
    fn lookup(&self, keys: &[Value]) -> QueryResult<BTreeSet<RecordId>>;
}

/// Resolves the index covering a field of a class
pub trait IndexProvider {
    fn find_index(&self, class: &str, field: &str) -> Option<&dyn RecordIndex>;
}

/// Provider for stores without indexes; every search evaluates
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIndexes;

impl IndexProvider for NoIndexes {
    fn find_index(&self, _class: &str, _field: &str) -> Option<&dyn RecordIndex> {
        None
    }
}

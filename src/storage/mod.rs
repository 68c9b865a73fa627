//! Record store collaborator
//!
//! The query engine never owns storage. It reads through [`RecordStore`],
//! which exposes the three primitives a select needs:
//!
//! - iterate identities of a class or cluster
//! - dereference an identity to its record
//! - resolve a dictionary key to an identity
//!
//! [`MemoryStore`] is the in-memory reference implementation used by the
//! tests and by embedders without a storage engine of their own.

mod memory;
mod record;

pub use memory::MemoryStore;
pub use record::Record;

use crate::errors::QueryResult;
use crate::value::RecordId;

/// Iterator over record identities produced by a store
pub type RidIter<'a> = Box<dyn Iterator<Item = QueryResult<RecordId>> + 'a>;

/// Read access to records
///
/// Iteration order is whatever the store provides; the engine assumes
/// nothing beyond it.
pub trait RecordStore {
    /// Identities of every record of a class, subclasses included
    fn browse_class(&self, class: &str) -> QueryResult<RidIter<'_>>;

    /// Identities of every record in a named cluster
    fn browse_cluster(&self, cluster: &str) -> QueryResult<RidIter<'_>>;

    /// Loads a record; `Ok(None)` if the identity does not exist
    fn load(&self, rid: RecordId) -> QueryResult<Option<Record>>;

    /// Resolves a dictionary key
    fn dictionary_get(&self, key: &str) -> QueryResult<Option<RecordId>>;

    /// True if `class` is `parent` or inherits from it
    fn is_subclass_of(&self, class: &str, parent: &str) -> bool {
        class.eq_ignore_ascii_case(parent)
    }
}

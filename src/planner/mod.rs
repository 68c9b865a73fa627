//! Search optimizer
//!
//! Classifies the identities a predicate can match, using the indexes of the
//! query target, so the executor can avoid a full scan.
//!
//! # Design Principles
//!
//! - Conservative: anything the optimizer cannot prove reports EVALUATE
//! - Unique indexes only: an equality on a uniquely indexed field is a point
//!   lookup; nothing else touches an index
//! - Deterministic: identity sets are ordered (`BTreeSet`)
//!
//! # Three-way classification
//!
//! - *included*: identities known to match, no evaluation needed
//! - *candidates*: identities that may match and must be evaluated
//! - *excluded*: identities known not to match
//!
//! AND combines both sides by set algebra. OR is only reduced when the
//! `optimize_or` flag is on, and then only for two inclusion-style sides.

mod optimizer;
mod search;

pub use optimizer::SearchContext;
pub use search::{IdSet, SearchResult, SearchState};

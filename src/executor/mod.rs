//! Query Executor subsystem
//!
//! Runs SELECT queries over a record store.
//!
//! # Execution modes
//!
//! - Streaming: no GROUP BY, ORDER BY or aggregate projection. Each record is
//!   filtered, skipped or projected and emitted before the next is read;
//!   the scan stops as soon as the limit is reached.
//! - Buffered: every match is collected first, then grouped, sorted and
//!   limited, then emitted in one pass.
//!
//! # Invariants
//!
//! - The query template is never evaluated; each execution works on a copy
//! - Each group evaluates its own projection copies
//! - Sorting is stable; incomparable values tie unless configured to fail
//! - A listener returning false stops the scan without an error

mod executor;
mod group;
mod listener;
mod query;
mod sorter;
mod source;
mod stream;

pub use executor::QueryExecutor;
pub use listener::{CollectingListener, ExecutionStats, ResultListener};
pub use query::{OrderItem, SelectQuery, SortDirection, Target};
pub use sorter::ResultSorter;
pub use stream::SelectStream;

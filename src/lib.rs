//! aeroql - predicate and projection evaluation for a record store
//!
//! Expression trees over records, the visitors that copy, simplify and bind
//! them, an index-aware search optimizer, and a SELECT engine that streams
//! rows to a listener.
//!
//! # Design Principles
//!
//! - Callables are pluggable through one registry; the node set is closed
//! - Every execution works on its own copy of the query
//! - Index pruning never changes the result set, only the work done
//! - Errors carry a stable code and a category

pub mod callable;
pub mod command;
pub mod config;
pub mod errors;
pub mod executor;
pub mod expr;
pub mod index;
pub mod observability;
pub mod planner;
pub mod storage;
pub mod value;
pub mod visitor;

pub use callable::CallableRegistry;
pub use command::{CommandExecutor, CommandFactory, CommandRegistry, SelectCommand};
pub use config::EngineConfig;
pub use errors::{ErrorKind, QueryError, QueryResult};
pub use executor::{QueryExecutor, ResultListener, SelectQuery, SortDirection, Target};
pub use expr::{EvalContext, Expr};
pub use index::{IndexKind, IndexManager, IndexProvider};
pub use storage::{MemoryStore, Record, RecordStore};
pub use value::{RecordId, Value};
pub use visitor::{CopyVisitor, ParameterResolver, Parameters, SimplifyVisitor};

//! Expression tree
//!
//! A closed set of node kinds evaluated against an optional candidate record.
//!
//! # Design Principles
//!
//! - Closed node set, open callables: functions, methods and operators come
//!   from the callable registry
//! - Every node reports two purity flags; a node that is both context-free
//!   and document-free is static and may be folded to a literal
//! - Trees are not `Clone`: aggregate state is never shared between copies
//!
//! # Purity overrides
//!
//! - A name or path is never document-free
//! - A variable or unresolved parameter is never context-free
//! - A function in aggregation mode is never document-free
//! - A non-deterministic function is never context-free

mod context;
mod display;
mod eval;
mod node;
mod pattern;

pub use context::{record_field, EvalContext};
pub use node::{CompareOp, Expr, ExprKind, FunctionCall, MethodCall, Parameter};
pub use pattern::PatternCache;

pub(crate) use eval::compare;
pub(crate) use pattern::{anchored, like_to_regex};

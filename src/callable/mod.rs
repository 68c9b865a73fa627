//! Callable registry subsystem
//!
//! Functions, methods and operators live outside the closed expression node
//! set. Each kind has a trait for implementations, a factory trait for
//! pluggable discovery, and a handle type that expression nodes hold.
//!
//! # Aggregation
//!
//! A function invoked with exactly one argument may run in aggregation mode:
//! every `execute` call folds one more candidate into private running state.
//! With more arguments the same function computes inline over the current
//! record only.
//!
//! Registry-owned [`FunctionPrototype`]s cannot be executed. Expression nodes
//! hold a [`BoundFunction`], obtained by binding a prototype or by copying
//! another bound function, and both paths start from empty state.

mod functions;
mod methods;
mod operators;
mod registry;

pub use functions::BuiltinFunctions;
pub use methods::BuiltinMethods;
pub use operators::BuiltinOperators;
pub use registry::CallableRegistry;

use std::fmt;
use std::sync::Arc;

use crate::errors::{QueryError, QueryResult};
use crate::expr::EvalContext;
use crate::storage::Record;
use crate::value::Value;

/// What a callable sees of the evaluation in progress
pub struct CallContext<'a, 'b> {
    pub eval: &'a EvalContext<'b>,
    pub candidate: Option<&'a Record>,
}

/// A named function over N evaluated arguments
pub trait SqlFunction: Send + Sync {
    fn name(&self) -> &str;

    fn min_args(&self) -> usize;

    /// `None` means unbounded
    fn max_args(&self) -> Option<usize>;

    /// True if invoking with `arg_count` arguments accumulates across calls
    fn aggregates(&self, _arg_count: usize) -> bool {
        false
    }

    /// False for functions whose result depends on the clock or randomness
    fn is_deterministic(&self) -> bool {
        true
    }

    fn execute(&mut self, args: &[Value], ctx: &CallContext<'_, '_>) -> QueryResult<Value>;

    /// A new instance of the same function with empty state
    fn fresh(&self) -> Box<dyn SqlFunction>;
}

/// A function whose implicit first argument is the value it is invoked on
pub trait SqlMethod: Send + Sync {
    fn name(&self) -> &str;

    fn min_args(&self) -> usize;

    fn max_args(&self) -> Option<usize>;

    fn execute(&self, source: &Value, args: &[Value], ctx: &CallContext<'_, '_>) -> QueryResult<Value>;
}

/// A named binary predicate or arithmetic operator
pub trait SqlOperator: Send + Sync {
    fn keyword(&self) -> &str;

    fn evaluate(&self, left: &Value, right: &Value, ctx: &CallContext<'_, '_>) -> QueryResult<Value>;
}

/// Pluggable source of functions
pub trait FunctionFactory: Send + Sync {
    fn function_names(&self) -> Vec<String>;

    fn has_function(&self, name: &str) -> bool {
        self.function_names().iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    fn create_function(&self, name: &str) -> Option<Box<dyn SqlFunction>>;
}

/// Pluggable source of methods
pub trait MethodFactory: Send + Sync {
    fn method_names(&self) -> Vec<String>;

    fn has_method(&self, name: &str) -> bool {
        self.method_names().iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    fn create_method(&self, name: &str) -> Option<Arc<dyn SqlMethod>>;
}

/// Pluggable source of operators
pub trait OperatorFactory: Send + Sync {
    fn operator_names(&self) -> Vec<String>;

    fn has_operator(&self, name: &str) -> bool {
        self.operator_names().iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    fn create_operator(&self, name: &str) -> Option<Arc<dyn SqlOperator>>;
}

pub(crate) fn check_arity(name: &str, min: usize, max: Option<usize>, given: usize) -> QueryResult<()> {
    if given < min || max.map(|m| given > m).unwrap_or(false) {
        return Err(QueryError::argument_count(name, min, max, given));
    }
    Ok(())
}

/// Registry-owned function definition. It can be inspected and bound, never executed.
#[derive(Clone)]
pub struct FunctionPrototype {
    inner: Arc<dyn SqlFunction>,
}

impl FunctionPrototype {
    pub fn new(function: Box<dyn SqlFunction>) -> Self {
        Self {
            inner: Arc::from(function),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn min_args(&self) -> usize {
        self.inner.min_args()
    }

    pub fn max_args(&self) -> Option<usize> {
        self.inner.max_args()
    }

    /// Checks arity and produces an executable instance with empty state
    pub fn bind(&self, arg_count: usize) -> QueryResult<BoundFunction> {
        check_arity(self.name(), self.min_args(), self.max_args(), arg_count)?;
        Ok(BoundFunction {
            instance: self.inner.fresh(),
        })
    }
}

impl fmt::Debug for FunctionPrototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionPrototype({})", self.name())
    }
}

/// A function instance owned by one expression node
pub struct BoundFunction {
    instance: Box<dyn SqlFunction>,
}

impl BoundFunction {
    pub fn name(&self) -> &str {
        self.instance.name()
    }

    pub fn aggregates(&self, arg_count: usize) -> bool {
        self.instance.aggregates(arg_count)
    }

    pub fn is_deterministic(&self) -> bool {
        self.instance.is_deterministic()
    }

    pub fn execute(&mut self, args: &[Value], ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
        self.instance.execute(args, ctx)
    }

    /// Copies the function, never its accumulated state
    pub fn copy(&self) -> BoundFunction {
        BoundFunction {
            instance: self.instance.fresh(),
        }
    }
}

impl fmt::Debug for BoundFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoundFunction({})", self.name())
    }
}

/// Shared handle to a stateless method
#[derive(Clone)]
pub struct MethodHandle(Arc<dyn SqlMethod>);

impl MethodHandle {
    pub fn new(method: Arc<dyn SqlMethod>) -> Self {
        Self(method)
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    /// Arity check on the explicit arguments
    pub fn check_arity(&self, arg_count: usize) -> QueryResult<()> {
        check_arity(self.0.name(), self.0.min_args(), self.0.max_args(), arg_count)
    }

    pub fn execute(&self, source: &Value, args: &[Value], ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
        self.0.execute(source, args, ctx)
    }
}

impl fmt::Debug for MethodHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodHandle({})", self.name())
    }
}

/// Shared handle to a stateless operator
#[derive(Clone)]
pub struct OperatorHandle(Arc<dyn SqlOperator>);

impl OperatorHandle {
    pub fn new(operator: Arc<dyn SqlOperator>) -> Self {
        Self(operator)
    }

    pub fn keyword(&self) -> &str {
        self.0.keyword()
    }

    pub fn evaluate(&self, left: &Value, right: &Value, ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
        self.0.evaluate(left, right, ctx)
    }
}

impl fmt::Debug for OperatorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OperatorHandle({})", self.keyword())
    }
}

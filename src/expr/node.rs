//! Expression node types and builders

use super::pattern::PatternCache;
use crate::callable::{BoundFunction, CallableRegistry, MethodHandle, OperatorHandle};
use crate::errors::QueryResult;
use crate::value::Value;

/// The six comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Equals,
    NotEquals,
    Inferior,
    InferiorEquals,
    Superior,
    SuperiorEquals,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Equals => "=",
            CompareOp::NotEquals => "<>",
            CompareOp::Inferior => "<",
            CompareOp::InferiorEquals => "<=",
            CompareOp::Superior => ">",
            CompareOp::SuperiorEquals => ">=",
        }
    }
}

/// A `?` or `:name` placeholder awaiting a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: Option<String>,
}

/// A function call node; owns its bound instance
#[derive(Debug)]
pub struct FunctionCall {
    pub(crate) function: BoundFunction,
    pub(crate) args: Vec<Expr>,
}

impl FunctionCall {
    pub fn name(&self) -> &str {
        self.function.name()
    }

    pub fn args(&self) -> &[Expr] {
        &self.args
    }

    /// True when this call accumulates across candidates
    pub fn is_aggregating(&self) -> bool {
        self.function.aggregates(self.args.len())
    }
}

/// A method call node; the source is held by the enclosing variant
#[derive(Debug)]
pub struct MethodCall {
    pub(crate) method: MethodHandle,
    pub(crate) args: Vec<Expr>,
}

impl MethodCall {
    pub fn name(&self) -> &str {
        self.method.name()
    }

    pub fn args(&self) -> &[Expr] {
        &self.args
    }
}

/// Closed set of expression node kinds
#[derive(Debug)]
pub enum ExprKind {
    Literal(Value),
    /// Field of the candidate record
    Name(String),
    /// Dotted field path, dereferencing links at each step
    Path(Vec<String>),
    /// Context variable, `$name`
    Variable(String),
    Parameter(Parameter),
    Collection(Vec<Expr>),
    Map(Vec<(String, Expr)>),
    Function(FunctionCall),
    Method {
        source: Box<Expr>,
        call: MethodCall,
    },
    Operator {
        operator: OperatorHandle,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Like {
        value: Box<Expr>,
        pattern: Box<Expr>,
        matcher: PatternCache,
    },
    Between {
        value: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
    },
    In {
        value: Box<Expr>,
        set: Box<Expr>,
    },
    IsNull(Box<Expr>),
    IsNotNull(Box<Expr>),
    /// `source[filter]`
    Filtered {
        source: Box<Expr>,
        filter: Box<Expr>,
    },
    /// Always true
    Include,
    /// Always false
    Exclude,
}

/// An expression node with its optional projection alias.
///
/// Not `Clone`: trees holding aggregate state are duplicated only through
/// the copy visitor, which gives every function a fresh instance.
#[derive(Debug)]
pub struct Expr {
    pub(crate) kind: ExprKind,
    pub(crate) alias: Option<String>,
}

impl From<ExprKind> for Expr {
    fn from(kind: ExprKind) -> Self {
        Expr { kind, alias: None }
    }
}

impl Expr {
    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub(crate) fn with_alias_opt(mut self, alias: Option<String>) -> Self {
        self.alias = alias;
        self
    }

    // ========================================================================
    // Builders
    // ========================================================================

    pub fn literal(value: impl Into<Value>) -> Self {
        ExprKind::Literal(value.into()).into()
    }

    pub fn name(name: impl Into<String>) -> Self {
        ExprKind::Name(name.into()).into()
    }

    /// `a.b.c`; a single segment is a plain name
    pub fn path(path: &str) -> Self {
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.len() == 1 {
            return Expr::name(path);
        }
        ExprKind::Path(segments).into()
    }

    pub fn variable(name: impl Into<String>) -> Self {
        ExprKind::Variable(name.into()).into()
    }

    /// Anonymous positional parameter, `?`
    pub fn param() -> Self {
        ExprKind::Parameter(Parameter { name: None }).into()
    }

    /// Named parameter, `:name`
    pub fn named_param(name: impl Into<String>) -> Self {
        ExprKind::Parameter(Parameter {
            name: Some(name.into()),
        })
        .into()
    }

    pub fn list(items: Vec<Expr>) -> Self {
        ExprKind::Collection(items).into()
    }

    pub fn map(entries: Vec<(String, Expr)>) -> Self {
        ExprKind::Map(entries).into()
    }

    pub fn include() -> Self {
        ExprKind::Include.into()
    }

    pub fn exclude() -> Self {
        ExprKind::Exclude.into()
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        ExprKind::And(Box::new(left), Box::new(right)).into()
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        ExprKind::Or(Box::new(left), Box::new(right)).into()
    }

    pub fn not(inner: Expr) -> Self {
        ExprKind::Not(Box::new(inner)).into()
    }

    pub fn compare(op: CompareOp, left: Expr, right: Expr) -> Self {
        ExprKind::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
        .into()
    }

    pub fn eq(left: Expr, right: Expr) -> Self {
        Expr::compare(CompareOp::Equals, left, right)
    }

    pub fn ne(left: Expr, right: Expr) -> Self {
        Expr::compare(CompareOp::NotEquals, left, right)
    }

    pub fn lt(left: Expr, right: Expr) -> Self {
        Expr::compare(CompareOp::Inferior, left, right)
    }

    pub fn le(left: Expr, right: Expr) -> Self {
        Expr::compare(CompareOp::InferiorEquals, left, right)
    }

    pub fn gt(left: Expr, right: Expr) -> Self {
        Expr::compare(CompareOp::Superior, left, right)
    }

    pub fn ge(left: Expr, right: Expr) -> Self {
        Expr::compare(CompareOp::SuperiorEquals, left, right)
    }

    pub fn like(value: Expr, pattern: Expr) -> Self {
        ExprKind::Like {
            value: Box::new(value),
            pattern: Box::new(pattern),
            matcher: PatternCache::new(),
        }
        .into()
    }

    pub fn between(value: Expr, low: Expr, high: Expr) -> Self {
        ExprKind::Between {
            value: Box::new(value),
            low: Box::new(low),
            high: Box::new(high),
        }
        .into()
    }

    pub fn in_(value: Expr, set: Expr) -> Self {
        ExprKind::In {
            value: Box::new(value),
            set: Box::new(set),
        }
        .into()
    }

    pub fn is_null(inner: Expr) -> Self {
        ExprKind::IsNull(Box::new(inner)).into()
    }

    pub fn is_not_null(inner: Expr) -> Self {
        ExprKind::IsNotNull(Box::new(inner)).into()
    }

    pub fn filtered(source: Expr, filter: Expr) -> Self {
        ExprKind::Filtered {
            source: Box::new(source),
            filter: Box::new(filter),
        }
        .into()
    }

    /// Function call; resolves the name and checks the argument count
    pub fn function(registry: &CallableRegistry, name: &str, args: Vec<Expr>) -> QueryResult<Self> {
        let function = registry.function(name)?.bind(args.len())?;
        Ok(ExprKind::Function(FunctionCall { function, args }).into())
    }

    /// Method call on this expression; checks the explicit argument count
    pub fn method(self, registry: &CallableRegistry, name: &str, args: Vec<Expr>) -> QueryResult<Self> {
        let method = registry.method(name)?;
        method.check_arity(args.len())?;
        Ok(ExprKind::Method {
            source: Box::new(self),
            call: MethodCall { method, args },
        }
        .into())
    }

    /// Binary operator by keyword
    pub fn operator(registry: &CallableRegistry, keyword: &str, left: Expr, right: Expr) -> QueryResult<Self> {
        let operator = registry.operator(keyword)?;
        Ok(ExprKind::Operator {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
        .into())
    }

    // ========================================================================
    // Structure
    // ========================================================================

    /// Direct children in evaluation order
    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Literal(_)
            | ExprKind::Name(_)
            | ExprKind::Path(_)
            | ExprKind::Variable(_)
            | ExprKind::Parameter(_)
            | ExprKind::Include
            | ExprKind::Exclude => Vec::new(),
            ExprKind::Collection(items) => items.iter().collect(),
            ExprKind::Map(entries) => entries.iter().map(|(_, e)| e).collect(),
            ExprKind::Function(call) => call.args.iter().collect(),
            ExprKind::Method { source, call } => {
                std::iter::once(source.as_ref()).chain(call.args.iter()).collect()
            }
            ExprKind::Operator { left, right, .. }
            | ExprKind::And(left, right)
            | ExprKind::Or(left, right)
            | ExprKind::Compare { left, right, .. } => vec![&**left, &**right],
            ExprKind::Like { value, pattern, .. } => vec![&**value, &**pattern],
            ExprKind::Between { value, low, high } => vec![&**value, &**low, &**high],
            ExprKind::In { value, set } => vec![&**value, &**set],
            ExprKind::Not(inner) | ExprKind::IsNull(inner) | ExprKind::IsNotNull(inner) => vec![&**inner],
            ExprKind::Filtered { source, filter } => vec![&**source, &**filter],
        }
    }

    // ========================================================================
    // Purity
    // ========================================================================

    /// Result does not depend on parameters, variables, clock or randomness
    pub fn is_context_free(&self) -> bool {
        match &self.kind {
            ExprKind::Variable(_) | ExprKind::Parameter(_) => false,
            ExprKind::Function(call) if !call.function.is_deterministic() => false,
            _ => self.children().iter().all(|c| c.is_context_free()),
        }
    }

    /// Result does not depend on the candidate record
    pub fn is_document_free(&self) -> bool {
        match &self.kind {
            ExprKind::Name(_) | ExprKind::Path(_) => false,
            ExprKind::Function(call) if call.is_aggregating() => false,
            _ => self.children().iter().all(|c| c.is_document_free()),
        }
    }

    /// Both context-free and document-free: may be evaluated once
    pub fn is_static(&self) -> bool {
        self.is_context_free() && self.is_document_free()
    }

    /// True if this tree holds a function in aggregation mode
    pub fn is_aggregate(&self) -> bool {
        match &self.kind {
            ExprKind::Function(call) if call.is_aggregating() => true,
            _ => self.children().iter().any(|c| c.is_aggregate()),
        }
    }

    /// Output field name: the alias, else a name derived from the node
    pub fn output_name(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        match &self.kind {
            ExprKind::Name(name) => name.clone(),
            ExprKind::Path(segments) => segments.last().cloned().unwrap_or_default(),
            ExprKind::Variable(name) => name.clone(),
            ExprKind::Function(call) => call.name().to_string(),
            ExprKind::Method { call, .. } => call.name().to_string(),
            _ => self.to_string(),
        }
    }

    /// Equality shape `field = literal` or `literal = field`
    pub fn as_field_equality(&self) -> Option<(&str, &Value)> {
        match &self.kind {
            ExprKind::Compare {
                op: CompareOp::Equals,
                left,
                right,
            } => match (&left.kind, &right.kind) {
                (ExprKind::Name(field), ExprKind::Literal(value))
                | (ExprKind::Literal(value), ExprKind::Name(field)) => Some((field.as_str(), value)),
                _ => None,
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purity_of_leaves() {
        assert!(Expr::literal(1).is_static());
        assert!(!Expr::name("size").is_document_free());
        assert!(Expr::name("size").is_context_free());
        assert!(!Expr::variable("x").is_context_free());
        assert!(Expr::variable("x").is_document_free());
        assert!(!Expr::param().is_context_free());
    }

    #[test]
    fn test_purity_of_composites() {
        let pure = Expr::gt(Expr::literal(3), Expr::literal(2));
        assert!(pure.is_static());
        let dynamic = Expr::and(Expr::include(), Expr::gt(Expr::name("size"), Expr::literal(2)));
        assert!(!dynamic.is_static());
    }

    #[test]
    fn test_function_purity() {
        let registry = CallableRegistry::with_builtins();
        let aggregate = Expr::function(&registry, "sum", vec![Expr::literal(1)]).unwrap();
        assert!(!aggregate.is_document_free());
        assert!(aggregate.is_aggregate());

        let inline = Expr::function(&registry, "sum", vec![Expr::literal(1), Expr::literal(2)]).unwrap();
        assert!(inline.is_static());
        assert!(!inline.is_aggregate());

        let clock = Expr::function(&registry, "sysdate", vec![]).unwrap();
        assert!(!clock.is_context_free());
    }

    #[test]
    fn test_definition_errors() {
        let registry = CallableRegistry::with_builtins();
        assert!(Expr::function(&registry, "nope", vec![]).unwrap_err().is_definition_error());
        assert!(Expr::function(&registry, "abs", vec![]).unwrap_err().is_definition_error());
        let err = Expr::name("name")
            .method(&registry, "charAt", vec![])
            .unwrap_err();
        assert_eq!(err.code(), "AERO_QUERY_ARGUMENT_COUNT");
        assert!(Expr::operator(&registry, "NOPE", Expr::literal(1), Expr::literal(2)).is_err());
    }

    #[test]
    fn test_output_name() {
        assert_eq!(Expr::name("name").output_name(), "name");
        assert_eq!(Expr::name("name").with_alias("brand").output_name(), "brand");
        assert_eq!(Expr::path("engine.power").output_name(), "power");
    }

    #[test]
    fn test_field_equality_shape() {
        let e = Expr::eq(Expr::literal("tempo"), Expr::name("name"));
        assert_eq!(e.as_field_equality(), Some(("name", &Value::from("tempo"))));
        assert!(Expr::lt(Expr::name("a"), Expr::literal(1)).as_field_equality().is_none());
    }
}

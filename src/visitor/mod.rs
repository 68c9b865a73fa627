//! Expression visitors
//!
//! Double dispatch over the closed node set. [`Expr::accept`] routes each
//! node to the visitor method for its family; transformations rebuild the
//! node from visited children with [`Expr::rebuild`].
//!
//! Three transformations ship with the crate:
//!
//! - [`CopyVisitor`]: independent deep copy, fresh function state
//! - [`SimplifyVisitor`]: boolean folding and static evaluation
//! - [`ParameterResolver`]: substitutes parameter values

mod copy;
mod params;
mod simplify;

pub use copy::CopyVisitor;
pub use params::{ParameterCursor, ParameterResolver, Parameters};
pub use simplify::SimplifyVisitor;

use crate::errors::QueryResult;
use crate::expr::{Expr, ExprKind, FunctionCall, MethodCall, Parameter, PatternCache};

/// Visitor over expression nodes
pub trait ExprVisitor {
    /// Caller-supplied state threaded through the traversal
    type Data;
    type Output;

    /// Literals, names, paths, variables and the include/exclude sentinels
    fn visit_leaf(&mut self, node: &Expr, data: &mut Self::Data) -> QueryResult<Self::Output>;

    fn visit_parameter(
        &mut self,
        node: &Expr,
        parameter: &Parameter,
        data: &mut Self::Data,
    ) -> QueryResult<Self::Output>;

    fn visit_function(
        &mut self,
        node: &Expr,
        call: &FunctionCall,
        data: &mut Self::Data,
    ) -> QueryResult<Self::Output>;

    fn visit_method(
        &mut self,
        node: &Expr,
        source: &Expr,
        call: &MethodCall,
        data: &mut Self::Data,
    ) -> QueryResult<Self::Output>;

    fn visit_operator(&mut self, node: &Expr, data: &mut Self::Data) -> QueryResult<Self::Output>;

    /// Boolean combinators, comparisons and null tests
    fn visit_condition(&mut self, node: &Expr, data: &mut Self::Data) -> QueryResult<Self::Output>;

    /// Collections, maps and filtered sub-collections
    fn visit_composite(&mut self, node: &Expr, data: &mut Self::Data) -> QueryResult<Self::Output>;
}

fn boxed(f: &mut dyn FnMut(&Expr) -> QueryResult<Expr>, child: &Expr) -> QueryResult<Box<Expr>> {
    Ok(Box::new(f(child)?))
}

fn all(f: &mut dyn FnMut(&Expr) -> QueryResult<Expr>, children: &[Expr]) -> QueryResult<Vec<Expr>> {
    children.iter().map(|c| f(c)).collect()
}

impl Expr {
    /// Dispatches to the visitor method for this node's family
    pub fn accept<V: ExprVisitor + ?Sized>(&self, visitor: &mut V, data: &mut V::Data) -> QueryResult<V::Output> {
        match &self.kind {
            ExprKind::Literal(_)
            | ExprKind::Name(_)
            | ExprKind::Path(_)
            | ExprKind::Variable(_)
            | ExprKind::Include
            | ExprKind::Exclude => visitor.visit_leaf(self, data),
            ExprKind::Parameter(parameter) => visitor.visit_parameter(self, parameter, data),
            ExprKind::Function(call) => visitor.visit_function(self, call, data),
            ExprKind::Method { source, call } => visitor.visit_method(self, source, call, data),
            ExprKind::Operator { .. } => visitor.visit_operator(self, data),
            ExprKind::And(..)
            | ExprKind::Or(..)
            | ExprKind::Not(_)
            | ExprKind::Compare { .. }
            | ExprKind::Like { .. }
            | ExprKind::Between { .. }
            | ExprKind::In { .. }
            | ExprKind::IsNull(_)
            | ExprKind::IsNotNull(_) => visitor.visit_condition(self, data),
            ExprKind::Collection(_) | ExprKind::Map(_) | ExprKind::Filtered { .. } => {
                visitor.visit_composite(self, data)
            }
        }
    }

    /// Builds a new node of the same kind and alias, mapping every child
    /// through `f`. Leaves are duplicated; functions get a fresh instance.
    pub fn rebuild(&self, f: &mut dyn FnMut(&Expr) -> QueryResult<Expr>) -> QueryResult<Expr> {
        let kind = match &self.kind {
            ExprKind::Literal(value) => ExprKind::Literal(value.clone()),
            ExprKind::Name(name) => ExprKind::Name(name.clone()),
            ExprKind::Path(segments) => ExprKind::Path(segments.clone()),
            ExprKind::Variable(name) => ExprKind::Variable(name.clone()),
            ExprKind::Parameter(parameter) => ExprKind::Parameter(parameter.clone()),
            ExprKind::Include => ExprKind::Include,
            ExprKind::Exclude => ExprKind::Exclude,
            ExprKind::Collection(items) => ExprKind::Collection(all(f, items)?),
            ExprKind::Map(entries) => ExprKind::Map(
                entries
                    .iter()
                    .map(|(key, value)| -> QueryResult<(String, Expr)> { Ok((key.clone(), f(value)?)) })
                    .collect::<QueryResult<Vec<_>>>()?,
            ),
            ExprKind::Function(call) => ExprKind::Function(FunctionCall {
                function: call.function.copy(),
                args: all(f, &call.args)?,
            }),
            ExprKind::Method { source, call } => ExprKind::Method {
                source: boxed(f, source)?,
                call: MethodCall {
                    method: call.method.clone(),
                    args: all(f, &call.args)?,
                },
            },
            ExprKind::Operator { operator, left, right } => ExprKind::Operator {
                operator: operator.clone(),
                left: boxed(f, left)?,
                right: boxed(f, right)?,
            },
            ExprKind::And(left, right) => ExprKind::And(boxed(f, left)?, boxed(f, right)?),
            ExprKind::Or(left, right) => ExprKind::Or(boxed(f, left)?, boxed(f, right)?),
            ExprKind::Not(inner) => ExprKind::Not(boxed(f, inner)?),
            ExprKind::Compare { op, left, right } => ExprKind::Compare {
                op: *op,
                left: boxed(f, left)?,
                right: boxed(f, right)?,
            },
            ExprKind::Like { value, pattern, .. } => ExprKind::Like {
                value: boxed(f, value)?,
                pattern: boxed(f, pattern)?,
                matcher: PatternCache::new(),
            },
            ExprKind::Between { value, low, high } => ExprKind::Between {
                value: boxed(f, value)?,
                low: boxed(f, low)?,
                high: boxed(f, high)?,
            },
            ExprKind::In { value, set } => ExprKind::In {
                value: boxed(f, value)?,
                set: boxed(f, set)?,
            },
            ExprKind::IsNull(inner) => ExprKind::IsNull(boxed(f, inner)?),
            ExprKind::IsNotNull(inner) => ExprKind::IsNotNull(boxed(f, inner)?),
            ExprKind::Filtered { source, filter } => ExprKind::Filtered {
                source: boxed(f, source)?,
                filter: boxed(f, filter)?,
            },
        };
        Ok(Expr::from(kind).with_alias_opt(self.alias.clone()))
    }
}

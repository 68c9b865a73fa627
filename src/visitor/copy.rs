//! Structural copy
//!
//! The only way to duplicate an expression tree. Every function node in the
//! copy owns a new instance with empty accumulator state.

use super::ExprVisitor;
use crate::errors::QueryResult;
use crate::expr::{Expr, FunctionCall, MethodCall, Parameter};

#[derive(Debug, Default, Clone, Copy)]
pub struct CopyVisitor;

impl CopyVisitor {
    /// Deep-copies a tree
    pub fn copy(expr: &Expr) -> QueryResult<Expr> {
        expr.accept(&mut CopyVisitor, &mut ())
    }

    fn descend(&mut self, node: &Expr, data: &mut ()) -> QueryResult<Expr> {
        node.rebuild(&mut |child| child.accept(self, data))
    }
}

impl ExprVisitor for CopyVisitor {
    type Data = ();
    type Output = Expr;

    fn visit_leaf(&mut self, node: &Expr, data: &mut ()) -> QueryResult<Expr> {
        self.descend(node, data)
    }

    fn visit_parameter(&mut self, node: &Expr, _parameter: &Parameter, data: &mut ()) -> QueryResult<Expr> {
        self.descend(node, data)
    }

    fn visit_function(&mut self, node: &Expr, _call: &FunctionCall, data: &mut ()) -> QueryResult<Expr> {
        self.descend(node, data)
    }

    fn visit_method(&mut self, node: &Expr, _source: &Expr, _call: &MethodCall, data: &mut ()) -> QueryResult<Expr> {
        self.descend(node, data)
    }

    fn visit_operator(&mut self, node: &Expr, data: &mut ()) -> QueryResult<Expr> {
        self.descend(node, data)
    }

    fn visit_condition(&mut self, node: &Expr, data: &mut ()) -> QueryResult<Expr> {
        self.descend(node, data)
    }

    fn visit_composite(&mut self, node: &Expr, data: &mut ()) -> QueryResult<Expr> {
        self.descend(node, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callable::CallableRegistry;
    use crate::expr::EvalContext;
    use crate::value::Value;

    #[test]
    fn test_copy_is_structurally_equal() {
        let registry = CallableRegistry::with_builtins();
        let expr = Expr::and(
            Expr::gt(Expr::path("engine.power"), Expr::named_param("p")),
            Expr::operator(&registry, "CONTAINS", Expr::name("tags"), Expr::literal("red")).unwrap(),
        )
        .with_alias("flag");
        let copy = CopyVisitor::copy(&expr).unwrap();
        assert_eq!(copy.to_string(), expr.to_string());
        assert_eq!(copy.alias(), Some("flag"));
    }

    #[test]
    fn test_copies_never_share_accumulators() {
        let registry = CallableRegistry::with_builtins();
        let ctx = EvalContext::new();
        let mut original = Expr::function(&registry, "sum", vec![Expr::literal(10)]).unwrap();
        original.evaluate(&ctx, None).unwrap();
        original.evaluate(&ctx, None).unwrap();

        let mut first = CopyVisitor::copy(&original).unwrap();
        let mut second = CopyVisitor::copy(&original).unwrap();
        assert_eq!(first.evaluate(&ctx, None).unwrap(), Value::Integer(10));
        assert_eq!(first.evaluate(&ctx, None).unwrap(), Value::Integer(20));
        assert_eq!(second.evaluate(&ctx, None).unwrap(), Value::Integer(10));
        assert_eq!(original.evaluate(&ctx, None).unwrap(), Value::Integer(30));
    }
}

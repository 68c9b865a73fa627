//! Constant folding
//!
//! Copies the tree bottom-up and folds each rebuilt node:
//!
//! - `AND(x, true) -> x`, `AND(x, false|null) -> EXCLUDE`
//! - `OR(x, true) -> INCLUDE`, `OR(x, false|null) -> x`
//! - `NOT(static) -> INCLUDE | EXCLUDE`
//! - `literal = literal` and `literal <> literal` -> `INCLUDE | EXCLUDE`
//! - any other static node -> literal of its value, alias kept
//!
//! A static node whose evaluation fails is left as is, so the error surfaces
//! at execution time.

use super::ExprVisitor;
use crate::errors::QueryResult;
use crate::expr::{compare, CompareOp, EvalContext, Expr, ExprKind, FunctionCall, MethodCall, Parameter};

#[derive(Debug, Default, Clone, Copy)]
pub struct SimplifyVisitor;

impl SimplifyVisitor {
    /// Returns a simplified copy of the tree
    pub fn simplify(expr: &Expr) -> QueryResult<Expr> {
        expr.accept(&mut SimplifyVisitor, &mut ())
    }

    fn descend(&mut self, node: &Expr, data: &mut ()) -> QueryResult<Expr> {
        let rebuilt = node.rebuild(&mut |child| child.accept(self, data))?;
        Ok(fold(rebuilt))
    }
}

/// Static truth value of a folded operand, if it has one
fn truth(expr: &Expr) -> Option<bool> {
    match &expr.kind {
        ExprKind::Include => Some(true),
        ExprKind::Exclude => Some(false),
        ExprKind::Literal(value) if value.is_null() => Some(false),
        ExprKind::Literal(value) => value.as_bool(),
        _ => None,
    }
}

/// Unboxes a surviving operand, giving it the parent's alias if it had one
fn keep(node: Box<Expr>, alias: Option<String>) -> Expr {
    let mut node = *node;
    if alias.is_some() {
        node.alias = alias;
    }
    node
}

fn sentinel(value: bool, alias: Option<String>) -> Expr {
    let kind = if value { ExprKind::Include } else { ExprKind::Exclude };
    Expr::from(kind).with_alias_opt(alias)
}

fn fold(expr: Expr) -> Expr {
    let Expr { kind, alias } = expr;
    let kind = match kind {
        ExprKind::And(left, right) => match (truth(&left), truth(&right)) {
            (Some(false), _) | (_, Some(false)) => return sentinel(false, alias),
            (Some(true), _) => return keep(right, alias),
            (_, Some(true)) => return keep(left, alias),
            _ => ExprKind::And(left, right),
        },
        ExprKind::Or(left, right) => match (truth(&left), truth(&right)) {
            (Some(true), _) | (_, Some(true)) => return sentinel(true, alias),
            (Some(false), _) => return keep(right, alias),
            (_, Some(false)) => return keep(left, alias),
            _ => ExprKind::Or(left, right),
        },
        ExprKind::Not(inner) => match truth(&inner) {
            Some(value) => return sentinel(!value, alias),
            None => ExprKind::Not(inner),
        },
        ExprKind::Compare { op, left, right } => {
            if matches!(op, CompareOp::Equals | CompareOp::NotEquals) {
                if let (ExprKind::Literal(l), ExprKind::Literal(r)) = (&left.kind, &right.kind) {
                    return sentinel(compare(op, l, r), alias);
                }
            }
            ExprKind::Compare { op, left, right }
        }
        other => other,
    };

    let mut node = Expr::from(kind).with_alias_opt(alias);
    let folded = matches!(node.kind, ExprKind::Literal(_) | ExprKind::Include | ExprKind::Exclude);
    if !folded && node.is_static() {
        if let Ok(value) = node.evaluate(&EvalContext::new(), None) {
            return Expr::literal(value).with_alias_opt(node.alias.take());
        }
    }
    node
}

impl ExprVisitor for SimplifyVisitor {
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

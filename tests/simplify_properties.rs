//! Simplification and Boundary Properties
//!
//! Property tests for:
//! - Literal comparisons fold to the sentinel of their value
//! - Boolean identities fold away without changing the dynamic side
//! - Static arithmetic folds to the value it evaluates to
//! - Static trees evaluate the same under any context and candidate
//! - skip/limit over S records returns max(0, min(M, S - N)) rows

use aeroql::expr::ExprKind;
use aeroql::{
    CallableRegistry, EvalContext, Expr, MemoryStore, Parameters, QueryExecutor, Record, SelectQuery,
    SimplifyVisitor, Value,
};
use proptest::prelude::*;
use serde_json::json;

fn dynamic(n: i64) -> Expr {
    Expr::gt(Expr::name("size"), Expr::literal(n))
}

/// Shape of a static tree built from literals and deterministic callables
#[derive(Debug, Clone)]
enum Shape {
    Literal(i64),
    Sum(Box<Shape>, Box<Shape>),
    Abs(Box<Shape>),
    Plus(Box<Shape>, Box<Shape>),
    Greater(Box<Shape>, Box<Shape>),
}

fn shape() -> impl Strategy<Value = Shape> {
    (-100i64..100).prop_map(Shape::Literal).prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Shape::Sum(Box::new(a), Box::new(b))),
            inner.clone().prop_map(|a| Shape::Abs(Box::new(a))),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Shape::Plus(Box::new(a), Box::new(b))),
            (inner.clone(), inner).prop_map(|(a, b)| Shape::Greater(Box::new(a), Box::new(b))),
        ]
    })
}

fn build(registry: &CallableRegistry, shape: &Shape) -> Expr {
    match shape {
        Shape::Literal(n) => Expr::literal(*n),
        Shape::Sum(a, b) => Expr::function(registry, "sum", vec![build(registry, a), build(registry, b)]).unwrap(),
        Shape::Abs(a) => Expr::function(registry, "abs", vec![build(registry, a)]).unwrap(),
        Shape::Plus(a, b) => Expr::operator(registry, "+", build(registry, a), build(registry, b)).unwrap(),
        Shape::Greater(a, b) => Expr::gt(build(registry, a), build(registry, b)),
    }
}

proptest! {
    #[test]
    fn literal_equality_folds(a in -50i64..50, b in -50i64..50) {
        let folded = SimplifyVisitor::simplify(&Expr::eq(Expr::literal(a), Expr::literal(b))).unwrap();
        if a == b {
            prop_assert!(matches!(folded.kind(), ExprKind::Include));
        } else {
            prop_assert!(matches!(folded.kind(), ExprKind::Exclude));
        }
    }

    #[test]
    fn boolean_identities_keep_dynamic_side(n in -1000i64..1000, flag in any::<bool>()) {
        let expected = dynamic(n).to_string();

        let and = SimplifyVisitor::simplify(&Expr::and(Expr::literal(true), dynamic(n))).unwrap();
        prop_assert_eq!(and.to_string(), expected.clone());

        let or = SimplifyVisitor::simplify(&Expr::or(dynamic(n), Expr::literal(false))).unwrap();
        prop_assert_eq!(or.to_string(), expected);

        let absorbed = if flag {
            SimplifyVisitor::simplify(&Expr::or(dynamic(n), Expr::include())).unwrap()
        } else {
            SimplifyVisitor::simplify(&Expr::and(Expr::exclude(), dynamic(n))).unwrap()
        };
        if flag {
            prop_assert!(matches!(absorbed.kind(), ExprKind::Include));
        } else {
            prop_assert!(matches!(absorbed.kind(), ExprKind::Exclude));
        }
    }

    #[test]
    fn static_arithmetic_folds_to_its_value(a in -10_000i64..10_000, b in -10_000i64..10_000) {
        let registry = CallableRegistry::with_builtins();
        let mut expr = Expr::operator(&registry, "+", Expr::literal(a), Expr::literal(b)).unwrap();
        let folded = SimplifyVisitor::simplify(&expr).unwrap();
        let value = expr.evaluate(&EvalContext::new(), None).unwrap();
        prop_assert_eq!(value.clone(), Value::Integer(a + b));
        prop_assert!(matches!(folded.kind(), ExprKind::Literal(v) if *v == value));
    }

    #[test]
    fn static_trees_ignore_context_and_candidate(shape in shape(), n in any::<i64>(), label in "[a-z]{0,8}") {
        let registry = CallableRegistry::with_builtins();
        let mut expr = build(&registry, &shape);
        prop_assert!(expr.is_static());

        let bare = EvalContext::new();
        let mut bound = EvalContext::new();
        bound.set_variable("n", n);
        bound.set_variable("label", label.as_str());
        let record = Record::new().with_field("n", n).with_field("label", label.as_str());

        let expected = expr.evaluate(&bare, None).unwrap();
        prop_assert_eq!(expr.evaluate(&bound, None).unwrap(), expected.clone());
        prop_assert_eq!(expr.evaluate(&bare, Some(&record)).unwrap(), expected.clone());
        prop_assert_eq!(expr.evaluate(&bound, Some(&record)).unwrap(), expected);
    }

    #[test]
    fn skip_limit_boundary(size in 0usize..20, skip in 0u64..25, limit in -1i64..25) {
        let mut store = MemoryStore::new();
        store.create_class("Item", None).unwrap();
        for i in 0..size {
            store.insert_json("Item", &json!({"n": i})).unwrap();
        }
        let query = SelectQuery::from_class("Item").skip(skip).limit(limit);
        let rows = QueryExecutor::new(&store)
            .execute_collect(&query, &Parameters::new())
            .unwrap();

        let available = (size as i64 - skip as i64).max(0);
        let expected = if limit < 0 { available } else { available.min(limit) };
        prop_assert_eq!(rows.len() as i64, expected);
    }
}

//! Expression evaluation
//!
//! Evaluation takes `&mut self` because function nodes may accumulate.
//! Conditions never fail on type mismatches: a null or incomparable operand
//! makes the comparison false.

use std::cmp::Ordering;

use super::context::{record_field, EvalContext};
use super::node::{CompareOp, Expr, ExprKind};
use super::pattern::like_to_regex;
use crate::callable::CallContext;
use crate::errors::{QueryError, QueryResult};
use crate::storage::Record;
use crate::value::{loose_eq, natural_cmp, Value};

impl Expr {
    /// Evaluates the node against an optional candidate record
    pub fn evaluate(&mut self, ctx: &EvalContext<'_>, candidate: Option<&Record>) -> QueryResult<Value> {
        match &mut self.kind {
            ExprKind::Literal(value) => Ok(value.clone()),
            ExprKind::Name(name) => Ok(candidate.map(|r| record_field(r, name)).unwrap_or_default()),
            ExprKind::Path(segments) => {
                let (Some(record), Some((first, rest))) = (candidate, segments.split_first()) else {
                    return Ok(Value::Null);
                };
                let mut current = record_field(record, first);
                for segment in rest {
                    if current.is_null() {
                        break;
                    }
                    current = ctx.field_of(&current, segment)?;
                }
                Ok(current)
            }
            ExprKind::Variable(name) => Ok(ctx.variable(name).cloned().unwrap_or_default()),
            ExprKind::Parameter(parameter) => Err(match &parameter.name {
                Some(name) => QueryError::MissingParameter(name.clone()),
                None => QueryError::UnboundParameter,
            }),
            ExprKind::Collection(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items.iter_mut() {
                    values.push(item.evaluate(ctx, candidate)?);
                }
                Ok(Value::List(values))
            }
            ExprKind::Map(entries) => {
                let mut map = std::collections::BTreeMap::new();
                for (key, item) in entries.iter_mut() {
                    map.insert(key.clone(), item.evaluate(ctx, candidate)?);
                }
                Ok(Value::Map(map))
            }
            ExprKind::Function(call) => {
                let mut args = Vec::with_capacity(call.args.len());
                for arg in call.args.iter_mut() {
                    args.push(arg.evaluate(ctx, candidate)?);
                }
                call.function.execute(&args, &CallContext { eval: ctx, candidate })
            }
            ExprKind::Method { source, call } => {
                let source = source.evaluate(ctx, candidate)?;
                let mut args = Vec::with_capacity(call.args.len());
                for arg in call.args.iter_mut() {
                    args.push(arg.evaluate(ctx, candidate)?);
                }
                call.method.execute(&source, &args, &CallContext { eval: ctx, candidate })
            }
            ExprKind::Operator { operator, left, right } => {
                let left = left.evaluate(ctx, candidate)?;
                let right = right.evaluate(ctx, candidate)?;
                operator.evaluate(&left, &right, &CallContext { eval: ctx, candidate })
            }
            ExprKind::And(left, right) => Ok(Value::Bool(
                left.matches(ctx, candidate)? && right.matches(ctx, candidate)?,
            )),
            ExprKind::Or(left, right) => Ok(Value::Bool(
                left.matches(ctx, candidate)? || right.matches(ctx, candidate)?,
            )),
            ExprKind::Not(inner) => Ok(Value::Bool(!inner.matches(ctx, candidate)?)),
            ExprKind::Compare { op, left, right } => {
                let left = left.evaluate(ctx, candidate)?;
                let right = right.evaluate(ctx, candidate)?;
                Ok(Value::Bool(compare(*op, &left, &right)))
            }
            ExprKind::Like { value, pattern, matcher } => {
                let value = value.evaluate(ctx, candidate)?;
                let pattern = pattern.evaluate(ctx, candidate)?;
                Ok(Value::Bool(match (&value, &pattern) {
                    (Value::String(text), Value::String(pattern)) => matcher
                        .compile(pattern, like_to_regex)
                        .map(|re| re.is_match(text))
                        .unwrap_or(false),
                    _ => false,
                }))
            }
            ExprKind::Between { value, low, high } => {
                let value = value.evaluate(ctx, candidate)?;
                let low = low.evaluate(ctx, candidate)?;
                let high = high.evaluate(ctx, candidate)?;
                Ok(Value::Bool(
                    compare(CompareOp::SuperiorEquals, &value, &low)
                        && compare(CompareOp::InferiorEquals, &value, &high),
                ))
            }
            ExprKind::In { value, set } => {
                let value = value.evaluate(ctx, candidate)?;
                let set = set.evaluate(ctx, candidate)?;
                Ok(Value::Bool(is_in(&value, &set)))
            }
            ExprKind::IsNull(inner) => Ok(Value::Bool(inner.evaluate(ctx, candidate)?.is_null())),
            ExprKind::IsNotNull(inner) => Ok(Value::Bool(!inner.evaluate(ctx, candidate)?.is_null())),
            ExprKind::Filtered { source, filter } => {
                let source = source.evaluate(ctx, candidate)?;
                if filter.is_document_free() {
                    let selector = filter.evaluate(ctx, candidate)?;
                    return select(ctx, &source, &selector);
                }
                let items = match source {
                    Value::Null => return Ok(Value::Null),
                    Value::List(items) => items,
                    other => vec![other],
                };
                let mut selected = Vec::new();
                for item in items {
                    if let Some(record) = ctx.element_record(&item)? {
                        if filter.matches(ctx, Some(&record))? {
                            selected.push(item);
                        }
                    }
                }
                Ok(Value::List(selected))
            }
            ExprKind::Include => Ok(Value::Bool(true)),
            ExprKind::Exclude => Ok(Value::Bool(false)),
        }
    }

    /// Evaluates as a predicate; only `true` matches
    pub fn matches(&mut self, ctx: &EvalContext<'_>, candidate: Option<&Record>) -> QueryResult<bool> {
        Ok(self.evaluate(ctx, candidate)?.is_true())
    }
}

/// Comparison with null and incomparable operands evaluating to false
pub(crate) fn compare(op: CompareOp, left: &Value, right: &Value) -> bool {
    if left.is_null() || right.is_null() {
        return false;
    }
    match op {
        CompareOp::Equals => loose_eq(left, right),
        CompareOp::NotEquals => !loose_eq(left, right),
        _ => match natural_cmp(left, right) {
            Some(ord) => match op {
                CompareOp::Inferior => ord == Ordering::Less,
                CompareOp::InferiorEquals => ord != Ordering::Greater,
                CompareOp::Superior => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            },
            None => false,
        },
    }
}

fn is_in(value: &Value, set: &Value) -> bool {
    if value.is_null() {
        return false;
    }
    match set {
        Value::Null => false,
        Value::List(items) => match value {
            Value::List(wanted) => wanted.iter().any(|w| items.iter().any(|item| loose_eq(item, w))),
            single => items.iter().any(|item| loose_eq(item, single)),
        },
        scalar => loose_eq(value, scalar),
    }
}

/// Positional or keyed selection for `source[selector]`
fn select(ctx: &EvalContext<'_>, source: &Value, selector: &Value) -> QueryResult<Value> {
    match selector {
        Value::Integer(i) => Ok(match source {
            Value::List(items) => {
                let len = items.len() as i64;
                let index = if *i < 0 { len + i } else { *i };
                if (0..len).contains(&index) {
                    items[index as usize].clone()
                } else {
                    Value::Null
                }
            }
            _ => Value::Null,
        }),
        Value::String(key) => match source {
            Value::List(_) | Value::Map(_) | Value::Document(_) | Value::Link(_) => ctx.field_of(source, key),
            _ => Ok(Value::Null),
        },
        Value::List(selectors) => {
            let mut out = Vec::with_capacity(selectors.len());
            for s in selectors {
                out.push(select(ctx, source, s)?);
            }
            Ok(Value::List(out))
        }
        _ => Ok(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callable::CallableRegistry;
    use crate::storage::MemoryStore;
    use crate::value::RecordId;
    use serde_json::json;

    fn car(name: Option<&str>, size: i64) -> Record {
        let mut record = Record::of_class("Car").with_field("size", size);
        record.set("name", Value::from(name));
        record
    }

    fn eval(expr: &mut Expr, record: &Record) -> Value {
        expr.evaluate(&EvalContext::new(), Some(record)).unwrap()
    }

    #[test]
    fn test_comparisons() {
        let tempo = car(Some("tempo"), 250);
        assert_eq!(eval(&mut Expr::gt(Expr::name("size"), Expr::literal(200)), &tempo), Value::Bool(true));
        assert_eq!(eval(&mut Expr::eq(Expr::name("size"), Expr::literal(250.0)), &tempo), Value::Bool(true));
        assert_eq!(eval(&mut Expr::ne(Expr::name("name"), Expr::literal("x")), &tempo), Value::Bool(true));
        assert_eq!(eval(&mut Expr::lt(Expr::name("name"), Expr::literal(1)), &tempo), Value::Bool(false));
    }

    #[test]
    fn test_null_operands_are_false() {
        let unnamed = car(None, 260);
        assert_eq!(eval(&mut Expr::eq(Expr::name("name"), Expr::literal("x")), &unnamed), Value::Bool(false));
        assert_eq!(eval(&mut Expr::ne(Expr::name("name"), Expr::literal("x")), &unnamed), Value::Bool(false));
        assert_eq!(eval(&mut Expr::is_null(Expr::name("name")), &unnamed), Value::Bool(true));
        assert_eq!(eval(&mut Expr::is_null(Expr::name("missing")), &unnamed), Value::Bool(true));
    }

    fn like(text: &str, pattern: &str) -> bool {
        let mut expr = Expr::like(Expr::literal(text), Expr::literal(pattern));
        expr.matches(&EvalContext::new(), None).unwrap()
    }

    #[test]
    fn test_like() {
        assert!(like("tempo", "te%"));
        assert!(like("tempo", "t_mpo"));
        assert!(!like("tempo", "t_po"));
        assert!(like("a.b", "a.b"));
        assert!(!like("axb", "a.b"));
        assert!(like("100%", "100%"));
    }

    #[test]
    fn test_like_keeps_pattern_compiled_across_records() {
        let mut expr = Expr::like(Expr::name("name"), Expr::literal("t%"));
        assert_eq!(eval(&mut expr, &car(Some("tempo"), 250)), Value::Bool(true));
        assert_eq!(eval(&mut expr, &car(Some("fiesta"), 160)), Value::Bool(false));
        match expr.kind() {
            ExprKind::Like { matcher, .. } => assert_eq!(matcher.cached_pattern(), Some("t%")),
            _ => panic!("expected LIKE"),
        }

        let mut per_record = Expr::like(Expr::literal("tempo"), Expr::name("name"));
        assert_eq!(eval(&mut per_record, &car(Some("te%"), 1)), Value::Bool(true));
        assert_eq!(eval(&mut per_record, &car(Some("fi%"), 1)), Value::Bool(false));
    }

    #[test]
    fn test_empty_path_is_null() {
        let mut empty = Expr::from(ExprKind::Path(Vec::new()));
        assert_eq!(eval(&mut empty, &car(Some("tempo"), 250)), Value::Null);
        assert_eq!(empty.evaluate(&EvalContext::new(), None).unwrap(), Value::Null);
    }

    #[test]
    fn test_between_and_in() {
        let tempo = car(Some("tempo"), 250);
        assert_eq!(
            eval(&mut Expr::between(Expr::name("size"), Expr::literal(250), Expr::literal(300)), &tempo),
            Value::Bool(true)
        );
        assert_eq!(
            eval(&mut Expr::in_(Expr::name("name"), Expr::literal(vec!["fiesta", "tempo"])), &tempo),
            Value::Bool(true)
        );
        assert_eq!(
            eval(&mut Expr::in_(Expr::name("size"), Expr::literal(250)), &tempo),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_short_circuit() {
        let tempo = car(Some("tempo"), 250);
        let mut expr = Expr::or(Expr::include(), Expr::param());
        assert_eq!(eval(&mut expr, &tempo), Value::Bool(true));
        let mut expr = Expr::and(Expr::exclude(), Expr::param());
        assert_eq!(eval(&mut expr, &tempo), Value::Bool(false));
    }

    #[test]
    fn test_unresolved_parameters_fail() {
        let ctx = EvalContext::new();
        assert_eq!(Expr::param().evaluate(&ctx, None).unwrap_err(), QueryError::UnboundParameter);
        assert_eq!(
            Expr::named_param("n").evaluate(&ctx, None).unwrap_err(),
            QueryError::MissingParameter("n".into())
        );
    }

    #[test]
    fn test_path_dereferences_links() {
        let mut store = MemoryStore::new();
        let engine = store.insert_json("Engine", &json!({"power": 90})).unwrap();
        let record = Record::of_class("Car").with_field("engine", engine);
        let ctx = EvalContext::with_store(&store);

        let mut path = Expr::path("engine.power");
        assert_eq!(path.evaluate(&ctx, Some(&record)).unwrap(), Value::Integer(90));

        let mut dangling = Expr::path("engine.power");
        let broken = Record::new().with_field("engine", RecordId::new(99, 0));
        assert_eq!(dangling.evaluate(&ctx, Some(&broken)).unwrap(), Value::Null);
    }

    #[test]
    fn test_filtered_selection() {
        let record = Record::new()
            .with_field("tags", vec!["a", "b", "c"])
            .with_field("owner", Value::from(json!({"name": "ann", "age": 30})));
        let ctx = EvalContext::new();

        let mut last = Expr::filtered(Expr::name("tags"), Expr::literal(-1));
        assert_eq!(last.evaluate(&ctx, Some(&record)).unwrap(), Value::from("c"));

        let mut keyed = Expr::filtered(Expr::name("owner"), Expr::literal("name"));
        assert_eq!(keyed.evaluate(&ctx, Some(&record)).unwrap(), Value::from("ann"));

        let mut several = Expr::filtered(Expr::name("tags"), Expr::literal(vec![0, 2]));
        assert_eq!(several.evaluate(&ctx, Some(&record)).unwrap(), Value::from(vec!["a", "c"]));
    }

    #[test]
    fn test_filtered_predicate() {
        let record = Record::new().with_field(
            "cars",
            Value::from(json!([{"name": "tempo", "size": 250}, {"name": "fiesta", "size": 160}])),
        );
        let mut big = Expr::filtered(Expr::name("cars"), Expr::gt(Expr::name("size"), Expr::literal(200)));
        let Value::List(items) = big.evaluate(&EvalContext::new(), Some(&record)).unwrap() else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_functions_and_methods() {
        let registry = CallableRegistry::with_builtins();
        let tempo = car(Some("tempo"), 250);
        let mut upper = Expr::name("name").method(&registry, "toUpperCase", vec![]).unwrap();
        assert_eq!(eval(&mut upper, &tempo), Value::from("TEMPO"));

        let mut plus = Expr::operator(&registry, "+", Expr::name("size"), Expr::literal(5)).unwrap();
        assert_eq!(eval(&mut plus, &tempo), Value::Integer(255));

        let mut count = Expr::function(&registry, "count", vec![Expr::name("name")]).unwrap();
        eval(&mut count, &tempo);
        assert_eq!(eval(&mut count, &tempo), Value::Integer(2));
    }

    #[test]
    fn test_special_names() {
        let record = car(Some("tempo"), 250).with_id(RecordId::new(4, 2));
        assert_eq!(eval(&mut Expr::name("@rid"), &record), Value::Link(RecordId::new(4, 2)));
        assert_eq!(eval(&mut Expr::name("@class"), &record), Value::from("Car"));
        assert_eq!(eval(&mut Expr::name("size"), &record), Value::Integer(250));
        assert_eq!(Expr::name("size").evaluate(&EvalContext::new(), None).unwrap(), Value::Null);
    }
}

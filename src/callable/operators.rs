//! Built-in operators
//!
//! Containment, text and type tests return booleans; arithmetic returns
//! numbers (or a concatenated string for `+` with a string operand). Null
//! operands make predicates false and arithmetic null.

use std::sync::{Arc, Mutex};

use super::{CallContext, OperatorFactory, SqlOperator};
use crate::errors::{QueryError, QueryResult};
use crate::expr::{anchored, PatternCache};
use crate::value::{loose_eq, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Containment {
    Contains,
    All,
    Any,
    Key,
    Value,
    Text,
}

impl Containment {
    fn keyword(self) -> &'static str {
        match self {
            Containment::Contains => "CONTAINS",
            Containment::All => "CONTAINSALL",
            Containment::Any => "CONTAINSANY",
            Containment::Key => "CONTAINSKEY",
            Containment::Value => "CONTAINSVALUE",
            Containment::Text => "CONTAINSTEXT",
        }
    }
}

fn member(items: &[Value], value: &Value) -> bool {
    items.iter().any(|item| loose_eq(item, value))
}

#[derive(Debug)]
struct ContainmentOperator(Containment);

impl SqlOperator for ContainmentOperator {
    fn keyword(&self) -> &str {
        self.0.keyword()
    }

    fn evaluate(&self, left: &Value, right: &Value, _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
        if left.is_null() || right.is_null() {
            return Ok(Value::Bool(false));
        }
        let result = match (self.0, left) {
            (Containment::All | Containment::Any, Value::Map(_)) => {
                return Err(QueryError::Unsupported(format!(
                    "{} with a map on the left side",
                    self.0.keyword()
                )));
            }
            (Containment::Contains, Value::List(items)) => match right {
                Value::List(wanted) => wanted.iter().all(|w| member(items, w)),
                other => member(items, other),
            },
            (Containment::Contains, Value::Map(map)) => map.values().any(|v| loose_eq(v, right)),
            (Containment::Contains, other) => loose_eq(other, right),
            (Containment::All, Value::List(items)) => match right {
                Value::List(wanted) => wanted.iter().all(|w| member(items, w)),
                other => !items.is_empty() && items.iter().all(|item| loose_eq(item, other)),
            },
            (Containment::Any, Value::List(items)) => match right {
                Value::List(wanted) => wanted.iter().any(|w| member(items, w)),
                other => member(items, other),
            },
            (Containment::All | Containment::Any, other) => match right {
                Value::List(wanted) => member(wanted, other),
                scalar => loose_eq(other, scalar),
            },
            (Containment::Key, Value::Map(map)) => right.as_str().map(|k| map.contains_key(k)).unwrap_or(false),
            (Containment::Key, Value::Document(doc)) => right.as_str().map(|k| doc.has_field(k)).unwrap_or(false),
            (Containment::Key, _) => false,
            (Containment::Value, Value::Map(map)) => map.values().any(|v| loose_eq(v, right)),
            (Containment::Value, Value::Document(doc)) => doc.fields().any(|(_, v)| loose_eq(v, right)),
            (Containment::Value, _) => false,
            (Containment::Text, Value::String(text)) => text.contains(&right.to_display_string()),
            (Containment::Text, _) => false,
        };
        Ok(Value::Bool(result))
    }
}

/// Full-string regular expression match.
///
/// Each node gets its own instance, so the cache holds that node's pattern.
#[derive(Debug, Default)]
struct Matches {
    pattern: Mutex<PatternCache>,
}

impl SqlOperator for Matches {
    fn keyword(&self) -> &str {
        "MATCHES"
    }

    fn evaluate(&self, left: &Value, right: &Value, _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
        let (Value::String(text), Value::String(pattern)) = (left, right) else {
            return Ok(Value::Bool(false));
        };
        let mut cache = self.pattern.lock().map_err(|_| QueryError::poisoned())?;
        Ok(match cache.compile(pattern, anchored) {
            Some(re) => Value::Bool(re.is_match(text)),
            None => Value::Null,
        })
    }
}

/// Class membership, subclasses included
#[derive(Debug)]
struct InstanceOf;

impl SqlOperator for InstanceOf {
    fn keyword(&self) -> &str {
        "INSTANCEOF"
    }

    fn evaluate(&self, left: &Value, right: &Value, ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
        let Some(parent) = right.as_str() else {
            return Ok(Value::Bool(false));
        };
        let class = match left {
            Value::Document(doc) => doc.class().map(str::to_string),
            Value::Link(rid) => ctx.eval.load(*rid)?.and_then(|r| r.class().map(str::to_string)),
            _ => None,
        };
        let Some(class) = class else {
            return Ok(Value::Bool(false));
        };
        let result = match ctx.eval.store() {
            Some(store) => store.is_subclass_of(&class, parent),
            None => class.eq_ignore_ascii_case(parent),
        };
        Ok(Value::Bool(result))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArithmeticOp {
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
}

#[derive(Debug)]
struct Arithmetic(ArithmeticOp);

impl Arithmetic {
    fn integers(&self, a: i64, b: i64) -> Value {
        let exact = match self.0 {
            ArithmeticOp::Plus => a.checked_add(b),
            ArithmeticOp::Minus => a.checked_sub(b),
            ArithmeticOp::Multiply => a.checked_mul(b),
            ArithmeticOp::Divide if b == 0 => return Value::Null,
            ArithmeticOp::Divide => a.checked_div(b),
            ArithmeticOp::Modulo if b == 0 => return Value::Null,
            ArithmeticOp::Modulo => a.checked_rem(b),
        };
        match exact {
            Some(n) => Value::Integer(n),
            None => self.floats(a as f64, b as f64),
        }
    }

    fn floats(&self, a: f64, b: f64) -> Value {
        match self.0 {
            ArithmeticOp::Plus => Value::Float(a + b),
            ArithmeticOp::Minus => Value::Float(a - b),
            ArithmeticOp::Multiply => Value::Float(a * b),
            ArithmeticOp::Divide | ArithmeticOp::Modulo if b == 0.0 => Value::Null,
            ArithmeticOp::Divide => Value::Float(a / b),
            ArithmeticOp::Modulo => Value::Float(a % b),
        }
    }
}

impl SqlOperator for Arithmetic {
    fn keyword(&self) -> &str {
        match self.0 {
            ArithmeticOp::Plus => "+",
            ArithmeticOp::Minus => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
            ArithmeticOp::Modulo => "%",
        }
    }

    fn evaluate(&self, left: &Value, right: &Value, _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
        if left.is_null() || right.is_null() {
            return Ok(Value::Null);
        }
        Ok(match (left, right) {
            (Value::Integer(a), Value::Integer(b)) => self.integers(*a, *b),
            (Value::String(_), _) | (_, Value::String(_)) if self.0 == ArithmeticOp::Plus => {
                Value::String(format!("{}{}", left.to_display_string(), right.to_display_string()))
            }
            _ => match (left.as_f64(), right.as_f64()) {
                (Some(a), Some(b)) => self.floats(a, b),
                _ => Value::Null,
            },
        })
    }
}

const CONTAINMENTS: [Containment; 6] = [
    Containment::Contains,
    Containment::All,
    Containment::Any,
    Containment::Key,
    Containment::Value,
    Containment::Text,
];

const ARITHMETIC: [ArithmeticOp; 5] = [
    ArithmeticOp::Plus,
    ArithmeticOp::Minus,
    ArithmeticOp::Multiply,
    ArithmeticOp::Divide,
    ArithmeticOp::Modulo,
];

fn all_operators() -> Vec<Arc<dyn SqlOperator>> {
    let mut operators: Vec<Arc<dyn SqlOperator>> = Vec::new();
    for c in CONTAINMENTS {
        operators.push(Arc::new(ContainmentOperator(c)));
    }
    operators.push(Arc::new(Matches::default()));
    operators.push(Arc::new(InstanceOf));
    for op in ARITHMETIC {
        operators.push(Arc::new(Arithmetic(op)));
    }
    operators
}

/// Factory for the built-in operator catalogue
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinOperators;

impl OperatorFactory for BuiltinOperators {
    fn operator_names(&self) -> Vec<String> {
        all_operators().iter().map(|o| o.keyword().to_string()).collect()
    }

    fn create_operator(&self, name: &str) -> Option<Arc<dyn SqlOperator>> {
        all_operators()
            .into_iter()
            .find(|o| o.keyword().eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::EvalContext;
    use crate::storage::{MemoryStore, Record};
    use serde_json::json;

    fn eval_with(ctx: &EvalContext<'_>, keyword: &str, left: Value, right: Value) -> QueryResult<Value> {
        let op = BuiltinOperators.create_operator(keyword).unwrap();
        let call = CallContext {
            eval: ctx,
            candidate: None,
        };
        op.evaluate(&left, &right, &call)
    }

    fn eval(keyword: &str, left: Value, right: Value) -> Value {
        eval_with(&EvalContext::new(), keyword, left, right).unwrap()
    }

    #[test]
    fn test_contains_family() {
        let tags = Value::from(vec!["red", "fast"]);
        assert_eq!(eval("CONTAINS", tags.clone(), Value::from("red")), Value::Bool(true));
        assert_eq!(eval("contains", tags.clone(), Value::from("blue")), Value::Bool(false));
        assert_eq!(
            eval("CONTAINSALL", tags.clone(), Value::from(vec!["red", "fast"])),
            Value::Bool(true)
        );
        assert_eq!(
            eval("CONTAINSANY", tags.clone(), Value::from(vec!["blue", "fast"])),
            Value::Bool(true)
        );
        assert_eq!(eval("CONTAINS", Value::Null, Value::from("red")), Value::Bool(false));
    }

    #[test]
    fn test_containsall_on_map_unsupported() {
        let map = Value::from(json!({"a": 1}));
        let err = eval_with(&EvalContext::new(), "CONTAINSALL", map.clone(), Value::Integer(1)).unwrap_err();
        assert_eq!(err.code(), "AERO_QUERY_UNSUPPORTED");
        assert!(eval_with(&EvalContext::new(), "CONTAINSANY", map, Value::Integer(1)).is_err());
    }

    #[test]
    fn test_key_value_text() {
        let map = Value::from(json!({"a": 1}));
        assert_eq!(eval("CONTAINSKEY", map.clone(), Value::from("a")), Value::Bool(true));
        assert_eq!(eval("CONTAINSVALUE", map, Value::Float(1.0)), Value::Bool(true));
        assert_eq!(eval("CONTAINSTEXT", Value::from("supreme"), Value::from("pre")), Value::Bool(true));
        assert_eq!(eval("CONTAINSTEXT", Value::Integer(1), Value::from("1")), Value::Bool(false));
    }

    #[test]
    fn test_matches() {
        assert_eq!(eval("MATCHES", Value::from("tempo"), Value::from("t.*o")), Value::Bool(true));
        assert_eq!(eval("MATCHES", Value::from("tempo"), Value::from("emp")), Value::Bool(false));
        assert_eq!(eval("MATCHES", Value::from("tempo"), Value::from("(")), Value::Null);
    }

    #[test]
    fn test_matches_reuses_compiled_pattern() {
        let matches = Matches::default();
        let ctx = EvalContext::new();
        let call = CallContext { eval: &ctx, candidate: None };
        let pattern = Value::from("t.*o");
        for (text, expected) in [("tempo", true), ("fiesta", false), ("turbo", true)] {
            assert_eq!(
                matches.evaluate(&Value::from(text), &pattern, &call).unwrap(),
                Value::Bool(expected)
            );
        }
        assert_eq!(matches.pattern.lock().unwrap().cached_pattern(), Some("t.*o"));
    }

    #[test]
    fn test_instanceof_uses_store_hierarchy() {
        let mut store = MemoryStore::new();
        store.create_class("Vehicle", None).unwrap();
        store.create_class("Car", Some("Vehicle")).unwrap();
        let rid = store.insert_json("Car", &json!({"name": "tempo"})).unwrap();
        let ctx = EvalContext::with_store(&store);

        assert_eq!(
            eval_with(&ctx, "INSTANCEOF", Value::Link(rid), Value::from("Vehicle")).unwrap(),
            Value::Bool(true)
        );
        let doc = Value::from(Record::of_class("Vehicle"));
        assert_eq!(
            eval_with(&ctx, "INSTANCEOF", doc, Value::from("Car")).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("+", Value::Integer(2), Value::Integer(3)), Value::Integer(5));
        assert_eq!(eval("+", Value::from("a"), Value::Integer(1)), Value::from("a1"));
        assert_eq!(eval("-", Value::Float(2.5), Value::Integer(1)), Value::Float(1.5));
        assert_eq!(eval("*", Value::Integer(4), Value::Integer(5)), Value::Integer(20));
        assert_eq!(eval("/", Value::Integer(7), Value::Integer(2)), Value::Integer(3));
        assert_eq!(eval("/", Value::Integer(7), Value::Integer(0)), Value::Null);
        assert_eq!(eval("%", Value::Integer(7), Value::Integer(4)), Value::Integer(3));
        assert_eq!(eval("*", Value::from("a"), Value::Integer(2)), Value::Null);
        assert_eq!(eval("+", Value::Null, Value::Integer(2)), Value::Null);
    }
}

//! Built-in methods
//!
//! Each method is a plain function over the source value and its evaluated
//! arguments. A null source yields null unless the method says otherwise.

use std::collections::HashSet;
use std::sync::Arc;

use super::functions::format_template;
use super::{CallContext, MethodFactory, SqlMethod};
use crate::errors::QueryResult;
use crate::value::{loose_eq, Value};

type MethodBody = fn(&Value, &[Value], &CallContext<'_, '_>) -> QueryResult<Value>;

#[derive(Clone, Copy)]
struct BuiltinMethod {
    name: &'static str,
    min: usize,
    max: Option<usize>,
    body: MethodBody,
}

impl SqlMethod for BuiltinMethod {
    fn name(&self) -> &str {
        self.name
    }

    fn min_args(&self) -> usize {
        self.min
    }

    fn max_args(&self) -> Option<usize> {
        self.max
    }

    fn execute(&self, source: &Value, args: &[Value], ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
        (self.body)(source, args, ctx)
    }
}

const fn method(name: &'static str, min: usize, max: Option<usize>, body: MethodBody) -> BuiltinMethod {
    BuiltinMethod { name, min, max, body }
}

static METHODS: &[BuiltinMethod] = &[
    method("size", 0, Some(0), size),
    method("length", 0, Some(0), length),
    method("toUpperCase", 0, Some(0), to_upper_case),
    method("toLowerCase", 0, Some(0), to_lower_case),
    method("trim", 0, Some(0), trim),
    method("charAt", 1, Some(1), char_at),
    method("indexOf", 1, Some(2), index_of),
    method("left", 1, Some(1), left),
    method("right", 1, Some(1), right),
    method("subString", 1, Some(2), sub_string),
    method("append", 1, None, append),
    method("prefix", 1, None, prefix),
    method("replace", 2, Some(2), replace),
    method("asString", 0, Some(0), as_string),
    method("asInteger", 0, Some(0), as_integer),
    method("asFloat", 0, Some(0), as_float),
    method("asBoolean", 0, Some(0), as_boolean),
    method("asList", 0, Some(0), as_list),
    method("asSet", 0, Some(0), as_set),
    method("keys", 0, Some(0), keys),
    method("values", 0, Some(0), values),
    method("field", 1, Some(1), field),
    method("type", 0, Some(0), type_of),
    method("format", 1, Some(1), format),
];

/// Factory for the built-in method catalogue
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinMethods;

impl MethodFactory for BuiltinMethods {
    fn method_names(&self) -> Vec<String> {
        METHODS.iter().map(|m| m.name.to_string()).collect()
    }

    fn create_method(&self, name: &str) -> Option<Arc<dyn SqlMethod>> {
        METHODS
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
            .map(|m| Arc::new(*m) as Arc<dyn SqlMethod>)
    }
}

fn chars_of(source: &Value) -> Option<Vec<char>> {
    match source {
        Value::Null => None,
        other => Some(other.to_display_string().chars().collect()),
    }
}

fn usize_arg(args: &[Value], i: usize) -> Option<usize> {
    args.get(i).and_then(Value::as_i64).and_then(|n| usize::try_from(n).ok())
}

fn size(source: &Value, _args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
    let n = match source {
        Value::Null => 0,
        Value::List(items) => items.len(),
        Value::Map(map) => map.len(),
        Value::Document(doc) => doc.len(),
        Value::String(s) => s.chars().count(),
        _ => 1,
    };
    Ok(Value::from(n))
}

fn length(source: &Value, _args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
    Ok(chars_of(source).map(|c| Value::from(c.len())).unwrap_or_default())
}

fn to_upper_case(source: &Value, _args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
    Ok(match source {
        Value::Null => Value::Null,
        other => Value::String(other.to_display_string().to_uppercase()),
    })
}

fn to_lower_case(source: &Value, _args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
    Ok(match source {
        Value::Null => Value::Null,
        other => Value::String(other.to_display_string().to_lowercase()),
    })
}

fn trim(source: &Value, _args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
    Ok(match source {
        Value::Null => Value::Null,
        other => Value::String(other.to_display_string().trim().to_string()),
    })
}

fn char_at(source: &Value, args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
    let (Some(chars), Some(i)) = (chars_of(source), usize_arg(args, 0)) else {
        return Ok(Value::Null);
    };
    Ok(chars.get(i).map(|c| Value::String(c.to_string())).unwrap_or_default())
}

fn index_of(source: &Value, args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
    let from = usize_arg(args, 1).unwrap_or(0);
    let found = match (source, &args[0]) {
        (Value::Null, _) => return Ok(Value::Null),
        (Value::List(items), needle) => items
            .iter()
            .skip(from)
            .position(|item| loose_eq(item, needle))
            .map(|p| p + from),
        (haystack, needle) => {
            let haystack: Vec<char> = haystack.to_display_string().chars().collect();
            let needle: Vec<char> = needle.to_display_string().chars().collect();
            if needle.is_empty() {
                (from <= haystack.len()).then_some(from)
            } else {
                (from..haystack.len())
                    .find(|&i| haystack[i..].starts_with(&needle))
            }
        }
    };
    Ok(Value::Integer(found.map(|i| i as i64).unwrap_or(-1)))
}

fn left(source: &Value, args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
    let (Some(chars), Some(n)) = (chars_of(source), usize_arg(args, 0)) else {
        return Ok(Value::Null);
    };
    Ok(Value::String(chars.iter().take(n).collect()))
}

fn right(source: &Value, args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
    let (Some(chars), Some(n)) = (chars_of(source), usize_arg(args, 0)) else {
        return Ok(Value::Null);
    };
    let start = chars.len().saturating_sub(n);
    Ok(Value::String(chars[start..].iter().collect()))
}

fn sub_string(source: &Value, args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
    let (Some(chars), Some(begin)) = (chars_of(source), usize_arg(args, 0)) else {
        return Ok(Value::Null);
    };
    let end = usize_arg(args, 1).unwrap_or(chars.len()).min(chars.len());
    if begin >= end {
        return Ok(Value::String(String::new()));
    }
    Ok(Value::String(chars[begin..end].iter().collect()))
}

fn append(source: &Value, args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
    if source.is_null() {
        return Ok(Value::Null);
    }
    let mut out = source.to_display_string();
    for arg in args {
        out.push_str(&arg.to_display_string());
    }
    Ok(Value::String(out))
}

fn prefix(source: &Value, args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
    if source.is_null() {
        return Ok(Value::Null);
    }
    let mut out: String = args.iter().map(Value::to_display_string).collect();
    out.push_str(&source.to_display_string());
    Ok(Value::String(out))
}

fn replace(source: &Value, args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
    Ok(match source {
        Value::Null => Value::Null,
        other => Value::String(
            other
                .to_display_string()
                .replace(&args[0].to_display_string(), &args[1].to_display_string()),
        ),
    })
}

fn as_string(source: &Value, _args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
    Ok(match source {
        Value::Null => Value::Null,
        other => Value::String(other.to_display_string()),
    })
}

fn as_integer(source: &Value, _args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
    Ok(match source {
        Value::Integer(i) => Value::Integer(*i),
        Value::Float(f) if f.is_finite() => Value::Integer(f.trunc() as i64),
        Value::Bool(b) => Value::Integer(i64::from(*b)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .or_else(|_| s.trim().parse::<f64>().map(|f| Value::Integer(f.trunc() as i64)))
            .unwrap_or_default(),
        Value::Date(d) => Value::Integer(d.timestamp_millis()),
        _ => Value::Null,
    })
}

fn as_float(source: &Value, _args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
    Ok(match source {
        Value::Integer(i) => Value::Float(*i as f64),
        Value::Float(f) => Value::Float(*f),
        Value::String(s) => s.trim().parse::<f64>().map(Value::Float).unwrap_or_default(),
        _ => Value::Null,
    })
}

fn as_boolean(source: &Value, _args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
    Ok(match source {
        Value::Bool(b) => Value::Bool(*b),
        Value::Integer(i) => Value::Bool(*i != 0),
        Value::Float(f) => Value::Bool(*f != 0.0),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Value::Bool(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Value::Bool(false),
        _ => Value::Null,
    })
}

fn as_list(source: &Value, _args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
    Ok(Value::List(source.clone().into_items()))
}

fn as_set(source: &Value, _args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
    let mut seen = HashSet::new();
    Ok(Value::List(
        source
            .clone()
            .into_items()
            .into_iter()
            .filter(|item| seen.insert(item.clone()))
            .collect(),
    ))
}

fn keys(source: &Value, _args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
    Ok(match source {
        Value::Map(map) => Value::List(map.keys().map(|k| Value::from(k.as_str())).collect()),
        Value::Document(doc) => Value::List(doc.field_names().into_iter().map(Value::from).collect()),
        _ => Value::Null,
    })
}

fn values(source: &Value, _args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
    Ok(match source {
        Value::Map(map) => Value::List(map.values().cloned().collect()),
        Value::Document(doc) => Value::List(doc.fields().map(|(_, v)| v.clone()).collect()),
        _ => Value::Null,
    })
}

fn field(source: &Value, args: &[Value], ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
    match args[0].as_str() {
        Some(name) => ctx.eval.field_of(source, name),
        None => Ok(Value::Null),
    }
}

fn type_of(source: &Value, _args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
    Ok(Value::from(source.type_name()))
}

fn format(source: &Value, args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
    let Some(pattern) = args[0].as_str() else {
        return Ok(Value::Null);
    };
    Ok(match source {
        Value::Null => Value::Null,
        Value::Date(d) => Value::String(d.format(pattern).to_string()),
        other => Value::String(format_template(pattern, std::slice::from_ref(other))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::EvalContext;
    use crate::storage::Record;

    fn call(name: &str, source: Value, args: &[Value]) -> Value {
        let method = BuiltinMethods.create_method(name).unwrap();
        let ctx = EvalContext::new();
        let call = CallContext {
            eval: &ctx,
            candidate: None,
        };
        method.execute(&source, args, &call).unwrap()
    }

    #[test]
    fn test_every_name_creates() {
        for name in BuiltinMethods.method_names() {
            assert!(BuiltinMethods.has_method(&name));
            assert!(BuiltinMethods.create_method(&name.to_uppercase()).is_some());
        }
    }

    #[test]
    fn test_size() {
        assert_eq!(call("size", Value::from(vec![1, 2, 3]), &[]), Value::Integer(3));
        assert_eq!(call("size", Value::Null, &[]), Value::Integer(0));
        assert_eq!(call("size", Value::from("abc"), &[]), Value::Integer(3));
    }

    #[test]
    fn test_string_methods() {
        assert_eq!(call("toUpperCase", Value::from("tempo"), &[]), Value::from("TEMPO"));
        assert_eq!(call("trim", Value::from("  x "), &[]), Value::from("x"));
        assert_eq!(call("charAt", Value::from("abc"), &[Value::Integer(1)]), Value::from("b"));
        assert_eq!(call("left", Value::from("fiesta"), &[Value::Integer(3)]), Value::from("fie"));
        assert_eq!(call("right", Value::from("fiesta"), &[Value::Integer(3)]), Value::from("sta"));
        assert_eq!(
            call("subString", Value::from("supreme"), &[Value::Integer(1), Value::Integer(4)]),
            Value::from("upr")
        );
        assert_eq!(
            call("replace", Value::from("a-b-c"), &[Value::from("-"), Value::from("+")]),
            Value::from("a+b+c")
        );
        assert_eq!(call("append", Value::from("a"), &[Value::from("b")]), Value::from("ab"));
        assert_eq!(call("prefix", Value::from("a"), &[Value::from("b")]), Value::from("ba"));
        assert_eq!(call("toLowerCase", Value::Null, &[]), Value::Null);
    }

    #[test]
    fn test_index_of() {
        assert_eq!(call("indexOf", Value::from("tempo"), &[Value::from("mp")]), Value::Integer(2));
        assert_eq!(call("indexOf", Value::from("tempo"), &[Value::from("x")]), Value::Integer(-1));
        assert_eq!(
            call("indexOf", Value::from(vec![5, 6, 7]), &[Value::Float(7.0)]),
            Value::Integer(2)
        );
    }

    #[test]
    fn test_conversions() {
        assert_eq!(call("asInteger", Value::from("42"), &[]), Value::Integer(42));
        assert_eq!(call("asInteger", Value::Float(3.9), &[]), Value::Integer(3));
        assert_eq!(call("asInteger", Value::from("x"), &[]), Value::Null);
        assert_eq!(call("asFloat", Value::from("1.5"), &[]), Value::Float(1.5));
        assert_eq!(call("asBoolean", Value::from("TRUE"), &[]), Value::Bool(true));
        assert_eq!(call("asString", Value::Integer(7), &[]), Value::from("7"));
        assert_eq!(
            call("asSet", Value::from(vec![1, 1, 2]), &[]),
            Value::from(vec![1, 2])
        );
    }

    #[test]
    fn test_document_methods() {
        let doc = Value::from(Record::new().with_field("name", "tempo").with_field("size", 250));
        assert_eq!(call("keys", doc.clone(), &[]), Value::from(vec!["name", "size"]));
        assert_eq!(call("field", doc.clone(), &[Value::from("size")]), Value::Integer(250));
        assert_eq!(call("type", doc, &[]), Value::from("DOCUMENT"));
    }

    #[test]
    fn test_format() {
        assert_eq!(call("format", Value::Integer(5), &[Value::from("n=%d")]), Value::from("n=5"));
    }
}

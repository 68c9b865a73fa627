//! Value comparison rules shared by predicates and sorting

use std::cmp::Ordering;

use super::Value;

/// Compares two numeric values; `None` if either side is not a number
pub fn compare_numeric(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Some(x.cmp(y)),
        _ => {
            let x = a.as_f64()?;
            let y = b.as_f64()?;
            x.partial_cmp(&y)
        }
    }
}

/// Natural ordering between two values of mutually comparable types.
///
/// Numbers compare numerically, strings lexicographically, booleans
/// false < true, dates chronologically, links by cluster then position,
/// lists element-wise. Anything else is not comparable.
pub fn natural_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    if let Some(ord) = compare_numeric(a, b) {
        return Some(ord);
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Date(x), Value::Date(y)) => Some(x.cmp(y)),
        (Value::Link(x), Value::Link(y)) => Some(x.cmp(y)),
        (Value::List(xs), Value::List(ys)) => {
            for (x, y) in xs.iter().zip(ys.iter()) {
                match natural_cmp(x, y)? {
                    Ordering::Equal => continue,
                    other => return Some(other),
                }
            }
            Some(xs.len().cmp(&ys.len()))
        }
        _ => None,
    }
}

/// Predicate equality: numbers compare by value, a link equals a document
/// carrying the same identity, collections compare element-wise.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    if let Some(ord) = compare_numeric(a, b) {
        return ord == Ordering::Equal;
    }
    match (a, b) {
        (Value::Link(_), Value::Document(_)) | (Value::Document(_), Value::Link(_)) => {
            a.as_record_id().is_some() && a.as_record_id() == b.as_record_id()
        }
        (Value::List(xs), Value::List(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(x, y)| loose_eq(x, y))
        }
        (Value::Map(xs), Value::Map(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).map(|y| loose_eq(x, y)).unwrap_or(false))
        }
        _ => a == b,
    }
}

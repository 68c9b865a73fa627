//! Numeric functions

use std::cmp::Ordering;

use crate::callable::{CallContext, SqlFunction};
use crate::errors::QueryResult;
use crate::value::{natural_cmp, Value};

/// Adds two numbers; integers stay integers until they overflow
pub(crate) fn add_numbers(acc: &Value, value: &Value) -> Value {
    match (acc, value) {
        (_, v) if !v.is_numeric() => acc.clone(),
        (Value::Null, v) => v.clone(),
        (Value::Integer(a), Value::Integer(b)) => match a.checked_add(*b) {
            Some(sum) => Value::Integer(sum),
            None => Value::Float(*a as f64 + *b as f64),
        },
        (a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => Value::Float(x + y),
            _ => acc.clone(),
        },
    }
}

#[derive(Debug, Default)]
pub struct Sum {
    total: Value,
}

impl SqlFunction for Sum {
    fn name(&self) -> &str {
        "sum"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        None
    }

    fn aggregates(&self, arg_count: usize) -> bool {
        arg_count == 1
    }

    fn execute(&mut self, args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
        if args.len() == 1 {
            for item in args[0].clone().into_items() {
                self.total = add_numbers(&self.total, &item);
            }
            return Ok(self.total.clone());
        }
        Ok(args.iter().fold(Value::Null, |acc, v| add_numbers(&acc, v)))
    }

    fn fresh(&self) -> Box<dyn SqlFunction> {
        Box::<Sum>::default()
    }
}

#[derive(Debug, Default)]
pub struct Average {
    total: f64,
    count: u64,
}

impl SqlFunction for Average {
    fn name(&self) -> &str {
        "avg"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        None
    }

    fn aggregates(&self, arg_count: usize) -> bool {
        arg_count == 1
    }

    fn execute(&mut self, args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
        if args.len() == 1 {
            if let Some(x) = args[0].as_f64() {
                self.total += x;
                self.count += 1;
            }
            return Ok(mean(self.total, self.count));
        }
        let numbers: Vec<f64> = args.iter().filter_map(Value::as_f64).collect();
        Ok(mean(numbers.iter().sum(), numbers.len() as u64))
    }

    fn fresh(&self) -> Box<dyn SqlFunction> {
        Box::<Average>::default()
    }
}

fn mean(total: f64, count: u64) -> Value {
    if count == 0 {
        Value::Null
    } else {
        Value::Float(total / count as f64)
    }
}

/// `max` and `min`
#[derive(Debug)]
pub struct Extreme {
    name: &'static str,
    keep: Ordering,
    current: Value,
}

impl Extreme {
    pub fn max() -> Self {
        Self {
            name: "max",
            keep: Ordering::Greater,
            current: Value::Null,
        }
    }

    pub fn min() -> Self {
        Self {
            name: "min",
            keep: Ordering::Less,
            current: Value::Null,
        }
    }

    fn fold(&self, current: Value, candidate: &Value) -> Value {
        if candidate.is_null() {
            return current;
        }
        if current.is_null() {
            return candidate.clone();
        }
        match natural_cmp(candidate, &current) {
            Some(ord) if ord == self.keep => candidate.clone(),
            _ => current,
        }
    }
}

impl SqlFunction for Extreme {
    fn name(&self) -> &str {
        self.name
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        None
    }

    fn aggregates(&self, arg_count: usize) -> bool {
        arg_count == 1
    }

    fn execute(&mut self, args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
        if args.len() == 1 {
            let current = std::mem::take(&mut self.current);
            self.current = self.fold(current, &args[0]);
            return Ok(self.current.clone());
        }
        Ok(args.iter().fold(Value::Null, |acc, v| self.fold(acc, v)))
    }

    fn fresh(&self) -> Box<dyn SqlFunction> {
        Box::new(Extreme {
            name: self.name,
            keep: self.keep,
            current: Value::Null,
        })
    }
}

/// Counts non-null values
#[derive(Debug, Default)]
pub struct Count {
    count: i64,
}

impl SqlFunction for Count {
    fn name(&self) -> &str {
        "count"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }

    fn aggregates(&self, _arg_count: usize) -> bool {
        true
    }

    fn execute(&mut self, args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
        if !args[0].is_null() {
            self.count += 1;
        }
        Ok(Value::Integer(self.count))
    }

    fn fresh(&self) -> Box<dyn SqlFunction> {
        Box::<Count>::default()
    }
}

#[derive(Debug)]
pub struct Abs;

impl SqlFunction for Abs {
    fn name(&self) -> &str {
        "abs"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }

    fn execute(&mut self, args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
        Ok(match &args[0] {
            Value::Integer(i) => i.checked_abs().map(Value::Integer).unwrap_or(Value::Float((*i as f64).abs())),
            Value::Float(f) => Value::Float(f.abs()),
            _ => Value::Null,
        })
    }

    fn fresh(&self) -> Box<dyn SqlFunction> {
        Box::new(Abs)
    }
}

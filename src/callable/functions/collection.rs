//! Collection functions

use std::collections::{BTreeMap, HashSet};

use crate::callable::{CallContext, SqlFunction};
use crate::errors::QueryResult;
use crate::value::{loose_eq, Value};

fn contains(items: &[Value], value: &Value) -> bool {
    items.iter().any(|item| loose_eq(item, value))
}

/// Appends unseen items, preserving first-seen order
fn push_unique(items: &mut Vec<Value>, seen: &mut HashSet<Value>, value: Value) {
    if seen.insert(value.clone()) {
        items.push(value);
    }
}

/// Passes each value through the first time it is seen, null afterwards
#[derive(Debug, Default)]
pub struct Distinct {
    seen: HashSet<Value>,
}

impl SqlFunction for Distinct {
    fn name(&self) -> &str {
        "distinct"
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
        if self.seen.insert(args[0].clone()) {
            Ok(args[0].clone())
        } else {
            Ok(Value::Null)
        }
    }

    fn fresh(&self) -> Box<dyn SqlFunction> {
        Box::<Distinct>::default()
    }
}

#[derive(Debug, Default)]
pub struct Union {
    items: Vec<Value>,
    seen: HashSet<Value>,
}

impl SqlFunction for Union {
    fn name(&self) -> &str {
        "union"
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
                push_unique(&mut self.items, &mut self.seen, item);
            }
            return Ok(Value::List(self.items.clone()));
        }
        let mut items = Vec::new();
        let mut seen = HashSet::new();
        for arg in args {
            for item in arg.clone().into_items() {
                push_unique(&mut items, &mut seen, item);
            }
        }
        Ok(Value::List(items))
    }

    fn fresh(&self) -> Box<dyn SqlFunction> {
        Box::<Union>::default()
    }
}

#[derive(Debug, Default)]
pub struct Intersect {
    current: Option<Vec<Value>>,
}

impl SqlFunction for Intersect {
    fn name(&self) -> &str {
        "intersect"
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
            let incoming = args[0].clone().into_items();
            let next = match self.current.take() {
                None => incoming,
                Some(mut current) => {
                    current.retain(|v| contains(&incoming, v));
                    current
                }
            };
            self.current = Some(next.clone());
            return Ok(Value::List(next));
        }
        let mut result = args[0].clone().into_items();
        for arg in &args[1..] {
            let other = arg.clone().into_items();
            result.retain(|v| contains(&other, v));
        }
        Ok(Value::List(result))
    }

    fn fresh(&self) -> Box<dyn SqlFunction> {
        Box::<Intersect>::default()
    }
}

/// Items of the first collection absent from every later one
#[derive(Debug, Default)]
pub struct Difference {
    base: Option<Vec<Value>>,
}

impl SqlFunction for Difference {
    fn name(&self) -> &str {
        "difference"
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
            let incoming = args[0].clone().into_items();
            let next = match self.base.take() {
                None => incoming,
                Some(mut base) => {
                    base.retain(|v| !contains(&incoming, v));
                    base
                }
            };
            self.base = Some(next.clone());
            return Ok(Value::List(next));
        }
        let mut result = args[0].clone().into_items();
        for arg in &args[1..] {
            let other = arg.clone().into_items();
            result.retain(|v| !contains(&other, v));
        }
        Ok(Value::List(result))
    }

    fn fresh(&self) -> Box<dyn SqlFunction> {
        Box::<Difference>::default()
    }
}

/// `list` keeps duplicates, `set` drops them
#[derive(Debug)]
pub struct Gather {
    name: &'static str,
    unique: bool,
    items: Vec<Value>,
    seen: HashSet<Value>,
}

impl Gather {
    pub fn list() -> Self {
        Self {
            name: "list",
            unique: false,
            items: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn set() -> Self {
        Self {
            name: "set",
            unique: true,
            ..Self::list()
        }
    }

    fn add(&mut self, value: Value) {
        for item in value.into_items() {
            if self.unique {
                push_unique(&mut self.items, &mut self.seen, item);
            } else {
                self.items.push(item);
            }
        }
    }
}

impl SqlFunction for Gather {
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
            self.add(args[0].clone());
            return Ok(Value::List(self.items.clone()));
        }
        let mut inline = Gather {
            name: self.name,
            unique: self.unique,
            items: Vec::new(),
            seen: HashSet::new(),
        };
        for arg in args {
            inline.add(arg.clone());
        }
        Ok(Value::List(inline.items))
    }

    fn fresh(&self) -> Box<dyn SqlFunction> {
        Box::new(Gather {
            name: self.name,
            unique: self.unique,
            items: Vec::new(),
            seen: HashSet::new(),
        })
    }
}

/// Aggregates maps, or builds one inline from `key, value` pairs
#[derive(Debug, Default)]
pub struct MapOf {
    entries: BTreeMap<String, Value>,
}

impl SqlFunction for MapOf {
    fn name(&self) -> &str {
        "map"
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
            if let Value::Map(map) = &args[0] {
                self.entries.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            return Ok(Value::Map(self.entries.clone()));
        }
        if args.len() % 2 != 0 {
            return Ok(Value::Null);
        }
        Ok(Value::Map(
            args.chunks(2)
                .map(|pair| (pair[0].to_display_string(), pair[1].clone()))
                .collect(),
        ))
    }

    fn fresh(&self) -> Box<dyn SqlFunction> {
        Box::<MapOf>::default()
    }
}

/// `first` and `last` item of a collection; scalars pass through
#[derive(Debug)]
pub struct Pick {
    last: bool,
}

impl Pick {
    pub fn first() -> Self {
        Self { last: false }
    }

    pub fn last() -> Self {
        Self { last: true }
    }
}

impl SqlFunction for Pick {
    fn name(&self) -> &str {
        if self.last {
            "last"
        } else {
            "first"
        }
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }

    fn execute(&mut self, args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
        Ok(match &args[0] {
            Value::List(items) if self.last => items.last().cloned().unwrap_or_default(),
            Value::List(items) => items.first().cloned().unwrap_or_default(),
            other => other.clone(),
        })
    }

    fn fresh(&self) -> Box<dyn SqlFunction> {
        Box::new(Pick { last: self.last })
    }
}

//! Built-in functions
//!
//! Aggregating functions (`sum`, `count`, `distinct`, ...) accumulate when
//! called with one argument and compute inline otherwise. Type mismatches
//! never fail a query: they produce null or are skipped.

mod collection;
mod math;
mod misc;

use super::{FunctionFactory, SqlFunction};

const NAMES: &[&str] = &[
    "sum", "avg", "max", "min", "count", "abs", "distinct", "union", "intersect", "difference",
    "list", "set", "map", "first", "last", "if", "ifnull", "coalesce", "format", "date",
    "sysdate", "uuid",
];

/// Factory for the built-in function catalogue
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinFunctions;

impl FunctionFactory for BuiltinFunctions {
    fn function_names(&self) -> Vec<String> {
        NAMES.iter().map(|n| n.to_string()).collect()
    }

    fn create_function(&self, name: &str) -> Option<Box<dyn SqlFunction>> {
        let function: Box<dyn SqlFunction> = match name.to_lowercase().as_str() {
            "sum" => Box::<math::Sum>::default(),
            "avg" => Box::<math::Average>::default(),
            "max" => Box::new(math::Extreme::max()),
            "min" => Box::new(math::Extreme::min()),
            "count" => Box::<math::Count>::default(),
            "abs" => Box::new(math::Abs),
            "distinct" => Box::<collection::Distinct>::default(),
            "union" => Box::<collection::Union>::default(),
            "intersect" => Box::<collection::Intersect>::default(),
            "difference" => Box::<collection::Difference>::default(),
            "list" => Box::new(collection::Gather::list()),
            "set" => Box::new(collection::Gather::set()),
            "map" => Box::<collection::MapOf>::default(),
            "first" => Box::new(collection::Pick::first()),
            "last" => Box::new(collection::Pick::last()),
            "if" => Box::new(misc::If),
            "ifnull" => Box::new(misc::IfNull),
            "coalesce" => Box::new(misc::Coalesce),
            "format" => Box::new(misc::Format),
            "date" => Box::new(misc::Date),
            "sysdate" => Box::new(misc::SysDate),
            "uuid" => Box::new(misc::Uuid),
            _ => return None,
        };
        Some(function)
    }
}

pub(crate) use misc::format_template;

//! Conditional, formatting, date and identifier functions

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::callable::{CallContext, SqlFunction};
use crate::errors::QueryResult;
use crate::value::Value;

const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Substitutes `%s` / `%d` placeholders in order; `%%` is a literal percent
pub(crate) fn format_template(template: &str, args: &[Value]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('%') => {
                chars.next();
                out.push('%');
            }
            Some('s') | Some('d') => {
                chars.next();
                if let Some(arg) = args.next() {
                    out.push_str(&arg.to_display_string());
                }
            }
            _ => out.push('%'),
        }
    }
    out
}

/// Parses a date string, with or without a time part
pub(crate) fn parse_date(text: &str, format: Option<&str>) -> Option<DateTime<Utc>> {
    let format = format.unwrap_or(DEFAULT_DATE_FORMAT);
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
        return Some(Utc.from_utc_datetime(&dt));
    }
    if let Ok(d) = NaiveDate::parse_from_str(text, format) {
        return d.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
}

#[derive(Debug)]
pub struct If;

impl SqlFunction for If {
    fn name(&self) -> &str {
        "if"
    }

    fn min_args(&self) -> usize {
        3
    }

    fn max_args(&self) -> Option<usize> {
        Some(3)
    }

    fn execute(&mut self, args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
        Ok(if args[0].is_true() {
            args[1].clone()
        } else {
            args[2].clone()
        })
    }

    fn fresh(&self) -> Box<dyn SqlFunction> {
        Box::new(If)
    }
}

/// `ifnull(v, fallback)` or `ifnull(v, when_null, when_not_null)`
#[derive(Debug)]
pub struct IfNull;

impl SqlFunction for IfNull {
    fn name(&self) -> &str {
        "ifnull"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(3)
    }

    fn execute(&mut self, args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
        Ok(if args[0].is_null() {
            args[1].clone()
        } else {
            args.get(2).unwrap_or(&args[0]).clone()
        })
    }

    fn fresh(&self) -> Box<dyn SqlFunction> {
        Box::new(IfNull)
    }
}

#[derive(Debug)]
pub struct Coalesce;

impl SqlFunction for Coalesce {
    fn name(&self) -> &str {
        "coalesce"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        None
    }

    fn execute(&mut self, args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
        Ok(args.iter().find(|v| !v.is_null()).cloned().unwrap_or_default())
    }

    fn fresh(&self) -> Box<dyn SqlFunction> {
        Box::new(Coalesce)
    }
}

#[derive(Debug)]
pub struct Format;

impl SqlFunction for Format {
    fn name(&self) -> &str {
        "format"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        None
    }

    fn execute(&mut self, args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
        Ok(match &args[0] {
            Value::String(template) => Value::String(format_template(template, &args[1..])),
            _ => Value::Null,
        })
    }

    fn fresh(&self) -> Box<dyn SqlFunction> {
        Box::new(Format)
    }
}

/// `date(text[, format])` or `date(epoch_millis)`
#[derive(Debug)]
pub struct Date;

impl SqlFunction for Date {
    fn name(&self) -> &str {
        "date"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }

    fn execute(&mut self, args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
        let parsed = match &args[0] {
            Value::String(text) => parse_date(text, args.get(1).and_then(Value::as_str)),
            Value::Integer(millis) => Utc.timestamp_millis_opt(*millis).single(),
            Value::Date(d) => Some(*d),
            _ => None,
        };
        Ok(parsed.map(Value::Date).unwrap_or_default())
    }

    fn fresh(&self) -> Box<dyn SqlFunction> {
        Box::new(Date)
    }
}

/// Current time; with a format argument, the formatted string
#[derive(Debug)]
pub struct SysDate;

impl SqlFunction for SysDate {
    fn name(&self) -> &str {
        "sysdate"
    }

    fn min_args(&self) -> usize {
        0
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }

    fn is_deterministic(&self) -> bool {
        false
    }

    fn execute(&mut self, args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
        let now = Utc::now();
        Ok(match args.first() {
            Some(Value::String(format)) => Value::String(now.format(format).to_string()),
            Some(_) => Value::Null,
            None => Value::Date(now),
        })
    }

    fn fresh(&self) -> Box<dyn SqlFunction> {
        Box::new(SysDate)
    }
}

#[derive(Debug)]
pub struct Uuid;

impl SqlFunction for Uuid {
    fn name(&self) -> &str {
        "uuid"
    }

    fn min_args(&self) -> usize {
        0
    }

    fn max_args(&self) -> Option<usize> {
        Some(0)
    }

    fn is_deterministic(&self) -> bool {
        false
    }

    fn execute(&mut self, _args: &[Value], _ctx: &CallContext<'_, '_>) -> QueryResult<Value> {
        Ok(Value::String(uuid::Uuid::new_v4().to_string()))
    }

    fn fresh(&self) -> Box<dyn SqlFunction> {
        Box::new(Uuid)
    }
}

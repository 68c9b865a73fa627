//! ORDER BY sorting
//!
//! Rows are sorted by precomputed key tuples, one key per ORDER BY item.
//! The sort is stable.

use std::cmp::Ordering;

use super::query::SortDirection;
use crate::config::ComparatorFallback;
use crate::errors::{QueryError, QueryResult};
use crate::value::{compare_numeric, natural_cmp, Value};

/// Sorts rows by composite keys
pub struct ResultSorter<'a> {
    directions: &'a [SortDirection],
    fallback: ComparatorFallback,
}

impl<'a> ResultSorter<'a> {
    pub fn new(directions: &'a [SortDirection], fallback: ComparatorFallback) -> Self {
        Self { directions, fallback }
    }

    /// Sorts `(keys, row)` pairs and returns the rows.
    ///
    /// With [`ComparatorFallback::Fail`] the first incomparable pair aborts
    /// the sort.
    pub fn sort<T>(&self, rows: Vec<(Vec<Value>, T)>) -> QueryResult<Vec<T>> {
        let mut failure = None;
        let mut compare = |a: &(Vec<Value>, T), b: &(Vec<Value>, T)| match self.compare_keys(&a.0, &b.0) {
            Ok(ordering) => ordering,
            Err(e) => {
                failure.get_or_insert(e);
                Ordering::Equal
            }
        };
        let rows = merge_sort(rows, &mut compare);
        match failure {
            Some(e) => Err(e),
            None => Ok(rows.into_iter().map(|(_, row)| row).collect()),
        }
    }

    /// Compares two key tuples; the first unequal item decides
    pub fn compare_keys(&self, a: &[Value], b: &[Value]) -> QueryResult<Ordering> {
        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            let ordering = self.compare_values(x, y)?;
            let ordering = match self.directions.get(i).copied().unwrap_or_default() {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return Ok(ordering);
            }
        }
        Ok(Ordering::Equal)
    }

    /// Compares two sort values.
    ///
    /// Ordering rules:
    /// - null before anything else
    /// - numbers by value
    /// - otherwise natural order when the types are comparable
    /// - incomparable values tie, or fail per configuration
    pub fn compare_values(&self, a: &Value, b: &Value) -> QueryResult<Ordering> {
        match (a.is_null(), b.is_null()) {
            (true, true) => return Ok(Ordering::Equal),
            (true, false) => return Ok(Ordering::Less),
            (false, true) => return Ok(Ordering::Greater),
            (false, false) => {}
        }
        if let Some(ordering) = compare_numeric(a, b) {
            return Ok(ordering);
        }
        match natural_cmp(a, b) {
            Some(ordering) => Ok(ordering),
            None => match self.fallback {
                ComparatorFallback::Tie => Ok(Ordering::Equal),
                ComparatorFallback::Fail => Err(QueryError::Incomparable {
                    left: a.type_name().to_string(),
                    right: b.type_name().to_string(),
                }),
            },
        }
    }
}

// The tie fallback is not transitive, which `slice::sort_by` may reject
// with a panic; a plain merge sort only needs a consistent answer per pair.
fn merge_sort<T>(mut items: Vec<T>, cmp: &mut dyn FnMut(&T, &T) -> Ordering) -> Vec<T> {
    if items.len() <= 1 {
        return items;
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, cmp);
    let right = merge_sort(right, cmp);

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(l), Some(r)) = (left.peek(), right.peek()) {
        // Equal keeps the left element first, which makes the sort stable
        let next = if cmp(r, l) == Ordering::Less { right.next() } else { left.next() };
        merged.extend(next);
    }
    merged.extend(left);
    merged.extend(right);
    merged
}

//! GROUP BY buckets
//!
//! Buckets are keyed by the tuple of group-by values, compared structurally,
//! and kept in first-seen order. Each bucket evaluates its own copies of
//! the projections, so aggregate state never leaks between groups.

use std::collections::HashMap;

use crate::errors::QueryResult;
use crate::expr::{EvalContext, Expr};
use crate::storage::Record;
use crate::value::Value;
use crate::visitor::CopyVisitor;

struct Bucket {
    projections: Vec<Expr>,
    row: Record,
    first: Option<Record>,
}

/// Accumulates records into one output row per group
pub(crate) struct Grouper<'q> {
    templates: &'q [Expr],
    names: &'q [String],
    slots: HashMap<Vec<Value>, usize>,
    buckets: Vec<Bucket>,
}

impl<'q> Grouper<'q> {
    pub(crate) fn new(templates: &'q [Expr], names: &'q [String]) -> Self {
        Self {
            templates,
            names,
            slots: HashMap::new(),
            buckets: Vec::new(),
        }
    }

    /// Folds one record into the bucket of `key`
    pub(crate) fn add(&mut self, key: Vec<Value>, record: Record, ctx: &EvalContext<'_>) -> QueryResult<()> {
        let slot = match self.slots.get(&key) {
            Some(slot) => *slot,
            None => {
                let projections = self
                    .templates
                    .iter()
                    .map(CopyVisitor::copy)
                    .collect::<QueryResult<Vec<_>>>()?;
                self.buckets.push(Bucket {
                    projections,
                    row: Record::new(),
                    first: None,
                });
                self.slots.insert(key, self.buckets.len() - 1);
                self.buckets.len() - 1
            }
        };

        let bucket = &mut self.buckets[slot];
        if self.templates.is_empty() {
            bucket.first.get_or_insert(record);
            return Ok(());
        }
        for (expr, name) in bucket.projections.iter_mut().zip(self.names) {
            let value = expr.evaluate(ctx, Some(&record))?;
            bucket.row.set(name.clone(), value);
        }
        Ok(())
    }

    /// One row per bucket; without projections the bucket's first record
    pub(crate) fn finish(self) -> Vec<Record> {
        let project = !self.templates.is_empty();
        self.buckets
            .into_iter()
            .filter_map(|bucket| if project { Some(bucket.row) } else { bucket.first })
            .collect()
    }
}

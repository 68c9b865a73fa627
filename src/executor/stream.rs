//! SELECT execution as a pull-based stream
//!
//! Without grouping, ordering or aggregation every pull scans just far
//! enough to produce the next row. Otherwise the first pull filters the
//! whole source, groups and sorts, and later pulls drain the buffer.

use std::collections::BTreeSet;

use super::group::Grouper;
use super::listener::ExecutionStats;
use super::query::{SelectQuery, SortDirection, Target};
use super::sorter::ResultSorter;
use super::source::RecordSource;
use crate::config::{ComparatorFallback, EngineConfig};
use crate::errors::{QueryError, QueryResult};
use crate::expr::{EvalContext, Expr, ExprKind};
use crate::index::IndexProvider;
use crate::observability::{log_event, Event};
use crate::planner::{IdSet, SearchContext, SearchResult};
use crate::storage::{Record, RecordStore};
use crate::value::{RecordId, Value};
use crate::visitor::{CopyVisitor, ParameterCursor, ParameterResolver, Parameters, SimplifyVisitor};

// ============================================================================
// Working copy
// ============================================================================

/// Duplicates query trees, resolving parameters when any were supplied
struct WorkingCopy {
    cursor: Option<ParameterCursor>,
}

impl WorkingCopy {
    fn new(params: &Parameters) -> Self {
        Self {
            cursor: if params.is_empty() { None } else { Some(params.cursor()) },
        }
    }

    fn copy(&mut self, expr: &Expr) -> QueryResult<Expr> {
        match &mut self.cursor {
            Some(cursor) => ParameterResolver::resolve(expr, cursor),
            None => CopyVisitor::copy(expr),
        }
    }

    fn copy_all(&mut self, exprs: &[Expr]) -> QueryResult<Vec<Expr>> {
        exprs.iter().map(|e| self.copy(e)).collect()
    }
}

enum Source {
    Records(Vec<RecordId>),
    Class(String),
    Clusters(Vec<String>),
    Dictionary(Vec<String>),
    SubQuery(Box<Prepared>),
}

/// One execution's private copy of a query
pub(crate) struct Prepared {
    projections: Vec<Expr>,
    names: Vec<String>,
    source: Source,
    filter: Option<Expr>,
    group_by: Vec<Expr>,
    order_by: Vec<(Expr, SortDirection)>,
    skip: u64,
    limit: i64,
    variables: Vec<(String, Value)>,
    buffered: bool,
    grouped: bool,
}

impl Prepared {
    pub(crate) fn new(query: &SelectQuery, params: &Parameters) -> QueryResult<Self> {
        Self::build(query, &mut WorkingCopy::new(params))
    }

    // Parameters are consumed in text order: projections, sub-query,
    // filter, group by, order by.
    fn build(query: &SelectQuery, copier: &mut WorkingCopy) -> QueryResult<Self> {
        let projections = copier.copy_all(&query.projections)?;
        let source = match &query.target {
            Target::Records(rids) => Source::Records(rids.clone()),
            Target::Class(class) => Source::Class(class.clone()),
            Target::Clusters(clusters) => Source::Clusters(clusters.clone()),
            Target::Dictionary(keys) => Source::Dictionary(keys.clone()),
            Target::SubQuery(inner) => Source::SubQuery(Box::new(Self::build(inner, copier)?)),
        };
        let filter = match &query.filter {
            Some(filter) => Some(check_predicate(SimplifyVisitor::simplify(&copier.copy(filter)?)?)?),
            None => None,
        };
        let group_by = copier.copy_all(&query.group_by)?;
        let mut order_by = Vec::with_capacity(query.order_by.len());
        for item in &query.order_by {
            order_by.push((copier.copy(&item.expr)?, item.direction));
        }

        let grouped = !group_by.is_empty() || projections.iter().any(Expr::is_aggregate);
        Ok(Self {
            names: output_names(&projections),
            projections,
            source,
            filter,
            group_by,
            buffered: grouped || !order_by.is_empty(),
            grouped,
            order_by,
            skip: query.skip,
            limit: query.limit,
            variables: query.variables.clone(),
        })
    }

    fn limit(&self) -> Option<u64> {
        u64::try_from(self.limit).ok()
    }
}

/// Rejects a simplified filter that can never be a condition: a non-boolean
/// literal, or a collection or map
fn check_predicate(filter: Expr) -> QueryResult<Expr> {
    let malformed = match filter.kind() {
        ExprKind::Literal(value) => !value.is_null() && value.as_bool().is_none(),
        ExprKind::Collection(_) | ExprKind::Map(_) => true,
        _ => false,
    };
    if malformed {
        return Err(QueryError::MalformedPredicate(format!("'{}' is not a condition", filter)));
    }
    Ok(filter)
}

/// Output field names; a repeated name gets a numeric suffix
fn output_names(projections: &[Expr]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(projections.len());
    for expr in projections {
        let base = expr.output_name();
        let mut name = base.clone();
        let mut suffix = 2;
        while names.contains(&name) {
            name = format!("{}{}", base, suffix);
            suffix += 1;
        }
        names.push(name);
    }
    names
}

// ============================================================================
// Stream
// ============================================================================

/// Collaborators and settings an execution runs with
#[derive(Clone, Copy)]
pub(crate) struct Env<'a> {
    pub store: &'a dyn RecordStore,
    pub indexes: &'a dyn IndexProvider,
    pub fallback: ComparatorFallback,
    pub use_indexes: bool,
    pub optimize_or: bool,
    pub log_queries: bool,
}

impl<'a> Env<'a> {
    pub(crate) fn new(store: &'a dyn RecordStore, indexes: &'a dyn IndexProvider, config: &EngineConfig) -> Self {
        Self {
            store,
            indexes,
            fallback: config.comparator_fallback,
            use_indexes: config.use_indexes,
            optimize_or: config.optimize_or,
            log_queries: config.log_queries,
        }
    }
}

enum State {
    Streaming,
    Pending,
    Buffered(std::vec::IntoIter<Record>),
    Done,
}

/// Lazy, single-pass result sequence of one SELECT execution
pub struct SelectStream<'a> {
    ctx: EvalContext<'a>,
    source: RecordSource<'a>,
    plan: Prepared,
    /// Identities the optimizer proved to match
    included: BTreeSet<RecordId>,
    fallback: ComparatorFallback,
    stats: ExecutionStats,
    valid: u64,
    state: State,
}

impl<'a> SelectStream<'a> {
    pub(crate) fn open(env: Env<'a>, mut plan: Prepared) -> QueryResult<Self> {
        let mut ctx = EvalContext::with_store(env.store);
        for (name, value) in plan.variables.drain(..) {
            ctx.set_variable(name, value);
        }

        let mut stats = ExecutionStats::default();
        let mut included = BTreeSet::new();
        let source = match std::mem::replace(&mut plan.source, Source::Records(Vec::new())) {
            Source::Records(rids) => RecordSource::records(env.store, rids),
            Source::Clusters(clusters) => RecordSource::clusters(env.store, &clusters)?,
            Source::Dictionary(keys) => RecordSource::dictionary(env.store, &keys)?,
            Source::SubQuery(inner) => RecordSource::query(SelectStream::open(env, *inner)?),
            Source::Class(class) => {
                let search = match (&plan.filter, env.use_indexes) {
                    (Some(filter), true) => {
                        let search_ctx = SearchContext::new(Some(class.as_str()), env.indexes)
                            .with_optimize_or(env.optimize_or);
                        filter.search_index(&search_ctx)?
                    }
                    _ => SearchResult::evaluate(),
                };
                let (source, pruned) = class_source(env.store, &class, search, &mut included)?;
                stats.index_used = pruned;
                if env.log_queries {
                    let event = if pruned { Event::IndexPruned } else { Event::FullScan };
                    log_event(event, &[("class", class.as_str())]);
                }
                source
            }
        };

        let state = if plan.buffered { State::Pending } else { State::Streaming };
        Ok(Self {
            ctx,
            source,
            fallback: env.fallback,
            plan,
            included,
            stats,
            valid: 0,
            state,
        })
    }

    /// Counters so far
    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    fn advance(&mut self) -> QueryResult<Option<Record>> {
        loop {
            match &mut self.state {
                State::Done => return Ok(None),
                State::Streaming => return self.next_streaming(),
                State::Pending => {
                    let rows = self.fill()?;
                    self.state = State::Buffered(rows.into_iter());
                }
                State::Buffered(rows) => {
                    let next = rows.next();
                    match next {
                        Some(_) => self.stats.returned += 1,
                        None => self.state = State::Done,
                    }
                    return Ok(next);
                }
            }
        }
    }

    fn next_streaming(&mut self) -> QueryResult<Option<Record>> {
        if self.plan.limit().map(|limit| self.valid >= limit).unwrap_or(false) {
            self.stats.limit_reached = true;
            self.state = State::Done;
            return Ok(None);
        }
        while let Some(record) = self.pull()? {
            if !self.accept(&record)? {
                continue;
            }
            self.valid += 1;
            if self.plan.limit() == Some(self.valid) {
                self.stats.limit_reached = true;
                self.state = State::Done;
            }
            let row = self.project(record)?;
            self.stats.returned += 1;
            return Ok(Some(row));
        }
        self.state = State::Done;
        Ok(None)
    }

    /// Filters, groups, sorts and limits the whole source
    fn fill(&mut self) -> QueryResult<Vec<Record>> {
        let mut matches = Vec::new();
        while let Some(record) = self.pull()? {
            if self.accept(&record)? {
                matches.push(record);
            }
        }

        let mut rows = if self.plan.grouped {
            let grouped = self.group(matches)?;
            self.sort(grouped)?
        } else {
            let sorted = self.sort(matches)?;
            let mut rows = Vec::with_capacity(sorted.len());
            for record in sorted {
                rows.push(self.project(record)?);
            }
            rows
        };

        if let Some(limit) = self.plan.limit() {
            let limit = usize::try_from(limit).unwrap_or(usize::MAX);
            if rows.len() >= limit {
                self.stats.limit_reached = true;
                rows.truncate(limit);
            }
        }
        Ok(rows)
    }

    fn pull(&mut self) -> QueryResult<Option<Record>> {
        let record = self.source.next_record()?;
        if record.is_some() {
            self.stats.scanned += 1;
        }
        Ok(record)
    }

    /// Applies the filter and the skip offset
    fn accept(&mut self, record: &Record) -> QueryResult<bool> {
        let proven = record.id().map(|rid| self.included.contains(&rid)).unwrap_or(false);
        if !proven {
            if let Some(filter) = self.plan.filter.as_mut() {
                if !filter.matches(&self.ctx, Some(record))? {
                    return Ok(false);
                }
            }
        }
        self.stats.tested += 1;
        Ok(self.stats.tested > self.plan.skip)
    }

    /// Evaluates the projections; no projections passes the record through
    fn project(&mut self, record: Record) -> QueryResult<Record> {
        if self.plan.projections.is_empty() {
            return Ok(record);
        }
        let mut row = Record::new();
        for (expr, name) in self.plan.projections.iter_mut().zip(&self.plan.names) {
            let value = expr.evaluate(&self.ctx, Some(&record))?;
            row.set(name.clone(), value);
        }
        Ok(row)
    }

    fn group(&mut self, records: Vec<Record>) -> QueryResult<Vec<Record>> {
        let mut grouper = Grouper::new(&self.plan.projections, &self.plan.names);
        for record in records {
            let key = self
                .plan
                .group_by
                .iter_mut()
                .map(|expr| expr.evaluate(&self.ctx, Some(&record)))
                .collect::<QueryResult<Vec<_>>>()?;
            grouper.add(key, record, &self.ctx)?;
        }
        Ok(grouper.finish())
    }

    fn sort(&mut self, rows: Vec<Record>) -> QueryResult<Vec<Record>> {
        if self.plan.order_by.is_empty() {
            return Ok(rows);
        }
        let mut keyed = Vec::with_capacity(rows.len());
        for row in rows {
            let keys = self
                .plan
                .order_by
                .iter_mut()
                .map(|(expr, _)| expr.evaluate(&self.ctx, Some(&row)))
                .collect::<QueryResult<Vec<_>>>()?;
            keyed.push((keys, row));
        }
        let directions: Vec<SortDirection> = self.plan.order_by.iter().map(|(_, d)| *d).collect();
        ResultSorter::new(&directions, self.fallback).sort(keyed)
    }
}

/// Opens a class source restricted by a search result.
///
/// Returns the source and whether the optimizer pruned the scan.
fn class_source<'a>(
    store: &'a dyn RecordStore,
    class: &str,
    search: SearchResult,
    included: &mut BTreeSet<RecordId>,
) -> QueryResult<(RecordSource<'a>, bool)> {
    if search.is_evaluate() || search.includes_all() {
        return Ok((RecordSource::class(store, class)?, false));
    }
    if search.excludes_all() {
        return Ok((RecordSource::Empty, true));
    }
    if search.is_inclusion_style() {
        if let Some(IdSet::Ids(ids)) = &search.included {
            included.extend(ids.iter().copied());
        }
        return match search.reachable() {
            IdSet::Ids(ids) => Ok((RecordSource::records(store, ids.into_iter().collect()), true)),
            IdSet::All => Ok((RecordSource::class(store, class)?, false)),
        };
    }
    match search.excluded {
        Some(IdSet::Ids(excluded)) => Ok((RecordSource::class(store, class)?.without(excluded), true)),
        _ => Ok((RecordSource::class(store, class)?, false)),
    }
}

impl Iterator for SelectStream<'_> {
    type Item = QueryResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(record) => record.map(Ok),
            Err(e) => {
                self.state = State::Done;
                Some(Err(e))
            }
        }
    }
}

//! Predicate optimization against the target's indexes

use std::fmt;

use super::search::{IdSet, SearchResult};
use crate::errors::QueryResult;
use crate::expr::{Expr, ExprKind};
use crate::index::{IndexKey, IndexKind, IndexProvider};

/// What the optimizer may know about a query
#[derive(Clone, Copy)]
pub struct SearchContext<'a> {
    /// Single named class of the target, if the target has one
    pub target_class: Option<&'a str>,
    pub indexes: &'a dyn IndexProvider,
    /// Reduce OR of two inclusion-style sides by union
    pub optimize_or: bool,
}

impl<'a> SearchContext<'a> {
    pub fn new(target_class: Option<&'a str>, indexes: &'a dyn IndexProvider) -> Self {
        Self {
            target_class,
            indexes,
            optimize_or: false,
        }
    }

    pub fn with_optimize_or(mut self, optimize_or: bool) -> Self {
        self.optimize_or = optimize_or;
        self
    }
}

impl fmt::Debug for SearchContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchContext")
            .field("target_class", &self.target_class)
            .field("optimize_or", &self.optimize_or)
            .finish()
    }
}

impl Expr {
    /// Classifies the identities of the target class this predicate can
    /// match. Without a single target class the result is EVALUATE.
    pub fn search_index(&self, ctx: &SearchContext<'_>) -> QueryResult<SearchResult> {
        let class = match ctx.target_class {
            Some(class) => class,
            None => return Ok(SearchResult::evaluate()),
        };

        match self.kind() {
            ExprKind::Include => Ok(SearchResult::include(IdSet::All)),
            ExprKind::Exclude => Ok(SearchResult::exclude(IdSet::All)),
            ExprKind::Literal(value) if value.is_null() => Ok(SearchResult::exclude(IdSet::All)),
            ExprKind::Literal(value) => Ok(match value.as_bool() {
                Some(true) => SearchResult::include(IdSet::All),
                Some(false) => SearchResult::exclude(IdSet::All),
                None => SearchResult::evaluate(),
            }),
            ExprKind::And(left, right) => Ok(left.search_index(ctx)?.and(right.search_index(ctx)?)),
            ExprKind::Or(left, right) if ctx.optimize_or => {
                Ok(left.search_index(ctx)?.or(right.search_index(ctx)?))
            }
            _ => {
                let (field, value) = match self.as_field_equality() {
                    Some(shape) => shape,
                    None => return Ok(SearchResult::evaluate()),
                };
                if IndexKey::exact(value).is_none() {
                    return Ok(SearchResult::evaluate());
                }
                match ctx.indexes.find_index(class, field) {
                    Some(index) if index.kind() == IndexKind::Unique => {
                        let ids = index.lookup(std::slice::from_ref(value))?;
                        Ok(SearchResult::include(IdSet::Ids(ids)))
                    }
                    _ => Ok(SearchResult::evaluate()),
                }
            }
        }
    }
}

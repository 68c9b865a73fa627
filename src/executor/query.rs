//! SELECT query model

use std::fmt;

use crate::expr::Expr;
use crate::value::{RecordId, Value};

/// Sort direction of one ORDER BY item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "ASC"),
            SortDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// One ORDER BY item
#[derive(Debug)]
pub struct OrderItem {
    pub expr: Expr,
    pub direction: SortDirection,
}

/// Where a query reads its records from
#[derive(Debug)]
pub enum Target {
    /// Explicit identities, in the given order
    Records(Vec<RecordId>),
    /// Every record of a class and its subclasses
    Class(String),
    /// Every record of the named clusters, cluster by cluster
    Clusters(Vec<String>),
    /// Records bound to dictionary keys; unknown keys are skipped
    Dictionary(Vec<String>),
    /// Output of a nested query
    SubQuery(Box<SelectQuery>),
}

impl Target {
    /// The single class a search can be optimized for
    pub fn class(&self) -> Option<&str> {
        match self {
            Target::Class(class) => Some(class),
            _ => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Records(rids) => {
                let rids: Vec<String> = rids.iter().map(|r| r.to_string()).collect();
                write!(f, "[{}]", rids.join(", "))
            }
            Target::Class(class) => write!(f, "{}", class),
            Target::Clusters(clusters) => write!(f, "cluster:[{}]", clusters.join(", ")),
            Target::Dictionary(keys) => write!(f, "dictionary:[{}]", keys.join(", ")),
            Target::SubQuery(query) => write!(f, "({})", query),
        }
    }
}

/// A parsed SELECT.
///
/// Held as a template: every execution works on its own copy, so one query
/// may be executed any number of times.
#[derive(Debug)]
pub struct SelectQuery {
    pub projections: Vec<Expr>,
    pub target: Target,
    pub filter: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub order_by: Vec<OrderItem>,
    pub skip: u64,
    /// Negative means unbounded
    pub limit: i64,
    /// Context variables visible as `$name`
    pub variables: Vec<(String, Value)>,
}

impl SelectQuery {
    /// `SELECT FROM target`
    pub fn from(target: Target) -> Self {
        Self {
            projections: Vec::new(),
            target,
            filter: None,
            group_by: Vec::new(),
            order_by: Vec::new(),
            skip: 0,
            limit: -1,
            variables: Vec::new(),
        }
    }

    pub fn from_class(class: impl Into<String>) -> Self {
        Self::from(Target::Class(class.into()))
    }

    pub fn project(mut self, expr: Expr) -> Self {
        self.projections.push(expr);
        self
    }

    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = Some(expr);
        self
    }

    pub fn group_by(mut self, expr: Expr) -> Self {
        self.group_by.push(expr);
        self
    }

    pub fn order_by(mut self, expr: Expr, direction: SortDirection) -> Self {
        self.order_by.push(OrderItem { expr, direction });
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.push((name.into(), value.into()));
        self
    }

    /// True when any projection aggregates across records
    pub fn has_aggregates(&self) -> bool {
        self.projections.iter().any(Expr::is_aggregate)
    }

    /// True when results must be collected before anything is emitted
    pub fn is_buffered(&self) -> bool {
        !self.group_by.is_empty() || !self.order_by.is_empty() || self.has_aggregates()
    }
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(exprs: &[Expr]) -> String {
            exprs.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", ")
        }

        write!(f, "SELECT")?;
        for (i, expr) in self.projections.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            match expr.alias() {
                Some(alias) => write!(f, "{}{} AS {}", sep, expr, alias)?,
                None => write!(f, "{}{}", sep, expr)?,
            }
        }
        write!(f, " FROM {}", self.target)?;
        if let Some(filter) = &self.filter {
            write!(f, " WHERE {}", filter)?;
        }
        if !self.group_by.is_empty() {
            write!(f, " GROUP BY {}", list(&self.group_by))?;
        }
        if !self.order_by.is_empty() {
            let items: Vec<String> = self
                .order_by
                .iter()
                .map(|item| format!("{} {}", item.expr, item.direction))
                .collect();
            write!(f, " ORDER BY {}", items.join(", "))?;
        }
        if self.skip > 0 {
            write!(f, " SKIP {}", self.skip)?;
        }
        if self.limit >= 0 {
            write!(f, " LIMIT {}", self.limit)?;
        }
        Ok(())
    }
}

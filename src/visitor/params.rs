//! Parameter resolution
//!
//! Named parameters are looked up by name. Anonymous parameters consume one
//! shared positional cursor, one value per occurrence in traversal order, so
//! a cursor must be threaded through every tree of one command in source
//! order.

use std::collections::HashMap;

use super::ExprVisitor;
use crate::errors::{QueryError, QueryResult};
use crate::expr::{Expr, FunctionCall, MethodCall, Parameter};
use crate::value::Value;

/// Values bound to a command's parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    positional: Vec<Value>,
    named: HashMap<String, Value>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional(values: Vec<Value>) -> Self {
        Self {
            positional: values,
            named: HashMap::new(),
        }
    }

    /// Appends the next positional value
    pub fn push(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Binds a named value
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    pub fn named(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    /// A fresh positional cursor over a copy of these parameters
    pub fn cursor(&self) -> ParameterCursor {
        ParameterCursor {
            parameters: self.clone(),
            next: 0,
        }
    }
}

/// Shared read position over positional parameters
#[derive(Debug)]
pub struct ParameterCursor {
    parameters: Parameters,
    next: usize,
}

impl ParameterCursor {
    /// Takes the next positional value; fails once all are consumed
    pub fn next_positional(&mut self) -> QueryResult<Value> {
        let value = self
            .parameters
            .positional
            .get(self.next)
            .cloned()
            .ok_or(QueryError::ParameterExhausted(self.next + 1))?;
        self.next += 1;
        Ok(value)
    }

    /// Number of positional values consumed so far
    pub fn consumed(&self) -> usize {
        self.next
    }

    fn named(&self, name: &str) -> Option<Value> {
        self.parameters.named(name).cloned()
    }
}

/// Replaces parameters with literals; the rest of the tree is copied
#[derive(Debug, Default, Clone, Copy)]
pub struct ParameterResolver;

impl ParameterResolver {
    /// Resolves one tree, advancing the shared cursor
    pub fn resolve(expr: &Expr, cursor: &mut ParameterCursor) -> QueryResult<Expr> {
        expr.accept(&mut ParameterResolver, cursor)
    }

    fn descend(&mut self, node: &Expr, cursor: &mut ParameterCursor) -> QueryResult<Expr> {
        node.rebuild(&mut |child| child.accept(self, cursor))
    }
}

impl ExprVisitor for ParameterResolver {
    type Data = ParameterCursor;
    type Output = Expr;

    fn visit_leaf(&mut self, node: &Expr, cursor: &mut ParameterCursor) -> QueryResult<Expr> {
        self.descend(node, cursor)
    }

    fn visit_parameter(
        &mut self,
        node: &Expr,
        parameter: &Parameter,
        cursor: &mut ParameterCursor,
    ) -> QueryResult<Expr> {
        let value = match &parameter.name {
            Some(name) => match cursor.named(name) {
                Some(value) => value,
                None => return self.descend(node, cursor),
            },
            None => cursor.next_positional()?,
        };
        Ok(Expr::literal(value).with_alias_opt(node.alias.clone()))
    }

    fn visit_function(&mut self, node: &Expr, _call: &FunctionCall, cursor: &mut ParameterCursor) -> QueryResult<Expr> {
        self.descend(node, cursor)
    }

    fn visit_method(
        &mut self,
        node: &Expr,
        _source: &Expr,
        _call: &MethodCall,
        cursor: &mut ParameterCursor,
    ) -> QueryResult<Expr> {
        self.descend(node, cursor)
    }

    fn visit_operator(&mut self, node: &Expr, cursor: &mut ParameterCursor) -> QueryResult<Expr> {
        self.descend(node, cursor)
    }

    fn visit_condition(&mut self, node: &Expr, cursor: &mut ParameterCursor) -> QueryResult<Expr> {
        self.descend(node, cursor)
    }

    fn visit_composite(&mut self, node: &Expr, cursor: &mut ParameterCursor) -> QueryResult<Expr> {
        self.descend(node, cursor)
    }
}

//! SQL-like rendering of expression trees

use std::fmt;

use super::node::{Expr, ExprKind};

fn join(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Literal(value) => write!(f, "{}", value),
            ExprKind::Name(name) => write!(f, "{}", name),
            ExprKind::Path(segments) => write!(f, "{}", segments.join(".")),
            ExprKind::Variable(name) => write!(f, "${}", name),
            ExprKind::Parameter(p) => match &p.name {
                Some(name) => write!(f, ":{}", name),
                None => write!(f, "?"),
            },
            ExprKind::Collection(items) => {
                write!(f, "[")?;
                join(f, items)?;
                write!(f, "]")
            }
            ExprKind::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{}': {}", key, value)?;
                }
                write!(f, "}}")
            }
            ExprKind::Function(call) => {
                write!(f, "{}(", call.name())?;
                join(f, call.args())?;
                write!(f, ")")
            }
            ExprKind::Method { source, call } => {
                write!(f, "{}.{}(", source, call.name())?;
                join(f, call.args())?;
                write!(f, ")")
            }
            ExprKind::Operator { operator, left, right } => {
                write!(f, "{} {} {}", left, operator.keyword(), right)
            }
            ExprKind::And(left, right) => write!(f, "({} AND {})", left, right),
            ExprKind::Or(left, right) => write!(f, "({} OR {})", left, right),
            ExprKind::Not(inner) => write!(f, "NOT {}", inner),
            ExprKind::Compare { op, left, right } => write!(f, "{} {} {}", left, op.symbol(), right),
            ExprKind::Like { value, pattern, .. } => write!(f, "{} LIKE {}", value, pattern),
            ExprKind::Between { value, low, high } => {
                write!(f, "{} BETWEEN {} AND {}", value, low, high)
            }
            ExprKind::In { value, set } => write!(f, "{} IN {}", value, set),
            ExprKind::IsNull(inner) => write!(f, "{} IS NULL", inner),
            ExprKind::IsNotNull(inner) => write!(f, "{} IS NOT NULL", inner),
            ExprKind::Filtered { source, filter } => write!(f, "{}[{}]", source, filter),
            ExprKind::Include => write!(f, "true"),
            ExprKind::Exclude => write!(f, "false"),
        }
    }
}

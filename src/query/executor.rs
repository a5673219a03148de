//! Evaluates a parsed [`Query`] against a table.
//!
//! Projection runs first, then the filter is compiled against the projected
//! columns and evaluated row by row. Comparisons follow SQL three-valued
//! logic: anything compared with null is unknown, and only rows whose filter
//! is definitely true are kept.

use std::cmp::Ordering;

use crate::query::ast::{CompareOp, Expr, Projection, Query};
use crate::query::errors::ExecError;
use crate::query::filter::parse_filter;
use crate::table::{Table, Value};

/// Runs `query` over `table` and returns a new table.
///
/// `table` is never modified; row order is preserved.
pub fn execute(query: &Query, table: &Table) -> Result<Table, ExecError> {
    let projected = project(&query.columns, table)?;
    let Some(filter) = &query.filter else {
        return Ok(projected);
    };

    let expr = parse_filter(filter)?;
    let bound = bind(&expr, &projected)?;
    let keep = projected
        .rows()
        .iter()
        .map(|row| bound.matches(row))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(projected.retain_rows(&keep))
}

fn project(columns: &Projection, table: &Table) -> Result<Table, ExecError> {
    match columns {
        Projection::Wildcard => Ok(table.clone()),
        Projection::Columns(names) => {
            let indices = names
                .iter()
                .map(|name| {
                    table
                        .column_index(name)
                        .ok_or_else(|| ExecError::UnknownColumn(name.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(table.select(&indices))
        }
    }
}

/// Filter expression with column names resolved to row positions.
#[derive(Debug)]
enum Bound {
    Column(usize),
    Literal(Value),
    Compare {
        op: CompareOp,
        left: Box<Bound>,
        right: Box<Bound>,
    },
    IsNull {
        inner: Box<Bound>,
        negated: bool,
    },
    Not(Box<Bound>),
    And(Box<Bound>, Box<Bound>),
    Or(Box<Bound>, Box<Bound>),
}

fn bind(expr: &Expr, table: &Table) -> Result<Bound, ExecError> {
    let bound = match expr {
        Expr::Column(name) => Bound::Column(
            table
                .column_index(name)
                .ok_or_else(|| ExecError::UnknownColumn(name.clone()))?,
        ),
        Expr::Literal(value) => Bound::Literal(value.clone()),
        Expr::Compare { op, left, right } => Bound::Compare {
            op: *op,
            left: Box::new(bind(left, table)?),
            right: Box::new(bind(right, table)?),
        },
        Expr::IsNull { expr, negated } => Bound::IsNull {
            inner: Box::new(bind(expr, table)?),
            negated: *negated,
        },
        Expr::Not(inner) => Bound::Not(Box::new(bind(inner, table)?)),
        Expr::And(left, right) => {
            Bound::And(Box::new(bind(left, table)?), Box::new(bind(right, table)?))
        }
        Expr::Or(left, right) => {
            Bound::Or(Box::new(bind(left, table)?), Box::new(bind(right, table)?))
        }
    };
    Ok(bound)
}

/// Kleene truth value; `None` is unknown.
type Truth = Option<bool>;

impl Bound {
    fn matches(&self, row: &[Value]) -> Result<bool, ExecError> {
        Ok(self.truth(row, "WHERE clause")? == Some(true))
    }

    fn value(&self, row: &[Value]) -> Result<Value, ExecError> {
        match self {
            Bound::Column(idx) => Ok(row[*idx].clone()),
            Bound::Literal(value) => Ok(value.clone()),
            _ => Ok(match self.truth(row, "expression")? {
                Some(flag) => Value::Bool(flag),
                None => Value::Null,
            }),
        }
    }

    fn truth(&self, row: &[Value], context: &'static str) -> Result<Truth, ExecError> {
        match self {
            Bound::Column(_) | Bound::Literal(_) => match self.value(row)? {
                Value::Bool(flag) => Ok(Some(flag)),
                Value::Null => Ok(None),
                other => Err(ExecError::NotBoolean {
                    context,
                    found: other.data_type(),
                }),
            },
            Bound::Compare { op, left, right } => {
                compare(*op, &left.value(row)?, &right.value(row)?)
            }
            Bound::IsNull { inner, negated } => {
                let is_null = inner.value(row)?.is_null();
                Ok(Some(is_null != *negated))
            }
            Bound::Not(inner) => Ok(inner.truth(row, "NOT")?.map(|flag| !flag)),
            Bound::And(left, right) => {
                let left = left.truth(row, "AND")?;
                if left == Some(false) {
                    return Ok(Some(false));
                }
                match (left, right.truth(row, "AND")?) {
                    (_, Some(false)) => Ok(Some(false)),
                    (Some(true), Some(true)) => Ok(Some(true)),
                    _ => Ok(None),
                }
            }
            Bound::Or(left, right) => {
                let left = left.truth(row, "OR")?;
                if left == Some(true) {
                    return Ok(Some(true));
                }
                match (left, right.truth(row, "OR")?) {
                    (_, Some(true)) => Ok(Some(true)),
                    (Some(false), Some(false)) => Ok(Some(false)),
                    _ => Ok(None),
                }
            }
        }
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<Truth, ExecError> {
    if left.is_null() || right.is_null() {
        return Ok(None);
    }
    let ordering = left.partial_cmp_value(right);
    let result = match (op, ordering) {
        (CompareOp::Eq, ordering) => ordering == Some(Ordering::Equal),
        (CompareOp::Ne, ordering) => ordering != Some(Ordering::Equal),
        (_, None) => {
            return Err(ExecError::TypeMismatch {
                op: op.symbol(),
                left: left.data_type(),
                right: right.data_type(),
            })
        }
        (CompareOp::Lt, Some(ord)) => ord == Ordering::Less,
        (CompareOp::Le, Some(ord)) => ord != Ordering::Greater,
        (CompareOp::Gt, Some(ord)) => ord == Ordering::Greater,
        (CompareOp::Ge, Some(ord)) => ord != Ordering::Less,
    };
    Ok(Some(result))
}

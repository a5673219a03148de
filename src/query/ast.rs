//! Parsed forms of a statement and of its filter expression.
//!
//! A [`Query`] keeps the filter as raw text; it is compiled into an [`Expr`]
//! only when the query is executed, which keeps statement parsing and
//! filter evaluation as separate stages.

use std::fmt;

use crate::table::Value;

/// Columns requested by a statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Projection {
    /// `*`: every column, in table order.
    Wildcard,
    /// Named columns in the requested order. Duplicates are allowed.
    Columns(Vec<String>),
}

/// Parsed `SELECT ... [WHERE ...]` statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    /// Projection clause.
    pub columns: Projection,
    /// Raw filter text following `WHERE`, if any.
    pub filter: Option<String>,
}

/// Comparison operators accepted in filters.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompareOp {
    /// `=` or `==`
    Eq,
    /// `!=` or `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    /// Canonical operator spelling.
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Boolean filter expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Reference to a column by name.
    Column(String),
    /// Constant operand.
    Literal(Value),
    /// Binary comparison.
    Compare {
        /// Comparison operator.
        op: CompareOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// `expr IS [NOT] NULL`.
    IsNull {
        /// Tested operand.
        expr: Box<Expr>,
        /// `true` for `IS NOT NULL`.
        negated: bool,
    },
    /// Logical negation.
    Not(Box<Expr>),
    /// Logical conjunction.
    And(Box<Expr>, Box<Expr>),
    /// Logical disjunction.
    Or(Box<Expr>, Box<Expr>),
}

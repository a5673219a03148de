#![forbid(unsafe_code)]

//! Restricted query language: `SELECT <columns> [WHERE <filter>]`.
//!
//! Parsing and execution are separate stages. [`parse`] turns statement text
//! into a [`Query`] and never looks at data; [`execute`] projects and filters
//! a [`Table`](crate::table::Table) and never sees raw statement text.
//! There are no joins, grouping, ordering, aggregates or subqueries.

/// Statement and filter syntax trees.
pub mod ast;

/// Structured parse and execution errors.
pub mod errors;

/// Projection and filter evaluation.
pub mod executor;

/// Filter expression parser.
pub mod filter;

mod lexer;

/// Statement parser.
pub mod parser;

pub use ast::{CompareOp, Expr, Projection, Query};
pub use errors::{ExecError, FilterSyntaxError, ParseError, QueryError};
pub use executor::execute;
pub use filter::parse_filter;
pub use parser::parse;

use crate::table::Table;

/// Parses `text` and executes it against `table` in one call.
pub fn run(text: &str, table: &Table) -> Result<Table, QueryError> {
    let query = parse(text)?;
    Ok(execute(&query, table)?)
}

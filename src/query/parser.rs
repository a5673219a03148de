//! Statement parser for `SELECT <columns> [WHERE <filter>]`.
//!
//! The clause boundary is the first case-insensitive occurrence of the text
//! `where` anywhere in the statement. A column name or string literal that
//! contains `where` therefore splits the statement in the wrong place; this
//! is a known limitation kept for compatibility with generated queries.

use crate::query::ast::{Projection, Query};
use crate::query::errors::ParseError;

const SELECT: &str = "select";
const WHERE: &str = "where";

/// Parses a statement into a [`Query`].
///
/// The filter is kept as raw text; see [`crate::query::parse_filter`].
pub fn parse(text: &str) -> Result<Query, ParseError> {
    let statement = text.trim();
    let statement = statement.strip_suffix(';').unwrap_or(statement).trim_end();
    // ASCII lowering keeps byte offsets aligned with `statement`.
    let lowered = statement.to_ascii_lowercase();
    if !lowered.starts_with(SELECT) {
        return Err(ParseError::NotASelect);
    }

    let (select_clause, filter) = match lowered.find(WHERE) {
        Some(idx) => (
            &statement[..idx],
            Some(statement[idx + WHERE.len()..].trim().to_owned()),
        ),
        None => (statement, None),
    };
    let column_clause = strip_from_tail(select_clause[SELECT.len()..].trim());

    Ok(Query {
        columns: parse_projection(column_clause)?,
        filter,
    })
}

fn parse_projection(clause: &str) -> Result<Projection, ParseError> {
    if clause.is_empty() {
        return Err(ParseError::EmptyProjection);
    }
    if clause == "*" {
        return Ok(Projection::Wildcard);
    }
    clause
        .split(',')
        .enumerate()
        .map(|(position, raw)| {
            let name = unquote(raw.trim());
            if name.is_empty() {
                Err(ParseError::EmptyColumnName { position })
            } else {
                Ok(name.to_owned())
            }
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Projection::Columns)
}

/// Drops a `FROM <source>` tail; the source table is implied.
fn strip_from_tail(clause: &str) -> &str {
    let lowered = clause.to_ascii_lowercase();
    let bytes = lowered.as_bytes();
    let is_word = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
    for (idx, _) in lowered.match_indices("from") {
        let before = idx.checked_sub(1).map(|i| bytes[i]);
        let after = bytes.get(idx + 4).copied();
        if !before.is_some_and(is_word) && !after.is_some_and(is_word) {
            return clause[..idx].trim();
        }
    }
    clause
}

fn unquote(name: &str) -> &str {
    for quote in ['`', '"'] {
        if name.len() >= 2 && name.starts_with(quote) && name.ends_with(quote) {
            return &name[1..name.len() - 1];
        }
    }
    name
}

#![forbid(unsafe_code)]

use thiserror::Error;

use crate::table::DataType;

/// Statement-level parse failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The statement does not start with `SELECT`.
    #[error("query must start with SELECT")]
    NotASelect,
    /// Nothing follows `SELECT`.
    #[error("SELECT requires '*' or at least one column name")]
    EmptyProjection,
    /// A comma-separated column list contains a blank entry.
    #[error("empty column name at position {position} in SELECT list")]
    EmptyColumnName {
        /// Zero-based entry index.
        position: usize,
    },
}

impl ParseError {
    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            ParseError::NotASelect => "NotASelect",
            ParseError::EmptyProjection => "EmptyProjection",
            ParseError::EmptyColumnName { .. } => "EmptyColumnName",
        }
    }
}

/// Syntax error inside a filter expression.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message} at offset {offset}")]
pub struct FilterSyntaxError {
    /// What the parser expected or found.
    pub message: String,
    /// Byte offset into the filter text.
    pub offset: usize,
}

impl FilterSyntaxError {
    pub(crate) fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// Failures while executing a parsed query against a table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// A projected or filtered column does not exist.
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
    /// The filter text is not a valid boolean expression.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    /// Operands cannot be ordered against each other.
    #[error("cannot compare {left} {op} {right}")]
    TypeMismatch {
        /// Operator symbol.
        op: &'static str,
        /// Left operand type.
        left: DataType,
        /// Right operand type.
        right: DataType,
    },
    /// A logical position held something other than a boolean.
    #[error("expected a boolean in {context}, found {found}")]
    NotBoolean {
        /// Where the value appeared.
        context: &'static str,
        /// Type that was found.
        found: DataType,
    },
}

impl ExecError {
    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            ExecError::UnknownColumn(_) => "UnknownColumn",
            ExecError::InvalidFilter(_) => "InvalidFilter",
            ExecError::TypeMismatch { .. } => "TypeMismatch",
            ExecError::NotBoolean { .. } => "NotBoolean",
        }
    }
}

impl From<FilterSyntaxError> for ExecError {
    fn from(err: FilterSyntaxError) -> Self {
        ExecError::InvalidFilter(err.to_string())
    }
}

/// Either stage of running a statement.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Statement parsing failed.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Execution failed.
    #[error(transparent)]
    Exec(#[from] ExecError),
}

impl QueryError {
    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::Parse(err) => err.code(),
            QueryError::Exec(err) => err.code(),
        }
    }
}

#![forbid(unsafe_code)]

//! Request-level error taxonomy.
//!
//! Each layer keeps its own error type; [`LakeError`] wraps them so callers
//! get one `code()` and one HTTP status per failure.

use thiserror::Error;

use crate::provider::ProviderError;
use crate::query::{ExecError, ParseError, QueryError};
use crate::storage::StorageError;

/// Result alias for request-level operations.
pub type Result<T> = std::result::Result<T, LakeError>;

/// Request-level failure surfaced to callers.
#[derive(Debug, Error)]
pub enum LakeError {
    /// Storage could not be reached or read.
    #[error("storage failure: {0}")]
    Infrastructure(#[from] StorageError),
    /// No partitions or no rows for the request.
    #[error("{0}")]
    NotFound(String),
    /// The request itself is malformed.
    #[error("{0}")]
    Validation(String),
    /// The generated statement did not parse.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The generated statement failed against the data.
    #[error(transparent)]
    Exec(#[from] ExecError),
    /// The language model failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl LakeError {
    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        LakeError::NotFound(message.into())
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        LakeError::Validation(message.into())
    }

    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            LakeError::Infrastructure(err) => err.code(),
            LakeError::NotFound(_) => "NotFound",
            LakeError::Validation(_) => "Validation",
            LakeError::Parse(err) => err.code(),
            LakeError::Exec(err) => err.code(),
            LakeError::Provider(err) => err.code(),
        }
    }

    /// HTTP status equivalent of the error.
    pub fn http_status(&self) -> u16 {
        match self {
            LakeError::Infrastructure(_) => 500,
            LakeError::NotFound(_) => 404,
            LakeError::Validation(_) | LakeError::Parse(_) | LakeError::Exec(_) => 400,
            LakeError::Provider(_) => 502,
        }
    }
}

impl From<QueryError> for LakeError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Parse(err) => LakeError::Parse(err),
            QueryError::Exec(err) => LakeError::Exec(err),
        }
    }
}

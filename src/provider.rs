#![forbid(unsafe_code)]

//! Language-model capability used by the orchestrator.
//!
//! Providers form a closed set selected by name through [`ProviderKind`].
//! Prompt construction and vendor clients live outside this crate; the only
//! in-tree model is [`PassthroughModel`], which treats the question as the
//! statement to run. It backs the CLI and lets the full pipeline run without
//! network access.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::inspect::SchemaDescriptor;
use crate::table::Table;

/// Failure reported by a language model.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider call failed.
    #[error("provider '{provider}' request failed: {message}")]
    Request {
        /// Provider name.
        provider: String,
        /// Failure description.
        message: String,
    },
    /// The provider answered with nothing usable.
    #[error("provider '{provider}' returned an empty response")]
    EmptyResponse {
        /// Provider name.
        provider: String,
    },
}

impl ProviderError {
    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            ProviderError::Request { .. } => "ProviderRequest",
            ProviderError::EmptyResponse { .. } => "ProviderEmptyResponse",
        }
    }
}

/// Capability turning questions into statements and results into prose.
///
/// No guarantee is made about latency, determinism or the validity of the
/// generated statement; callers parse and execute it and surface failures.
pub trait LanguageModel: Send + Sync {
    /// Provider name used in logs and errors.
    fn name(&self) -> &str;

    /// Model identifier the provider was built with.
    fn model(&self) -> &str;

    /// Produces a candidate statement answering `question`.
    fn generate_query(
        &self,
        question: &str,
        schema: &SchemaDescriptor,
        sample: &str,
    ) -> Result<String, ProviderError>;

    /// Describes `results` of running `query` for `question`.
    fn explain(&self, question: &str, query: &str, results: &Table)
        -> Result<String, ProviderError>;
}

/// Providers this build can construct.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Uses the question text as the statement.
    Passthrough,
}

impl ProviderKind {
    /// Every provider, in listing order.
    pub const ALL: [ProviderKind; 1] = [ProviderKind::Passthrough];

    /// Configuration name.
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Passthrough => "passthrough",
        }
    }

    /// Human-readable description for provider listings.
    pub fn info(self) -> ProviderInfo {
        match self {
            ProviderKind::Passthrough => ProviderInfo {
                name: self.as_str(),
                display_name: "Passthrough (question is the query)",
                models: vec![PassthroughModel::DEFAULT_MODEL],
                requires_key: false,
            },
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a provider name outside [`ProviderKind::ALL`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown provider '{0}'")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownProvider(wanted.to_owned()))
    }
}

/// Listing entry describing one provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProviderInfo {
    /// Configuration name.
    pub name: &'static str,
    /// Human-readable name.
    pub display_name: &'static str,
    /// Model identifiers accepted by the provider.
    pub models: Vec<&'static str>,
    /// Whether the provider needs an API key.
    pub requires_key: bool,
}

/// Builds the model for `kind`. `model` overrides the provider's default model.
pub fn build_provider(kind: ProviderKind, model: Option<&str>) -> Box<dyn LanguageModel> {
    match kind {
        ProviderKind::Passthrough => Box::new(PassthroughModel::new(
            model.unwrap_or(PassthroughModel::DEFAULT_MODEL),
        )),
    }
}

/// Model that returns the question unchanged as the statement.
#[derive(Clone, Debug)]
pub struct PassthroughModel {
    model: String,
}

impl PassthroughModel {
    /// Model identifier used when none is configured.
    pub const DEFAULT_MODEL: &'static str = "identity";

    /// Creates the model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

impl LanguageModel for PassthroughModel {
    fn name(&self) -> &str {
        ProviderKind::Passthrough.as_str()
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn generate_query(
        &self,
        question: &str,
        _schema: &SchemaDescriptor,
        _sample: &str,
    ) -> Result<String, ProviderError> {
        let statement = question.trim();
        if statement.is_empty() {
            return Err(ProviderError::EmptyResponse {
                provider: self.name().to_owned(),
            });
        }
        Ok(statement.to_owned())
    }

    fn explain(
        &self,
        _question: &str,
        query: &str,
        results: &Table,
    ) -> Result<String, ProviderError> {
        let rows = results.num_rows();
        let columns = results.num_columns();
        Ok(format!(
            "`{query}` returned {rows} row{} across {columns} column{}.",
            if rows == 1 { "" } else { "s" },
            if columns == 1 { "" } else { "s" },
        ))
    }
}

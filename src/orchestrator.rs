#![forbid(unsafe_code)]

//! Question answering over a date range of partitions.
//!
//! One [`Orchestrator::ask`] call runs the whole pipeline synchronously:
//! resolve the range, load it, summarise it for the language model, run the
//! statement the model produced, then ask the model to explain the result.
//! Failures surface as [`LakeError`] without retries.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime};
use tracing::{debug, info};

use crate::catalog::{format_date, parse_date, DateRange, PartitionCatalog, PartitionLayout};
use crate::config::LakeConfig;
use crate::error::{LakeError, Result};
use crate::ingest::Ingestor;
use crate::inspect::{describe_schema, render_sample, SchemaDescriptor};
use crate::provider::{build_provider, LanguageModel, ProviderKind};
use crate::query;
use crate::storage::ObjectStore;
use crate::table::Table;

const NO_PARTITIONS: &str = "No data available in storage";
const NO_ROWS: &str = "No data available for the specified date range";

/// A natural-language question and optional overrides.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct QuestionRequest {
    /// Question to answer.
    pub question: String,
    /// Provider name; the configured provider when absent.
    pub provider: Option<String>,
    /// Model override for the provider.
    pub model: Option<String>,
    /// First day (`YYYY-MM-DD`); requires `end_date`.
    pub start_date: Option<String>,
    /// Last day (`YYYY-MM-DD`); requires `start_date`.
    pub end_date: Option<String>,
}

impl QuestionRequest {
    /// Request for `question` over the default window.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }

    /// Restricts the request to `start..=end`.
    pub fn with_dates(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_date = Some(start.into());
        self.end_date = Some(end.into());
        self
    }
}

/// Result of a question.
#[derive(Clone, Debug, Serialize)]
pub struct Answer {
    /// The question as asked.
    pub question: String,
    /// Statement the model produced.
    pub sql_query: String,
    /// Rows the statement returned.
    pub results: Table,
    /// The model's description of the rows.
    pub explanation: String,
}

/// Summary of the data in a range, as shown to the language model.
#[derive(Clone, Debug, Serialize)]
pub struct Inspection {
    /// Range that was loaded.
    pub range: DateRange,
    /// Rows loaded.
    pub rows: usize,
    /// Column summaries.
    pub schema: SchemaDescriptor,
    /// Rendered leading rows.
    pub sample: String,
}

/// Runs requests against one store with one configuration.
pub struct Orchestrator {
    config: LakeConfig,
    catalog: PartitionCatalog,
    ingestor: Ingestor,
    today: Option<Date>,
}

impl Orchestrator {
    /// Orchestrator reading partitions from `store`.
    pub fn new(store: Arc<dyn ObjectStore>, config: LakeConfig) -> Self {
        let layout = PartitionLayout::new(config.storage.base_path.clone());
        let ingestor = Ingestor::new(store.clone(), layout.clone())
            .with_file_suffix(config.storage.file_suffix.clone());
        Self {
            catalog: PartitionCatalog::new(store, layout),
            ingestor,
            config,
            today: None,
        }
    }

    /// Pins the date that default windows end on.
    pub fn with_today(mut self, today: Date) -> Self {
        self.today = Some(today);
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &LakeConfig {
        &self.config
    }

    fn today(&self) -> Date {
        self.today.unwrap_or_else(|| OffsetDateTime::now_utc().date())
    }

    /// Earliest and latest partition dates in storage.
    pub fn available_dates(&self) -> Result<DateRange> {
        self.catalog
            .list_partition_dates()?
            .ok_or_else(|| LakeError::not_found(NO_PARTITIONS))
    }

    /// Validates request dates, falling back to the trailing default window.
    pub fn resolve_range(&self, start: Option<&str>, end: Option<&str>) -> Result<DateRange> {
        let (start, end) = match (start, end) {
            (Some(start), Some(end)) => (parse_request_date(start)?, parse_request_date(end)?),
            (None, None) => {
                let end = self.today();
                let window = Duration::days(i64::from(self.config.ingest.default_window_days));
                (end.saturating_sub(window), end)
            }
            _ => {
                return Err(LakeError::validation(
                    "start_date and end_date must be given together",
                ))
            }
        };
        DateRange::new(start, end).ok_or_else(|| {
            LakeError::validation(format!(
                "start_date {} is after end_date {}",
                format_date(start),
                format_date(end)
            ))
        })
    }

    /// Loads `range`; an empty result is [`LakeError::NotFound`].
    pub fn load(&self, range: DateRange) -> Result<Table> {
        let file_limit = self.config.ingest.file_limit;
        let table = self
            .ingestor
            .load_range(range.start(), range.end(), file_limit)?;
        if table.is_empty() {
            return Err(LakeError::not_found(NO_ROWS));
        }
        Ok(table)
    }

    /// Loads `range` and summarises it.
    pub fn inspect(&self, range: DateRange) -> Result<Inspection> {
        let table = self.load(range)?;
        Ok(Inspection {
            range,
            rows: table.num_rows(),
            schema: describe_schema(&table),
            sample: render_sample(&table, self.config.ingest.sample_rows),
        })
    }

    /// Runs `sql` directly against `range`, skipping the language model.
    pub fn run_query(&self, sql: &str, range: DateRange) -> Result<Table> {
        let table = self.load(range)?;
        Ok(query::run(sql, &table)?)
    }

    /// Builds the model named by the request, or the configured default.
    pub fn provider_for(&self, request: &QuestionRequest) -> Result<Box<dyn LanguageModel>> {
        let name = request
            .provider
            .as_deref()
            .unwrap_or(&self.config.provider.name);
        let kind = name
            .parse::<ProviderKind>()
            .map_err(|err| LakeError::validation(err.to_string()))?;
        let model = request
            .model
            .as_deref()
            .or(self.config.provider.model.as_deref());
        Ok(build_provider(kind, model))
    }

    /// Answers `request` with the model it names.
    pub fn ask(&self, request: &QuestionRequest) -> Result<Answer> {
        let model = self.provider_for(request)?;
        self.ask_with(model.as_ref(), request)
    }

    /// Answers `request` with `model`, ignoring the request's provider fields.
    pub fn ask_with(&self, model: &dyn LanguageModel, request: &QuestionRequest) -> Result<Answer> {
        let question = request.question.trim();
        if question.is_empty() {
            return Err(LakeError::validation("Question is required"));
        }
        let range =
            self.resolve_range(request.start_date.as_deref(), request.end_date.as_deref())?;
        info!(
            provider = model.name(),
            model = model.model(),
            start = %format_date(range.start()),
            end = %format_date(range.end()),
            "answering question"
        );

        let table = self.load(range)?;
        let schema = describe_schema(&table);
        let sample = render_sample(&table, self.config.ingest.sample_rows);

        let sql_query = model.generate_query(question, &schema, &sample)?;
        debug!(%sql_query, "generated query");
        let results = query::run(&sql_query, &table)?;
        let explanation = model.explain(question, &sql_query, &results)?;
        info!(rows = results.num_rows(), "question answered");

        Ok(Answer {
            question: question.to_owned(),
            sql_query,
            results,
            explanation,
        })
    }
}

fn parse_request_date(text: &str) -> Result<Date> {
    parse_date(text).map_err(|_| {
        LakeError::validation(format!("Invalid date '{text}'. Use YYYY-MM-DD"))
    })
}

//! Natural-language questions over a date-partitioned lake of CSV files.
//!
//! Partitions live under `year=YYYY/month=MM/day=DD/` prefixes in an
//! [`storage::ObjectStore`]. The [`catalog`] discovers which days exist,
//! [`ingest`] loads a range of days into one [`table::Table`], [`inspect`]
//! summarises it for a language model, and [`query`] runs the restricted
//! `SELECT ... WHERE ...` statement the model produces. The
//! [`orchestrator`] sequences those steps for one question; [`server`]
//! exposes it over HTTP.

#![warn(missing_docs)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod ingest;
pub mod inspect;
pub mod orchestrator;
pub mod provider;
pub mod query;
pub mod server;
pub mod storage;
pub mod table;

pub use error::{LakeError, Result};
pub use orchestrator::{Answer, Orchestrator, QuestionRequest};

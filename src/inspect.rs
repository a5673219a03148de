#![forbid(unsafe_code)]

//! Schema and sample summaries of a loaded table.
//!
//! The rendered text is handed verbatim to the language model, so an empty
//! table renders an explicit "no data" sentence instead of an empty schema.

use std::fmt;

use serde::Serialize;

use crate::table::{DataType, Table, Value};

/// Rows included in a sample when the caller does not choose.
pub const DEFAULT_SAMPLE_ROWS: usize = 5;

const NO_SCHEMA: &str = "No data available to generate schema.";
const NO_SAMPLE: &str = "No data available for sampling.";

/// One column of a [`SchemaDescriptor`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnSummary {
    /// Column name.
    pub column_name: String,
    /// Inferred column type.
    pub inferred_type: DataType,
    /// First non-null value, or [`Value::Null`] for an all-null column.
    pub example_value: Value,
}

/// Column-level description of a table.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "columns", rename_all = "snake_case")]
pub enum SchemaDescriptor {
    /// The table had no rows.
    NoData,
    /// Columns in table order.
    Columns(Vec<ColumnSummary>),
}

impl SchemaDescriptor {
    /// Column summaries; empty for [`SchemaDescriptor::NoData`].
    pub fn columns(&self) -> &[ColumnSummary] {
        match self {
            SchemaDescriptor::NoData => &[],
            SchemaDescriptor::Columns(columns) => columns,
        }
    }
}

impl fmt::Display for SchemaDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaDescriptor::NoData => f.write_str(NO_SCHEMA),
            SchemaDescriptor::Columns(columns) => {
                f.write_str("Table Schema:")?;
                for column in columns {
                    write!(
                        f,
                        "\n- {} ({}): Example value: {}",
                        column.column_name, column.inferred_type, column.example_value
                    )?;
                }
                Ok(())
            }
        }
    }
}

/// Describes every column of `table`.
pub fn describe_schema(table: &Table) -> SchemaDescriptor {
    if table.is_empty() {
        return SchemaDescriptor::NoData;
    }
    let columns = table
        .fields()
        .iter()
        .enumerate()
        .map(|(idx, field)| ColumnSummary {
            column_name: field.name.clone(),
            inferred_type: field.data_type,
            example_value: table
                .column_values(idx)
                .find(|value| !value.is_null())
                .cloned()
                .unwrap_or(Value::Null),
        })
        .collect();
    SchemaDescriptor::Columns(columns)
}

/// First `n` rows of `table`, in table order.
pub fn sample_rows(table: &Table, n: usize) -> Table {
    table.head(n)
}

/// Text rendering of the first `n` rows for prompts.
pub fn render_sample(table: &Table, n: usize) -> String {
    if table.is_empty() {
        return NO_SAMPLE.to_owned();
    }
    sample_rows(table, n).to_string()
}

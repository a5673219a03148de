#![forbid(unsafe_code)]

//! In-memory tables produced by ingestion and consumed by the query engine.
//!
//! A [`Table`] is row-oriented: an ordered list of [`Field`]s plus rows of
//! [`Value`]s in insertion order. Column types are inferred from the values
//! and every cell is coerced to its column's type, so a column never mixes
//! integers with strings.

use std::collections::HashMap;
use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Cell values and type inference.
pub mod value;

pub use value::{DataType, Value};

/// Named, typed column descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    /// Column name.
    pub name: String,
    /// Type shared by every non-null value in the column.
    pub data_type: DataType,
}

/// Errors raised while assembling a table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    /// A row does not have one value per column.
    #[error("row {row} has {found} values, expected {expected}")]
    RaggedRow {
        /// Zero-based row index.
        row: usize,
        /// Column count.
        expected: usize,
        /// Values present in the row.
        found: usize,
    },
}

/// Ordered columns with ordered rows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    fields: Vec<Field>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Table with no columns and no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a table, inferring column types from `rows`.
    ///
    /// Duplicate column names are allowed; lookups by name resolve to the
    /// first occurrence.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, TableError> {
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(TableError::RaggedRow {
                    row: idx,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
        }
        Ok(Self::from_parts(columns, rows))
    }

    /// Infers types and coerces cells. Callers guarantee rectangular rows.
    fn from_parts(columns: Vec<String>, mut rows: Vec<Vec<Value>>) -> Self {
        let mut types = vec![DataType::Null; columns.len()];
        for row in &rows {
            for (ty, value) in types.iter_mut().zip(row) {
                *ty = ty.unify(value.data_type());
            }
        }
        for row in &mut rows {
            for (cell, ty) in row.iter_mut().zip(&types) {
                if cell.data_type() != *ty {
                    *cell = std::mem::replace(cell, Value::Null).coerce(*ty);
                }
            }
        }
        let fields = columns
            .into_iter()
            .zip(types)
            .map(|(name, data_type)| Field { name, data_type })
            .collect();
        Self { fields, rows }
    }

    /// Concatenates frames using the union of their columns.
    ///
    /// Columns appear in first-seen order. Rows keep frame order and then
    /// in-frame order; a frame's rows hold null for columns it lacks.
    pub fn concat(frames: Vec<Table>) -> Table {
        let mut names: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for frame in &frames {
            for field in &frame.fields {
                if !positions.contains_key(&field.name) {
                    positions.insert(field.name.clone(), names.len());
                    names.push(field.name.clone());
                }
            }
        }

        let total_rows = frames.iter().map(Table::num_rows).sum();
        let mut rows = Vec::with_capacity(total_rows);
        for frame in frames {
            let mapping: Vec<usize> = frame
                .fields
                .iter()
                .map(|field| positions[&field.name])
                .collect();
            for row in frame.rows {
                let mut out = vec![Value::Null; names.len()];
                for (value, &target) in row.into_iter().zip(&mapping) {
                    // Duplicate names inside one frame collapse onto the
                    // first occurrence; keep the first non-null.
                    if out[target].is_null() {
                        out[target] = value;
                    }
                }
                rows.push(out);
            }
        }
        Self::from_parts(names, rows)
    }

    /// Column descriptors in order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Index of the first column named `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.fields.len()
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` when the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows in order.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Iterates over the values of column `idx`.
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |row| &row[idx])
    }

    /// Copy of the first `n` rows.
    pub fn head(&self, n: usize) -> Table {
        Table {
            fields: self.fields.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Copy holding the columns at `indices`, in that order.
    ///
    /// Indices must be in range; repeated indices repeat the column.
    pub fn select(&self, indices: &[usize]) -> Table {
        let fields = indices.iter().map(|&i| self.fields[i].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Table { fields, rows }
    }

    /// Copy holding the rows for which `keep` returned `true`.
    pub(crate) fn retain_rows(&self, keep: &[bool]) -> Table {
        let rows = self
            .rows
            .iter()
            .zip(keep)
            .filter(|(_, keep)| **keep)
            .map(|(row, _)| row.clone())
            .collect();
        Table {
            fields: self.fields.clone(),
            rows,
        }
    }
}

/// Renders the table as an aligned text grid with a leading row index.
impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fields.is_empty() {
            return write!(f, "Empty table\nColumns: []\nIndex: []");
        }
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect();
        let index_width = self.rows.len().saturating_sub(1).to_string().len();
        let widths: Vec<usize> = self
            .fields
            .iter()
            .enumerate()
            .map(|(col, field)| {
                cells
                    .iter()
                    .map(|row| row[col].chars().count())
                    .chain(std::iter::once(field.name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write!(f, "{:index_width$}", "")?;
        for (field, width) in self.fields.iter().zip(&widths) {
            write!(f, "  {:>width$}", field.name)?;
        }
        for (idx, row) in cells.iter().enumerate() {
            write!(f, "\n{idx:<index_width$}")?;
            for (cell, width) in row.iter().zip(&widths) {
                write!(f, "  {cell:>width$}")?;
            }
        }
        Ok(())
    }
}

/// Serializes as an array of records keyed by column name, in column order.
impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Record<'a> {
            fields: &'a [Field],
            row: &'a [Value],
        }

        impl Serialize for Record<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.fields.len()))?;
                for (field, value) in self.fields.iter().zip(self.row) {
                    map.serialize_entry(&field.name, value)?;
                }
                map.end()
            }
        }

        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&Record {
                fields: &self.fields,
                row,
            })?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn new_rejects_ragged_rows() {
        let err = Table::new(names(&["a", "b"]), vec![vec![Value::Int(1)]]).unwrap_err();
        assert_eq!(
            err,
            TableError::RaggedRow {
                row: 0,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn new_infers_and_coerces_types() {
        let table = Table::new(
            names(&["n", "mixed", "empty"]),
            vec![
                vec![Value::Int(1), Value::Int(1), Value::Null],
                vec![Value::Float(2.5), Value::from("x"), Value::Null],
            ],
        )
        .unwrap();
        let types: Vec<_> = table.fields().iter().map(|f| f.data_type).collect();
        assert_eq!(
            types,
            vec![DataType::Float, DataType::String, DataType::Null]
        );
        assert_eq!(table.rows()[0][0], Value::Float(1.0));
        assert_eq!(table.rows()[0][1], Value::from("1"));
    }

    #[test]
    fn concat_unions_columns_and_fills_nulls() {
        let first = Table::new(
            names(&["A", "B"]),
            vec![vec![Value::Int(1), Value::Int(2)]],
        )
        .unwrap();
        let second = Table::new(
            names(&["B", "C"]),
            vec![vec![Value::Int(3), Value::from("c")]],
        )
        .unwrap();

        let merged = Table::concat(vec![first, second]);
        assert_eq!(merged.column_names(), vec!["A", "B", "C"]);
        assert_eq!(
            merged.rows(),
            &[
                vec![Value::Int(1), Value::Int(2), Value::Null],
                vec![Value::Null, Value::Int(3), Value::from("c")],
            ]
        );
        assert_eq!(merged.fields()[2].data_type, DataType::String);
    }

    #[test]
    fn concat_of_nothing_is_empty() {
        let merged = Table::concat(Vec::new());
        assert!(merged.is_empty());
        assert_eq!(merged.num_columns(), 0);
    }

    #[test]
    fn select_and_head_copy() {
        let table = Table::new(
            names(&["a", "b"]),
            vec![
                vec![Value::Int(1), Value::from("x")],
                vec![Value::Int(2), Value::from("y")],
            ],
        )
        .unwrap();
        let projected = table.select(&[1, 0, 1]);
        assert_eq!(projected.column_names(), vec!["b", "a", "b"]);
        assert_eq!(projected.rows()[1], vec![Value::from("y"), Value::Int(2), Value::from("y")]);
        assert_eq!(table.head(1).num_rows(), 1);
        assert_eq!(table.head(10).num_rows(), 2);
    }

    #[test]
    fn serializes_as_ordered_records() {
        let table = Table::new(
            names(&["z", "a"]),
            vec![vec![Value::Int(1), Value::Null]],
        )
        .unwrap();
        assert_eq!(
            serde_json::to_string(&table).unwrap(),
            r#"[{"z":1,"a":null}]"#
        );
    }

    #[test]
    fn renders_aligned_grid() {
        let table = Table::new(
            names(&["id", "name"]),
            vec![
                vec![Value::Int(1), Value::from("ann")],
                vec![Value::Int(22), Value::Null],
            ],
        )
        .unwrap();
        let rendered = table.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "   id  name");
        assert_eq!(lines[1], "0   1   ann");
        assert_eq!(lines[2], "1  22  NULL");
    }
}

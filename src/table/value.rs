//! Scalar cell values and their column types.
use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Single table cell.
///
/// Serializes untagged so query results read naturally as JSON records
/// (`null`, `true`, `42`, `4.5`, `"text"`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer value.
    Int(i64),
    /// 64-bit floating point value.
    Float(f64),
    /// UTF-8 string value.
    String(String),
}

/// Column type inferred from the values a column holds.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Every value is null (or the column has no rows).
    Null,
    /// Booleans.
    Boolean,
    /// Signed integers.
    Integer,
    /// Floating point numbers.
    Float,
    /// Text, also the fallback for mixed columns.
    String,
}

impl DataType {
    /// Smallest type able to hold values of both `self` and `other`.
    ///
    /// Null unifies with anything, integer and float widen to float, and any
    /// other disagreement falls back to string.
    pub fn unify(self, other: DataType) -> DataType {
        match (self, other) {
            (a, b) if a == b => a,
            (DataType::Null, other) | (other, DataType::Null) => other,
            (DataType::Integer, DataType::Float) | (DataType::Float, DataType::Integer) => {
                DataType::Float
            }
            _ => DataType::String,
        }
    }

    /// Lower-case type name used in schema descriptions.
    pub fn name(self) -> &'static str {
        match self {
            DataType::Null => "null",
            DataType::Boolean => "boolean",
            DataType::Integer => "integer",
            DataType::Float => "float",
            DataType::String => "string",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    /// Parses one raw CSV cell.
    ///
    /// Empty cells and `null` become [`Value::Null`]; `true`/`false`, integers
    /// and finite floats are recognised in that order; anything else stays text.
    pub fn parse_cell(raw: &str) -> Value {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        let lower = trimmed.to_ascii_lowercase();
        match lower.as_str() {
            "null" => return Value::Null,
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            _ => {}
        }
        if let Ok(int_val) = trimmed.parse::<i64>() {
            return Value::Int(int_val);
        }
        if let Ok(float_val) = trimmed.parse::<f64>() {
            if float_val.is_finite() {
                return Value::Float(float_val);
            }
        }
        Value::String(raw.to_string())
    }

    /// Type of this individual value.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null => DataType::Null,
            Value::Bool(_) => DataType::Boolean,
            Value::Int(_) => DataType::Integer,
            Value::Float(_) => DataType::Float,
            Value::String(_) => DataType::String,
        }
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts the value into a column of type `target`.
    ///
    /// Only widening conversions are performed: integers become floats and
    /// anything becomes its text form for string columns. Nulls stay null.
    pub fn coerce(self, target: DataType) -> Value {
        match (self, target) {
            (Value::Null, _) => Value::Null,
            (Value::Int(v), DataType::Float) => Value::Float(v as f64),
            (Value::String(s), DataType::String) => Value::String(s),
            (other, DataType::String) => Value::String(other.to_string()),
            (other, _) => other,
        }
    }

    /// Orders two non-null values of compatible types.
    ///
    /// Integers and floats compare numerically. Returns `None` when the
    /// values have no meaningful order (null, mismatched types, NaN).
    pub fn partial_cmp_value(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 => {
                write!(f, "{v:.1}")
            }
            Value::Float(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

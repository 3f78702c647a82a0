use std::fmt;

use serde::{Deserialize, Serialize};

/// A single dataset cell.
///
/// Uploaded data is mixed: most cells are numbers, but categorical columns
/// carry text and gaps are common. Cleaning steps work on this widened form;
/// the pipeline narrows to `f32` on exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

/// Raw spellings the loader treats as an empty cell.
const MISSING_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "?"];

impl Value {
    /// Parse a raw uploaded cell.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if MISSING_MARKERS.contains(&trimmed) {
            return Value::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(n) => Value::Number(n),
            Err(_) => Value::Text(trimmed.to_string()),
        }
    }

    /// Missing cells and NaN numbers both count as missing.
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Missing => true,
            Value::Number(n) => n.is_nan(),
            Value::Text(_) => false,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Value::Text(_))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Coerce to `f32`, or `None` if the cell has no `f32` representation.
    ///
    /// Finite numbers beyond `f32::MAX` would silently become infinite, so
    /// they are rejected rather than narrowed.
    pub fn to_f32(&self) -> Option<f32> {
        match self {
            Value::Missing => Some(f32::NAN),
            Value::Number(n) if n.is_finite() && n.abs() > f32::MAX as f64 => None,
            Value::Number(n) => Some(*n as f32),
            Value::Text(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(|n| Value::Number(n).to_f32()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::Missing => write!(f, "NaN"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

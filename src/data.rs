use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use crate::canonical::CanonicalField;

/// A populated catalog cell. Absent cells are represented as `None` by the
/// containing record, never as an empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Number(Decimal),
}

impl Value {
    /// Wraps a raw source cell, treating blank input as "no value".
    pub fn from_raw(raw: &str) -> Option<Value> {
        if raw.trim().is_empty() {
            None
        } else {
            Some(Value::Text(raw.to_string()))
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(n) => n.normalize().to_string(),
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => coerce_number(s),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// Parses a cell as a number. Anything that does not look like a plain or
/// scientific decimal yields `None`; coercion never fails loudly.
pub fn coerce_number(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

/// Replaces a cell with its numeric form, or clears it when it is not numeric.
pub fn coerce_cell(cell: Option<Value>) -> Option<Value> {
    cell.and_then(|value| value.as_number()).map(Value::Number)
}

/// One row of the catalog, indexed by canonical field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalRecord {
    cells: [Option<Value>; CanonicalField::COUNT],
}

impl CanonicalRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: CanonicalField) -> Option<&Value> {
        self.cells[field.index()].as_ref()
    }

    pub fn set(&mut self, field: CanonicalField, value: Option<Value>) {
        self.cells[field.index()] = value;
    }

    pub fn take(&mut self, field: CanonicalField) -> Option<Value> {
        self.cells[field.index()].take()
    }

    pub fn with(mut self, field: CanonicalField, value: impl Into<String>) -> Self {
        self.set(field, Value::from_raw(&value.into()));
        self
    }

    pub fn text(&self, field: CanonicalField) -> Option<&str> {
        match self.get(field) {
            Some(Value::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn number(&self, field: CanonicalField) -> Option<Decimal> {
        self.get(field).and_then(Value::as_number)
    }

    pub fn is_present(&self, field: CanonicalField) -> bool {
        self.get(field).is_some()
    }

    /// Display strings for the requested columns; absent cells render empty.
    pub fn display_cells(&self, columns: &[CanonicalField]) -> Vec<String> {
        columns
            .iter()
            .map(|field| self.get(*field).map(Value::as_display).unwrap_or_default())
            .collect()
    }
}

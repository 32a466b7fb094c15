//! Raw result rows returned by the drivers.

use hysteria_core::{HysteriaError, HysteriaResult};

use crate::value::Value;

/// A single row of a query result: column names as reported by the driver,
/// paired with their values.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a new row from column names and values.
    ///
    /// # Panics
    ///
    /// Panics if the number of columns does not match the number of values.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        assert_eq!(
            columns.len(),
            values.len(),
            "Row column count must match value count"
        );
        Self { columns, values }
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Gets a typed value by column name.
    pub fn get<T: FromValue>(&self, column: &str) -> HysteriaResult<T> {
        let value = self.get_value(column).ok_or_else(|| {
            HysteriaError::Database(format!("Column '{column}' not found in row"))
        })?;
        T::from_value(value)
    }

    /// Returns a reference to the raw value of a column.
    pub fn get_value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    /// Iterates over `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

/// Trait for converting a [`Value`] to a concrete Rust type.
pub trait FromValue: Sized {
    /// Attempts to convert a value reference to this type.
    fn from_value(value: &Value) -> HysteriaResult<Self>;
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> HysteriaResult<Self> {
        value
            .as_int()
            .ok_or_else(|| HysteriaError::Database(format!("Expected Int, got {value:?}")))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> HysteriaResult<Self> {
        value
            .as_float()
            .ok_or_else(|| HysteriaError::Database(format!("Expected Float, got {value:?}")))
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> HysteriaResult<Self> {
        value
            .as_bool()
            .ok_or_else(|| HysteriaError::Database(format!("Expected Bool, got {value:?}")))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> HysteriaResult<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            _ => Err(HysteriaError::Database(format!(
                "Expected String, got {value:?}"
            ))),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> HysteriaResult<Self> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> HysteriaResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

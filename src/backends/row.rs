//! Result rows with named-field lookup
//!
//! A `Row` is an ordered list of `(column, value)` cells. `Value::Null` is
//! the "no value" marker: hydration skips null cells so the corresponding
//! property keeps its default.

use serde_json::Value;

/// One result row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, Value)>,
}

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Chainable cell append, mainly for scripted backends and tests
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.push(column, value.into());
        self
    }

    /// Append a cell
    pub fn push(&mut self, column: &str, value: Value) {
        self.cells.push((column.to_string(), value));
    }

    /// Value of the named column, if present
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Whether the row's schema contains the named column
    pub fn contains(&self, column: &str) -> bool {
        self.cells.iter().any(|(name, _)| name == column)
    }

    /// Column names in schema order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    /// Cells in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// First cell's value, consumed; used for scalar reads
    pub fn into_first_value(self) -> Option<Value> {
        self.cells.into_iter().next().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

//! Stored-procedure parameter sets
//!
//! Parameters are kept in declaration order and checked for duplicate names
//! when added. Values are `serde_json::Value` so a single parameter type
//! covers every backend.

use serde_json::Value;

use crate::error::{OrmError, OrmResult};

/// Direction of a stored-procedure parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterDirection {
    Input,
    Output,
}

/// A single named parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
    pub direction: ParameterDirection,
}

/// An ordered set of parameters for one command, with duplicate detection
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    parameters: Vec<Parameter>,
}

impl ParameterSet {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an input parameter
    pub fn add_input(&mut self, name: &str, value: impl Into<Value>) -> OrmResult<()> {
        self.add(name, value.into(), ParameterDirection::Input)
    }

    /// Add an output parameter placeholder
    pub fn add_output(&mut self, name: &str) -> OrmResult<()> {
        self.add(name, Value::Null, ParameterDirection::Output)
    }

    /// Chainable form of [`add_input`](Self::add_input)
    pub fn input(mut self, name: &str, value: impl Into<Value>) -> OrmResult<Self> {
        self.add_input(name, value)?;
        Ok(self)
    }

    /// Look up a parameter by name
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// All parameters, in declaration order
    pub fn as_slice(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    fn add(&mut self, name: &str, value: Value, direction: ParameterDirection) -> OrmResult<()> {
        if name.is_empty() {
            return Err(OrmError::Argument("parameter name must not be empty".to_string()));
        }
        if self.parameters.iter().any(|p| p.name == name) {
            return Err(OrmError::ParameterExists(name.to_string()));
        }
        self.parameters.push(Parameter {
            name: name.to_string(),
            value,
            direction,
        });
        Ok(())
    }
}

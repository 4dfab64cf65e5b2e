//! Validated tool arguments handed to tool bodies.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use robotape_contracts::error::{RobotapeError, RobotapeResult};

/// Arguments that passed schema validation, with defaults filled in.
///
/// Only `ArgumentValidator::validate` builds these, so a tool body can rely
/// on every required parameter being present with the declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct Arguments {
    values: Map<String, Value>,
}

impl Arguments {
    pub(crate) fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// The raw value of `name`, if present. Explicit `null` is returned as-is.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// True when `name` is present and not `null`.
    pub fn has(&self, name: &str) -> bool {
        self.values.get(name).is_some_and(|v| !v.is_null())
    }

    /// Deserialize `name` into `T`.
    ///
    /// # Errors
    ///
    /// `Validation` naming the field when it is missing or does not fit `T`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> RobotapeResult<T> {
        let value = self.values.get(name).ok_or_else(|| RobotapeError::Validation {
            field: name.to_string(),
            reason: "argument not provided".to_string(),
        })?;
        serde_json::from_value(value.clone()).map_err(|e| RobotapeError::Validation {
            field: name.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn str(&self, name: &str) -> RobotapeResult<&str> {
        self.values
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| type_error(name, "string"))
    }

    pub fn i64(&self, name: &str) -> RobotapeResult<i64> {
        self.values
            .get(name)
            .and_then(Value::as_i64)
            .ok_or_else(|| type_error(name, "integer"))
    }

    pub fn f64(&self, name: &str) -> RobotapeResult<f64> {
        self.values
            .get(name)
            .and_then(Value::as_f64)
            .ok_or_else(|| type_error(name, "number"))
    }

    pub fn bool(&self, name: &str) -> RobotapeResult<bool> {
        self.values
            .get(name)
            .and_then(Value::as_bool)
            .ok_or_else(|| type_error(name, "boolean"))
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }
}

fn type_error(name: &str, expected: &str) -> RobotapeError {
    RobotapeError::Validation {
        field: name.to_string(),
        reason: format!("expected a present {expected} argument"),
    }
}

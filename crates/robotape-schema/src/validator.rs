//! Argument validation against a `ParameterSchema`.
//!
//! Validation runs in two phases:
//!
//! 1. **Shape**: arguments must be an object, contain no undeclared keys, and
//!    carry every required parameter. These checks name the field directly.
//! 2. **Types**: the object is checked against the rendered JSON Schema with
//!    the `jsonschema` crate; the first violation is reported by the top-level
//!    property it sits under.
//!
//! The first failure wins: a validation error is terminal for the call, so
//! there is nothing to gain from collecting the rest.

use std::fmt;

use serde_json::{Map, Value};
use tracing::debug;

use robotape_contracts::error::{RobotapeError, RobotapeResult};

use crate::{arguments::Arguments, params::ParameterSchema};

/// Field name reported when the arguments value itself is the problem.
pub const ROOT_FIELD: &str = "$";

/// A `ParameterSchema` compiled for repeated validation.
pub struct ArgumentValidator {
    schema: ParameterSchema,
    json_schema: Value,
    compiled: jsonschema::Validator,
}

impl ArgumentValidator {
    /// Compile `schema`.
    ///
    /// # Errors
    ///
    /// `Config` if the rendered document is not a valid JSON Schema, which
    /// only happens when a default or description is malformed.
    pub fn new(schema: ParameterSchema) -> RobotapeResult<Self> {
        let json_schema = schema.to_json_schema();
        let compiled =
            jsonschema::validator_for(&json_schema).map_err(|e| RobotapeError::Config {
                reason: format!("invalid parameter schema: {e}"),
            })?;
        Ok(Self {
            schema,
            json_schema,
            compiled,
        })
    }

    pub fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    /// The JSON Schema document this validator enforces.
    pub fn json_schema(&self) -> &Value {
        &self.json_schema
    }

    /// Validate `args` and return them with defaults applied.
    ///
    /// # Errors
    ///
    /// `Validation` naming the offending field.
    pub fn validate(&self, args: &Value) -> RobotapeResult<Arguments> {
        let object = match args {
            Value::Object(map) => map,
            // A tool with no parameters may be called with `null`.
            Value::Null if self.schema.params().is_empty() => {
                return Ok(Arguments::new(Map::new()));
            }
            other => {
                return Err(RobotapeError::Validation {
                    field: ROOT_FIELD.to_string(),
                    reason: format!("arguments must be a JSON object, got {other}"),
                });
            }
        };

        // ── Phase 1: shape ────────────────────────────────────────────────────
        if let Some(unknown) = object.keys().find(|k| self.schema.get(k.as_str()).is_none()) {
            return Err(RobotapeError::Validation {
                field: unknown.clone(),
                reason: "unexpected argument".to_string(),
            });
        }
        if let Some(missing) = self
            .schema
            .params()
            .iter()
            .find(|p| p.required && !object.contains_key(&p.name))
        {
            return Err(RobotapeError::Validation {
                field: missing.name.clone(),
                reason: "missing required argument".to_string(),
            });
        }

        // ── Phase 2: types ────────────────────────────────────────────────────
        if let Some(error) = self.compiled.iter_errors(args).next() {
            let path = error.instance_path.to_string();
            let field = path
                .trim_start_matches('/')
                .split('/')
                .next()
                .filter(|s| !s.is_empty())
                .unwrap_or(ROOT_FIELD)
                .to_string();
            debug!(%field, %path, "argument type check failed");
            return Err(RobotapeError::Validation {
                field,
                reason: error.to_string(),
            });
        }

        let mut values = object.clone();
        for param in self.schema.params() {
            if let Some(default) = &param.default {
                // Explicit null counts as omitted.
                if values.get(&param.name).map_or(true, Value::is_null) {
                    values.insert(param.name.clone(), default.clone());
                }
            }
        }
        Ok(Arguments::new(values))
    }
}

impl fmt::Debug for ArgumentValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentValidator")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

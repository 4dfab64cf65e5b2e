//! Declarative parameter lists for tools and their JSON Schema rendering.
//!
//! A `ParameterSchema` is the Rust stand-in for a function signature: an
//! ordered list of named, typed parameters, each required or optional (with
//! an optional default). It renders to the JSON Schema document that both the
//! validator and `ToolDefinition` use.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// The JSON type a parameter accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    /// An array with unconstrained items.
    Array,
    /// An array whose items all have the given type.
    ArrayOf(Box<ParamType>),
    /// A JSON object with unconstrained fields.
    Object,
    /// No type constraint at all.
    Any,
}

impl ParamType {
    fn type_name(&self) -> Option<&'static str> {
        match self {
            ParamType::String => Some("string"),
            ParamType::Integer => Some("integer"),
            ParamType::Number => Some("number"),
            ParamType::Boolean => Some("boolean"),
            ParamType::Array | ParamType::ArrayOf(_) => Some("array"),
            ParamType::Object => Some("object"),
            ParamType::Any => None,
        }
    }

    /// JSON Schema fragment for this type. Optional parameters also accept
    /// `null`, mirroring an `Option<T>` argument.
    fn to_schema(&self, nullable: bool) -> Map<String, Value> {
        let mut schema = Map::new();
        if let Some(name) = self.type_name() {
            let ty = if nullable {
                json!([name, "null"])
            } else {
                json!(name)
            };
            schema.insert("type".to_string(), ty);
        }
        if let ParamType::ArrayOf(items) = self {
            schema.insert("items".to_string(), Value::Object(items.to_schema(false)));
        }
        schema
    }
}

/// One named parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub param_type: ParamType,
    pub required: bool,
    /// Value filled in when an optional parameter is omitted.
    pub default: Option<Value>,
    pub description: Option<String>,
}

/// An ordered parameter list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    params: Vec<Parameter>,
}

impl ParameterSchema {
    /// A schema with no parameters; only `{}` validates against it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required parameter.
    pub fn required(mut self, name: impl Into<String>, param_type: ParamType) -> Self {
        self.params.push(Parameter {
            name: name.into(),
            param_type,
            required: true,
            default: None,
            description: None,
        });
        self
    }

    /// Add an optional parameter with no default. Omitted means absent.
    pub fn optional(mut self, name: impl Into<String>, param_type: ParamType) -> Self {
        self.params.push(Parameter {
            name: name.into(),
            param_type,
            required: false,
            default: None,
            description: None,
        });
        self
    }

    /// Add an optional parameter that takes `default` when omitted.
    pub fn optional_with_default(
        mut self,
        name: impl Into<String>,
        param_type: ParamType,
        default: impl Into<Value>,
    ) -> Self {
        self.params.push(Parameter {
            name: name.into(),
            param_type,
            required: false,
            default: Some(default.into()),
            description: None,
        });
        self
    }

    /// Attach a description to the most recently added parameter.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        if let Some(last) = self.params.last_mut() {
            last.description = Some(description.into());
        }
        self
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Render as a JSON Schema object document.
    ///
    /// Undeclared properties are rejected (`additionalProperties: false`).
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.params {
            let mut schema = param.param_type.to_schema(!param.required);
            if let Some(description) = &param.description {
                schema.insert("description".to_string(), json!(description));
            }
            if let Some(default) = &param.default {
                schema.insert("default".to_string(), default.clone());
            }
            properties.insert(param.name.clone(), Value::Object(schema));
            if param.required {
                required.push(json!(param.name));
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}

//! # robotape-schema
//!
//! Tool parameter schemas and argument validation for the robotape runtime.
//!
//! A tool declares its parameters with [`ParameterSchema`]; the schema is
//! rendered to JSON Schema and compiled once into an [`ArgumentValidator`].
//! Every call's arguments go through [`ArgumentValidator::validate`], which
//! either names the offending field or returns [`Arguments`] with defaults
//! applied.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use robotape_schema::{ArgumentValidator, ParamType, ParameterSchema};
//!
//! let schema = ParameterSchema::new()
//!     .required("query", ParamType::String)
//!     .optional_with_default("max_results", ParamType::Integer, 10);
//! let validator = ArgumentValidator::new(schema)?;
//! let args = validator.validate(&serde_json::json!({ "query": "tapes" }))?;
//! assert_eq!(args.i64("max_results")?, 10);
//! ```

pub mod arguments;
pub mod params;
pub mod validator;

pub use arguments::Arguments;
pub use params::{ParamType, Parameter, ParameterSchema};
pub use validator::ArgumentValidator;

// ── Tests ─────────────────────────────────────────────────────────────────────

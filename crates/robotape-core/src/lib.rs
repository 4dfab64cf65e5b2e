//! # robotape-core
//!
//! The tool invocation runtime for robotape agents.
//!
//! This crate provides:
//! - The trait seams (`TapeStore`, `ToolFunction`, `LlmProvider`)
//! - `RunContext`, the per-invocation state a tool sees
//! - `Tool`, which validates arguments, retries the wrapped function up to a
//!   bound, and records exactly one outcome step per invocation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use robotape_core::{RunContext, Tool};
//! use robotape_schema::{ParamType, ParameterSchema};
//!
//! let tool = Tool::<()>::from_fn(
//!     "echo",
//!     ParameterSchema::new().required("text", ParamType::String),
//!     |_ctx, args| Ok(serde_json::json!(args.str("text")?)),
//! )?;
//! let mut tape = robotape_contracts::Tape::new("me");
//! let mut ctx = RunContext::new((), "say hi", &mut tape);
//! let outcome = tool.execute(serde_json::json!({ "text": "hi" }), &mut ctx).await;
//! ```

pub mod context;
pub mod llm;
pub mod tool;
pub mod traits;

pub use context::{RunContext, UsageTracker};
pub use llm::{generation_tool, GENERATE_TOOL_NAME};
pub use tool::{FnTool, Tool};
pub use traits::{LlmProvider, TapeStore, ToolFunction};

//! Tool invocation results, retry backoff, and model-facing tool definitions.
//!
//! `ToolOutcome` is what `Tool::execute` returns. Callers pattern-match on it:
//! - `Succeeded` → use `output`
//! - `Failed` → every attempt failed; an ERROR step was recorded
//! - `Rejected` → arguments failed validation; nothing ran, nothing recorded
//! - `Cancelled` → stopped between attempts; nothing recorded

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RobotapeError;

/// Description of a tool handed to a model so it can produce calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema (`type: object`) describing the accepted arguments.
    pub parameters_json_schema: Value,
}

/// Delay policy between failed attempts.
///
/// Purely caller configuration; the default is to retry immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    #[default]
    None,
    Fixed {
        delay_ms: u64,
    },
    Exponential {
        base_delay_ms: u64,
        max_delay_ms: u64,
    },
}

impl Backoff {
    /// Delay to wait after the failed attempt `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Backoff::Exponential {
                base_delay_ms,
                max_delay_ms,
            } => {
                let factor = 1u64.checked_shl(attempt.min(63)).unwrap_or(u64::MAX);
                Duration::from_millis(base_delay_ms.saturating_mul(factor).min(max_delay_ms))
            }
        }
    }
}

/// The terminal state of one `Tool::execute` call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Succeeded {
        tool: String,
        output: Value,
        attempts: u32,
    },
    Failed {
        tool: String,
        /// Always `RobotapeError::RetriesExhausted`.
        error: RobotapeError,
        attempts: u32,
    },
    Rejected {
        tool: String,
        /// Always `RobotapeError::Validation`.
        error: RobotapeError,
    },
    Cancelled {
        tool: String,
        attempts: u32,
    },
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Succeeded { .. })
    }

    pub fn tool(&self) -> &str {
        match self {
            ToolOutcome::Succeeded { tool, .. }
            | ToolOutcome::Failed { tool, .. }
            | ToolOutcome::Rejected { tool, .. }
            | ToolOutcome::Cancelled { tool, .. } => tool,
        }
    }

    /// Number of times the wrapped operation was invoked.
    pub fn attempts(&self) -> u32 {
        match self {
            ToolOutcome::Succeeded { attempts, .. }
            | ToolOutcome::Failed { attempts, .. }
            | ToolOutcome::Cancelled { attempts, .. } => *attempts,
            ToolOutcome::Rejected { .. } => 0,
        }
    }

    /// Collapse into a plain `Result` for callers that propagate with `?`.
    pub fn into_result(self) -> Result<Value, RobotapeError> {
        match self {
            ToolOutcome::Succeeded { output, .. } => Ok(output),
            ToolOutcome::Failed { error, .. } | ToolOutcome::Rejected { error, .. } => Err(error),
            ToolOutcome::Cancelled { tool, attempts } => {
                Err(RobotapeError::Cancelled { tool, attempts })
            }
        }
    }

    /// A serializable result object for surfacing to an agent or a user.
    pub fn report(&self) -> ToolReport {
        let (output, error, error_kind) = match self {
            ToolOutcome::Succeeded { output, .. } => (Some(output.clone()), None, None),
            ToolOutcome::Failed { error, .. } | ToolOutcome::Rejected { error, .. } => {
                (None, Some(error.to_string()), Some(error.kind().to_string()))
            }
            ToolOutcome::Cancelled { tool, attempts } => {
                let error = RobotapeError::Cancelled {
                    tool: tool.clone(),
                    attempts: *attempts,
                };
                (None, Some(error.to_string()), Some(error.kind().to_string()))
            }
        };

        ToolReport {
            success: self.is_success(),
            output,
            error,
            metadata: ToolReportMetadata {
                tool: self.tool().to_string(),
                error_kind,
                attempts: self.attempts(),
            },
        }
    }
}

/// Result object with a human-readable error and structured metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolReport {
    pub success: bool,
    pub output: Option<Value>,
    pub error: Option<String>,
    pub metadata: ToolReportMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolReportMetadata {
    pub tool: String,
    /// `RobotapeError::kind()` of the failure; absent on success.
    pub error_kind: Option<String>,
    pub attempts: u32,
}

//! Runtime error types for the robotape tape and tool subsystems.
//!
//! All fallible operations return `RobotapeResult<T>`. Variants carry enough
//! context to be recorded on a tape or surfaced to the agent unchanged.

use thiserror::Error;

/// The unified error type for the robotape runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RobotapeError {
    /// A step was rejected by `Tape::append` because its metadata is malformed.
    #[error("invalid step: {reason}")]
    InvalidStep { reason: String },

    /// A query that needs at least one step was made against an empty tape.
    #[error("tape '{tape_id}' has no steps")]
    EmptyTape { tape_id: String },

    /// Walking `parent_id` links revisited a tape.
    ///
    /// Clone semantics never produce cycles, so this always means the stored
    /// lineage is corrupt.
    #[error("lineage cycle detected at tape '{tape_id}'")]
    LineageCycle { tape_id: String },

    /// No tape with the given id exists in the store.
    #[error("tape '{tape_id}' not found")]
    TapeNotFound { tape_id: String },

    /// The storage backend failed (connectivity, constraint violation, decode).
    ///
    /// The store never retries on its own; the caller decides.
    #[error("storage error: {reason}")]
    Storage { reason: String },

    /// Tool arguments did not match the declared parameter schema.
    ///
    /// Never retried: the same arguments cannot start passing.
    #[error("validation failed for field '{field}': {reason}")]
    Validation { field: String, reason: String },

    /// The wrapped tool operation failed on one attempt.
    #[error("execution failed: {reason}")]
    Execution { reason: String },

    /// Every allowed attempt of a tool failed.
    #[error("tool '{tool}' failed after {attempts} attempt(s): {reason}")]
    RetriesExhausted {
        tool: String,
        attempts: u32,
        reason: String,
    },

    /// `search_tapes` was given a filter key it does not understand.
    #[error("unsupported search filter '{key}'")]
    UnsupportedFilter { key: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// The invocation was cancelled before it could complete.
    #[error("tool '{tool}' cancelled after {attempts} attempt(s)")]
    Cancelled { tool: String, attempts: u32 },
}

impl RobotapeError {
    /// Shorthand for building a `Storage` error from any displayable cause.
    pub fn storage(reason: impl std::fmt::Display) -> Self {
        Self::Storage {
            reason: reason.to_string(),
        }
    }

    /// Shorthand for building an `Execution` error from any displayable cause.
    pub fn execution(reason: impl std::fmt::Display) -> Self {
        Self::Execution {
            reason: reason.to_string(),
        }
    }

    /// Stable, machine-readable name of the variant.
    ///
    /// Recorded in tool reports and ERROR step content so later analysis can
    /// group failures without parsing messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidStep { .. } => "invalid_step",
            Self::EmptyTape { .. } => "empty_tape",
            Self::LineageCycle { .. } => "lineage_cycle",
            Self::TapeNotFound { .. } => "tape_not_found",
            Self::Storage { .. } => "storage",
            Self::Validation { .. } => "validation",
            Self::Execution { .. } => "execution",
            Self::RetriesExhausted { .. } => "retries_exhausted",
            Self::UnsupportedFilter { .. } => "unsupported_filter",
            Self::Config { .. } => "config",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

/// Convenience alias used throughout the robotape crates.
pub type RobotapeResult<T> = Result<T, RobotapeError>;

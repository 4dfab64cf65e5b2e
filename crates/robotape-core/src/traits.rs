//! Trait seams of the robotape runtime.
//!
//! - `TapeStore`: durable persistence and lineage queries for tapes
//! - `ToolFunction`: the fallible operation a `Tool` wraps
//! - `LlmProvider`: a model client, consumed at its boundary only
//!
//! Implementations live outside this crate (`robotape-store`, the caller's
//! tools and provider clients). The `Tool` engine only talks to these traits.

use async_trait::async_trait;
use serde_json::Value;

use robotape_contracts::{
    error::RobotapeResult,
    filter::TapeFilter,
    tape::{Tape, TapeId},
    usage::LlmResponse,
};
use robotape_schema::Arguments;

use crate::context::RunContext;

/// Durable storage for tapes and their steps.
///
/// Implementations must be safe to share between concurrent flows: every call
/// is a self-contained transaction against the backend. No implementation
/// retries on its own; retry policy belongs to the caller.
#[async_trait]
pub trait TapeStore: Send + Sync {
    /// Persist `tape` and all of its current steps, returning its id.
    ///
    /// Re-saving the same tape is idempotent: afterwards the stored step
    /// sequence equals the in-memory one exactly.
    ///
    /// # Errors
    ///
    /// `Storage` on backend failure or constraint violation, including a
    /// `parent_id` that names a tape the store has never seen.
    async fn save_tape(&self, tape: &Tape) -> RobotapeResult<TapeId>;

    /// Rebuild the tape with steps in original append order.
    ///
    /// # Errors
    ///
    /// `TapeNotFound` if no tape has this id.
    async fn load_tape(&self, id: &TapeId) -> RobotapeResult<Tape>;

    /// Lineage from `id` up to its root, starting with `id` itself.
    ///
    /// A root yields a chain of length one.
    ///
    /// # Errors
    ///
    /// `TapeNotFound` if `id` is absent, `LineageCycle` if a tape is reached
    /// twice while walking parents.
    async fn get_tape_history(&self, id: &TapeId) -> RobotapeResult<Vec<TapeId>>;

    /// Direct children of `id` (tapes whose `parent_id` is `id`), oldest first.
    async fn get_children(&self, id: &TapeId) -> RobotapeResult<Vec<TapeId>>;

    /// Every tape matching all constraints in `filter`.
    ///
    /// An empty filter returns every stored tape. Results are ordered by
    /// creation time, then id.
    async fn search_tapes(&self, filter: &TapeFilter) -> RobotapeResult<Vec<Tape>>;

    /// Remove a tape and its steps.
    ///
    /// Retention policy is the caller's business; this is only the primitive.
    ///
    /// # Errors
    ///
    /// `TapeNotFound` if absent, `Storage` if other tapes still name it as
    /// their parent.
    async fn delete_tape(&self, id: &TapeId) -> RobotapeResult<()>;
}

/// The fallible operation behind a `Tool`.
///
/// Receives the run context by shared reference: it may read `retry`,
/// `deps`, `prompt` and the tape, and record usage, but it cannot change the
/// attempt counter or append to the tape. Any `Err` counts as an execution
/// failure and is retried up to the tool's bound.
#[async_trait]
pub trait ToolFunction<D: Send + Sync>: Send + Sync {
    async fn call(&self, ctx: &RunContext<'_, D>, args: &Arguments) -> RobotapeResult<Value>;
}

/// An LLM provider client.
///
/// The runtime never calls a provider directly; `generation_tool` wraps one
/// so that its failures go through the normal retry and recording path.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> RobotapeResult<LlmResponse>;

    /// Release any resources held by the client.
    async fn close(&self) -> RobotapeResult<()>;
}

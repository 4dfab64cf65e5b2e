//! The tool engine: validate, execute with bounded retries, record.
//!
//! One call to `Tool::execute` moves through:
//!
//!   VALIDATING → REJECTED
//!   VALIDATING → EXECUTING → SUCCEEDED | FAILED
//!   EXECUTING  → (attempts remaining) → EXECUTING
//!   EXECUTING  → CANCELLED                       (between attempts only)
//!
//! SUCCEEDED and FAILED append exactly one step to the context's tape.
//! REJECTED and CANCELLED append nothing: in the first case nothing ran, in
//! the second the caller walked away before an outcome existed.
//!
//! The attempt counter and the give-up decision live together in
//! `Tool::execute`; tool bodies only observe `RunContext::retry`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use robotape_config::{ToolConfig, DEFAULT_MAX_RETRIES, DEFAULT_TOOL_AGENT};
use robotape_contracts::{
    error::{RobotapeError, RobotapeResult},
    step::{Step, StepMetadata},
    tool::{Backoff, ToolDefinition, ToolOutcome},
};
use robotape_schema::{ArgumentValidator, Arguments, ParameterSchema};

use crate::{context::RunContext, traits::ToolFunction};

/// Adapter that turns a synchronous closure into a `ToolFunction`.
pub struct FnTool<F>(pub F);

#[async_trait]
impl<D, F> ToolFunction<D> for FnTool<F>
where
    D: Send + Sync,
    F: Fn(&RunContext<'_, D>, &Arguments) -> RobotapeResult<Value> + Send + Sync,
{
    async fn call(&self, ctx: &RunContext<'_, D>, args: &Arguments) -> RobotapeResult<Value> {
        (self.0)(ctx, args)
    }
}

/// A named, schema-validated, retrying wrapper around a `ToolFunction`.
pub struct Tool<D> {
    name: String,
    description: String,
    validator: ArgumentValidator,
    function: Arc<dyn ToolFunction<D>>,
    max_retries: u32,
    backoff: Backoff,
    agent: String,
}

impl<D: Send + Sync> Tool<D> {
    /// Wrap `function` under `name` with the given parameter schema.
    ///
    /// Defaults: three retries, no backoff, outcome steps attributed to agent
    /// `"agent"`.
    ///
    /// # Errors
    ///
    /// `Config` if `name` is empty or the schema does not compile.
    pub fn new(
        name: impl Into<String>,
        schema: ParameterSchema,
        function: impl ToolFunction<D> + 'static,
    ) -> RobotapeResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RobotapeError::Config {
                reason: "tool name must not be empty".to_string(),
            });
        }
        Ok(Self {
            name,
            description: String::new(),
            validator: ArgumentValidator::new(schema)?,
            function: Arc::new(function),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: Backoff::None,
            agent: DEFAULT_TOOL_AGENT.to_string(),
        })
    }

    /// Wrap a synchronous closure.
    pub fn from_fn<F>(name: impl Into<String>, schema: ParameterSchema, f: F) -> RobotapeResult<Self>
    where
        F: Fn(&RunContext<'_, D>, &Arguments) -> RobotapeResult<Value> + Send + Sync + 'static,
    {
        Self::new(name, schema, FnTool(f))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Retries after the first attempt. `0` means exactly one attempt.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Agent name recorded on outcome steps.
    ///
    /// # Errors
    ///
    /// `Config` if `agent` is blank, since such steps could never be appended.
    pub fn with_agent(mut self, agent: impl Into<String>) -> RobotapeResult<Self> {
        let agent = agent.into();
        if agent.trim().is_empty() {
            return Err(RobotapeError::Config {
                reason: format!("tool '{}' needs a non-empty agent name", self.name),
            });
        }
        self.agent = agent;
        Ok(self)
    }

    /// Apply retry, backoff and agent defaults from configuration.
    pub fn with_config(mut self, config: &ToolConfig) -> Self {
        self.max_retries = config.max_retries;
        self.backoff = config.backoff;
        if !config.agent.trim().is_empty() {
            self.agent = config.agent.clone();
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn parameters_json_schema(&self) -> &Value {
        self.validator.json_schema()
    }

    /// The definition to hand to a model.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters_json_schema: self.validator.json_schema().clone(),
        }
    }

    /// Validate `args`, run the wrapped function with up to
    /// `max_retries + 1` attempts, and record the outcome on the context's
    /// tape.
    ///
    /// Never returns `Err`: every terminal state is a `ToolOutcome` variant,
    /// and propagation is the caller's choice (`ToolOutcome::into_result`).
    pub async fn execute(&self, args: Value, ctx: &mut RunContext<'_, D>) -> ToolOutcome {
        ctx.tool_name = Some(self.name.clone());
        ctx.retry = 0;

        // ── Validate ──────────────────────────────────────────────────────────
        //
        // Validation failures are deterministic; retrying cannot help.
        let validated = match self.validator.validate(&args) {
            Ok(validated) => validated,
            Err(error) => {
                warn!(tool = %self.name, error = %error, "tool arguments rejected");
                return ToolOutcome::Rejected {
                    tool: self.name.clone(),
                    error,
                };
            }
        };

        // ── Attempt loop ──────────────────────────────────────────────────────
        let cancellation = ctx.cancellation().cloned();
        let mut attempt: u32 = 0;
        let result = loop {
            if ctx.is_cancelled() {
                info!(tool = %self.name, attempts = attempt, "tool invocation cancelled");
                return ToolOutcome::Cancelled {
                    tool: self.name.clone(),
                    attempts: attempt,
                };
            }

            ctx.retry = attempt;
            debug!(tool = %self.name, attempt, "tool attempt starting");

            match self.function.call(ctx, &validated).await {
                Ok(output) => break Ok(output),
                Err(error) if attempt >= self.max_retries => break Err(error),
                Err(error) => {
                    let delay = self.backoff.delay_for(attempt);
                    warn!(
                        tool = %self.name,
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay_millis(delay),
                        error = %error,
                        "tool attempt failed, retrying"
                    );

                    if !delay.is_zero() {
                        match &cancellation {
                            Some(token) => {
                                tokio::select! {
                                    _ = token.cancelled() => {
                                        info!(tool = %self.name, attempts = attempt + 1, "tool invocation cancelled during backoff");
                                        return ToolOutcome::Cancelled {
                                            tool: self.name.clone(),
                                            attempts: attempt + 1,
                                        };
                                    }
                                    _ = tokio::time::sleep(delay) => {}
                                }
                            }
                            None => tokio::time::sleep(delay).await,
                        }
                    }
                    attempt += 1;
                }
            }
        };
        let attempts = attempt + 1;

        // ── Record ────────────────────────────────────────────────────────────
        match result {
            Ok(output) => {
                debug!(tool = %self.name, attempts, "tool succeeded");
                let step = Step::action(
                    json!({
                        "tool": self.name,
                        "args": args,
                        "result": output,
                        "attempts": attempts,
                    }),
                    StepMetadata::new(&self.agent, &self.name),
                );
                self.record(ctx, step);
                ToolOutcome::Succeeded {
                    tool: self.name.clone(),
                    output,
                    attempts,
                }
            }
            Err(last) => {
                let error = RobotapeError::RetriesExhausted {
                    tool: self.name.clone(),
                    attempts,
                    reason: last.to_string(),
                };
                warn!(tool = %self.name, attempts, error = %last, "tool failed, attempts exhausted");
                let step = Step::error(
                    json!({
                        "tool": self.name,
                        "args": args,
                        "error": last.to_string(),
                        "error_kind": last.kind(),
                        "attempts": attempts,
                    }),
                    StepMetadata::new(&self.agent, &self.name),
                );
                self.record(ctx, step);
                ToolOutcome::Failed {
                    tool: self.name.clone(),
                    error,
                    attempts,
                }
            }
        }
    }

    fn record(&self, ctx: &mut RunContext<'_, D>, step: Step) {
        let Some(tape) = ctx.tape_mut() else {
            debug!(tool = %self.name, "no tape in context, outcome not recorded");
            return;
        };
        let tape_id = tape.id();
        if let Err(e) = tape.append(step) {
            // Unreachable with a non-empty agent name, which the builder enforces.
            warn!(tool = %self.name, %tape_id, error = %e, "failed to record tool outcome");
        }
    }
}

/// Milliseconds for log fields, saturating at `u64::MAX`.
fn delay_millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

// ── Tests ────────────────────────────────────────────────────────────────────

//! Wrapping an `LlmProvider` as a tool.
//!
//! Model calls fail for transient reasons (rate limits, timeouts), so they
//! get the same validation, retry and recording path as any other tool.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use robotape_contracts::error::RobotapeResult;
use robotape_schema::{Arguments, ParamType, ParameterSchema};

use crate::{
    context::RunContext,
    tool::Tool,
    traits::{LlmProvider, ToolFunction},
};

/// Name under which `generation_tool` registers.
pub const GENERATE_TOOL_NAME: &str = "generate";

struct Generate {
    provider: Arc<dyn LlmProvider>,
}

#[async_trait]
impl<D: Send + Sync> ToolFunction<D> for Generate {
    async fn call(&self, ctx: &RunContext<'_, D>, args: &Arguments) -> RobotapeResult<Value> {
        let prompt = if args.has("prompt") {
            args.str("prompt")?
        } else {
            ctx.prompt()
        };
        let response = self.provider.generate(prompt).await?;
        ctx.usage().record(&response.usage);
        debug!(
            model = %response.model,
            total_tokens = response.usage.total_tokens,
            "generation completed"
        );
        Ok(json!({
            "text": response.text,
            "model": response.model,
            "usage": response.usage,
        }))
    }
}

/// A tool that sends `prompt` (or the context's prompt when omitted) to
/// `provider` and returns `{ text, model, usage }`.
///
/// Usage from every successful call is added to the context's tracker.
pub fn generation_tool<D: Send + Sync>(provider: Arc<dyn LlmProvider>) -> RobotapeResult<Tool<D>> {
    let schema = ParameterSchema::new()
        .optional("prompt", ParamType::String)
        .describe("Prompt text; defaults to the run's prompt");
    Ok(Tool::new(GENERATE_TOOL_NAME, schema, Generate { provider })?
        .with_description("Generate a completion with the configured language model."))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use serde_json::json;

    use robotape_contracts::{
        error::RobotapeError,
        step::StepType,
        tape::Tape,
        usage::{LlmResponse, Usage},
    };

    use super::*;

    /// Rate-limits its first `failures` requests, then echoes the prompt.
    struct MockProvider {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        async fn generate(&self, prompt: &str) -> RobotapeResult<LlmResponse> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(RobotapeError::execution("rate limited"));
            }
            Ok(LlmResponse {
                text: format!("echo: {prompt}"),
                usage: Usage {
                    requests: 1,
                    request_tokens: 10,
                    response_tokens: 5,
                    total_tokens: 15,
                },
                raw_response: json!({ "id": "resp-1" }),
                model: "mock-model".to_string(),
            })
        }

        async fn close(&self) -> RobotapeResult<()> {
            Ok(())
        }
    }

    fn provider(failures: u32) -> Arc<MockProvider> {
        Arc::new(MockProvider {
            failures,
            calls: AtomicU32::new(0),
        })
    }

    #[tokio::test]
    async fn generation_records_usage_and_action() {
        let tool = generation_tool::<()>(provider(0)).unwrap();
        let mut tape = Tape::new("llm");
        let mut ctx = RunContext::new((), "default prompt", &mut tape);

        let output = tool
            .execute(json!({ "prompt": "hello" }), &mut ctx)
            .await
            .into_result()
            .unwrap();

        assert_eq!(output["text"], "echo: hello");
        assert_eq!(output["model"], "mock-model");
        assert_eq!(ctx.usage().snapshot().total_tokens, 15);
        assert_eq!(tape.get_steps_by_type(&StepType::Action).len(), 1);
        assert_eq!(tape.get_steps_by_node(GENERATE_TOOL_NAME).len(), 1);
    }

    #[tokio::test]
    async fn omitted_prompt_falls_back_to_context_prompt() {
        let tool = generation_tool::<()>(provider(0)).unwrap();
        let mut ctx = RunContext::detached((), "from context");

        let output = tool.execute(json!({}), &mut ctx).await.into_result().unwrap();
        assert_eq!(output["text"], "echo: from context");
    }

    #[tokio::test]
    async fn rate_limits_are_retried_and_usage_counts_only_successes() {
        let mock = provider(2);
        let tool = generation_tool::<()>(mock.clone()).unwrap();
        let mut ctx = RunContext::detached((), "p");

        let outcome = tool.execute(json!({}), &mut ctx).await;

        assert!(outcome.is_success());
        assert_eq!(outcome.attempts(), 3);
        assert_eq!(mock.calls.load(Ordering::SeqCst), 3);
        assert_eq!(ctx.usage().snapshot().requests, 1);
    }

    #[tokio::test]
    async fn shared_tracker_accumulates_across_contexts() {
        let tool = generation_tool::<()>(provider(0)).unwrap();
        let mut first = RunContext::detached((), "a");
        let shared = first.usage_handle();
        let mut second = RunContext::detached((), "b").with_usage(shared.clone());

        tool.execute(json!({}), &mut first).await.into_result().unwrap();
        tool.execute(json!({}), &mut second).await.into_result().unwrap();

        assert_eq!(shared.snapshot().total_tokens, 30);
        assert_eq!(shared.snapshot().requests, 2);
    }
}

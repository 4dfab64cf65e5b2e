//! A scripted two-tape agent session.
//!
//! Walk-through:
//!   1. Root tape: the agent thinks, then calls a flaky `search` tool that
//!      fails once and succeeds on retry (one ACTION step).
//!   2. A malformed call is rejected by validation (no step).
//!   3. The root tape is saved and branched.
//!   4. On the branch the agent tries `fetch_page`, which always fails
//!      (one ERROR step after every retry is spent).
//!   5. The branch is saved; its history leads back to the root.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use robotape_config::ToolConfig;
use robotape_contracts::{
    error::{RobotapeError, RobotapeResult},
    step::{Step, StepMetadata},
    tape::{Tape, TapeId},
};
use robotape_core::{traits::TapeStore, RunContext, Tool, ToolFunction};
use robotape_schema::{Arguments, ParamType, ParameterSchema};

const AGENT: &str = "research_agent";

/// Dependencies handed to every tool of the session.
pub struct Corpus {
    pages: Vec<&'static str>,
}

impl Corpus {
    fn sample() -> Self {
        Self {
            pages: vec![
                "Tapes record every step an agent takes.",
                "Branching a tape keeps the parent untouched.",
                "Tools retry transient failures up to a bound.",
                "Search filters match author, agent, node and tags.",
            ],
        }
    }
}

// ── Tools ─────────────────────────────────────────────────────────────────────

/// Substring search over the corpus that times out on its first call.
struct FlakySearch {
    calls: AtomicU32,
}

#[async_trait]
impl ToolFunction<Corpus> for FlakySearch {
    async fn call(&self, ctx: &RunContext<'_, Corpus>, args: &Arguments) -> RobotapeResult<Value> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(RobotapeError::execution("search backend timed out"));
        }
        let query = args.str("query")?.to_lowercase();
        let limit = usize::try_from(args.i64("max_results")?).unwrap_or(0);
        let hits: Vec<&str> = ctx
            .deps()
            .pages
            .iter()
            .copied()
            .filter(|page| page.to_lowercase().contains(&query))
            .take(limit)
            .collect();
        Ok(json!({ "query": query, "hits": hits, "attempt": ctx.retry() }))
    }
}

fn search_tool(config: &ToolConfig) -> RobotapeResult<Tool<Corpus>> {
    let schema = ParameterSchema::new()
        .required("query", ParamType::String)
        .describe("Case-insensitive substring to look for")
        .optional_with_default("max_results", ParamType::Integer, 3);
    Ok(Tool::new(
        "search",
        schema,
        FlakySearch {
            calls: AtomicU32::new(0),
        },
    )?
    .with_description("Search the local corpus.")
    .with_config(config)
    .with_agent(AGENT)?)
}

fn fetch_tool(config: &ToolConfig) -> RobotapeResult<Tool<Corpus>> {
    let schema = ParameterSchema::new().required("url", ParamType::String);
    Ok(Tool::from_fn("fetch_page", schema, |_ctx, args| {
        Err(RobotapeError::execution(format!(
            "connection refused: {}",
            args.str("url")?
        )))
    })?
    .with_description("Fetch a remote page.")
    .with_config(config)
    .with_agent(AGENT)?)
}

// ── Session ───────────────────────────────────────────────────────────────────

/// Ids of the tapes a session produced.
pub struct SessionSummary {
    pub root: TapeId,
    pub branch: TapeId,
}

/// Record the scripted session and persist both tapes to `store`.
pub async fn run_session(store: &dyn TapeStore, config: &ToolConfig) -> RobotapeResult<SessionSummary> {
    let corpus = Corpus::sample();
    let search = search_tool(config)?;
    let fetch = fetch_tool(config)?;

    // ── Root tape ────────────────────────────────────────────────────────────
    let mut root = Tape::new("demo").with_tag("demo").with_tag("research");
    root.append(Step::thought(
        "I should look up how branching works.",
        StepMetadata::new(AGENT, "plan").with_prompt_id("demo-prompt-1"),
    ))?;

    let found = {
        let mut ctx = RunContext::new(corpus, "How does branching work?", &mut root);
        let found = search
            .execute(json!({ "query": "branch" }), &mut ctx)
            .await;
        print_outcome(&found.report());

        let rejected = search.execute(json!({ "max_results": 2 }), &mut ctx).await;
        print_outcome(&rejected.report());

        found.into_result()?
    };

    root.append(Step::observation(
        found["hits"].clone(),
        StepMetadata::new(AGENT, "observe"),
    ))?;
    store.save_tape(&root).await?;
    info!(tape_id = %root.id(), steps = root.len(), "root tape saved");

    // ── Branch ───────────────────────────────────────────────────────────────
    let mut branch = root.branch();
    branch.append(Step::thought(
        "The corpus was thin; try fetching a remote page instead.",
        StepMetadata::new(AGENT, "plan"),
    ))?;
    {
        let mut ctx = RunContext::new(Corpus::sample(), "Fetch a page", &mut branch);
        let fetched = fetch
            .execute(json!({ "url": "https://example.invalid/tapes" }), &mut ctx)
            .await;
        print_outcome(&fetched.report());
    }
    store.save_tape(&branch).await?;
    info!(tape_id = %branch.id(), steps = branch.len(), "branch tape saved");

    Ok(SessionSummary {
        root: root.id(),
        branch: branch.id(),
    })
}

fn print_outcome(report: &robotape_contracts::tool::ToolReport) {
    let status = if report.success { "ok" } else { "failed" };
    println!(
        "  tool {:<12} {:<7} attempts={}{}",
        report.metadata.tool,
        status,
        report.metadata.attempts,
        report
            .error
            .as_deref()
            .map(|e| format!("  ({e})"))
            .unwrap_or_default()
    );
}

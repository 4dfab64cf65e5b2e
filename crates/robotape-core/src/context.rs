//! Per-invocation state handed to tools.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use tokio_util::sync::CancellationToken;

use robotape_contracts::{tape::Tape, usage::Usage};

/// Add-only usage counters shared by every context of one agent run.
///
/// Counters only grow: there is no way to subtract or reset them.
#[derive(Debug, Default)]
pub struct UsageTracker {
    requests: AtomicU64,
    request_tokens: AtomicU64,
    response_tokens: AtomicU64,
    total_tokens: AtomicU64,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `usage` to the running totals.
    pub fn record(&self, usage: &Usage) {
        self.requests.fetch_add(usage.requests, Ordering::Relaxed);
        self.request_tokens
            .fetch_add(usage.request_tokens, Ordering::Relaxed);
        self.response_tokens
            .fetch_add(usage.response_tokens, Ordering::Relaxed);
        self.total_tokens.fetch_add(usage.total_tokens, Ordering::Relaxed);
    }

    /// Current totals.
    pub fn snapshot(&self) -> Usage {
        Usage {
            requests: self.requests.load(Ordering::Relaxed),
            request_tokens: self.request_tokens.load(Ordering::Relaxed),
            response_tokens: self.response_tokens.load(Ordering::Relaxed),
            total_tokens: self.total_tokens.load(Ordering::Relaxed),
        }
    }
}

/// Information about the current tool call.
///
/// The context borrows the tape mutably for its whole lifetime, so while a
/// tool runs nothing else can append to that tape. `retry` and `tool_name`
/// are written only by the `Tool` engine; tool bodies receive `&RunContext`
/// and can read them but not change them.
pub struct RunContext<'a, D> {
    deps: D,
    usage: Arc<UsageTracker>,
    prompt: String,
    tape: Option<&'a mut Tape>,
    cancellation: Option<CancellationToken>,
    pub(crate) tool_name: Option<String>,
    pub(crate) retry: u32,
}

impl<'a, D> RunContext<'a, D> {
    /// A context whose tool outcomes are recorded on `tape`.
    pub fn new(deps: D, prompt: impl Into<String>, tape: &'a mut Tape) -> Self {
        Self {
            deps,
            usage: Arc::new(UsageTracker::new()),
            prompt: prompt.into(),
            tape: Some(tape),
            cancellation: None,
            tool_name: None,
            retry: 0,
        }
    }

    /// A context with no tape. Tool outcomes are returned but not recorded.
    pub fn detached(deps: D, prompt: impl Into<String>) -> Self {
        Self {
            deps,
            usage: Arc::new(UsageTracker::new()),
            prompt: prompt.into(),
            tape: None,
            cancellation: None,
            tool_name: None,
            retry: 0,
        }
    }

    /// Share a usage tracker with other contexts of the same run.
    pub fn with_usage(mut self, usage: Arc<UsageTracker>) -> Self {
        self.usage = usage;
        self
    }

    /// Stop retrying once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn deps(&self) -> &D {
        &self.deps
    }

    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    pub fn usage_handle(&self) -> Arc<UsageTracker> {
        Arc::clone(&self.usage)
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// The tape outcomes are recorded on, read-only.
    pub fn tape(&self) -> Option<&Tape> {
        self.tape.as_deref()
    }

    /// Name of the tool this context is bound to, once `execute` has started.
    pub fn tool_name(&self) -> Option<&str> {
        self.tool_name.as_deref()
    }

    /// Current attempt index, starting at 0.
    pub fn retry(&self) -> u32 {
        self.retry
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    pub(crate) fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    pub(crate) fn tape_mut(&mut self) -> Option<&mut Tape> {
        self.tape.as_deref_mut()
    }
}

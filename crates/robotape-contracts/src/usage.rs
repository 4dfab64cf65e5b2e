//! Usage accounting and LLM provider response types.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Resource usage of one or more model calls.
///
/// Only ever added to; nothing in the runtime subtracts usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub requests: u64,
    pub request_tokens: u64,
    pub response_tokens: u64,
    pub total_tokens: u64,
}

impl AddAssign for Usage {
    fn add_assign(&mut self, rhs: Self) {
        self.requests += rhs.requests;
        self.request_tokens += rhs.request_tokens;
        self.response_tokens += rhs.response_tokens;
        self.total_tokens += rhs.total_tokens;
    }
}

/// What an LLM provider returns from `generate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub usage: Usage,
    /// The provider's untouched response body, kept for later inspection.
    pub raw_response: Value,
    pub model: String,
}

//! Step types: the unit of recorded agent activity.
//!
//! A `Step` is immutable once it lands on a tape. Corrections are expressed as
//! new steps (usually `StepType::Error`) that reference the original step id.

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{RobotapeError, RobotapeResult};

/// The kind of activity a step records.
///
/// The four core kinds are reserved; anything else is carried as `Custom`.
/// The runtime only ever compares step types by value and never dispatches on
/// them, so custom kinds filter and persist exactly like the core ones.
///
/// Equality and hashing go through the string tag, so `Custom("thought")`
/// is the same step type as `Thought`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepType {
    Thought,
    Action,
    Observation,
    Error,
    Custom(String),
}

impl StepType {
    /// Build a step type from its string tag.
    ///
    /// Core tags map to their reserved variants; everything else becomes
    /// `Custom`. This is the inverse of `as_str`.
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        match tag.as_str() {
            "thought" => Self::Thought,
            "action" => Self::Action,
            "observation" => Self::Observation,
            "error" => Self::Error,
            _ => Self::Custom(tag),
        }
    }

    /// The string tag used for storage and filtering.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Thought => "thought",
            Self::Action => "action",
            Self::Observation => "observation",
            Self::Error => "error",
            Self::Custom(tag) => tag,
        }
    }
}

impl PartialEq for StepType {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for StepType {}

impl Hash for StepType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl From<String> for StepType {
    fn from(tag: String) -> Self {
        Self::new(tag)
    }
}

impl From<StepType> for String {
    fn from(step_type: StepType) -> Self {
        match step_type {
            StepType::Custom(tag) => tag,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who produced a step, where, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepMetadata {
    /// Unique step id, generated at creation.
    pub id: Uuid,
    /// Hierarchical name of the agent that produced the step. Must be non-empty.
    pub agent: String,
    /// Logical stage within the agent (e.g. "planning", "web_search").
    pub node: String,
    /// Creation instant (UTC).
    pub timestamp: DateTime<Utc>,
    /// Optional link to the prompt that produced this step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_id: Option<String>,
}

impl StepMetadata {
    /// Metadata stamped with the current wall-clock time.
    pub fn new(agent: impl Into<String>, node: impl Into<String>) -> Self {
        Self::at(agent, node, Utc::now())
    }

    /// Metadata with an explicit timestamp, for injected clocks and tests.
    pub fn at(agent: impl Into<String>, node: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent: agent.into(),
            node: node.into(),
            timestamp,
            prompt_id: None,
        }
    }

    /// Attach the id of the prompt that produced this step.
    pub fn with_prompt_id(mut self, prompt_id: impl Into<String>) -> Self {
        self.prompt_id = Some(prompt_id.into());
        self
    }
}

/// One recorded unit of agent activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(rename = "type")]
    pub step_type: StepType,
    /// Structured payload. Any JSON value; never executable.
    pub content: Value,
    pub metadata: StepMetadata,
}

impl Step {
    pub fn new(step_type: StepType, content: impl Into<Value>, metadata: StepMetadata) -> Self {
        Self {
            step_type,
            content: content.into(),
            metadata,
        }
    }

    pub fn thought(content: impl Into<Value>, metadata: StepMetadata) -> Self {
        Self::new(StepType::Thought, content, metadata)
    }

    pub fn action(content: impl Into<Value>, metadata: StepMetadata) -> Self {
        Self::new(StepType::Action, content, metadata)
    }

    pub fn observation(content: impl Into<Value>, metadata: StepMetadata) -> Self {
        Self::new(StepType::Observation, content, metadata)
    }

    pub fn error(content: impl Into<Value>, metadata: StepMetadata) -> Self {
        Self::new(StepType::Error, content, metadata)
    }

    /// Shorthand for `self.metadata.id`.
    pub fn id(&self) -> Uuid {
        self.metadata.id
    }

    /// Check the required metadata fields.
    ///
    /// Content is never inspected; only identity and authorship are required.
    pub fn validate(&self) -> RobotapeResult<()> {
        if self.metadata.id.is_nil() {
            return Err(RobotapeError::InvalidStep {
                reason: "step id must not be nil".to_string(),
            });
        }
        if self.metadata.agent.trim().is_empty() {
            return Err(RobotapeError::InvalidStep {
                reason: format!("step {} has an empty agent name", self.metadata.id),
            });
        }
        Ok(())
    }
}

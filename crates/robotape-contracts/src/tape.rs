//! The tape: an ordered, append-only log of steps with parent lineage.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{RobotapeError, RobotapeResult},
    step::{Step, StepType},
};

/// Unique identifier of a tape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TapeId(pub Uuid);

impl TapeId {
    /// Create a new, unique tape id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TapeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TapeId {
    type Err = RobotapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| RobotapeError::Config {
                reason: format!("'{s}' is not a valid tape id: {e}"),
            })
    }
}

/// Identity, lineage, and search attributes of a tape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapeMetadata {
    pub id: TapeId,
    /// The tape this one was branched from. A lineage pointer, not ownership:
    /// the parent lives and changes independently.
    pub parent_id: Option<TapeId>,
    /// Agent or environment that created the tape.
    pub author: String,
    pub created_at: DateTime<Utc>,
    /// Free-form labels used by `search_tapes`.
    pub tags: BTreeSet<String>,
}

impl TapeMetadata {
    /// Fresh root metadata for `author`.
    pub fn new(author: impl Into<String>) -> Self {
        Self {
            id: TapeId::new(),
            parent_id: None,
            author: author.into(),
            created_at: Utc::now(),
            tags: BTreeSet::new(),
        }
    }
}

impl Default for TapeMetadata {
    fn default() -> Self {
        Self::new("root")
    }
}

/// An ordered sequence of steps representing one logical execution thread.
///
/// Append order is the only order: steps are never removed, reordered, or
/// deduplicated. A single writer at a time is assumed; tool invocations get
/// the tape through a `&mut` borrow, which makes concurrent appends to the
/// same instance unrepresentable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tape {
    pub metadata: TapeMetadata,
    steps: Vec<Step>,
}

impl Tape {
    /// An empty root tape authored by `author`.
    pub fn new(author: impl Into<String>) -> Self {
        Self {
            metadata: TapeMetadata::new(author),
            steps: Vec::new(),
        }
    }

    /// Rebuild a tape from stored parts. Steps are taken in the given order.
    pub fn from_parts(metadata: TapeMetadata, steps: Vec<Step>) -> Self {
        Self { metadata, steps }
    }

    /// Add a tag, builder style.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.metadata.tags.insert(tag.into());
        self
    }

    pub fn id(&self) -> TapeId {
        self.metadata.id
    }

    pub fn parent_id(&self) -> Option<TapeId> {
        self.metadata.parent_id
    }

    /// A tape with no parent is a root.
    pub fn is_root(&self) -> bool {
        self.metadata.parent_id.is_none()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Append `step` to the end of the tape.
    ///
    /// The tape does not stamp time; the step's timestamp is whatever its
    /// creator put there.
    ///
    /// # Errors
    ///
    /// `InvalidStep` if the step's metadata is malformed. The tape is left
    /// unchanged in that case.
    pub fn append(&mut self, step: Step) -> RobotapeResult<()> {
        step.validate()?;
        self.steps.push(step);
        Ok(())
    }

    /// Steps of the given type, in original relative order.
    pub fn get_steps_by_type(&self, step_type: &StepType) -> Vec<&Step> {
        self.steps
            .iter()
            .filter(|s| &s.step_type == step_type)
            .collect()
    }

    /// Steps produced by the named agent, in original relative order.
    pub fn get_steps_by_agent(&self, agent: &str) -> Vec<&Step> {
        self.steps
            .iter()
            .filter(|s| s.metadata.agent == agent)
            .collect()
    }

    /// Steps produced at the named node, in original relative order.
    pub fn get_steps_by_node(&self, node: &str) -> Vec<&Step> {
        self.steps
            .iter()
            .filter(|s| s.metadata.node == node)
            .collect()
    }

    /// The most recently appended step.
    ///
    /// # Errors
    ///
    /// `EmptyTape` when nothing has been appended yet.
    pub fn get_last_step(&self) -> RobotapeResult<&Step> {
        self.steps.last().ok_or_else(|| RobotapeError::EmptyTape {
            tape_id: self.metadata.id.to_string(),
        })
    }

    /// Branch this tape into a new child tape.
    ///
    /// The child gets a fresh id, `parent_id` pointing at this tape, the same
    /// author and tags, and a deep copy of the current steps. The two tapes
    /// are fully independent afterwards. There is no merge counterpart.
    ///
    /// `Clone::clone` is a plain value copy that keeps the id; this is the
    /// lineage-aware clone.
    pub fn branch(&self) -> Tape {
        Tape {
            metadata: TapeMetadata {
                id: TapeId::new(),
                parent_id: Some(self.metadata.id),
                author: self.metadata.author.clone(),
                created_at: Utc::now(),
                tags: self.metadata.tags.clone(),
            },
            steps: self.steps.clone(),
        }
    }
}

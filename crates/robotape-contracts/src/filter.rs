//! Search filters for `TapeStore::search_tapes`.
//!
//! Filters are combined with logical AND. The key/value form accepted by
//! `TapeFilter::from_pairs` is the external surface: unknown keys are an
//! error rather than being ignored, so a typo never widens a search.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{RobotapeError, RobotapeResult},
    tape::Tape,
};

/// The keys `from_pairs` understands.
pub const FILTER_KEYS: [&str; 4] = ["author", "agent", "node", "tags"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapeFilter {
    /// Exact match on the tape author.
    pub author: Option<String>,
    /// At least one step produced by this agent.
    pub agent: Option<String>,
    /// At least one step produced at this node.
    pub node: Option<String>,
    /// Every listed tag must be present on the tape.
    pub tags: BTreeSet<String>,
}

impl TapeFilter {
    /// A filter that matches every tape.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// True when no constraint is set.
    pub fn is_empty(&self) -> bool {
        self.author.is_none() && self.agent.is_none() && self.node.is_none() && self.tags.is_empty()
    }

    /// Build a filter from key/value pairs.
    ///
    /// `author`, `agent` and `node` take a string. `tags` takes a string or an
    /// array of strings; repeated `tags` keys accumulate.
    ///
    /// # Errors
    ///
    /// `UnsupportedFilter` for any key outside `FILTER_KEYS`, and for values
    /// of the wrong shape (named by key).
    pub fn from_pairs<K, I>(pairs: I) -> RobotapeResult<Self>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let mut filter = Self::default();
        for (key, value) in pairs {
            let key = key.as_ref();
            match key {
                "author" => filter.author = Some(expect_string(key, &value)?),
                "agent" => filter.agent = Some(expect_string(key, &value)?),
                "node" => filter.node = Some(expect_string(key, &value)?),
                "tags" => match &value {
                    Value::String(tag) => {
                        filter.tags.insert(tag.clone());
                    }
                    Value::Array(items) => {
                        for item in items {
                            filter.tags.insert(expect_string(key, item)?);
                        }
                    }
                    _ => return Err(unsupported_value(key)),
                },
                other => {
                    return Err(RobotapeError::UnsupportedFilter {
                        key: other.to_string(),
                    })
                }
            }
        }
        Ok(filter)
    }

    /// In-memory evaluation of the filter against a tape.
    ///
    /// Store backends that cannot push the filter down use this directly; the
    /// SQLite store mirrors the same semantics in SQL.
    pub fn matches(&self, tape: &Tape) -> bool {
        if let Some(author) = &self.author {
            if &tape.metadata.author != author {
                return false;
            }
        }
        if let Some(agent) = &self.agent {
            if tape.get_steps_by_agent(agent).is_empty() {
                return false;
            }
        }
        if let Some(node) = &self.node {
            if tape.get_steps_by_node(node).is_empty() {
                return false;
            }
        }
        self.tags.is_subset(&tape.metadata.tags)
    }
}

fn expect_string(key: &str, value: &Value) -> RobotapeResult<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| unsupported_value(key))
}

fn unsupported_value(key: &str) -> RobotapeError {
    RobotapeError::UnsupportedFilter {
        key: format!("{key} (expected a string value)"),
    }
}

//! In-memory implementation of `TapeStore`.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use robotape_contracts::{
    error::{RobotapeError, RobotapeResult},
    filter::TapeFilter,
    tape::{Tape, TapeId},
};
use robotape_core::traits::TapeStore;

use crate::{lineage::walk_lineage, to_storage_err};

/// Tapes kept in a map behind an async `RwLock`.
///
/// Stored tapes are full copies: mutating a tape after saving it does not
/// change what the store holds until it is saved again.
#[derive(Default)]
pub struct MemoryTapeStore {
    tapes: RwLock<HashMap<TapeId, Tape>>,
}

impl MemoryTapeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tapes.
    pub async fn len(&self) -> usize {
        self.tapes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tapes.read().await.is_empty()
    }
}

fn sort_oldest_first(tapes: &mut [&Tape]) {
    tapes.sort_by(|a, b| {
        a.metadata
            .created_at
            .cmp(&b.metadata.created_at)
            .then_with(|| a.id().cmp(&b.id()))
    });
}

#[async_trait]
impl TapeStore for MemoryTapeStore {
    async fn save_tape(&self, tape: &Tape) -> RobotapeResult<TapeId> {
        let id = tape.id();
        let mut tapes = self.tapes.write().await;
        if let Some(parent) = tape.parent_id() {
            if parent != id && !tapes.contains_key(&parent) {
                return Err(to_storage_err(format!(
                    "tape '{id}' names unknown parent '{parent}'"
                )));
            }
        }
        tapes.insert(id, tape.clone());
        debug!(tape_id = %id, steps = tape.len(), "tape saved");
        Ok(id)
    }

    async fn load_tape(&self, id: &TapeId) -> RobotapeResult<Tape> {
        self.tapes
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RobotapeError::TapeNotFound {
                tape_id: id.to_string(),
            })
    }

    async fn get_tape_history(&self, id: &TapeId) -> RobotapeResult<Vec<TapeId>> {
        let tapes = self.tapes.read().await;
        walk_lineage(*id, |current| Ok(tapes.get(current).map(Tape::parent_id)))
    }

    async fn get_children(&self, id: &TapeId) -> RobotapeResult<Vec<TapeId>> {
        let tapes = self.tapes.read().await;
        let mut children: Vec<&Tape> = tapes
            .values()
            .filter(|t| t.parent_id() == Some(*id) && t.id() != *id)
            .collect();
        sort_oldest_first(&mut children);
        Ok(children.into_iter().map(Tape::id).collect())
    }

    async fn search_tapes(&self, filter: &TapeFilter) -> RobotapeResult<Vec<Tape>> {
        let tapes = self.tapes.read().await;
        let mut found: Vec<&Tape> = tapes.values().filter(|t| filter.matches(t)).collect();
        sort_oldest_first(&mut found);
        Ok(found.into_iter().cloned().collect())
    }

    async fn delete_tape(&self, id: &TapeId) -> RobotapeResult<()> {
        let mut tapes = self.tapes.write().await;
        if !tapes.contains_key(id) {
            return Err(RobotapeError::TapeNotFound {
                tape_id: id.to_string(),
            });
        }
        if tapes
            .values()
            .any(|t| t.parent_id() == Some(*id) && t.id() != *id)
        {
            return Err(to_storage_err(format!(
                "tape '{id}' still has children"
            )));
        }
        tapes.remove(id);
        debug!(tape_id = %id, "tape deleted");
        Ok(())
    }
}

//! SQLite implementation of `TapeStore`.
//!
//! One connection behind a mutex. Every trait call moves onto the blocking
//! pool with `spawn_blocking`, takes the lock, and runs as a single
//! transaction, so concurrent flows never observe a half-written tape.

pub mod migrations;
pub mod pragmas;
pub mod queries;

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;
use tracing::{debug, info};

use robotape_contracts::{
    error::{RobotapeError, RobotapeResult},
    filter::TapeFilter,
    tape::{Tape, TapeId},
};
use robotape_core::traits::TapeStore;

use crate::{lineage::walk_lineage, to_storage_err};

/// A tape store backed by a SQLite database file or an in-memory database.
#[derive(Clone)]
pub struct SqliteTapeStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTapeStore {
    /// Open (creating if needed) the database at `path` and migrate it.
    pub fn open(path: &Path) -> RobotapeResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| to_storage_err(format!("open '{}': {e}", path.display())))?;
        let store = Self::initialize(conn)?;
        info!(path = %path.display(), "sqlite tape store opened");
        Ok(store)
    }

    /// A private in-memory database, gone when the store is dropped.
    pub fn open_in_memory() -> RobotapeResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| to_storage_err(format!("open in-memory database: {e}")))?;
        Self::initialize(conn)
    }

    fn initialize(conn: Connection) -> RobotapeResult<Self> {
        pragmas::apply_pragmas(&conn)?;
        if !pragmas::foreign_keys_enabled(&conn)? {
            return Err(to_storage_err("foreign key enforcement is unavailable"));
        }
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Number of stored tapes.
    pub async fn count(&self) -> RobotapeResult<usize> {
        self.with_conn("count", queries::count_tapes).await
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, op: &'static str, f: F) -> RobotapeResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> RobotapeResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| to_storage_err(format!("{op}: connection lock poisoned")))?;
            f(&guard)
        })
        .await
        .map_err(|e| to_storage_err(format!("{op}: blocking task failed: {e}")))?
    }
}

#[async_trait]
impl TapeStore for SqliteTapeStore {
    async fn save_tape(&self, tape: &Tape) -> RobotapeResult<TapeId> {
        let id = tape.id();
        let steps = tape.len();
        let tape = tape.clone();
        self.with_conn("save_tape", move |conn| queries::save_tape(conn, &tape))
            .await?;
        debug!(tape_id = %id, steps, "tape saved");
        Ok(id)
    }

    async fn load_tape(&self, id: &TapeId) -> RobotapeResult<Tape> {
        let id = *id;
        self.with_conn("load_tape", move |conn| queries::load_tape(conn, &id))
            .await?
            .ok_or_else(|| RobotapeError::TapeNotFound {
                tape_id: id.to_string(),
            })
    }

    async fn get_tape_history(&self, id: &TapeId) -> RobotapeResult<Vec<TapeId>> {
        let id = *id;
        self.with_conn("get_tape_history", move |conn| {
            walk_lineage(id, |current| queries::parent_of(conn, current))
        })
        .await
    }

    async fn get_children(&self, id: &TapeId) -> RobotapeResult<Vec<TapeId>> {
        let id = *id;
        self.with_conn("get_children", move |conn| queries::children_of(conn, &id))
            .await
    }

    async fn search_tapes(&self, filter: &TapeFilter) -> RobotapeResult<Vec<Tape>> {
        let filter = filter.clone();
        let tapes = self
            .with_conn("search_tapes", move |conn| queries::search_tapes(conn, &filter))
            .await?;
        debug!(matches = tapes.len(), "tape search completed");
        Ok(tapes)
    }

    async fn delete_tape(&self, id: &TapeId) -> RobotapeResult<()> {
        let id = *id;
        self.with_conn("delete_tape", move |conn| queries::delete_tape(conn, &id))
            .await?;
        debug!(tape_id = %id, "tape deleted");
        Ok(())
    }
}

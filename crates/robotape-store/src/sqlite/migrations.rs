//! Schema migrations, tracked with `PRAGMA user_version`.

use rusqlite::Connection;
use tracing::info;

use robotape_contracts::error::RobotapeResult;

use crate::to_storage_err;

/// Latest schema version this build knows how to use.
pub const SCHEMA_VERSION: i64 = 1;

/// Bring the database up to `SCHEMA_VERSION`.
///
/// # Errors
///
/// `Storage` if a migration fails or the file was written by a newer schema.
pub fn run_migrations(conn: &Connection) -> RobotapeResult<()> {
    let current: i64 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| to_storage_err(format!("read schema version: {e}")))?;

    if current > SCHEMA_VERSION {
        return Err(to_storage_err(format!(
            "database schema version {current} is newer than supported version {SCHEMA_VERSION}"
        )));
    }
    if current < 1 {
        v001_tapes_and_steps(conn)?;
        set_version(conn, 1)?;
        info!(version = 1, "applied tape store migration");
    }
    Ok(())
}

fn set_version(conn: &Connection, version: i64) -> RobotapeResult<()> {
    conn.pragma_update(None, "user_version", version)
        .map_err(|e| to_storage_err(format!("write schema version: {e}")))
}

/// v001: tapes, steps.
///
/// Steps are keyed by their position on the tape. Step ids are indexed but
/// not unique: a branch carries copies of its parent's steps.
fn v001_tapes_and_steps(conn: &Connection) -> RobotapeResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS tapes (
            id          TEXT PRIMARY KEY,
            parent_id   TEXT REFERENCES tapes(id),
            author      TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            tags        TEXT NOT NULL DEFAULT '[]'
        );

        CREATE INDEX IF NOT EXISTS idx_tapes_parent ON tapes(parent_id);
        CREATE INDEX IF NOT EXISTS idx_tapes_author ON tapes(author);
        CREATE INDEX IF NOT EXISTS idx_tapes_created ON tapes(created_at);

        CREATE TABLE IF NOT EXISTS steps (
            tape_id     TEXT NOT NULL REFERENCES tapes(id) ON DELETE CASCADE,
            seq         INTEGER NOT NULL,
            id          TEXT NOT NULL,
            step_type   TEXT NOT NULL,
            content     TEXT NOT NULL,
            agent       TEXT NOT NULL,
            node        TEXT NOT NULL,
            timestamp   TEXT NOT NULL,
            prompt_id   TEXT,
            PRIMARY KEY (tape_id, seq)
        );

        CREATE INDEX IF NOT EXISTS idx_steps_id ON steps(id);
        CREATE INDEX IF NOT EXISTS idx_steps_agent ON steps(agent, tape_id);
        CREATE INDEX IF NOT EXISTS idx_steps_node ON steps(node, tape_id);
        CREATE INDEX IF NOT EXISTS idx_steps_type ON steps(step_type);
        ",
    )
    .map_err(|e| to_storage_err(format!("v001 migration: {e}")))?;
    Ok(())
}

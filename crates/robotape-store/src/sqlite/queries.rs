//! Tape and step reads and writes against a single connection.
//!
//! Timestamps are stored as RFC 3339 with nanoseconds and a `Z` suffix, so
//! text order equals time order and values round-trip exactly.

use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::Value;
use uuid::Uuid;

use robotape_contracts::{
    error::{RobotapeError, RobotapeResult},
    filter::TapeFilter,
    step::{Step, StepMetadata, StepType},
    tape::{Tape, TapeId, TapeMetadata},
};

use crate::to_storage_err;

// ── Encoding ──────────────────────────────────────────────────────────────────

fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(s: &str) -> RobotapeResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| to_storage_err(format!("bad timestamp '{s}': {e}")))
}

fn parse_uuid(s: &str) -> RobotapeResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| to_storage_err(format!("bad id '{s}': {e}")))
}

// ── Writes ────────────────────────────────────────────────────────────────────

/// Upsert the tape row and replace its steps with the tape's current ones.
///
/// Runs in one transaction: either the whole tape lands or nothing changes.
pub fn save_tape(conn: &Connection, tape: &Tape) -> RobotapeResult<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("save_tape begin: {e}")))?;

    match save_tape_inner(&tx, tape) {
        Ok(()) => {
            tx.commit()
                .map_err(|e| to_storage_err(format!("save_tape commit: {e}")))?;
            Ok(())
        }
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

fn save_tape_inner(conn: &Connection, tape: &Tape) -> RobotapeResult<()> {
    let meta = &tape.metadata;
    let tape_id = meta.id.to_string();
    let tags = serde_json::to_string(&meta.tags).map_err(|e| to_storage_err(e.to_string()))?;

    conn.execute(
        "INSERT INTO tapes (id, parent_id, author, created_at, tags)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
            parent_id  = excluded.parent_id,
            author     = excluded.author,
            created_at = excluded.created_at,
            tags       = excluded.tags",
        params![
            tape_id,
            meta.parent_id.map(|p| p.to_string()),
            meta.author,
            fmt_ts(&meta.created_at),
            tags,
        ],
    )
    .map_err(|e| to_storage_err(format!("save tape '{tape_id}': {e}")))?;

    conn.execute("DELETE FROM steps WHERE tape_id = ?1", params![tape_id])
        .map_err(|e| to_storage_err(format!("clear steps of '{tape_id}': {e}")))?;

    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO steps (
                tape_id, seq, id, step_type, content, agent, node, timestamp, prompt_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    for (seq, step) in tape.steps().iter().enumerate() {
        let content =
            serde_json::to_string(&step.content).map_err(|e| to_storage_err(e.to_string()))?;
        stmt.execute(params![
            tape_id,
            seq as i64,
            step.metadata.id.to_string(),
            step.step_type.as_str(),
            content,
            step.metadata.agent,
            step.metadata.node,
            fmt_ts(&step.metadata.timestamp),
            step.metadata.prompt_id,
        ])
        .map_err(|e| to_storage_err(format!("save step {seq} of '{tape_id}': {e}")))?;
    }
    Ok(())
}

/// Delete a childless tape and its steps.
pub fn delete_tape(conn: &Connection, id: &TapeId) -> RobotapeResult<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("delete_tape begin: {e}")))?;

    match delete_tape_inner(&tx, id) {
        Ok(()) => {
            tx.commit()
                .map_err(|e| to_storage_err(format!("delete_tape commit: {e}")))?;
            Ok(())
        }
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

fn delete_tape_inner(conn: &Connection, id: &TapeId) -> RobotapeResult<()> {
    if parent_of(conn, id)?.is_none() {
        return Err(RobotapeError::TapeNotFound {
            tape_id: id.to_string(),
        });
    }
    if !children_of(conn, id)?.is_empty() {
        return Err(to_storage_err(format!("tape '{id}' still has children")));
    }
    let tape_id = id.to_string();
    conn.execute("DELETE FROM steps WHERE tape_id = ?1", params![tape_id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute("DELETE FROM tapes WHERE id = ?1", params![tape_id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

// ── Reads ─────────────────────────────────────────────────────────────────────

/// The tape with steps in append order, or `None` if absent.
pub fn load_tape(conn: &Connection, id: &TapeId) -> RobotapeResult<Option<Tape>> {
    let row = conn
        .query_row(
            "SELECT parent_id, author, created_at, tags FROM tapes WHERE id = ?1",
            params![id.to_string()],
            |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()
        .map_err(|e| to_storage_err(format!("load tape '{id}': {e}")))?;

    let Some((parent_id, author, created_at, tags)) = row else {
        return Ok(None);
    };

    let tags: BTreeSet<String> = serde_json::from_str(&tags)
        .map_err(|e| to_storage_err(format!("bad tags on '{id}': {e}")))?;
    let metadata = TapeMetadata {
        id: *id,
        parent_id: parent_id.as_deref().map(parse_uuid).transpose()?.map(TapeId),
        author,
        created_at: parse_ts(&created_at)?,
        tags,
    };
    let steps = load_steps(conn, id)?;
    Ok(Some(Tape::from_parts(metadata, steps)))
}

struct StepRow {
    id: String,
    step_type: String,
    content: String,
    agent: String,
    node: String,
    timestamp: String,
    prompt_id: Option<String>,
}

impl StepRow {
    fn into_step(self) -> RobotapeResult<Step> {
        let content: Value = serde_json::from_str(&self.content)
            .map_err(|e| to_storage_err(format!("bad content on step '{}': {e}", self.id)))?;
        Ok(Step {
            step_type: StepType::new(self.step_type),
            content,
            metadata: StepMetadata {
                id: parse_uuid(&self.id)?,
                agent: self.agent,
                node: self.node,
                timestamp: parse_ts(&self.timestamp)?,
                prompt_id: self.prompt_id,
            },
        })
    }
}

fn load_steps(conn: &Connection, tape_id: &TapeId) -> RobotapeResult<Vec<Step>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT id, step_type, content, agent, node, timestamp, prompt_id
             FROM steps WHERE tape_id = ?1 ORDER BY seq",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let rows = stmt
        .query_map(params![tape_id.to_string()], |row| {
            Ok(StepRow {
                id: row.get(0)?,
                step_type: row.get(1)?,
                content: row.get(2)?,
                agent: row.get(3)?,
                node: row.get(4)?,
                timestamp: row.get(5)?,
                prompt_id: row.get(6)?,
            })
        })
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(format!("load steps of '{tape_id}': {e}")))?;

    rows.into_iter().map(StepRow::into_step).collect()
}

/// `None` if the tape is absent, otherwise its parent link.
pub fn parent_of(conn: &Connection, id: &TapeId) -> RobotapeResult<Option<Option<TapeId>>> {
    let row: Option<Option<String>> = conn
        .query_row(
            "SELECT parent_id FROM tapes WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;

    match row {
        None => Ok(None),
        Some(None) => Ok(Some(None)),
        Some(Some(parent)) => Ok(Some(Some(TapeId(parse_uuid(&parent)?)))),
    }
}

/// Tapes whose parent is `id`, oldest first. A self-parented tape is not its
/// own child.
pub fn children_of(conn: &Connection, id: &TapeId) -> RobotapeResult<Vec<TapeId>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT id FROM tapes
             WHERE parent_id = ?1 AND id <> ?1
             ORDER BY created_at, id",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let ids = stmt
        .query_map(params![id.to_string()], |row| row.get::<_, String>(0))
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    ids.iter().map(|s| parse_uuid(s).map(TapeId)).collect()
}

/// Every tape matching all constraints of `filter`, oldest first.
///
/// Agent and node match when at least one step carries the value; tags match
/// when every requested tag is on the tape.
pub fn search_tapes(conn: &Connection, filter: &TapeFilter) -> RobotapeResult<Vec<Tape>> {
    let mut sql = String::from("SELECT t.id FROM tapes t WHERE 1 = 1");
    let mut values: Vec<&str> = Vec::new();

    if let Some(author) = &filter.author {
        values.push(author);
        sql.push_str(&format!(" AND t.author = ?{}", values.len()));
    }
    if let Some(agent) = &filter.agent {
        values.push(agent);
        sql.push_str(&format!(
            " AND EXISTS (SELECT 1 FROM steps s WHERE s.tape_id = t.id AND s.agent = ?{})",
            values.len()
        ));
    }
    if let Some(node) = &filter.node {
        values.push(node);
        sql.push_str(&format!(
            " AND EXISTS (SELECT 1 FROM steps s WHERE s.tape_id = t.id AND s.node = ?{})",
            values.len()
        ));
    }
    for tag in &filter.tags {
        values.push(tag);
        sql.push_str(&format!(
            " AND EXISTS (SELECT 1 FROM json_each(t.tags) j WHERE j.value = ?{})",
            values.len()
        ));
    }
    sql.push_str(" ORDER BY t.created_at, t.id");

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| to_storage_err(format!("search_tapes prepare: {e}")))?;
    let ids = stmt
        .query_map(params_from_iter(values.iter()), |row| row.get::<_, String>(0))
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut tapes = Vec::with_capacity(ids.len());
    for id in ids {
        let id = TapeId(parse_uuid(&id)?);
        if let Some(tape) = load_tape(conn, &id)? {
            tapes.push(tape);
        }
    }
    Ok(tapes)
}

/// Number of stored tapes.
pub fn count_tapes(conn: &Connection) -> RobotapeResult<usize> {
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM tapes", [], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(n as usize)
}

//! # robotape-store
//!
//! `TapeStore` implementations for the robotape runtime.
//!
//! - `MemoryTapeStore` keeps tapes in a map; for tests and short-lived runs.
//! - `SqliteTapeStore` persists tapes and steps in two tables and answers
//!   lineage and search queries in SQL.
//!
//! Both enforce the same rules: a tape can only name a parent the store has
//! already seen, re-saving a tape replaces its stored steps with the current
//! ones, and a tape with children cannot be deleted.

pub mod lineage;
pub mod memory;
pub mod sqlite;

pub use memory::MemoryTapeStore;
pub use sqlite::SqliteTapeStore;

use robotape_contracts::error::RobotapeError;

/// Map any backend failure to `RobotapeError::Storage`.
pub(crate) fn to_storage_err(reason: impl Into<String>) -> RobotapeError {
    RobotapeError::Storage {
        reason: reason.into(),
    }
}

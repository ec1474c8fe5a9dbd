//! Schema migrations for the SQLite document store.
//!
//! Each step is guarded by `PRAGMA user_version`, so reopening a file only
//! applies what is missing.

pub mod v001_initial;

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Schema version this build expects.
const CURRENT_VERSION: u32 = 1;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema v{current} is newer than supported v{CURRENT_VERSION}"
        )));
    }

    if current < 1 {
        tracing::info!(from = current, "applying migration v001_initial");
        v001_initial::up(conn).map_err(|e| StoreError::Migration(e.to_string()))?;
        conn.pragma_update(None, "user_version", 1)?;
    }

    Ok(())
}

//! v001 -- Initial schema creation.
//!
//! Creates the `documents` table holding every collection and the single-row
//! `server_clock` table backing monotonic server timestamps.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Documents (all collections)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS documents (
    path TEXT NOT NULL,                -- collection path, e.g. rooms/ROOM1/messages
    id   TEXT NOT NULL,                -- document id within the collection
    seq  INTEGER NOT NULL,             -- arrival order across the store
    data TEXT NOT NULL,                -- JSON object

    PRIMARY KEY (path, id)
);

CREATE INDEX IF NOT EXISTS idx_documents_path_seq ON documents(path, seq);

-- ----------------------------------------------------------------
-- Server clock
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS server_clock (
    id      INTEGER PRIMARY KEY CHECK (id = 1),
    last_ms INTEGER NOT NULL            -- last issued timestamp, Unix millis
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}

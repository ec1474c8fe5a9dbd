//! SQLite connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! migrations are run before any other operation. Several processes may open
//! the same file; each sees the others' commits through
//! [`Database::data_version`].

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::migrations;

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the default database in the platform data directory:
    /// - Linux:   `~/.local/share/emojichat/emojichat.db`
    /// - macOS:   `~/Library/Application Support/com.emojichat.emojichat/emojichat.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\emojichat\emojichat\data\emojichat.db`
    pub fn new() -> Result<Self> {
        let path = Self::default_path()?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        tracing::info!(path = %path.display(), "opening database");

        Self::open_at(&path)
    }

    pub fn default_path() -> Result<PathBuf> {
        let project_dirs =
            ProjectDirs::from("com", "emojichat", "emojichat").ok_or(StoreError::NoDataDir)?;
        Ok(project_dirs.data_dir().join("emojichat.db"))
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        migrations::run_migrations(&conn)?;

        Ok(Self { conn })
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Changes whenever *another* connection commits to the file.
    pub fn data_version(&self) -> Result<i64> {
        Ok(self
            .conn
            .pragma_query_value(None, "data_version", |row| row.get(0))?)
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        let db = Database::open_at(&path).expect("should open");
        assert!(db.path().is_some());
    }

    #[test]
    fn data_version_tracks_other_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.db");

        let a = Database::open_at(&path).unwrap();
        let b = Database::open_at(&path).unwrap();
        let before = a.data_version().unwrap();

        b.conn()
            .execute(
                "INSERT INTO documents (path, id, seq, data) VALUES ('p', 'x', 1, '{}')",
                [],
            )
            .unwrap();

        assert_ne!(a.data_version().unwrap(), before);
    }
}

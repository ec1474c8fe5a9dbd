use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde_json::{Map, Value};

use crate::database::Database;
use crate::error::Result;
use crate::models::{
    apply_mode, next_server_time, stamp_fields, CollectionPath, DocumentId, DocumentWrite,
    StoredDocument, WriteMode,
};

impl Database {
    /// Apply one write atomically. When `stamp` is false the server-stamped
    /// fields are written as null and filled later by another stamped write.
    pub fn apply_write(
        &mut self,
        path: &CollectionPath,
        id: &DocumentId,
        write: &DocumentWrite,
        mode: WriteMode,
        stamp: bool,
    ) -> Result<()> {
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: Option<(i64, String)> = tx
            .query_row(
                "SELECT seq, data FROM documents WHERE path = ?1 AND id = ?2",
                params![path.as_str(), id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (seq, current) = match existing {
            Some((seq, data)) => (seq, Some(serde_json::from_str::<Map<String, Value>>(&data)?)),
            None => {
                let seq: i64 =
                    tx.query_row("SELECT COALESCE(MAX(seq), 0) + 1 FROM documents", [], |row| {
                        row.get(0)
                    })?;
                (seq, None)
            }
        };

        let mut data = apply_mode(current, &write.fields, mode);
        let at = if stamp {
            Some(advance_clock(&tx, Utc::now())?)
        } else {
            None
        };
        stamp_fields(&mut data, &write.server_timestamps, at);

        tx.execute(
            "INSERT INTO documents (path, id, seq, data) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(path, id) DO UPDATE SET data = excluded.data",
            params![
                path.as_str(),
                id.as_str(),
                seq,
                serde_json::to_string(&data)?
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// All documents of a collection in arrival order.
    pub fn load_collection(&self, path: &CollectionPath) -> Result<Vec<StoredDocument>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, seq, data FROM documents
             WHERE path = ?1
             ORDER BY seq ASC",
        )?;

        let rows = stmt.query_map(params![path.as_str()], |row| {
            let id: String = row.get(0)?;
            let seq: i64 = row.get(1)?;
            let data: String = row.get(2)?;
            Ok((id, seq, data))
        })?;

        let mut documents = Vec::new();
        for row in rows {
            let (id, seq, data) = row?;
            documents.push(row_to_document(id, seq, &data)?);
        }
        Ok(documents)
    }

    pub fn get_document(
        &self,
        path: &CollectionPath,
        id: &DocumentId,
    ) -> Result<Option<StoredDocument>> {
        let row: Option<(i64, String)> = self
            .conn()
            .query_row(
                "SELECT seq, data FROM documents WHERE path = ?1 AND id = ?2",
                params![path.as_str(), id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        row.map(|(seq, data)| row_to_document(id.0.clone(), seq, &data))
            .transpose()
    }
}

fn row_to_document(id: String, seq: i64, data: &str) -> Result<StoredDocument> {
    Ok(StoredDocument {
        id: DocumentId(id),
        data: serde_json::from_str(data)?,
        seq: u64::try_from(seq).unwrap_or_default(),
    })
}

/// Issue the next server timestamp and persist it, inside the caller's
/// transaction so concurrent processes never hand out the same value.
fn advance_clock(conn: &Connection, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let last: Option<i64> = conn
        .query_row("SELECT last_ms FROM server_clock WHERE id = 1", [], |row| {
            row.get(0)
        })
        .optional()?;

    let at = next_server_time(last, now);
    conn.execute(
        "INSERT INTO server_clock (id, last_ms) VALUES (1, ?1)
         ON CONFLICT(id) DO UPDATE SET last_ms = excluded.last_ms",
        params![at.timestamp_millis()],
    )?;
    Ok(at)
}

//! Document model shared by every backend.
//!
//! Documents are schemaless JSON objects grouped into collections. Typed
//! records live in `emojichat_shared::protocol` and are converted at the edge.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use emojichat_shared::constants::{ROOMS_COLLECTION, USERS_COLLECTION};
use emojichat_shared::types::RoomToken;

// ---------------------------------------------------------------------------
// Addressing
// ---------------------------------------------------------------------------

/// Logical collection path, e.g. `rooms/ROOM1/messages`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn room_messages(room: &RoomToken) -> Self {
        Self(format!("{ROOMS_COLLECTION}/{room}/messages"))
    }

    pub fn room_presence(room: &RoomToken) -> Self {
        Self(format!("{ROOMS_COLLECTION}/{room}/presence"))
    }

    pub fn users() -> Self {
        Self(USERS_COLLECTION.to_string())
    }

    /// Rebuild a path read back from storage.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store-assigned (or caller-chosen) document id, unique within a collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// The written fields become the whole document.
    Replace,
    /// Written fields overwrite their stored counterparts; all other stored
    /// fields are preserved.
    Merge,
}

/// Fields to write plus the fields the store must fill with its own clock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentWrite {
    pub fields: Map<String, Value>,
    pub server_timestamps: Vec<String>,
}

impl DocumentWrite {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            server_timestamps: Vec::new(),
        }
    }

    pub fn with_server_timestamp(mut self, field: &str) -> Self {
        self.server_timestamps.push(field.to_string());
        self
    }
}

/// Combine a stored body with incoming fields according to `mode`.
pub fn apply_mode(
    existing: Option<Map<String, Value>>,
    fields: &Map<String, Value>,
    mode: WriteMode,
) -> Map<String, Value> {
    match (mode, existing) {
        (WriteMode::Merge, Some(mut current)) => {
            for (key, value) in fields {
                current.insert(key.clone(), value.clone());
            }
            current
        }
        _ => fields.clone(),
    }
}

/// Set each server-stamped field to `at`, or to null while unacknowledged.
pub fn stamp_fields(data: &mut Map<String, Value>, fields: &[String], at: Option<DateTime<Utc>>) {
    let value = match at {
        Some(ts) => Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
        None => Value::Null,
    };
    for field in fields {
        data.insert(field.clone(), value.clone());
    }
}

/// Next value of the store clock: wall time, but always at least 1 ms after
/// the previous stamp so server timestamps are strictly increasing.
pub fn next_server_time(last_ms: Option<i64>, now: DateTime<Utc>) -> DateTime<Utc> {
    let now_ms = now.timestamp_millis();
    let ms = match last_ms {
        Some(last) if last >= now_ms => last + 1,
        _ => now_ms,
    };
    Utc.timestamp_millis_opt(ms).single().unwrap_or(now)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// A document as held by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: DocumentId,
    pub data: Map<String, Value>,
    /// Position in arrival order across the whole store.
    pub seq: u64,
}

impl StoredDocument {
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.data.clone()))
    }
}

/// The full content of one collection at one point in time, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub path: CollectionPath,
    pub documents: Vec<StoredDocument>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, id: &DocumentId) -> Option<&StoredDocument> {
        self.documents.iter().find(|doc| &doc.id == id)
    }
}

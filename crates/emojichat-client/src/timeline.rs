//! Message timeline rebuilt from full collection snapshots.
//!
//! Every snapshot replaces the view. Records are decoded with the room codec
//! and ordered by server timestamp; records the store has not stamped yet go
//! last, in the order they were received.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use emojichat_shared::protocol::MessageRecord;
use emojichat_shared::{Codec, UserId};
use emojichat_store::{DocumentId, Snapshot};

/// One rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEntry {
    pub id: DocumentId,
    pub user_id: UserId,
    pub nickname: String,
    /// Decoded body, or the raw token when it does not decode
    pub content: String,
    pub timestamp: Option<DateTime<Utc>>,
    /// Inserted locally after a write and not yet seen in a snapshot
    pub local: bool,
}

impl TimelineEntry {
    /// Not yet stamped by the store.
    pub fn is_pending(&self) -> bool {
        self.local || self.timestamp.is_none()
    }
}

/// Rebuild the view from `snapshot`.
///
/// Local entries from `current` whose id is not in the snapshot are carried
/// over; everything else from `current` is discarded.
pub fn reconcile(
    current: &[TimelineEntry],
    snapshot: &Snapshot,
    codec: &Codec,
) -> Vec<TimelineEntry> {
    let mut entries: Vec<TimelineEntry> = Vec::with_capacity(snapshot.len());

    for doc in &snapshot.documents {
        let record: MessageRecord = match doc.parse() {
            Ok(record) => record,
            Err(e) => {
                warn!(id = %doc.id, error = %e, "skipping malformed message record");
                continue;
            }
        };
        let Some(body) = record.body() else {
            warn!(id = %doc.id, "skipping message record without a body");
            continue;
        };
        let content = codec.decode(body);
        entries.push(TimelineEntry {
            id: doc.id.clone(),
            user_id: record.user_id,
            nickname: record.user_nickname,
            content,
            timestamp: record.timestamp,
            local: false,
        });
    }

    entries.extend(
        current
            .iter()
            .filter(|entry| entry.local && snapshot.get(&entry.id).is_none())
            .cloned(),
    );

    // Stable, so unstamped records keep their receipt order.
    entries.sort_by_key(|entry| (entry.timestamp.is_none(), entry.timestamp));
    entries
}

/// The current room's message view.
#[derive(Debug, Default, Clone)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_snapshot(&mut self, snapshot: &Snapshot, codec: &Codec) {
        self.entries = reconcile(&self.entries, snapshot, codec);
        debug!(
            path = %snapshot.path,
            records = snapshot.len(),
            entries = self.entries.len(),
            "timeline rebuilt"
        );
    }

    /// Show a just-written message until the store reports it back.
    pub fn insert_pending(&mut self, entry: TimelineEntry) {
        if self.entries.iter().any(|e| e.id == entry.id) {
            return;
        }
        self.entries.push(TimelineEntry {
            local: true,
            timestamp: None,
            ..entry
        });
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use emojichat_shared::RoomToken;
    use emojichat_store::{CollectionPath, StoredDocument};
    use serde_json::{json, Map, Value};

    fn room() -> RoomToken {
        RoomToken::parse("ROOM1").unwrap()
    }

    fn codec() -> Codec {
        Codec::for_room(&room())
    }

    fn ts(secs: i64) -> Value {
        json!(Utc.timestamp_opt(secs, 0).unwrap())
    }

    fn doc(id: &str, seq: u64, body: &str, timestamp: Value) -> StoredDocument {
        let data = json!({
            "userId": "u1",
            "userNickname": "whale",
            "cipherText": codec().encode(body),
            "timestamp": timestamp,
        });
        let Value::Object(data) = data else {
            unreachable!()
        };
        StoredDocument {
            id: DocumentId::from(id),
            data,
            seq,
        }
    }

    fn snapshot(documents: Vec<StoredDocument>) -> Snapshot {
        Snapshot {
            path: CollectionPath::room_messages(&room()),
            documents,
        }
    }

    #[test]
    fn test_orders_by_timestamp_with_nulls_last() {
        let snap = snapshot(vec![
            doc("a", 1, "🚀", ts(30)),
            doc("b", 2, "🔥", ts(10)),
            doc("c", 3, "💎", Value::Null),
            doc("d", 4, "🐳", ts(20)),
        ]);

        let view = reconcile(&[], &snap, &codec());
        let ids: Vec<_> = view.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["b", "d", "a", "c"]);
        assert_eq!(view[0].content, "🔥");
    }

    #[test]
    fn test_nulls_keep_receipt_order() {
        let snap = snapshot(vec![
            doc("x", 1, "1️⃣", Value::Null),
            doc("y", 2, "2️⃣", Value::Null),
            doc("z", 3, "🚀", ts(5)),
        ]);
        let ids: Vec<_> = reconcile(&[], &snap, &codec())
            .into_iter()
            .map(|e| e.id.0)
            .collect();
        assert_eq!(ids, ["z", "x", "y"]);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let snap = snapshot(vec![
            doc("a", 1, "🚀", ts(30)),
            doc("b", 2, "🔥", Value::Null),
            doc("c", 3, "💎", ts(10)),
        ]);
        let once = reconcile(&[], &snap, &codec());
        let twice = reconcile(&once, &snap, &codec());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_previous_view_is_discarded() {
        let first = reconcile(&[], &snapshot(vec![doc("a", 1, "🚀", ts(1))]), &codec());
        let second = reconcile(&first, &snapshot(vec![doc("b", 2, "🔥", ts(2))]), &codec());
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id.as_str(), "b");
    }

    #[test]
    fn test_legacy_plaintext_falls_back_to_raw() {
        let mut data = Map::new();
        data.insert("userId".into(), json!("u2"));
        data.insert("userNickname".into(), json!("old"));
        data.insert("content".into(), json!("🚀"));
        let snap = snapshot(vec![StoredDocument {
            id: DocumentId::from("legacy"),
            data,
            seq: 1,
        }]);

        let view = reconcile(&[], &snap, &codec());
        assert_eq!(view[0].content, "🚀");
        assert!(view[0].is_pending());
    }

    #[test]
    fn test_record_with_token_and_legacy_content_is_kept() {
        let mut mixed = doc("mixed", 1, "💎", ts(1));
        mixed.data.insert("content".into(), json!("🚀"));
        let view = reconcile(&[], &snapshot(vec![mixed]), &codec());
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].content, "💎");
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let mut data = Map::new();
        data.insert("unexpected".into(), json!(true));
        let snap = snapshot(vec![
            StoredDocument {
                id: DocumentId::from("junk"),
                data,
                seq: 1,
            },
            doc("ok", 2, "🚀", ts(1)),
        ]);
        let view = reconcile(&[], &snap, &codec());
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id.as_str(), "ok");
    }

    #[test]
    fn test_pending_entry_is_superseded() {
        let mut timeline = Timeline::new();
        timeline.insert_pending(TimelineEntry {
            id: DocumentId::from("mine"),
            user_id: UserId("u1".into()),
            nickname: "whale".into(),
            content: "🚀".into(),
            timestamp: None,
            local: false,
        });
        assert!(timeline.entries()[0].local);

        // Snapshot raced ahead of the write: the local copy stays.
        timeline.apply_snapshot(&snapshot(vec![doc("other", 1, "🔥", ts(1))]), &codec());
        assert_eq!(timeline.len(), 2);
        assert!(timeline.entries()[1].local);

        timeline.apply_snapshot(
            &snapshot(vec![doc("other", 1, "🔥", ts(1)), doc("mine", 2, "🚀", ts(2))]),
            &codec(),
        );
        assert_eq!(timeline.len(), 2);
        assert!(timeline.entries().iter().all(|e| !e.local));
    }
}

//! Room roster built from presence snapshots.
//!
//! Stored records are never expired. Staleness is judged at view time from
//! `lastSeen`.

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use emojichat_shared::protocol::{PresenceRecord, PresenceUpdate, PRESENCE_LAST_SEEN_FIELD};
use emojichat_shared::{Nickname, PresenceStatus, UserId};
use emojichat_store::{DocumentWrite, Snapshot};

/// One participant as last reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub user_id: UserId,
    pub nickname: String,
    pub status: PresenceStatus,
    pub last_seen: Option<DateTime<Utc>>,
}

impl RosterEntry {
    /// Status as shown to the user. A participant not heard from within
    /// `stale_after` counts as offline; an unstamped record is still fresh.
    pub fn effective_status(&self, now: DateTime<Utc>, stale_after: Duration) -> PresenceStatus {
        match self.last_seen {
            Some(seen) if now - seen > stale_after => PresenceStatus::Offline,
            _ => self.status,
        }
    }
}

/// Full roster of one room, in the order the store returned it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterView {
    entries: Vec<RosterEntry>,
}

impl RosterView {
    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn get(&self, user_id: &UserId) -> Option<&RosterEntry> {
        self.entries.iter().find(|e| &e.user_id == user_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Participants not shown as offline at `now`.
    pub fn active(&self, now: DateTime<Utc>, stale_after: Duration) -> usize {
        self.entries
            .iter()
            .filter(|e| e.effective_status(now, stale_after) != PresenceStatus::Offline)
            .count()
    }
}

#[derive(Debug, Default)]
pub struct PresenceTracker {
    roster: RosterView,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the roster with the content of `snapshot`.
    pub fn on_snapshot(&mut self, snapshot: &Snapshot) -> &RosterView {
        let mut entries = Vec::with_capacity(snapshot.len());
        for doc in &snapshot.documents {
            let record: PresenceRecord = match doc.parse() {
                Ok(record) => record,
                Err(e) => {
                    warn!(id = %doc.id, error = %e, "skipping malformed presence record");
                    continue;
                }
            };
            entries.push(RosterEntry {
                // Presence documents are keyed by user id.
                user_id: UserId(doc.id.0.clone()),
                nickname: record.nickname,
                status: record.status,
                last_seen: record.last_seen,
            });
        }

        debug!(path = %snapshot.path, participants = entries.len(), "roster rebuilt");
        self.roster = RosterView { entries };
        &self.roster
    }

    pub fn roster(&self) -> &RosterView {
        &self.roster
    }

    pub fn clear(&mut self) {
        self.roster = RosterView::default();
    }
}

/// The merge write that publishes our own status. Only `nickname`, `status`
/// and the server-stamped `lastSeen` are touched.
pub fn presence_write(
    nickname: &Nickname,
    status: PresenceStatus,
) -> Result<DocumentWrite, serde_json::Error> {
    let fields: Map<String, Value> = PresenceUpdate {
        nickname: nickname.as_str(),
        status,
    }
    .to_fields()?;
    Ok(DocumentWrite::new(fields).with_server_timestamp(PRESENCE_LAST_SEEN_FIELD))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use emojichat_shared::RoomToken;
    use emojichat_store::{CollectionPath, DocumentId, StoredDocument};
    use serde_json::json;

    fn doc(id: &str, value: Value) -> StoredDocument {
        let Value::Object(data) = value else {
            unreachable!()
        };
        StoredDocument {
            id: DocumentId::from(id),
            data,
            seq: 0,
        }
    }

    fn snapshot(documents: Vec<StoredDocument>) -> Snapshot {
        Snapshot {
            path: CollectionPath::room_presence(&RoomToken::parse("ROOM1").unwrap()),
            documents,
        }
    }

    #[test]
    fn test_snapshot_replaces_roster() {
        let mut tracker = PresenceTracker::new();
        tracker.on_snapshot(&snapshot(vec![
            doc("u1", json!({"nickname": "ab", "status": "online"})),
            doc("u2", json!({"nickname": "cd", "status": "away"})),
        ]));
        assert_eq!(tracker.roster().len(), 2);

        let roster = tracker.on_snapshot(&snapshot(vec![doc(
            "u2",
            json!({"nickname": "cd", "status": "offline"}),
        )]));
        assert_eq!(roster.len(), 1);
        let entry = roster.get(&UserId("u2".into())).unwrap();
        assert_eq!(entry.status, PresenceStatus::Offline);
    }

    #[test]
    fn test_bad_records_are_skipped() {
        let mut tracker = PresenceTracker::new();
        let roster = tracker.on_snapshot(&snapshot(vec![
            doc("u1", json!({"nickname": "ab", "status": "dancing"})),
            doc("u2", json!({"nickname": "cd", "status": "online"})),
        ]));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_stale_participant_shows_offline() {
        let seen = Utc.timestamp_opt(1_000, 0).unwrap();
        let entry = RosterEntry {
            user_id: UserId("u1".into()),
            nickname: "ab".into(),
            status: PresenceStatus::Online,
            last_seen: Some(seen),
        };
        let stale = Duration::seconds(90);

        assert_eq!(
            entry.effective_status(seen + Duration::seconds(30), stale),
            PresenceStatus::Online
        );
        assert_eq!(
            entry.effective_status(seen + Duration::seconds(91), stale),
            PresenceStatus::Offline
        );

        let unstamped = RosterEntry {
            last_seen: None,
            ..entry
        };
        assert_eq!(
            unstamped.effective_status(seen + Duration::days(1), stale),
            PresenceStatus::Online
        );
    }

    #[test]
    fn test_presence_write_touches_three_fields() {
        let nick = Nickname::parse("whale").unwrap();
        let write = presence_write(&nick, PresenceStatus::Away).unwrap();
        assert_eq!(write.fields.get("nickname"), Some(&json!("whale")));
        assert_eq!(write.fields.get("status"), Some(&json!("away")));
        assert_eq!(write.fields.len(), 2);
        assert_eq!(write.server_timestamps, [PRESENCE_LAST_SEEN_FIELD]);
    }
}

//! Document schemas exchanged through the real-time store.
//!
//! Field names are camelCase so documents written by the browser client and by
//! this workspace share one layout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{Nickname, PresenceStatus, UserId};

/// Server-stamped field on message documents
pub const MESSAGE_TIMESTAMP_FIELD: &str = "timestamp";

/// Server-stamped field on presence documents
pub const PRESENCE_LAST_SEEN_FIELD: &str = "lastSeen";

/// Server-stamped field on profile documents
pub const PROFILE_LAST_UPDATE_FIELD: &str = "lastUpdate";

/// A chat message as persisted. New bodies are always codec tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub user_id: UserId,
    pub user_nickname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cipher_text: Option<String>,
    /// Plaintext body of older documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// `None` until the store acknowledges the write
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl MessageRecord {
    pub fn new(user_id: UserId, nickname: &Nickname, cipher_text: String) -> Self {
        Self {
            user_id,
            user_nickname: nickname.as_str().to_string(),
            cipher_text: Some(cipher_text),
            content: None,
            timestamp: None,
        }
    }

    /// The stored body: the token when present, else the legacy plaintext.
    pub fn body(&self) -> Option<&str> {
        self.cipher_text.as_deref().or(self.content.as_deref())
    }

    /// Fields for a new message write; the timestamp is left to the store.
    pub fn to_fields(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let mut fields = to_object(self)?;
        fields.remove(MESSAGE_TIMESTAMP_FIELD);
        Ok(fields)
    }
}

/// One participant's presence in one room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRecord {
    /// Not written by status publishes; the document id is authoritative
    #[serde(default)]
    pub user_id: UserId,
    pub nickname: String,
    pub status: PresenceStatus,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

/// The subset of a presence document touched by a status publish. Every other
/// stored field is left alone by the merge.
#[derive(Debug, Clone, Serialize)]
pub struct PresenceUpdate<'a> {
    pub nickname: &'a str,
    pub status: PresenceStatus,
}

impl PresenceUpdate<'_> {
    pub fn to_fields(&self) -> Result<Map<String, Value>, serde_json::Error> {
        to_object(self)
    }
}

/// Global profile document, keyed by user id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: UserId,
    pub nickname: String,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn new(user_id: UserId, nickname: &Nickname) -> Self {
        Self {
            user_id,
            nickname: nickname.as_str().to_string(),
            last_update: None,
        }
    }

    pub fn to_fields(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let mut fields = to_object(self)?;
        fields.remove(PROFILE_LAST_UPDATE_FIELD);
        Ok(fields)
    }
}

fn to_object<T: Serialize>(value: &T) -> Result<Map<String, Value>, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(serde::ser::Error::custom(format!(
            "expected an object, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_fields_are_camel_case() {
        let nick = Nickname::parse("whale").unwrap();
        let record = MessageRecord::new(UserId("u1".into()), &nick, "AA==".into());
        let fields = record.to_fields().unwrap();

        assert_eq!(fields.get("userId"), Some(&json!("u1")));
        assert_eq!(fields.get("userNickname"), Some(&json!("whale")));
        assert_eq!(fields.get("cipherText"), Some(&json!("AA==")));
        assert!(!fields.contains_key(MESSAGE_TIMESTAMP_FIELD));
        assert!(!fields.contains_key("content"));
    }

    #[test]
    fn test_legacy_content_field_accepted() {
        let doc = json!({
            "userId": "u2",
            "userNickname": "old",
            "content": "🚀",
            "timestamp": null,
        });
        let record: MessageRecord = serde_json::from_value(doc).unwrap();
        assert_eq!(record.body(), Some("🚀"));
        assert!(record.timestamp.is_none());
    }

    #[test]
    fn test_token_wins_over_legacy_content() {
        let doc = json!({
            "userId": "u2",
            "userNickname": "mixed",
            "cipherText": "AA==",
            "content": "🚀",
        });
        let record: MessageRecord = serde_json::from_value(doc).unwrap();
        assert_eq!(record.body(), Some("AA=="));
    }

    #[test]
    fn test_missing_body() {
        let doc = json!({"userId": "u2", "userNickname": "empty"});
        let record: MessageRecord = serde_json::from_value(doc).unwrap();
        assert_eq!(record.body(), None);
    }

    #[test]
    fn test_presence_update_only_touches_its_fields() {
        let update = PresenceUpdate {
            nickname: "whale",
            status: PresenceStatus::Away,
        };
        let fields = update.to_fields().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get("status"), Some(&json!("away")));
    }

    #[test]
    fn test_presence_record_parses_timestamp() {
        let doc = json!({
            "userId": "u3",
            "nickname": "n3",
            "status": "online",
            "lastSeen": "2024-01-01T00:00:00Z",
        });
        let record: PresenceRecord = serde_json::from_value(doc).unwrap();
        assert_eq!(record.status, PresenceStatus::Online);
        assert!(record.last_seen.is_some());
    }
}

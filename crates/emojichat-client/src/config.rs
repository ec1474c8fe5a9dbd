//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so the client starts with zero configuration.

use std::path::PathBuf;
use std::time::Duration;

use emojichat_shared::constants::{
    DEFAULT_HEARTBEAT_SECS, DEFAULT_POLL_MS, DEFAULT_PRESENCE_STALE_SECS,
};
use emojichat_shared::{RoomToken, UserId};

/// Where the local store keeps its documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// Platform data directory, `emojichat.db`.
    Default,
    /// Volatile, this process only.
    Memory,
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Env: `EMOJICHAT_DB_PATH` (`:memory:` for a volatile store)
    pub store: StoreLocation,

    /// Pins the client to one room and lets it join before a nickname is set.
    /// Env: `EMOJICHAT_ROOM`
    pub fixed_room: Option<RoomToken>,

    /// Reuse an earlier anonymous identity.
    /// Env: `EMOJICHAT_USER_ID`
    pub user_id: Option<UserId>,

    /// Env: `EMOJICHAT_HEARTBEAT_SECS`
    pub heartbeat: Duration,

    /// How often to check the database for other processes' writes.
    /// Env: `EMOJICHAT_POLL_MS`
    pub poll_interval: Duration,

    /// Participants silent for longer are shown offline.
    /// Env: `EMOJICHAT_PRESENCE_STALE_SECS`
    pub presence_stale_after: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            store: StoreLocation::Default,
            fixed_room: None,
            user_id: None,
            heartbeat: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_MS),
            presence_stale_after: Duration::from_secs(DEFAULT_PRESENCE_STALE_SECS),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("EMOJICHAT_DB_PATH") {
            config.store = match path.trim() {
                "" => StoreLocation::Default,
                ":memory:" => StoreLocation::Memory,
                other => StoreLocation::File(PathBuf::from(other)),
            };
        }

        if let Some(room) = lookup("EMOJICHAT_ROOM") {
            match RoomToken::parse(&room) {
                Ok(token) => config.fixed_room = Some(token),
                Err(e) => tracing::warn!(value = %room, error = %e, "Invalid EMOJICHAT_ROOM, ignoring"),
            }
        }

        if let Some(id) = lookup("EMOJICHAT_USER_ID") {
            let id = id.trim();
            if !id.is_empty() {
                config.user_id = Some(UserId(id.to_string()));
            }
        }

        if let Some(secs) = parse_positive(&lookup, "EMOJICHAT_HEARTBEAT_SECS") {
            config.heartbeat = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_positive(&lookup, "EMOJICHAT_POLL_MS") {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_positive(&lookup, "EMOJICHAT_PRESENCE_STALE_SECS") {
            config.presence_stale_after = Duration::from_secs(secs);
        }

        config
    }

    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.presence_stale_after)
            .unwrap_or_else(|_| chrono::Duration::seconds(DEFAULT_PRESENCE_STALE_SECS as i64))
    }
}

fn parse_positive(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let value = lookup(key)?;
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            tracing::warn!(key, value = %value, "Invalid duration, using default");
            None
        }
    }
}

//! Plain-text rendering of views for the terminal.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Local, Utc};

use emojichat_shared::constants::QUICK_EMOJIS;
use emojichat_shared::{PresenceStatus, UserId};
use emojichat_store::DocumentId;

use crate::notices::{Notice, NoticeKind};
use crate::presence::RosterView;
use crate::timeline::TimelineEntry;

const PALETTE_COLUMNS: usize = 8;

pub const HELP: &str = "\
Commands:
  /nick <name>      set your nickname (2-15 characters)
  /join <room>      join a room (up to 20 characters)
  /leave            leave the current room
  /status <s>       online, away or offline
  /who              list participants
  /palette          show the quick emoji palette
  /pick <n>         add palette emoji n to the draft
  /send             send the draft
  /transfer         send $100 💰
  /help             show this help
  /quit             leave and exit
Anything else is sent as a message. Only emojis allowed!";

pub fn format_time(timestamp: Option<DateTime<Utc>>) -> String {
    match timestamp {
        Some(ts) => ts.with_timezone(&Local).format("%H:%M").to_string(),
        None => "now".to_string(),
    }
}

pub fn format_entry(entry: &TimelineEntry, me: &UserId) -> String {
    let sender = if &entry.user_id == me {
        "You"
    } else {
        entry.nickname.as_str()
    };
    let time = if entry.is_pending() {
        format_time(None)
    } else {
        format_time(entry.timestamp)
    };
    format!("[{time}] {sender}: {}", entry.content)
}

pub fn format_notice(notice: &Notice) -> String {
    match notice.kind {
        NoticeKind::Success => format!("✅ {}", notice.message),
        NoticeKind::Error => format!("⚠️ {}", notice.message),
    }
}

fn status_marker(status: PresenceStatus) -> &'static str {
    match status {
        PresenceStatus::Online => "🟢",
        PresenceStatus::Away => "🟡",
        PresenceStatus::Offline => "⚫",
    }
}

pub fn format_roster(
    roster: &RosterView,
    me: &UserId,
    now: DateTime<Utc>,
    stale_after: Duration,
) -> Vec<String> {
    if roster.is_empty() {
        return vec!["Nobody here yet.".to_string()];
    }

    let mut lines = vec![format!(
        "{} of {} participants active",
        roster.active(now, stale_after),
        roster.len()
    )];
    for entry in roster.entries() {
        let status = entry.effective_status(now, stale_after);
        let you = if &entry.user_id == me { " (you)" } else { "" };
        lines.push(format!(
            "  {} {}{you} {status}",
            status_marker(status),
            entry.nickname
        ));
    }
    lines
}

pub fn format_palette() -> Vec<String> {
    QUICK_EMOJIS
        .chunks(PALETTE_COLUMNS)
        .enumerate()
        .map(|(row, chunk)| {
            chunk
                .iter()
                .enumerate()
                .map(|(col, emoji)| format!("{:>2} {emoji}", row * PALETTE_COLUMNS + col + 1))
                .collect::<Vec<_>>()
                .join("  ")
        })
        .collect()
}

/// Remembers which messages were already printed so each snapshot only adds
/// the new ones to the scrollback.
#[derive(Debug, Default)]
pub struct TimelinePrinter {
    printed: HashSet<DocumentId>,
}

impl TimelinePrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh<'a>(&mut self, entries: &'a [TimelineEntry]) -> Vec<&'a TimelineEntry> {
        entries
            .iter()
            .filter(|entry| self.printed.insert(entry.id.clone()))
            .collect()
    }

    pub fn reset(&mut self) {
        self.printed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(id: &str, user: &str, timestamp: Option<DateTime<Utc>>) -> TimelineEntry {
        TimelineEntry {
            id: DocumentId::from(id),
            user_id: UserId(user.into()),
            nickname: "whale".into(),
            content: "🚀".into(),
            timestamp,
            local: false,
        }
    }

    #[test]
    fn test_own_messages_say_you() {
        let me = UserId("me".into());
        let ts = Utc.timestamp_opt(1_700_000_000, 0).single();
        assert!(format_entry(&entry("a", "me", ts), &me).contains("] You: 🚀"));
        assert!(format_entry(&entry("b", "other", ts), &me).contains("] whale: 🚀"));
    }

    #[test]
    fn test_pending_messages_say_now() {
        let me = UserId("me".into());
        assert_eq!(format_entry(&entry("a", "me", None), &me), "[now] You: 🚀");
    }

    #[test]
    fn test_printer_only_returns_new_entries() {
        let mut printer = TimelinePrinter::new();
        let first = vec![entry("a", "u", None)];
        assert_eq!(printer.fresh(&first).len(), 1);

        let second = vec![entry("a", "u", None), entry("b", "u", None)];
        let fresh = printer.fresh(&second);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].id.as_str(), "b");

        printer.reset();
        assert_eq!(printer.fresh(&second).len(), 2);
    }

    #[test]
    fn test_palette_numbers_every_entry() {
        let lines = format_palette();
        assert_eq!(lines.len(), QUICK_EMOJIS.len() / PALETTE_COLUMNS);
        assert!(lines[0].starts_with(" 1 "));
        assert!(lines.last().unwrap().contains(&QUICK_EMOJIS.len().to_string()));
    }
}

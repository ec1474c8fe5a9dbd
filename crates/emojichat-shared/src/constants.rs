/// Application name
pub const APP_NAME: &str = "Emoji Chat";

/// Nickname bounds, counted in characters after trimming
pub const NICKNAME_MIN_CHARS: usize = 2;
pub const NICKNAME_MAX_CHARS: usize = 15;

/// Maximum room token length in characters
pub const ROOM_TOKEN_MAX_CHARS: usize = 20;

/// Collection holding one profile document per user id
pub const USERS_COLLECTION: &str = "emoji_chat_users";

/// Prefix of the per-room collections (`rooms/{ROOM}/messages`, `rooms/{ROOM}/presence`)
pub const ROOMS_COLLECTION: &str = "rooms";

/// Body of the canned "send $100" transfer
pub const TRANSFER_BODY: &str = "💰💳💵💎";

/// Quick-select palette shown under the composer
pub const QUICK_EMOJIS: [&str; 32] = [
    "💰", "💎", "📈", "📉", "🏦", "💳", "💵", "💸",
    "🔒", "🔑", "🔗", "🤯", "💯", "🚀", "✨", "🧊",
    "🪙", "🟣", "☀️", "🐕", "🕯️", "🔶", "🌱", "🌊",
    "📱", "💻", "📞", "📧", "📡", "⛏️", "🤖", "🕶️",
];

/// Presence heartbeat interval in seconds
pub const DEFAULT_HEARTBEAT_SECS: u64 = 30;

/// A participant whose `lastSeen` is older than this is shown as offline
pub const DEFAULT_PRESENCE_STALE_SECS: u64 = 90;

/// Interval for picking up writes committed by other processes
pub const DEFAULT_POLL_MS: u64 = 500;

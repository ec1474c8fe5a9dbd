use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{NICKNAME_MAX_CHARS, NICKNAME_MIN_CHARS, ROOM_TOKEN_MAX_CHARS};
use crate::error::ValidationError;

// Opaque id handed out by the identity provider, stable for the session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Mint a fresh anonymous id.
    pub fn anonymous() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        let end = self.0.char_indices().nth(8).map(|(i, _)| i).unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A display name that passed validation: trimmed, 2 to 15 characters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Nickname(String);

impl Nickname {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let len = trimmed.chars().count();

        if len < NICKNAME_MIN_CHARS {
            return Err(ValidationError::NicknameTooShort);
        }
        if len > NICKNAME_MAX_CHARS {
            return Err(ValidationError::NicknameTooLong {
                max: NICKNAME_MAX_CHARS,
            });
        }
        if trimmed.chars().any(char::is_control) {
            return Err(ValidationError::NicknameInvalidChars);
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Nickname {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Room identifier, also used as the codec key. Never empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct RoomToken(String);

impl RoomToken {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let token = input.trim().to_uppercase();

        if token.is_empty() {
            return Err(ValidationError::EmptyRoom);
        }
        if token.chars().count() > ROOM_TOKEN_MAX_CHARS {
            return Err(ValidationError::RoomTooLong {
                max: ROOM_TOKEN_MAX_CHARS,
            });
        }

        Ok(Self(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    #[default]
    Online,
    Away,
    Offline,
}

impl PresenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Offline => "offline",
        }
    }
}

impl std::str::FromStr for PresenceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" => Ok(Self::Online),
            "away" => Ok(Self::Away),
            "offline" => Ok(Self::Offline),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

impl std::fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nickname_trimmed() {
        let nick = Nickname::parse(" ab ").unwrap();
        assert_eq!(nick.as_str(), "ab");
    }

    #[test]
    fn test_nickname_bounds() {
        assert_eq!(Nickname::parse("x"), Err(ValidationError::NicknameTooShort));
        assert_eq!(Nickname::parse("   "), Err(ValidationError::NicknameTooShort));
        assert!(Nickname::parse(&"a".repeat(15)).is_ok());
        assert!(matches!(
            Nickname::parse(&"a".repeat(16)),
            Err(ValidationError::NicknameTooLong { .. })
        ));
        assert!(Nickname::parse("a\u{7}b").is_err());
    }

    #[test]
    fn test_room_token_uppercased() {
        let room = RoomToken::parse(" room1 ").unwrap();
        assert_eq!(room.as_str(), "ROOM1");
    }

    #[test]
    fn test_room_token_rejects_empty_and_long() {
        assert_eq!(RoomToken::parse("  "), Err(ValidationError::EmptyRoom));
        assert!(RoomToken::parse(&"R".repeat(20)).is_ok());
        assert!(RoomToken::parse(&"R".repeat(21)).is_err());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("Away".parse::<PresenceStatus>(), Ok(PresenceStatus::Away));
        assert!("busy".parse::<PresenceStatus>().is_err());
    }
}

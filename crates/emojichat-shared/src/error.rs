use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Codec key must not be empty")]
    EmptyKey,

    #[error("Token is not valid base64")]
    InvalidBase64,

    #[error("Token does not carry a valid unit sequence")]
    InvalidEncoding,

    #[error("Decoded units are not valid UTF-16")]
    InvalidUtf16,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Nickname must be 2+ characters!")]
    NicknameTooShort,

    #[error("Nickname must be at most {max} characters")]
    NicknameTooLong { max: usize },

    #[error("Nickname contains control characters")]
    NicknameInvalidChars,

    #[error("Room name cannot be empty")]
    EmptyRoom,

    #[error("Room name must be at most {max} characters")]
    RoomTooLong { max: usize },
}

/// Why a message body was refused by the emoji-only rule.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRejection {
    #[error("Message cannot be empty!")]
    Empty,

    #[error("Only emojis allowed!")]
    NonEmoji,
}

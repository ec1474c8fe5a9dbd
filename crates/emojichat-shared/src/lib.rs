//! Types and pure logic shared by the store and the client: the room codec,
//! the emoji-only rule, domain identifiers and document schemas.

pub mod codec;
pub mod constants;
pub mod content;
pub mod error;
pub mod protocol;
pub mod types;

pub use codec::Codec;
pub use error::{CodecError, ContentRejection, ValidationError};
pub use types::{Nickname, PresenceStatus, RoomToken, UserId};

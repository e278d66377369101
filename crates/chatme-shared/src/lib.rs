// Domain types, errors and constants shared by the Chat Me crates.

pub mod constants;
pub mod error;
pub mod identity;
pub mod models;
pub mod types;

pub use error::{ChatError, ValidationError};
pub use identity::{validate_password, Identity};
pub use models::{ChatRoom, Message, OnlineUser};
pub use types::{IdentityStatus, MessageId, MessageKind, Presence, RoomId, RoomKind, UserId};

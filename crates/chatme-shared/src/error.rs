use thiserror::Error;

use crate::types::RoomId;

/// Rejections raised synchronously by chat operations. Nothing is created or
/// appended when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("No identity is signed in")]
    NotAuthenticated,

    #[error("Message content is empty")]
    EmptyMessage,

    #[error("Unknown room: {0}")]
    UnknownRoom(RoomId),

    #[error("Group room name must not be empty")]
    EmptyRoomName,

    #[error("Direct room needs exactly one other participant, got {0}")]
    InvalidParticipantCount(usize),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Password must be at least {min} characters (got {len})")]
    PasswordTooShort { len: usize, min: usize },
}

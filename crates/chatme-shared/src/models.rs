//! Chat domain records handed to the UI layer.
//!
//! Every struct derives `Serialize` so a front-end can render it directly;
//! field names are camelCase on the wire.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{MessageId, MessageKind, Presence, RoomId, RoomKind, UserId};

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message. Never mutated after it is appended to a room log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    /// Sender's display name at the time the message was created.
    pub sender_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub room_id: RoomId,
}

impl Message {
    /// Build a text message with a fresh id.
    pub fn text(
        room_id: RoomId,
        sender_id: UserId,
        sender_name: impl Into<String>,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            sender_id,
            sender_name: sender_name.into(),
            content: content.into(),
            timestamp,
            kind: MessageKind::Text,
            room_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// A direct (two-party) or group conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    pub id: RoomId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: RoomKind,
    #[serde(rename = "participants")]
    pub participant_ids: BTreeSet<UserId>,
    pub last_message: Option<Message>,
    pub unread_count: u32,
    pub avatar: Option<String>,
}

impl ChatRoom {
    pub fn has_participant(&self, user_id: &UserId) -> bool {
        self.participant_ids.contains(user_id)
    }

    pub fn member_count(&self) -> usize {
        self.participant_ids.len()
    }
}

// ---------------------------------------------------------------------------
// Roster entry
// ---------------------------------------------------------------------------

/// A known peer with a presence status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUser {
    pub id: UserId,
    pub username: String,
    pub avatar: String,
    pub status: Presence,
}

impl OnlineUser {
    pub fn new(id: &str, username: &str, avatar: &str, status: Presence) -> Self {
        Self {
            id: UserId::from(id),
            username: username.to_string(),
            avatar: avatar.to_string(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_message_defaults() {
        let msg = Message::text(
            RoomId::from("general"),
            UserId::from("1"),
            "rahul_sharma",
            "hello",
            Utc::now(),
        );
        assert_eq!(msg.kind, MessageKind::Text);
        assert_eq!(msg.room_id.as_str(), "general");

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["senderId"], "1");
        assert_eq!(json["roomId"], "general");
    }

    #[test]
    fn test_room_membership() {
        let room = ChatRoom {
            id: RoomId::from("direct-2"),
            name: "Priya Patel".into(),
            kind: RoomKind::Direct,
            participant_ids: [UserId::from("1"), UserId::from("2")].into_iter().collect(),
            last_message: None,
            unread_count: 0,
            avatar: None,
        };
        assert!(room.has_participant(&UserId::from("2")));
        assert!(!room.has_participant(&UserId::from("3")));
        assert_eq!(room.member_count(), 2);
    }
}

//! Change notifications for UI collaborators.
//!
//! Both the session manager and the chat store hand out unbounded tokio
//! receivers from `subscribe()`. Events carry ids only; subscribers read the
//! current state back through the store's accessors.

use serde::Serialize;
use tokio::sync::mpsc;

use chatme_shared::{MessageId, RoomId, UserId};

pub const EVENT_INITIALIZED: &str = "initialized";
pub const EVENT_ROOM_CREATED: &str = "room-created";
pub const EVENT_ACTIVE_ROOM_CHANGED: &str = "active-room-changed";
pub const EVENT_NEW_MESSAGE: &str = "new-message";
pub const EVENT_TYPING_CHANGED: &str = "typing-changed";
pub const EVENT_UNREAD_CHANGED: &str = "unread-changed";
pub const EVENT_SIGNED_IN: &str = "signed-in";
pub const EVENT_SIGNED_OUT: &str = "signed-out";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ChatEvent {
    /// State was seeded (or replaced) for this identity.
    Initialized { user_id: UserId },
    RoomCreated { room_id: RoomId },
    ActiveRoomChanged { room_id: Option<RoomId> },
    /// `simulated` is set for replies generated by the peer simulator.
    #[serde(rename = "new-message")]
    MessageAppended {
        room_id: RoomId,
        message_id: MessageId,
        simulated: bool,
    },
    TypingChanged { room_id: RoomId },
    UnreadChanged { room_id: RoomId, unread_count: u32 },
}

impl ChatEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialized { .. } => EVENT_INITIALIZED,
            Self::RoomCreated { .. } => EVENT_ROOM_CREATED,
            Self::ActiveRoomChanged { .. } => EVENT_ACTIVE_ROOM_CHANGED,
            Self::MessageAppended { .. } => EVENT_NEW_MESSAGE,
            Self::TypingChanged { .. } => EVENT_TYPING_CHANGED,
            Self::UnreadChanged { .. } => EVENT_UNREAD_CHANGED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum SessionEvent {
    SignedIn { user_id: UserId },
    SignedOut,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SignedIn { .. } => EVENT_SIGNED_IN,
            Self::SignedOut => EVENT_SIGNED_OUT,
        }
    }
}

/// Fan-out list of event receivers. Closed receivers are pruned on emit.
#[derive(Debug)]
pub(crate) struct Subscribers<E> {
    senders: Vec<mpsc::UnboundedSender<E>>,
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self {
            senders: Vec::new(),
        }
    }
}

impl<E: Clone + std::fmt::Debug> Subscribers<E> {
    pub(crate) fn subscribe(&mut self) -> mpsc::UnboundedReceiver<E> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.push(tx);
        rx
    }

    pub(crate) fn emit(&mut self, event: E) {
        let before = self.senders.len();
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
        let dropped = before - self.senders.len();
        if dropped > 0 {
            tracing::debug!(dropped, ?event, "Pruned closed event subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_reaches_every_live_subscriber() {
        let mut subs = Subscribers::<SessionEvent>::default();
        let mut a = subs.subscribe();
        let b = subs.subscribe();
        drop(b);

        subs.emit(SessionEvent::SignedOut);
        assert_eq!(a.try_recv().unwrap(), SessionEvent::SignedOut);
        assert_eq!(subs.senders.len(), 1);
    }

    #[test]
    fn test_event_names_match_serialized_tags() {
        let event = ChatEvent::MessageAppended {
            room_id: RoomId::from("general"),
            message_id: MessageId::from("m1"),
            simulated: true,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], event.name());

        let event = ChatEvent::ActiveRoomChanged { room_id: None };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], event.name());
    }

    #[test]
    fn test_payload_fields_are_camel_case() {
        let event = ChatEvent::UnreadChanged {
            room_id: RoomId::from("general"),
            unread_count: 3,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["roomId"], "general");
        assert_eq!(json["unreadCount"], 3);
        assert!(json.get("room_id").is_none());

        let json = serde_json::to_value(SessionEvent::SignedIn {
            user_id: UserId::from("1"),
        })
        .unwrap();
        assert_eq!(json["userId"], "1");
    }
}

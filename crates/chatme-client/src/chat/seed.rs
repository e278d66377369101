// Starter rooms and histories handed to every freshly initialized store.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Duration, Utc};

use chatme_shared::constants::GROUP_AVATAR;
use chatme_shared::{ChatRoom, Message, MessageId, MessageKind, RoomId, RoomKind, UserId};

pub const GENERAL_ROOM: &str = "general";
pub const DIRECT_ROOM: &str = "direct-2";
pub const TECH_ROOM: &str = "tech-group";

const PRIYA_AVATAR: &str = "https://images.pexels.com/photos/1130626/pexels-photo-1130626.jpeg?auto=compress&cs=tinysrgb&w=150&h=150&fit=crop";
const RAHUL_AVATAR: &str = "https://images.pexels.com/photos/2379004/pexels-photo-2379004.jpeg?auto=compress&cs=tinysrgb&w=150&h=150&fit=crop";
const TECH_AVATAR: &str = "https://images.pexels.com/photos/3184306/pexels-photo-3184306.jpeg?auto=compress&cs=tinysrgb&w=150&h=150&fit=crop";

pub(crate) struct Seed {
    pub rooms: Vec<ChatRoom>,
    pub messages: HashMap<RoomId, Vec<Message>>,
    pub active_room: RoomId,
}

/// Build the starter state for `owner`. The owner takes the place of the
/// stock account in every participant list.
pub(crate) fn starter(owner: &UserId, now: DateTime<Utc>) -> Seed {
    // The direct room must have two members, so the stock partner signing in
    // chats with the other stock account instead.
    let (partner_id, partner_name, partner_avatar) = if owner.as_str() == "2" {
        ("1", "Rahul Sharma", RAHUL_AVATAR)
    } else {
        ("2", "Priya Patel", PRIYA_AVATAR)
    };

    let members = |peers: &[&str]| -> BTreeSet<UserId> {
        peers
            .iter()
            .map(|&p| UserId::from(p))
            .chain(std::iter::once(owner.clone()))
            .collect()
    };

    let room = |id: &str, name: &str, kind, participant_ids, unread_count, avatar: &str| ChatRoom {
        id: RoomId::from(id),
        name: name.to_string(),
        kind,
        participant_ids,
        last_message: None,
        unread_count,
        avatar: Some(avatar.to_string()),
    };

    let rooms = vec![
        room(
            GENERAL_ROOM,
            "General Chat",
            RoomKind::Group,
            members(&["2", "3", "4", "5"]),
            2,
            GROUP_AVATAR,
        ),
        room(
            DIRECT_ROOM,
            partner_name,
            RoomKind::Direct,
            members(&[partner_id]),
            0,
            partner_avatar,
        ),
        room(
            TECH_ROOM,
            "Tech Enthusiasts",
            RoomKind::Group,
            members(&["3", "5"]),
            1,
            TECH_AVATAR,
        ),
    ];

    let message = |id: &str, room: &str, sender: &str, name: &str, content: &str, ago_secs| Message {
        id: MessageId::from(id),
        sender_id: UserId::from(sender),
        sender_name: name.to_string(),
        content: content.to_string(),
        timestamp: now - Duration::seconds(ago_secs),
        kind: MessageKind::Text,
        room_id: RoomId::from(room),
    };

    let mut messages: HashMap<RoomId, Vec<Message>> = HashMap::new();
    for msg in [
        message(
            "1",
            GENERAL_ROOM,
            "2",
            "Priya Patel",
            "Hey everyone! How is everyone doing today?",
            3600,
        ),
        message(
            "2",
            GENERAL_ROOM,
            "3",
            "Amit Kumar",
            "All good here! Just finished a great project. How about you?",
            3000,
        ),
        message(
            "3",
            DIRECT_ROOM,
            partner_id,
            partner_name,
            "Hi! Are we still on for the meeting tomorrow?",
            1800,
        ),
        message(
            "4",
            TECH_ROOM,
            "5",
            "Vikram Gupta",
            "Check out this new React feature! It's amazing.",
            900,
        ),
    ] {
        messages.entry(msg.room_id.clone()).or_default().push(msg);
    }

    Seed {
        rooms,
        messages,
        active_room: RoomId::from(GENERAL_ROOM),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_joins_every_starter_room() {
        let owner = UserId::from("42");
        let seed = starter(&owner, Utc::now());

        assert_eq!(seed.rooms.len(), 3);
        assert!(seed.rooms.iter().all(|r| r.has_participant(&owner)));
        assert!(seed.rooms.iter().all(|r| !r.has_participant(&UserId::from("1"))));

        let unread: Vec<u32> = seed.rooms.iter().map(|r| r.unread_count).collect();
        assert_eq!(unread, vec![2, 0, 1]);
        assert_eq!(seed.active_room.as_str(), GENERAL_ROOM);
    }

    #[test]
    fn test_direct_room_has_two_members_for_stock_partner() {
        for owner in ["1", "2", "42"] {
            let owner = UserId::from(owner);
            let seed = starter(&owner, Utc::now());
            let direct = seed
                .rooms
                .iter()
                .find(|r| r.id.as_str() == DIRECT_ROOM)
                .unwrap();

            assert_eq!(direct.kind, RoomKind::Direct);
            assert_eq!(direct.member_count(), 2, "owner {owner}");
            assert!(direct.has_participant(&owner));

            let partner = direct.participant_ids.iter().find(|id| **id != owner).unwrap();
            let history = &seed.messages[&RoomId::from(DIRECT_ROOM)];
            assert_eq!(&history[0].sender_id, partner);
            assert_eq!(history[0].sender_name, direct.name);
        }

        let seed = starter(&UserId::from("2"), Utc::now());
        let direct = &seed.rooms[1];
        assert_eq!(direct.name, "Rahul Sharma");
        assert_eq!(direct.avatar.as_deref(), Some(RAHUL_AVATAR));
    }

    #[test]
    fn test_histories_are_chronological() {
        let now = Utc::now();
        let seed = starter(&UserId::from("1"), now);

        let general = &seed.messages[&RoomId::from(GENERAL_ROOM)];
        assert_eq!(general.len(), 2);
        assert!(general[0].timestamp < general[1].timestamp);
        assert!(general.iter().all(|m| m.timestamp < now));

        assert_eq!(seed.messages[&RoomId::from(DIRECT_ROOM)].len(), 1);
        assert_eq!(seed.messages[&RoomId::from(TECH_ROOM)].len(), 1);
    }
}

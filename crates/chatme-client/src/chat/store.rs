//! The chat session store.
//!
//! One [`ChatStore`] holds the rooms, message logs, typing sets and active
//! room for the signed-in identity. Handles are cheap clones over shared
//! state; scheduled callbacks only ever hold a [`WeakChatStore`].

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tracing::{debug, info};

use chatme_shared::constants::GROUP_AVATAR;
use chatme_shared::{
    ChatError, ChatRoom, Identity, Message, OnlineUser, Presence, RoomId, RoomKind, UserId,
};

use super::seed;
use crate::config::ChatConfig;
use crate::directory::Roster;
use crate::events::{ChatEvent, Subscribers};
use crate::scheduler::{Clock, Scheduler};

#[derive(Clone)]
pub struct ChatStore {
    shared: Arc<Shared>,
}

/// Non-owning handle; upgrading fails once every [`ChatStore`] is dropped.
#[derive(Clone)]
pub struct WeakChatStore {
    shared: Weak<Shared>,
}

impl WeakChatStore {
    pub fn upgrade(&self) -> Option<ChatStore> {
        self.shared.upgrade().map(|shared| ChatStore { shared })
    }
}

struct Shared {
    state: Mutex<ChatState>,
    roster: Roster,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
    config: ChatConfig,
}

#[derive(Default)]
struct ChatState {
    identity: Option<Identity>,
    /// Bumped on every (re)initialization and clear. Replies carry the
    /// generation they were scheduled in and are dropped on mismatch.
    generation: u64,
    rooms: Vec<ChatRoom>,
    messages: HashMap<RoomId, Vec<Message>>,
    active_room: Option<RoomId>,
    typing: HashMap<RoomId, BTreeSet<UserId>>,
    subscribers: Subscribers<ChatEvent>,
}

impl ChatState {
    fn room_mut(&mut self, room_id: &RoomId) -> Option<&mut ChatRoom> {
        self.rooms.iter_mut().find(|r| &r.id == room_id)
    }

    fn has_room(&self, room_id: &RoomId) -> bool {
        self.rooms.iter().any(|r| &r.id == room_id)
    }

    /// The active room id, only if it still names a room.
    fn live_active_room(&self) -> Option<&RoomId> {
        self.active_room.as_ref().filter(|id| self.has_room(id))
    }

    /// Append to the room log and refresh the room's preview. The caller has
    /// already checked that the room exists.
    fn append(&mut self, message: Message) {
        if let Some(room) = self.room_mut(&message.room_id) {
            room.last_message = Some(message.clone());
        }
        self.messages
            .entry(message.room_id.clone())
            .or_default()
            .push(message);
    }
}

/// A rolled simulated reply waiting for its timer.
struct PendingReply {
    delay: Duration,
    sender: OnlineUser,
    content: String,
}

impl ChatStore {
    pub fn new(
        roster: Roster,
        scheduler: Arc<dyn Scheduler>,
        clock: Arc<dyn Clock>,
        config: ChatConfig,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ChatState::default()),
                roster,
                scheduler,
                clock,
                rng: Mutex::new(rng),
                config,
            }),
        }
    }

    pub fn downgrade(&self) -> WeakChatStore {
        WeakChatStore {
            shared: Arc::downgrade(&self.shared),
        }
    }

    fn state(&self) -> MutexGuard<'_, ChatState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ChatEvent> {
        self.state().subscribers.subscribe()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Seed the starter rooms for `identity`. A repeat call for the same
    /// identity id changes nothing; a different identity replaces everything.
    pub fn initialize(&self, identity: &Identity) {
        let mut state = self.state();

        if state.identity.as_ref().map(|i| &i.id) == Some(&identity.id) {
            debug!(user_id = %identity.id, "Chat store already initialized");
            return;
        }

        let seed = seed::starter(&identity.id, self.shared.clock.now());
        state.generation += 1;
        state.identity = Some(identity.clone());
        state.rooms = seed.rooms;
        state.messages = seed.messages;
        state.active_room = Some(seed.active_room);
        state.typing.clear();

        info!(
            user_id = %identity.id,
            generation = state.generation,
            rooms = state.rooms.len(),
            "Chat store initialized"
        );
        state.subscribers.emit(ChatEvent::Initialized {
            user_id: identity.id.clone(),
        });
        let active = state.active_room.clone();
        state
            .subscribers
            .emit(ChatEvent::ActiveRoomChanged { room_id: active });
    }

    /// Forget the identity and all rooms. Pending replies are discarded.
    pub fn clear(&self) {
        let mut state = self.state();
        let Some(identity) = state.identity.take() else {
            return;
        };

        state.generation += 1;
        state.rooms.clear();
        state.messages.clear();
        state.active_room = None;
        state.typing.clear();

        info!(user_id = %identity.id, "Chat store cleared");
        state
            .subscribers
            .emit(ChatEvent::ActiveRoomChanged { room_id: None });
    }

    #[cfg(test)]
    fn generation(&self) -> u64 {
        self.state().generation
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state().identity.clone()
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Select a room. The id is not checked.
    pub fn set_active_room(&self, room_id: &RoomId) {
        let mut state = self.state();
        state.active_room = Some(room_id.clone());
        state.subscribers.emit(ChatEvent::ActiveRoomChanged {
            room_id: Some(room_id.clone()),
        });
    }

    /// Append a text message from the signed-in identity and maybe schedule a
    /// simulated reply.
    pub fn send_message(&self, content: &str, room_id: &RoomId) -> Result<Message, ChatError> {
        let (message, generation) = {
            let mut state = self.state();
            let identity = state.identity.as_ref().ok_or(ChatError::NotAuthenticated)?;
            if content.trim().is_empty() {
                return Err(ChatError::EmptyMessage);
            }
            if !state.has_room(room_id) {
                return Err(ChatError::UnknownRoom(room_id.clone()));
            }

            let message = Message::text(
                room_id.clone(),
                identity.id.clone(),
                identity.username.clone(),
                content,
                self.shared.clock.now(),
            );
            state.append(message.clone());

            debug!(room_id = %room_id, message_id = %message.id, "Message sent");
            state.subscribers.emit(ChatEvent::MessageAppended {
                room_id: room_id.clone(),
                message_id: message.id.clone(),
                simulated: false,
            });
            (message, state.generation)
        };

        if let Some(reply) = self.roll_reply() {
            debug!(
                room_id = %room_id,
                sender = %reply.sender.username,
                delay_ms = reply.delay.as_millis() as u64,
                "Simulated reply scheduled"
            );
            let weak = self.downgrade();
            let room_id = room_id.clone();
            let delay = reply.delay;
            self.shared.scheduler.schedule(
                delay,
                Box::new(move || {
                    if let Some(store) = weak.upgrade() {
                        store.deliver_reply(generation, &room_id, reply);
                    }
                }),
            );
        }

        Ok(message)
    }

    fn roll_reply(&self) -> Option<PendingReply> {
        let config = &self.shared.config;
        let mut rng = self
            .shared
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if !rng.gen_bool(config.clamped_probability()) {
            return None;
        }

        let sender = self.shared.roster.users().choose(&mut *rng)?.clone();
        let content = config.reply_phrases.choose(&mut *rng)?.clone();

        let min = config.reply_delay_min.as_millis() as u64;
        let max = config.reply_delay_max.as_millis() as u64;
        let delay_ms = if max > min { rng.gen_range(min..max) } else { min };

        Some(PendingReply {
            delay: Duration::from_millis(delay_ms),
            sender,
            content,
        })
    }

    fn deliver_reply(&self, generation: u64, room_id: &RoomId, reply: PendingReply) {
        let mut state = self.state();

        if state.generation != generation {
            debug!(room_id = %room_id, "Dropping reply from a previous session");
            return;
        }
        if !state.has_room(room_id) {
            debug!(room_id = %room_id, "Dropping reply for a missing room");
            return;
        }

        let message = Message::text(
            room_id.clone(),
            reply.sender.id,
            reply.sender.username,
            reply.content,
            self.shared.clock.now(),
        );
        let message_id = message.id.clone();
        state.append(message);

        let is_active = state.live_active_room() == Some(room_id);
        state.subscribers.emit(ChatEvent::MessageAppended {
            room_id: room_id.clone(),
            message_id,
            simulated: true,
        });

        if !is_active {
            if let Some(room) = state.room_mut(room_id) {
                room.unread_count += 1;
                let unread_count = room.unread_count;
                state.subscribers.emit(ChatEvent::UnreadChanged {
                    room_id: room_id.clone(),
                    unread_count,
                });
            }
        }
    }

    /// Create a room and make it active.
    ///
    /// A group room needs a non-blank name. A direct room needs exactly one
    /// participant besides the signed-in identity; a blank name falls back to
    /// the partner's roster username. The signed-in identity is always added
    /// to the participants.
    pub fn create_room(
        &self,
        name: &str,
        kind: RoomKind,
        participant_ids: &[UserId],
    ) -> Result<ChatRoom, ChatError> {
        let mut state = self.state();
        let owner = state
            .identity
            .as_ref()
            .map(|i| i.id.clone())
            .ok_or(ChatError::NotAuthenticated)?;

        let others: BTreeSet<UserId> = participant_ids
            .iter()
            .filter(|id| **id != owner)
            .cloned()
            .collect();
        let name = name.trim();

        let (name, avatar) = match kind {
            RoomKind::Group => {
                if name.is_empty() {
                    return Err(ChatError::EmptyRoomName);
                }
                (name.to_string(), Some(GROUP_AVATAR.to_string()))
            }
            RoomKind::Direct => {
                let partner = match (others.len(), others.iter().next()) {
                    (1, Some(partner)) => partner,
                    (n, _) => return Err(ChatError::InvalidParticipantCount(n)),
                };
                let entry = self.shared.roster.get(partner);
                let name = if name.is_empty() {
                    entry
                        .map(|u| u.username.clone())
                        .unwrap_or_else(|| partner.to_string())
                } else {
                    name.to_string()
                };
                (name, entry.map(|u| u.avatar.clone()))
            }
        };

        let mut participant_ids = others;
        participant_ids.insert(owner);

        let room = ChatRoom {
            id: RoomId::new(),
            name,
            kind,
            participant_ids,
            last_message: None,
            unread_count: 0,
            avatar,
        };

        state.rooms.push(room.clone());
        state.messages.insert(room.id.clone(), Vec::new());
        state.active_room = Some(room.id.clone());

        info!(room_id = %room.id, name = %room.name, kind = ?room.kind, "Room created");
        state.subscribers.emit(ChatEvent::RoomCreated {
            room_id: room.id.clone(),
        });
        state.subscribers.emit(ChatEvent::ActiveRoomChanged {
            room_id: Some(room.id.clone()),
        });

        Ok(room)
    }

    /// Mark the signed-in identity as typing in `room_id`. Idempotent.
    pub fn start_typing(&self, room_id: &RoomId) -> Result<(), ChatError> {
        self.update_typing(room_id, true)
    }

    /// Remove the signed-in identity from `room_id`'s typing set. Idempotent.
    pub fn stop_typing(&self, room_id: &RoomId) -> Result<(), ChatError> {
        self.update_typing(room_id, false)
    }

    fn update_typing(&self, room_id: &RoomId, typing: bool) -> Result<(), ChatError> {
        let mut state = self.state();
        let user_id = state
            .identity
            .as_ref()
            .map(|i| i.id.clone())
            .ok_or(ChatError::NotAuthenticated)?;

        let changed = if typing {
            state
                .typing
                .entry(room_id.clone())
                .or_default()
                .insert(user_id)
        } else {
            state
                .typing
                .get_mut(room_id)
                .map(|set| set.remove(&user_id))
                .unwrap_or(false)
        };

        if changed {
            state.subscribers.emit(ChatEvent::TypingChanged {
                room_id: room_id.clone(),
            });
        }
        Ok(())
    }

    /// Reset a room's unread counter. Returns false for unknown rooms.
    pub fn mark_read(&self, room_id: &RoomId) -> bool {
        let mut state = self.state();
        let Some(room) = state.room_mut(room_id) else {
            return false;
        };
        if room.unread_count == 0 {
            return true;
        }

        room.unread_count = 0;
        state.subscribers.emit(ChatEvent::UnreadChanged {
            room_id: room_id.clone(),
            unread_count: 0,
        });
        true
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Rooms in creation order.
    pub fn rooms(&self) -> Vec<ChatRoom> {
        self.state().rooms.clone()
    }

    pub fn room(&self, room_id: &RoomId) -> Option<ChatRoom> {
        self.state().rooms.iter().find(|r| &r.id == room_id).cloned()
    }

    /// The room's log, oldest first. Empty for unknown rooms.
    pub fn messages(&self, room_id: &RoomId) -> Vec<Message> {
        self.state()
            .messages
            .get(room_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Everyone in the room's typing set, including the signed-in identity.
    pub fn typing_users(&self, room_id: &RoomId) -> Vec<UserId> {
        self.state()
            .typing
            .get(room_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The room's typing set minus the signed-in identity.
    pub fn others_typing(&self, room_id: &RoomId) -> Vec<UserId> {
        let state = self.state();
        let me = state.identity.as_ref().map(|i| &i.id);
        state
            .typing
            .get(room_id)
            .map(|set| set.iter().filter(|id| Some(*id) != me).cloned().collect())
            .unwrap_or_default()
    }

    /// Indicator text for other typists, `None` when nobody else is typing.
    pub fn typing_label(&self, room_id: &RoomId) -> Option<String> {
        let others = self.others_typing(room_id);
        match others.as_slice() {
            [] => None,
            [one] => {
                let name = self.shared.roster.username(one).unwrap_or("Someone");
                Some(format!("{name} is typing..."))
            }
            many => Some(format!("{} people are typing...", many.len())),
        }
    }

    pub fn active_room_id(&self) -> Option<RoomId> {
        self.state().live_active_room().cloned()
    }

    pub fn active_room(&self) -> Option<ChatRoom> {
        let state = self.state();
        let id = state.live_active_room()?;
        state.rooms.iter().find(|r| &r.id == id).cloned()
    }

    pub fn online_users(&self) -> Vec<OnlineUser> {
        self.shared.roster.users().to_vec()
    }

    pub fn online_count(&self) -> usize {
        self.shared.roster.online_count()
    }

    /// Rooms whose name contains `query`, ignoring case. A blank query
    /// matches every room.
    pub fn search_rooms(&self, query: &str) -> Vec<ChatRoom> {
        let needle = query.trim().to_lowercase();
        self.state()
            .rooms
            .iter()
            .filter(|r| r.name.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Whether a direct room's partner shows as online in the roster.
    /// False for group rooms, unknown rooms and partners outside the roster.
    pub fn partner_online(&self, room_id: &RoomId) -> bool {
        let state = self.state();
        let Some(room) = state.rooms.iter().find(|r| &r.id == room_id) else {
            return false;
        };
        if room.kind != RoomKind::Direct {
            return false;
        }
        let me = state.identity.as_ref().map(|i| &i.id);
        self.shared
            .roster
            .users()
            .iter()
            .find(|u| room.has_participant(&u.id) && Some(&u.id) != me)
            .is_some_and(|u| u.status == Presence::Online)
    }

    /// Participants of a room that appear in the roster.
    pub fn room_members(&self, room_id: &RoomId) -> Vec<OnlineUser> {
        let state = self.state();
        let Some(room) = state.rooms.iter().find(|r| &r.id == room_id) else {
            return Vec::new();
        };
        self.shared
            .roster
            .users()
            .iter()
            .filter(|u| room.has_participant(&u.id))
            .cloned()
            .collect()
    }

    pub fn total_unread(&self) -> u32 {
        self.state().rooms.iter().map(|r| r.unread_count).sum()
    }
}

//! Rooms, message logs, typing presence and the simulated peers.

mod seed;
mod store;

pub use seed::{DIRECT_ROOM, GENERAL_ROOM, TECH_ROOM};
pub use store::{ChatStore, WeakChatStore};

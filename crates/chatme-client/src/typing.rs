//! Debounced typing indicator.
//!
//! Every keystroke marks the user as typing and (re)arms a quiet-period
//! timer; the indicator clears when the timer fires without a newer
//! keystroke. The store itself never expires typing state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{trace, warn};

use chatme_shared::{ChatError, RoomId};

use crate::chat::ChatStore;
use crate::scheduler::Scheduler;

pub struct TypingDebouncer {
    store: ChatStore,
    scheduler: Arc<dyn Scheduler>,
    quiet: Duration,
    /// Latest keystroke token per room; only the timer holding the latest
    /// token may clear the indicator.
    tokens: Arc<Mutex<HashMap<RoomId, u64>>>,
}

impl TypingDebouncer {
    pub fn new(store: ChatStore, scheduler: Arc<dyn Scheduler>, quiet: Duration) -> Self {
        Self {
            store,
            scheduler,
            quiet,
            tokens: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn keystroke(&self, room_id: &RoomId) -> Result<(), ChatError> {
        self.store.start_typing(room_id)?;

        let token = {
            let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
            let slot = tokens.entry(room_id.clone()).or_insert(0);
            *slot += 1;
            *slot
        };

        let store = self.store.downgrade();
        let tokens = Arc::clone(&self.tokens);
        let room_id = room_id.clone();
        self.scheduler.schedule(
            self.quiet,
            Box::new(move || {
                let latest = tokens
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get(&room_id)
                    .copied();
                if latest != Some(token) {
                    trace!(room_id = %room_id, "Typing timer superseded");
                    return;
                }
                let Some(store) = store.upgrade() else {
                    return;
                };
                if let Err(e) = store.stop_typing(&room_id) {
                    warn!(room_id = %room_id, error = %e, "Could not clear typing indicator");
                }
            }),
        );

        Ok(())
    }

    /// Stop typing now and disarm any pending timer for the room.
    pub fn flush(&self, room_id: &RoomId) -> Result<(), ChatError> {
        if let Some(slot) = self
            .tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(room_id)
        {
            *slot += 1;
        }
        self.store.stop_typing(room_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::GENERAL_ROOM;
    use crate::config::ChatConfig;
    use crate::directory::{Roster, UserDirectory};
    use crate::scheduler::ManualScheduler;
    use chrono::Utc;

    fn setup() -> (ChatStore, TypingDebouncer, ManualScheduler) {
        let scheduler = ManualScheduler::new();
        let store = ChatStore::new(
            Roster::demo(),
            Arc::new(scheduler.clone()),
            Arc::new(scheduler.clone()),
            ChatConfig::silent(),
        );
        let rahul = UserDirectory::demo(Utc::now())
            .find("rahul_sharma")
            .cloned()
            .unwrap();
        store.initialize(&rahul);

        let debouncer = TypingDebouncer::new(
            store.clone(),
            Arc::new(scheduler.clone()),
            Duration::from_millis(1000),
        );
        (store, debouncer, scheduler)
    }

    #[test]
    fn test_indicator_clears_after_quiet_period() {
        let (store, debouncer, scheduler) = setup();
        let room = RoomId::from(GENERAL_ROOM);

        debouncer.keystroke(&room).unwrap();
        assert_eq!(store.typing_users(&room).len(), 1);

        scheduler.advance(Duration::from_millis(999));
        assert_eq!(store.typing_users(&room).len(), 1);

        scheduler.advance(Duration::from_millis(1));
        assert!(store.typing_users(&room).is_empty());
    }

    #[test]
    fn test_keystroke_rearms_timer() {
        let (store, debouncer, scheduler) = setup();
        let room = RoomId::from(GENERAL_ROOM);

        debouncer.keystroke(&room).unwrap();
        scheduler.advance(Duration::from_millis(800));
        debouncer.keystroke(&room).unwrap();
        scheduler.advance(Duration::from_millis(800));
        assert_eq!(store.typing_users(&room).len(), 1);

        scheduler.advance(Duration::from_millis(200));
        assert!(store.typing_users(&room).is_empty());
    }

    #[test]
    fn test_flush_clears_immediately() {
        let (store, debouncer, scheduler) = setup();
        let room = RoomId::from(GENERAL_ROOM);

        debouncer.keystroke(&room).unwrap();
        debouncer.flush(&room).unwrap();
        assert!(store.typing_users(&room).is_empty());

        // The disarmed timer must not clear a later keystroke early.
        scheduler.advance(Duration::from_millis(500));
        debouncer.keystroke(&room).unwrap();
        scheduler.advance(Duration::from_millis(600));
        assert_eq!(store.typing_users(&room).len(), 1);
    }
}

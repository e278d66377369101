//! Session manager: owns the signed-in [`Identity`] and its lifecycle.
//!
//! Sign-in is checked against an injected [`UserDirectory`]; the current
//! identity is mirrored into a [`KvStore`] so it can be restored on the next
//! start. Failures are reported as `false` only, with no reason attached.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use chatme_shared::{validate_password, Identity};
use chatme_store::{KvStore, SessionStore};

use crate::config::SessionConfig;
use crate::directory::UserDirectory;
use crate::events::{SessionEvent, Subscribers};
use crate::scheduler::{Clock, SystemClock};

pub struct SessionManager {
    directory: UserDirectory,
    storage: Mutex<Box<dyn KvStore>>,
    current: Mutex<Option<Identity>>,
    subscribers: Mutex<Subscribers<SessionEvent>>,
    /// Number of login/registration round-trips in flight.
    in_flight: AtomicUsize,
    config: SessionConfig,
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
}

/// Decrements the in-flight counter when a round-trip finishes or its
/// future is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionManager {
    pub fn new(
        directory: UserDirectory,
        storage: impl KvStore + 'static,
        config: SessionConfig,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let storage: Box<dyn KvStore> = Box::new(storage);

        Self {
            directory,
            storage: Mutex::new(storage),
            current: Mutex::new(None),
            subscribers: Mutex::new(Subscribers::default()),
            in_flight: AtomicUsize::new(0),
            config,
            clock: Arc::new(SystemClock),
            rng: Mutex::new(rng),
        }
    }

    /// Replace the wall clock used for `lastSeen` stamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The signed-in identity, if any.
    pub fn current(&self) -> Option<Identity> {
        lock(&self.current).clone()
    }

    pub fn is_authenticated(&self) -> bool {
        lock(&self.current).is_some()
    }

    /// True while a login or registration round-trip is pending.
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        lock(&self.subscribers).subscribe()
    }

    /// Adopt the persisted identity, if one exists, without re-validating it.
    pub fn restore_session(&self) -> Option<Identity> {
        let restored = match lock(&self.storage).load_identity() {
            Ok(identity) => identity,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable persisted session");
                None
            }
        };

        let identity = restored?;
        info!(user_id = %identity.id, username = %identity.username, "Restored session");
        self.set_current(identity.clone());
        Some(identity)
    }

    /// Sign in against the directory. The last call to complete wins.
    pub async fn login(&self, username: &str, password: &str) -> bool {
        let _in_flight = InFlight::enter(&self.in_flight);
        self.simulate_round_trip().await;

        let Some(found) = self.directory.authenticate(username, password) else {
            info!(username, "Login rejected");
            return false;
        };

        let identity = found.signed_in(self.clock.now());
        info!(user_id = %identity.id, username, "Logged in");
        self.persist(&identity);
        self.set_current(identity);
        true
    }

    /// Create a new identity and sign it in. Fails only for passwords shorter
    /// than the minimum length.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> bool {
        if let Err(e) = validate_password(password) {
            info!(username, error = %e, "Registration rejected");
            return false;
        }

        let _in_flight = InFlight::enter(&self.in_flight);
        self.simulate_round_trip().await;

        let identity = {
            let mut rng = lock(&self.rng);
            Identity::register(username, email, self.clock.now(), &mut *rng)
        };

        info!(user_id = %identity.id, username, "Registered new identity");
        self.persist(&identity);
        self.set_current(identity);
        true
    }

    /// Drop the current identity and its persisted record.
    pub fn logout(&self) {
        let previous = lock(&self.current).take();

        match lock(&self.storage).clear_identity() {
            Ok(removed) => debug!(removed, "Cleared persisted session"),
            Err(e) => warn!(error = %e, "Failed to clear persisted session"),
        }

        if let Some(identity) = previous {
            info!(user_id = %identity.id, "Logged out");
            lock(&self.subscribers).emit(SessionEvent::SignedOut);
        }
    }

    async fn simulate_round_trip(&self) {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
    }

    fn persist(&self, identity: &Identity) {
        if let Err(e) = lock(&self.storage).save_identity(identity) {
            warn!(user_id = %identity.id, error = %e, "Failed to persist session");
        }
    }

    fn set_current(&self, identity: Identity) {
        let user_id = identity.id.clone();
        *lock(&self.current) = Some(identity);
        lock(&self.subscribers).emit(SessionEvent::SignedIn { user_id });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatme_shared::constants::DEMO_SECRET;
    use chatme_shared::IdentityStatus;
    use chatme_store::{Database, MemoryStore};
    use chrono::Utc;
    use std::collections::HashSet;
    use std::time::Duration;

    fn instant() -> SessionConfig {
        SessionConfig {
            latency: Duration::ZERO,
            rng_seed: Some(1),
        }
    }

    fn manager(store: MemoryStore) -> SessionManager {
        SessionManager::new(UserDirectory::demo(Utc::now()), store, instant())
    }

    #[tokio::test]
    async fn test_login_with_valid_credentials() {
        let store = MemoryStore::new();
        let sessions = manager(store.clone());

        for username in ["rahul_sharma", "priya_patel"] {
            assert!(sessions.login(username, DEMO_SECRET).await);
            let current = sessions.current().unwrap();
            assert_eq!(current.username, username);
            assert_eq!(current.status, IdentityStatus::Online);
            assert_eq!(store.load_identity().unwrap(), Some(current));
        }
    }

    #[tokio::test]
    async fn test_failed_login_keeps_current_identity() {
        let sessions = manager(MemoryStore::new());

        assert!(!sessions.login("rahul_sharma", "nope").await);
        assert!(sessions.current().is_none());

        assert!(sessions.login("rahul_sharma", DEMO_SECRET).await);
        let before = sessions.current();

        assert!(!sessions.login("priya_patel", "wrong").await);
        assert!(!sessions.login("ghost", DEMO_SECRET).await);
        assert!(!sessions.login("", "").await);
        assert_eq!(sessions.current(), before);
    }

    #[tokio::test]
    async fn test_register_mints_fresh_identities() {
        let sessions = manager(MemoryStore::new());
        let mut seen = HashSet::new();

        for i in 0..5 {
            let name = format!("user{i}");
            assert!(sessions.register(&name, "u@example.com", "secret1").await);
            let current = sessions.current().unwrap();
            assert_eq!(current.username, name);
            assert_eq!(current.status, IdentityStatus::Online);
            assert!(seen.insert(current.id.clone()));
        }
    }

    #[tokio::test]
    async fn test_register_rejects_short_password() {
        let sessions = manager(MemoryStore::new());
        assert!(!sessions.register("ana", "ana@example.com", "12345").await);
        assert!(sessions.current().is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_persisted_record() {
        let store = MemoryStore::new();
        let sessions = manager(store.clone());

        assert!(sessions.login("priya_patel", DEMO_SECRET).await);
        assert!(!store.is_empty());

        sessions.logout();
        assert!(sessions.current().is_none());
        assert!(store.load_identity().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_restore_session_from_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.db");

        let registered = {
            let sessions = SessionManager::new(
                UserDirectory::demo(Utc::now()),
                Database::open_at(&path).unwrap(),
                instant(),
            );
            assert!(sessions.register("ana", "ana@example.com", "secret1").await);
            sessions.current().unwrap()
        };

        let sessions = SessionManager::new(
            UserDirectory::demo(Utc::now()),
            Database::open_at(&path).unwrap(),
            instant(),
        );
        assert!(sessions.current().is_none());
        assert_eq!(sessions.restore_session(), Some(registered.clone()));
        assert_eq!(sessions.current(), Some(registered));
    }

    #[test]
    fn test_restore_without_record_or_with_garbage() {
        let store = MemoryStore::new();
        let sessions = manager(store.clone());
        assert!(sessions.restore_session().is_none());

        store
            .put(chatme_shared::constants::SESSION_STORAGE_KEY, "{broken")
            .unwrap();
        assert!(sessions.restore_session().is_none());
        assert!(!sessions.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_waits_for_latency_and_reports_loading() {
        let sessions = Arc::new(SessionManager::new(
            UserDirectory::demo(Utc::now()),
            MemoryStore::new(),
            SessionConfig {
                latency: Duration::from_millis(1000),
                rng_seed: Some(1),
            },
        ));

        let task = {
            let sessions = sessions.clone();
            tokio::spawn(async move { sessions.login("rahul_sharma", DEMO_SECRET).await })
        };

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(sessions.is_loading());
        assert!(sessions.current().is_none());

        assert!(task.await.unwrap());
        assert!(!sessions.is_loading());
        assert!(sessions.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_completed_login_wins() {
        let sessions = Arc::new(SessionManager::new(
            UserDirectory::demo(Utc::now()),
            MemoryStore::new(),
            SessionConfig {
                latency: Duration::from_millis(1000),
                rng_seed: Some(1),
            },
        ));

        let first = {
            let sessions = sessions.clone();
            tokio::spawn(async move { sessions.login("rahul_sharma", DEMO_SECRET).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = {
            let sessions = sessions.clone();
            tokio::spawn(async move { sessions.login("priya_patel", DEMO_SECRET).await })
        };

        assert!(first.await.unwrap());
        assert!(second.await.unwrap());
        assert_eq!(sessions.current().unwrap().username, "priya_patel");
    }

    #[tokio::test]
    async fn test_session_events() {
        let sessions = manager(MemoryStore::new());
        let mut events = sessions.subscribe();

        assert!(sessions.login("rahul_sharma", DEMO_SECRET).await);
        sessions.logout();

        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::SignedIn {
                user_id: "1".into()
            }
        );
        assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedOut);
    }

    #[test]
    fn test_logout_without_session_is_silent() {
        let sessions = manager(MemoryStore::new());
        let mut events = sessions.subscribe();

        sessions.logout();
        assert!(events.try_recv().is_err());
    }
}

// End-to-end flow across the session manager, the SQLite store and the chat
// store, driven on virtual time.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use chatme_client::chat::GENERAL_ROOM;
use chatme_client::{
    ChatConfig, ChatStore, ManualScheduler, Roster, SessionConfig, SessionManager, UserDirectory,
};
use chatme_shared::constants::{DEMO_SECRET, REPLY_PHRASES};
use chatme_shared::RoomId;
use chatme_store::Database;

fn sessions(db: Database) -> SessionManager {
    SessionManager::new(
        UserDirectory::demo(Utc::now()),
        db,
        SessionConfig {
            latency: Duration::ZERO,
            rng_seed: Some(3),
        },
    )
}

#[tokio::test]
async fn test_hello_gets_at_most_one_reply_within_four_seconds() {
    let dir = tempfile::tempdir().unwrap();
    let sessions = sessions(Database::open_at(&dir.path().join("chat.db")).unwrap());
    assert!(sessions.login("rahul_sharma", DEMO_SECRET).await);
    let me = sessions.current().unwrap();

    let roster = Roster::demo();
    for seed in 0..16 {
        let scheduler = ManualScheduler::new();
        let chat = ChatStore::new(
            roster.clone(),
            Arc::new(scheduler.clone()),
            Arc::new(scheduler.clone()),
            ChatConfig {
                rng_seed: Some(seed),
                ..ChatConfig::default()
            },
        );
        chat.initialize(&me);

        let general = RoomId::from(GENERAL_ROOM);
        let before = chat.messages(&general).len();
        chat.send_message("hello", &general).unwrap();
        scheduler.advance(Duration::from_millis(4000));

        let log = chat.messages(&general);
        let new = &log[before..];
        assert!(matches!(new.len(), 1 | 2), "seed {seed}: {} new", new.len());
        assert_eq!(new[0].content, "hello");
        assert_eq!(new[0].sender_id, me.id);

        if let Some(reply) = new.get(1) {
            assert!(roster.get(&reply.sender_id).is_some());
            assert!(REPLY_PHRASES.contains(&reply.content.as_str()));
            assert!(reply.timestamp > new[0].timestamp);
        }
    }
}

#[tokio::test]
async fn test_identity_survives_restart_until_logout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chat.db");

    let first = sessions(Database::open_at(&path).unwrap());
    assert!(first.register("meera", "meera@example.com", "hunter22").await);
    let registered = first.current().unwrap();
    drop(first);

    let second = sessions(Database::open_at(&path).unwrap());
    assert_eq!(second.restore_session(), Some(registered.clone()));

    let scheduler = ManualScheduler::new();
    let chat = ChatStore::new(
        Roster::demo(),
        Arc::new(scheduler.clone()),
        Arc::new(scheduler),
        ChatConfig::silent(),
    );
    chat.initialize(&registered);
    assert!(chat
        .rooms()
        .iter()
        .all(|room| room.has_participant(&registered.id)));

    second.logout();
    chat.clear();
    assert!(chat.rooms().is_empty());

    let third = sessions(Database::open_at(&path).unwrap());
    assert!(third.restore_session().is_none());
}

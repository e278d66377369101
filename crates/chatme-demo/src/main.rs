//! # chatme-demo
//!
//! Scripted session against the real stack: SQLite-backed session
//! persistence, the chat store on the tokio scheduler, and a typing
//! debouncer. Events are logged as they arrive.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use chatme_client::chat::{DIRECT_ROOM, GENERAL_ROOM};
use chatme_client::{
    init_tracing, ChatStore, ClientConfig, Clock, Roster, SessionManager, SystemClock,
    TokioScheduler, TypingDebouncer, UserDirectory,
};
use chatme_shared::constants::{APP_NAME, DEMO_SECRET};
use chatme_shared::{RoomId, RoomKind, UserId};
use chatme_store::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Tracing and configuration
    // -----------------------------------------------------------------------
    init_tracing();
    info!("Starting {} demo v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 2. Session
    // -----------------------------------------------------------------------
    let db = match &config.db_path {
        Some(path) => Database::open_at(path),
        None => Database::new(),
    }
    .context("Failed to open session database")?;

    let clock = Arc::new(SystemClock);
    let sessions = SessionManager::new(
        UserDirectory::demo(clock.now()),
        db,
        config.session.clone(),
    )
    .with_clock(clock.clone());

    let mut session_events = sessions.subscribe();
    tokio::spawn(async move {
        while let Some(event) = session_events.recv().await {
            info!(event = event.name(), ?event, "Session event");
        }
    });

    let identity = match sessions.restore_session() {
        Some(identity) => identity,
        None => {
            if !sessions.login("rahul_sharma", DEMO_SECRET).await {
                anyhow::bail!("Demo login was rejected");
            }
            sessions
                .current()
                .context("Login succeeded without an identity")?
        }
    };
    info!(user_id = %identity.id, username = %identity.username, "Signed in");

    // -----------------------------------------------------------------------
    // 3. Chat store
    // -----------------------------------------------------------------------
    let scheduler = Arc::new(TokioScheduler::current()?);
    let chat = ChatStore::new(
        Roster::demo(),
        scheduler.clone(),
        clock,
        config.chat.clone(),
    );

    let mut chat_events = chat.subscribe();
    tokio::spawn(async move {
        while let Some(event) = chat_events.recv().await {
            info!(event = event.name(), ?event, "Chat event");
        }
    });

    chat.initialize(&identity);
    info!(
        rooms = chat.rooms().len(),
        unread = chat.total_unread(),
        online = chat.online_count(),
        "Chat ready"
    );

    // -----------------------------------------------------------------------
    // 4. Script
    // -----------------------------------------------------------------------
    let general = RoomId::from(GENERAL_ROOM);
    let typing = TypingDebouncer::new(chat.clone(), scheduler, config.typing_quiet);

    typing.keystroke(&general)?;
    chat.send_message("Hello everyone!", &general)?;
    typing.flush(&general)?;

    chat.send_message("See you tomorrow.", &RoomId::from(DIRECT_ROOM))?;

    let room = chat.create_room("Weekend hike", RoomKind::Group, &[UserId::from("4")])?;
    chat.send_message("Who's in?", &room.id)?;

    let wait = config.chat.reply_delay_max + Duration::from_millis(500);
    tokio::select! {
        _ = tokio::time::sleep(wait) => {}
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, shutting down early");
        }
    }

    for room in chat.rooms() {
        let log = chat.messages(&room.id);
        info!(
            room = %room.name,
            messages = log.len(),
            unread = room.unread_count,
            last = log.last().map(|m| m.content.as_str()).unwrap_or(""),
            "Room summary"
        );
    }

    info!("Demo finished");
    Ok(())
}

pub mod auth;
pub mod chat;
pub mod config;
pub mod directory;
pub mod events;
pub mod scheduler;
pub mod typing;

pub use auth::SessionManager;
pub use chat::{ChatStore, WeakChatStore};
pub use config::{ChatConfig, ClientConfig, SessionConfig};
pub use directory::{Roster, UserDirectory};
pub use events::{ChatEvent, SessionEvent};
pub use scheduler::{Clock, ManualScheduler, Scheduler, SystemClock, Task, TokioScheduler};
pub use typing::TypingDebouncer;

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the default
/// filter. Returns false if a subscriber was already installed.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,chatme_client=debug")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .is_ok()
}

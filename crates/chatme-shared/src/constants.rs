/// Application name
pub const APP_NAME: &str = "Chat Me";

/// Key under which the signed-in identity is persisted
pub const SESSION_STORAGE_KEY: &str = "chat-me-user";

/// Shared secret accepted for every directory user (demo only)
pub const DEMO_SECRET: &str = "password123";

/// Minimum password length accepted at registration
pub const MIN_PASSWORD_LEN: usize = 6;

/// Simulated round-trip for login/registration, in milliseconds
pub const DEFAULT_LOGIN_LATENCY_MS: u64 = 1000;

/// Chance that a sent message receives a simulated reply
pub const DEFAULT_REPLY_PROBABILITY: f64 = 0.7;

/// Simulated reply delay window [min, max), in milliseconds
pub const DEFAULT_REPLY_DELAY_MIN_MS: u64 = 1000;
pub const DEFAULT_REPLY_DELAY_MAX_MS: u64 = 4000;

/// Quiet period after the last keystroke before typing stops, in milliseconds
pub const DEFAULT_TYPING_QUIET_MS: u64 = 1000;

/// Canned replies used by the simulated peers
pub const REPLY_PHRASES: [&str; 8] = [
    "That's interesting!",
    "I agree with you.",
    "Thanks for sharing!",
    "Great point!",
    "Let me think about that.",
    "Absolutely right!",
    "I was thinking the same thing.",
    "Good to know!",
];

/// Avatar used for group rooms
pub const GROUP_AVATAR: &str = "https://images.pexels.com/photos/3184454/pexels-photo-3184454.jpeg?auto=compress&cs=tinysrgb&w=150&h=150&fit=crop";

/// Base photo number for generated avatars; a random offset below
/// `AVATAR_PHOTO_SPREAD` is added.
pub const AVATAR_PHOTO_BASE: u32 = 2_379_004;
pub const AVATAR_PHOTO_SPREAD: u32 = 1000;

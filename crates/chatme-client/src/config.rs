//! Client configuration loaded from environment variables.
//!
//! All settings have defaults matching the stock demo behaviour, so the
//! client runs with zero configuration.

use std::path::PathBuf;
use std::time::Duration;

use chatme_shared::constants::{
    DEFAULT_LOGIN_LATENCY_MS, DEFAULT_REPLY_DELAY_MAX_MS, DEFAULT_REPLY_DELAY_MIN_MS,
    DEFAULT_REPLY_PROBABILITY, DEFAULT_TYPING_QUIET_MS, REPLY_PHRASES,
};

/// Top-level client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// SQLite file holding the persisted identity.
    /// Env: `CHATME_DB_PATH`
    /// Default: `None` (platform data directory).
    pub db_path: Option<PathBuf>,

    /// Env: `CHATME_LOGIN_LATENCY_MS`
    pub session: SessionConfig,

    /// Env: `CHATME_REPLY_PROBABILITY`, `CHATME_REPLY_DELAY_MIN_MS`,
    /// `CHATME_REPLY_DELAY_MAX_MS`
    pub chat: ChatConfig,

    /// Quiet period before a debounced typing indicator clears.
    /// Env: `CHATME_TYPING_QUIET_MS`
    /// Default: 1000 ms
    pub typing_quiet: Duration,
}

/// Session manager settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Artificial round-trip applied to login and registration.
    pub latency: Duration,
    /// Seed for avatar generation. `None` seeds from OS entropy.
    /// Env: `CHATME_RNG_SEED`
    pub rng_seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(DEFAULT_LOGIN_LATENCY_MS),
            rng_seed: None,
        }
    }
}

/// Chat store settings, mostly for the simulated peers.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Chance in [0, 1] that a sent message gets a simulated reply.
    pub reply_probability: f64,
    /// Replies arrive after a uniform delay in `[reply_delay_min, reply_delay_max)`.
    pub reply_delay_min: Duration,
    pub reply_delay_max: Duration,
    /// Canned reply contents.
    pub reply_phrases: Vec<String>,
    /// Seed for reply rolls. `None` seeds from OS entropy.
    /// Env: `CHATME_RNG_SEED`
    pub rng_seed: Option<u64>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            reply_probability: DEFAULT_REPLY_PROBABILITY,
            reply_delay_min: Duration::from_millis(DEFAULT_REPLY_DELAY_MIN_MS),
            reply_delay_max: Duration::from_millis(DEFAULT_REPLY_DELAY_MAX_MS),
            reply_phrases: REPLY_PHRASES.iter().map(|p| p.to_string()).collect(),
            rng_seed: None,
        }
    }
}

impl ChatConfig {
    /// Simulated replies disabled; useful for tests that count messages.
    pub fn silent() -> Self {
        Self {
            reply_probability: 0.0,
            ..Self::default()
        }
    }

    /// Probability clamped into [0, 1]; NaN counts as 0.
    pub(crate) fn clamped_probability(&self) -> f64 {
        if self.reply_probability.is_nan() {
            0.0
        } else {
            self.reply_probability.clamp(0.0, 1.0)
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            session: SessionConfig::default(),
            chat: ChatConfig::default(),
            typing_quiet: Duration::from_millis(DEFAULT_TYPING_QUIET_MS),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("CHATME_DB_PATH") {
            if !path.is_empty() {
                config.db_path = Some(PathBuf::from(path));
            }
        }

        if let Some(ms) = parse_var::<u64, _>(&lookup, "CHATME_LOGIN_LATENCY_MS") {
            config.session.latency = Duration::from_millis(ms);
        }

        if let Some(p) = parse_var::<f64, _>(&lookup, "CHATME_REPLY_PROBABILITY") {
            if (0.0..=1.0).contains(&p) {
                config.chat.reply_probability = p;
            } else {
                tracing::warn!(value = p, "CHATME_REPLY_PROBABILITY outside [0, 1], using default");
            }
        }

        if let Some(ms) = parse_var::<u64, _>(&lookup, "CHATME_REPLY_DELAY_MIN_MS") {
            config.chat.reply_delay_min = Duration::from_millis(ms);
        }

        if let Some(ms) = parse_var::<u64, _>(&lookup, "CHATME_REPLY_DELAY_MAX_MS") {
            config.chat.reply_delay_max = Duration::from_millis(ms);
        }

        if config.chat.reply_delay_max < config.chat.reply_delay_min {
            tracing::warn!(
                min = ?config.chat.reply_delay_min,
                max = ?config.chat.reply_delay_max,
                "Reply delay max below min, collapsing window to min"
            );
            config.chat.reply_delay_max = config.chat.reply_delay_min;
        }

        if let Some(ms) = parse_var::<u64, _>(&lookup, "CHATME_TYPING_QUIET_MS") {
            config.typing_quiet = Duration::from_millis(ms);
        }

        if let Some(seed) = parse_var::<u64, _>(&lookup, "CHATME_RNG_SEED") {
            config.session.rng_seed = Some(seed);
            config.chat.rng_seed = Some(seed);
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Invalid value, using default");
            None
        }
    }
}

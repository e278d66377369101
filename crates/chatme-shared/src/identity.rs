use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{AVATAR_PHOTO_BASE, AVATAR_PHOTO_SPREAD, MIN_PASSWORD_LEN};
use crate::error::ValidationError;
use crate::types::{IdentityStatus, UserId};

/// The signed-in user's profile record.
/// This is the only piece of state that survives a restart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub avatar: String,
    pub status: IdentityStatus,
    pub last_seen: DateTime<Utc>,
}

impl Identity {
    /// Mint a brand-new identity with a fresh id and a generated avatar.
    pub fn register<R: Rng>(
        username: &str,
        email: &str,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Self {
        Self {
            id: UserId::new(),
            username: username.to_string(),
            email: email.to_string(),
            avatar: generated_avatar(rng),
            status: IdentityStatus::Online,
            last_seen: now,
        }
    }

    /// Copy of this identity marked online as of `now`.
    pub fn signed_in(&self, now: DateTime<Utc>) -> Self {
        Self {
            status: IdentityStatus::Online,
            last_seen: now,
            ..self.clone()
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Build a pseudo-random stock-photo avatar reference.
pub fn generated_avatar<R: Rng>(rng: &mut R) -> String {
    let a = AVATAR_PHOTO_BASE + rng.gen_range(0..AVATAR_PHOTO_SPREAD);
    let b = AVATAR_PHOTO_BASE + rng.gen_range(0..AVATAR_PHOTO_SPREAD);
    format!(
        "https://images.pexels.com/photos/{a}/pexels-photo-{b}.jpeg?auto=compress&cs=tinysrgb&w=150&h=150&fit=crop"
    )
}

/// Registration precondition callers check before invoking `register`.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            len,
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

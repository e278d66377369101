//! Known-user directories.
//!
//! [`UserDirectory`] is what the session manager authenticates against;
//! [`Roster`] is the presence list the chat store reads. Both are plain
//! values handed to constructors so tests can substitute fixtures. The
//! `demo()` constructors reproduce the stock demo data.

use chrono::{DateTime, Utc};

use chatme_shared::constants::DEMO_SECRET;
use chatme_shared::{Identity, IdentityStatus, OnlineUser, Presence, UserId};

const AVATAR_RAHUL: &str = "https://images.pexels.com/photos/2379004/pexels-photo-2379004.jpeg?auto=compress&cs=tinysrgb&w=150&h=150&fit=crop";
const AVATAR_PRIYA: &str = "https://images.pexels.com/photos/1130626/pexels-photo-1130626.jpeg?auto=compress&cs=tinysrgb&w=150&h=150&fit=crop";
const AVATAR_AMIT: &str = "https://images.pexels.com/photos/2379005/pexels-photo-2379005.jpeg?auto=compress&cs=tinysrgb&w=150&h=150&fit=crop";
const AVATAR_SNEHA: &str = "https://images.pexels.com/photos/1239291/pexels-photo-1239291.jpeg?auto=compress&cs=tinysrgb&w=150&h=150&fit=crop";
const AVATAR_VIKRAM: &str = "https://images.pexels.com/photos/2182970/pexels-photo-2182970.jpeg?auto=compress&cs=tinysrgb&w=150&h=150&fit=crop";

// ---------------------------------------------------------------------------
// User directory
// ---------------------------------------------------------------------------

/// Identities that can sign in, all sharing one secret.
#[derive(Debug, Clone)]
pub struct UserDirectory {
    users: Vec<Identity>,
    secret: String,
}

impl UserDirectory {
    pub fn new(users: Vec<Identity>, secret: impl Into<String>) -> Self {
        Self {
            users,
            secret: secret.into(),
        }
    }

    /// The two stock demo accounts, sharing [`DEMO_SECRET`].
    pub fn demo(now: DateTime<Utc>) -> Self {
        let user = |id: &str, username: &str, email: &str, avatar: &str| Identity {
            id: UserId::from(id),
            username: username.to_string(),
            email: email.to_string(),
            avatar: avatar.to_string(),
            status: IdentityStatus::Online,
            last_seen: now,
        };

        Self::new(
            vec![
                user("1", "rahul_sharma", "rahul@example.com", AVATAR_RAHUL),
                user("2", "priya_patel", "priya@example.com", AVATAR_PRIYA),
            ],
            DEMO_SECRET,
        )
    }

    pub fn find(&self, username: &str) -> Option<&Identity> {
        self.users.iter().find(|u| u.username == username)
    }

    /// Returns the matching identity iff the username exists and the
    /// password equals the shared secret.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<&Identity> {
        self.find(username).filter(|_| password == self.secret)
    }

    pub fn users(&self) -> &[Identity] {
        &self.users
    }
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// Fixed presence directory of peers. Not derived from live connections.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    users: Vec<OnlineUser>,
}

impl Roster {
    pub fn new(users: Vec<OnlineUser>) -> Self {
        Self { users }
    }

    pub fn demo() -> Self {
        Self::new(vec![
            OnlineUser::new("2", "priya_patel", AVATAR_PRIYA, Presence::Online),
            OnlineUser::new("3", "amit_kumar", AVATAR_AMIT, Presence::Away),
            OnlineUser::new("4", "sneha_singh", AVATAR_SNEHA, Presence::Online),
            OnlineUser::new("5", "vikram_gupta", AVATAR_VIKRAM, Presence::Busy),
        ])
    }

    pub fn users(&self) -> &[OnlineUser] {
        &self.users
    }

    pub fn get(&self, id: &UserId) -> Option<&OnlineUser> {
        self.users.iter().find(|u| &u.id == id)
    }

    pub fn username(&self, id: &UserId) -> Option<&str> {
        self.get(id).map(|u| u.username.as_str())
    }

    /// Entries whose presence is exactly `online`.
    pub fn online_count(&self) -> usize {
        self.users
            .iter()
            .filter(|u| u.status == Presence::Online)
            .count()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticate_requires_known_user_and_secret() {
        let dir = UserDirectory::demo(Utc::now());

        assert!(dir.authenticate("rahul_sharma", DEMO_SECRET).is_some());
        assert!(dir.authenticate("rahul_sharma", "wrong").is_none());
        assert!(dir.authenticate("nobody", DEMO_SECRET).is_none());
        assert!(dir.authenticate("", "").is_none());
    }

    #[test]
    fn test_custom_secret() {
        let dir = UserDirectory::new(UserDirectory::demo(Utc::now()).users().to_vec(), "hunter22");
        assert!(dir.authenticate("priya_patel", "hunter22").is_some());
        assert!(dir.authenticate("priya_patel", DEMO_SECRET).is_none());
    }

    #[test]
    fn test_roster_lookup_and_online_count() {
        let roster = Roster::demo();
        assert_eq!(roster.len(), 4);
        assert_eq!(roster.online_count(), 2);
        assert_eq!(roster.username(&UserId::from("3")), Some("amit_kumar"));
        assert!(roster.get(&UserId::from("1")).is_none());
    }
}

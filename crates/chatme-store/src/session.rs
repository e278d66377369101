//! Persistence of the signed-in [`Identity`].
//!
//! The record is the JSON-serialized identity stored under
//! [`SESSION_STORAGE_KEY`].  There is no schema version on the record.

use chatme_shared::constants::SESSION_STORAGE_KEY;
use chatme_shared::Identity;

use crate::error::Result;
use crate::kv::KvStore;

/// Load / save / clear the persisted identity on any [`KvStore`].
pub trait SessionStore: KvStore {
    fn load_identity(&self) -> Result<Option<Identity>> {
        match self.get(SESSION_STORAGE_KEY)? {
            Some(json) => Ok(Some(Identity::from_json(&json)?)),
            None => Ok(None),
        }
    }

    fn save_identity(&self, identity: &Identity) -> Result<()> {
        let json = identity.to_json()?;
        self.put(SESSION_STORAGE_KEY, &json)
    }

    fn clear_identity(&self) -> Result<bool> {
        self.remove(SESSION_STORAGE_KEY)
    }
}

impl<T: KvStore + ?Sized> SessionStore for T {}

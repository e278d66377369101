//! # chatme-store
//!
//! Durable storage for the Chat Me session layer.
//!
//! The only record that survives a restart is the signed-in identity, kept as
//! a JSON blob under a fixed key.  The crate exposes a small key/value
//! abstraction ([`KvStore`]) with two backends: a SQLite [`Database`] and an
//! in-memory [`MemoryStore`] for tests.  [`SessionStore`] layers the identity
//! record on top of any backend.

pub mod database;
pub mod kv;
pub mod memory;
pub mod migrations;
pub mod session;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use kv::KvStore;
pub use memory::MemoryStore;
pub use session::SessionStore;

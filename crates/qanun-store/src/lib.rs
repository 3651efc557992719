//! Qanun Storage crate - keyed JSON persistence for chats and users.
//!
//! Provides a pluggable document backend (one JSON file per record, or an
//! in-memory map for tests) and the two entity stores built on top of it,
//! with ownership enforcement and uniqueness validation.

pub mod backend;
pub mod chats;
pub mod error;
pub mod users;

pub use backend::{JsonFileBackend, MemoryBackend, StorageBackend};
pub use chats::ChatStore;
pub use error::{Result, StoreError};
pub use users::{NewUser, UserStore};

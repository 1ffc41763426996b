//! Lumen Session - durable-for-tab session persistence
//!
//! A small key/value store abstraction for session secrets, with change
//! notification for observers in the same process and an entry point for
//! externally originated changes (another tab writing the same key). The
//! store is injected as a capability: code that runs without a storage
//! context gets the null implementation and sees every key as absent.

pub mod fields;
pub mod memory;
pub mod store;

pub use fields::{clear_session, load_session, save_session, SessionField};
pub use memory::MemorySessionStore;
pub use store::{ChangeEvent, ChangeOrigin, NullSessionStore, SessionStore};

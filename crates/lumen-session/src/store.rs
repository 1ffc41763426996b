//! Session store contract and the null implementation

use tokio::sync::broadcast;

/// Where a change came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// A set/clear through this store handle
    Local,
    /// A change applied from outside (another tab writing the same key)
    External,
}

/// A single key change
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub key: String,
    /// The new value, or None when the key was cleared
    pub value: Option<String>,
    pub origin: ChangeOrigin,
}

/// Key/value persistence for session secrets.
///
/// All operations are total: when storage is unavailable the implementation
/// returns absent and ignores writes rather than failing. Callers treat
/// absence as "session not started".
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn clear(&self, key: &str);

    /// Subscribe to change events for every key in this store
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

/// Null-object store for contexts with no storage at all: every read is
/// absent, every write a no-op, and no event is ever delivered.
pub struct NullSessionStore {
    events: broadcast::Sender<ChangeEvent>,
}

impl NullSessionStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(1);
        Self { events }
    }
}

impl Default for NullSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for NullSessionStore {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: &str) {}

    fn clear(&self, _key: &str) {}

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }
}

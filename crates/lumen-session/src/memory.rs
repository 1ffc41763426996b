//! In-memory session store with change notification

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::broadcast;
use tracing::debug;

use crate::store::{ChangeEvent, ChangeOrigin, SessionStore};

/// Broadcast capacity; subscribers that lag past this simply miss events,
/// which is acceptable for cache-invalidation style notification.
const EVENT_CAPACITY: usize = 64;

/// In-memory store backing one logical tab. `apply_external` models a write
/// arriving from another tab against the same underlying storage.
pub struct MemorySessionStore {
    inner: RwLock<HashMap<String, String>>,
    events: broadcast::Sender<ChangeEvent>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Apply a change that originated outside this handle. Observers see it
    /// with `ChangeOrigin::External`.
    pub fn apply_external(&self, key: &str, value: Option<&str>) {
        {
            let mut map = self.inner.write().expect("session store lock poisoned");
            match value {
                Some(v) => {
                    map.insert(key.to_string(), v.to_string());
                }
                None => {
                    map.remove(key);
                }
            }
        }
        self.notify(key, value, ChangeOrigin::External);
    }

    fn notify(&self, key: &str, value: Option<&str>, origin: ChangeOrigin) {
        // Send fails only when nobody is subscribed
        let _ = self.events.send(ChangeEvent {
            key: key.to_string(),
            value: value.map(str::to_string),
            origin,
        });
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner
            .read()
            .expect("session store lock poisoned")
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.inner
            .write()
            .expect("session store lock poisoned")
            .insert(key.to_string(), value.to_string());
        debug!(key, "session field set");
        self.notify(key, Some(value), ChangeOrigin::Local);
    }

    fn clear(&self, key: &str) {
        self.inner
            .write()
            .expect("session store lock poisoned")
            .remove(key);
        debug!(key, "session field cleared");
        self.notify(key, None, ChangeOrigin::Local);
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }
}

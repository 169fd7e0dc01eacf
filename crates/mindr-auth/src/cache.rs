//! Session-scoped cache seam.
//!
//! The original client kept the calendar credential in browser session
//! storage so it survived page reloads but not the end of the session. This
//! trait models that storage; the in-memory implementation covers the common
//! case and tests.

use std::collections::HashMap;
use std::sync::Mutex;

/// Key/value cache with session lifetime.
pub trait SessionCache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

/// Process-lifetime cache backed by a mutex-guarded map.
#[derive(Debug, Default)]
pub struct InMemorySessionCache {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionCache for InMemorySessionCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .expect("session cache mutex poisoned")
            .get(key)
            .cloned()
    }

    fn put(&self, key: &str, value: String) {
        self.entries
            .lock()
            .expect("session cache mutex poisoned")
            .insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.entries
            .lock()
            .expect("session cache mutex poisoned")
            .remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_remove() {
        let cache = InMemorySessionCache::new();
        assert!(cache.get("k").is_none());

        cache.put("k", "v1".to_string());
        assert_eq!(cache.get("k").as_deref(), Some("v1"));

        // Last writer wins.
        cache.put("k", "v2".to_string());
        assert_eq!(cache.get("k").as_deref(), Some("v2"));

        cache.remove("k");
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn test_remove_missing_key_is_noop() {
        let cache = InMemorySessionCache::new();
        cache.remove("absent");
        assert!(cache.get("absent").is_none());
    }
}

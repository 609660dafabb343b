use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tokio::sync::broadcast;

use crate::backend::{BackendError, StorageBackend, StorageEvent, CHANGE_CHANNEL_CAPACITY};

/// In-process backend. Share one instance (behind an `Arc`) between stores
/// to model several tabs of one profile.
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
    changes: broadcast::Sender<StorageEvent>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            entries: Mutex::new(HashMap::new()),
            quota: None,
            changes,
        }
    }

    /// Reject any single value larger than `limit` bytes.
    pub fn with_quota(limit: usize) -> Self {
        Self {
            quota: Some(limit),
            ..Self::new()
        }
    }

    /// Put a raw value without notifying anyone, e.g. to plant corrupt data.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    fn notify(&self, key: &str, origin: &str) {
        // No receivers is fine.
        let _ = self.changes.send(StorageEvent {
            key: key.to_string(),
            origin: Some(origin.to_string()),
        });
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, BackendError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str, origin: &str) -> Result<(), BackendError> {
        if let Some(limit) = self.quota {
            if value.len() > limit {
                return Err(BackendError::QuotaExceeded {
                    key: key.to_string(),
                    size: value.len(),
                    limit,
                });
            }
        }
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        self.notify(key, origin);
        Ok(())
    }

    fn remove(&self, key: &str, origin: &str) -> Result<(), BackendError> {
        let removed = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        if removed.is_some() {
            self.notify(key, origin);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_remove() {
        let backend = MemoryBackend::new();
        assert!(backend.read("k").unwrap().is_none());
        backend.write("k", "v", "a").unwrap();
        assert_eq!(backend.read("k").unwrap().as_deref(), Some("v"));
        backend.remove("k", "a").unwrap();
        assert!(backend.read("k").unwrap().is_none());
    }

    #[test]
    fn writes_are_broadcast_with_origin() {
        let backend = MemoryBackend::new();
        let mut rx = backend.subscribe();
        backend.write("k", "v", "tab_a").unwrap();
        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.key, "k");
        assert_eq!(ev.origin.as_deref(), Some("tab_a"));
    }

    #[test]
    fn quota_rejects_large_values_and_keeps_old_value() {
        let backend = MemoryBackend::with_quota(4);
        backend.write("k", "tiny", "a").unwrap();
        let err = backend.write("k", "too large", "a").unwrap_err();
        assert!(matches!(err, BackendError::QuotaExceeded { limit: 4, .. }));
        assert_eq!(backend.read("k").unwrap().as_deref(), Some("tiny"));
    }

    #[test]
    fn removing_missing_key_is_silent() {
        let backend = MemoryBackend::new();
        let mut rx = backend.subscribe();
        backend.remove("nothing", "a").unwrap();
        assert!(rx.try_recv().is_err());
    }
}

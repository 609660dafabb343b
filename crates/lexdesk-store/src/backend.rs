use thiserror::Error;
use tokio::sync::broadcast;

/// Capacity of each backend's change channel. Slow subscribers lag rather than block writers.
pub const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage quota exceeded writing '{key}' ({size} bytes, limit {limit})")]
    QuotaExceeded {
        key: String,
        size: usize,
        limit: usize,
    },
    #[error("invalid storage key: '{0}'")]
    InvalidKey(String),
}

/// A change to one storage key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    /// Writer that made the change, or `None` when it came from outside this
    /// process (another process sharing the same files).
    pub origin: Option<String>,
}

/// A string key/value store shared by every [`crate::StateStore`] handle of one profile.
///
/// Writes replace the whole value; there is no partial update and no
/// cross-writer transaction. The last write wins.
pub trait StorageBackend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// Replace the value under `key`. `origin` identifies the writer so it can
    /// skip its own change notifications.
    fn write(&self, key: &str, value: &str, origin: &str) -> Result<(), BackendError>;

    fn remove(&self, key: &str, origin: &str) -> Result<(), BackendError>;

    /// Receive every subsequent change, including the subscriber's own.
    fn subscribe(&self) -> broadcast::Receiver<StorageEvent>;
}

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::backend::{BackendError, StorageBackend, StorageEvent, CHANGE_CHANNEL_CAPACITY};
use crate::{replace_file, StoreLock};

const EXTENSION: &str = "json";

/// Content hash of every key as last written or observed by this process.
type Seen = Arc<Mutex<HashMap<String, blake3::Hash>>>;

/// Directory-backed storage: each key lives in `<root>/<key>.json`.
///
/// Writes are atomic (temp file + rename) and serialised across processes by
/// an exclusive lock on `<root>/.lock`. Changes made by other processes are
/// picked up by a polling [`Watcher`].
pub struct FileBackend {
    root: PathBuf,
    seen: Seen,
    changes: broadcast::Sender<StorageEvent>,
}

impl FileBackend {
    pub fn open(root: &Path) -> Result<Self, BackendError> {
        fs::create_dir_all(root)?;
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            root: root.to_path_buf(),
            seen: Arc::new(Mutex::new(HashMap::new())),
            changes,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, BackendError> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}.{EXTENSION}")))
    }

    /// Start polling the directory every `interval` for changes made outside
    /// this process. Polling stops when the returned guard is dropped.
    pub fn watch(&self, interval: Duration) -> Watcher {
        prime(&self.root, &self.seen);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let root = self.root.clone();
        let seen = Arc::clone(&self.seen);
        let changes = self.changes.clone();
        let handle = std::thread::spawn(move || loop {
            match stop_rx.recv_timeout(interval) {
                Err(mpsc::RecvTimeoutError::Timeout) => poll_once(&root, &seen, &changes),
                _ => break,
            }
        });
        Watcher {
            stop: Some(stop_tx),
            handle: Some(handle),
        }
    }

    fn notify(&self, key: &str, origin: &str) {
        let _ = self.changes.send(StorageEvent {
            key: key.to_string(),
            origin: Some(origin.to_string()),
        });
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>, BackendError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str, origin: &str) -> Result<(), BackendError> {
        let path = self.path_for(key)?;
        let _lock = StoreLock::acquire(&self.root)?;
        // Held across the write so the watcher never mistakes it for a foreign change.
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        replace_file(&path, value.as_bytes())?;
        seen.insert(key.to_string(), blake3::hash(value.as_bytes()));
        drop(seen);
        self.notify(key, origin);
        Ok(())
    }

    fn remove(&self, key: &str, origin: &str) -> Result<(), BackendError> {
        let path = self.path_for(key)?;
        let _lock = StoreLock::acquire(&self.root)?;
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        }
        seen.remove(key);
        drop(seen);
        self.notify(key, origin);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.changes.subscribe()
    }
}

/// Guard for a running directory poller.
pub struct Watcher {
    stop: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Drop for Watcher {
    fn drop(&mut self) {
        // Dropping the sender wakes the poller immediately.
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Keys are file stems: ASCII letters, digits, `_`, `-` and `.`, not starting with `.`.
fn validate_key(key: &str) -> Result<(), BackendError> {
    let ok = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if ok {
        Ok(())
    } else {
        Err(BackendError::InvalidKey(key.to_string()))
    }
}

fn list_keys(root: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut keys = Vec::new();
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            if validate_key(stem).is_ok() {
                keys.push((stem.to_string(), path));
            }
        }
    }
    Ok(keys)
}

/// Record current hashes for keys not seen yet, without emitting events.
fn prime(root: &Path, seen: &Seen) {
    let Ok(keys) = list_keys(root) else {
        return;
    };
    let mut seen = seen.lock().unwrap_or_else(PoisonError::into_inner);
    for (key, path) in keys {
        if seen.contains_key(&key) {
            continue;
        }
        if let Ok(bytes) = fs::read(&path) {
            seen.insert(key, blake3::hash(&bytes));
        }
    }
}

fn poll_once(root: &Path, seen: &Seen, changes: &broadcast::Sender<StorageEvent>) {
    let keys = match list_keys(root) {
        Ok(k) => k,
        Err(e) => {
            warn!(root = %root.display(), error = %e, "cannot scan storage directory");
            return;
        }
    };
    let mut seen = seen.lock().unwrap_or_else(PoisonError::into_inner);
    let mut changed = Vec::new();
    for (key, path) in &keys {
        let Ok(bytes) = fs::read(path) else {
            continue;
        };
        let hash = blake3::hash(&bytes);
        if seen.get(key) != Some(&hash) {
            seen.insert(key.clone(), hash);
            changed.push(key.clone());
        }
    }
    let gone: Vec<String> = seen
        .keys()
        .filter(|k| !keys.iter().any(|(key, _)| key == *k))
        .cloned()
        .collect();
    for key in gone {
        seen.remove(&key);
        changed.push(key);
    }
    drop(seen);
    for key in changed {
        debug!(key = %key, "external storage change");
        let _ = changes.send(StorageEvent { key, origin: None });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_remove_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(tmp.path()).unwrap();
        assert!(backend.read("state").unwrap().is_none());
        backend.write("state", "{\"a\":1}", "tab").unwrap();
        assert_eq!(
            fs::read_to_string(tmp.path().join("state.json")).unwrap(),
            "{\"a\":1}"
        );
        assert_eq!(backend.read("state").unwrap().as_deref(), Some("{\"a\":1}"));
        backend.remove("state", "tab").unwrap();
        assert!(backend.read("state").unwrap().is_none());
        backend.remove("state", "tab").unwrap();
    }

    #[test]
    fn rejects_path_like_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(tmp.path()).unwrap();
        for key in ["../escape", "a/b", "", ".lock"] {
            assert!(matches!(
                backend.write(key, "x", "tab"),
                Err(BackendError::InvalidKey(_))
            ));
        }
    }

    #[test]
    fn poll_reports_foreign_writes_only() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(tmp.path()).unwrap();
        let mut rx = backend.subscribe();

        backend.write("state", "mine", "tab").unwrap();
        assert_eq!(rx.try_recv().unwrap().origin.as_deref(), Some("tab"));

        poll_once(&backend.root, &backend.seen, &backend.changes);
        assert!(rx.try_recv().is_err());

        fs::write(tmp.path().join("state.json"), "theirs").unwrap();
        poll_once(&backend.root, &backend.seen, &backend.changes);
        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.key, "state");
        assert!(ev.origin.is_none());

        fs::remove_file(tmp.path().join("state.json")).unwrap();
        poll_once(&backend.root, &backend.seen, &backend.changes);
        assert_eq!(rx.try_recv().unwrap().key, "state");
    }

    #[test]
    fn prime_suppresses_preexisting_files() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("state.json"), "old").unwrap();
        let backend = FileBackend::open(tmp.path()).unwrap();
        let mut rx = backend.subscribe();
        prime(&backend.root, &backend.seen);
        poll_once(&backend.root, &backend.seen, &backend.changes);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn watcher_stops_on_drop() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(tmp.path()).unwrap();
        let watcher = backend.watch(Duration::from_secs(3600));
        drop(watcher);
    }
}

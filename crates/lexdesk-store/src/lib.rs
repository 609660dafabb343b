//! Persisted application state.
//!
//! A [`StateStore`] owns one JSON document under one storage key. Several
//! stores sharing a [`StorageBackend`] observe each other's writes through
//! [`Subscription`]s, the way browser tabs sharing a profile do.

pub mod backend;
pub mod file;
pub mod memory;
pub mod store;

use fs2::FileExt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub use backend::{BackendError, StorageBackend, StorageEvent};
pub use file::{FileBackend, Watcher};
pub use memory::MemoryBackend;
pub use store::{StateStore, StoreError, Subscription, STATE_KEY};

/// Return the per-user data root.
///
/// `LEXDESK_HOME` wins; otherwise the platform data dir (`~/.local/share/lexdesk`,
/// `%APPDATA%\lexdesk`), falling back to `~/.lexdesk`.
pub fn store_root() -> PathBuf {
    if let Ok(home) = std::env::var("LEXDESK_HOME") {
        if !home.trim().is_empty() {
            return PathBuf::from(home);
        }
    }
    if let Some(data_dir) = dirs::data_dir() {
        data_dir.join("lexdesk")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".lexdesk")
    } else {
        PathBuf::from(".lexdesk-store")
    }
}

/// Replace `path` with `data`. Readers see the old content or the new
/// content, never a partial file.
///
/// The data is staged in a dot-prefixed `.tmp` file beside `path` (which the
/// watcher ignores), synced, then renamed over the target.
pub fn replace_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut staged = tempfile::Builder::new()
        .prefix(".lexdesk-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    staged.write_all(data)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Exclusive advisory lock on a store directory, released on drop.
///
/// Serialises writers across processes. Readers never take it; they rely on
/// [`replace_file`] instead.
#[derive(Debug)]
pub struct StoreLock {
    file: fs::File,
    path: PathBuf,
}

impl StoreLock {
    /// Lock file name inside a store directory.
    pub const FILE_NAME: &'static str = ".lock";

    /// Block until this process holds the lock on `dir`.
    pub fn acquire(dir: &Path) -> std::io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(Self::FILE_NAME);
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;
        FileExt::lock_exclusive(&file)?;
        debug!(path = %path.display(), "store lock acquired");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "could not release store lock");
        }
    }
}

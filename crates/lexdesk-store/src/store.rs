use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lexdesk_core::{ids, seed_state, AppState, StateError, SCHEMA_VERSION};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};

use crate::backend::{BackendError, StorageBackend, StorageEvent};

/// Storage key holding the application state.
pub const STATE_KEY: &str = "lexdesk_v1";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Rejected(#[from] StateError),
    #[error("failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),
    /// The mutation was applied in memory but could not be written. `state`
    /// is what this handle now serves; other handles do not see it.
    #[error("state kept in memory but not persisted: {source}")]
    Persist {
        #[source]
        source: BackendError,
        state: Box<AppState>,
    },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Single source of truth for [`AppState`] within one handle ("tab").
///
/// Reads return owned copies; mutations run against a private deep copy and
/// replace the whole persisted document. Mutations through one handle are
/// serialised; across handles the last write wins.
///
/// `metrics.totalDocuments` is recomputed from `documents` on every load and
/// after every mutation.
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn StorageBackend>,
    key: String,
    origin: String,
    cache: Mutex<Cache>,
}

#[derive(Default)]
struct Cache {
    state: Option<AppState>,
    /// `state` holds a mutation the backend refused; serve it until a write succeeds.
    dirty: bool,
}

impl StateStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_key(backend, STATE_KEY)
    }

    pub fn with_key(backend: Arc<dyn StorageBackend>, key: &str) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                key: key.to_string(),
                origin: ids::new_id("tab"),
                cache: Mutex::new(Cache::default()),
            }),
        }
    }

    /// Identifier this handle writes under.
    pub fn origin(&self) -> &str {
        &self.inner.origin
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    fn lock_cache(&self) -> MutexGuard<'_, Cache> {
        self.inner.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state. First run persists and returns the seed; corrupt data
    /// also yields the seed. Never fails.
    pub fn load(&self) -> AppState {
        let mut cache = self.lock_cache();
        if cache.dirty {
            if let Some(state) = &cache.state {
                return state.clone();
            }
        }
        let state = self.read_persisted(cache.state.as_ref());
        cache.state = Some(state.clone());
        state
    }

    /// Apply `f` to a private copy, persist the result and return it.
    pub fn mutate<F>(&self, f: F) -> Result<AppState, StoreError>
    where
        F: FnOnce(&mut AppState),
    {
        self.try_mutate(|state| {
            f(state);
            Ok(())
        })
        .map(|(state, ())| state)
    }

    /// Like [`mutate`](Self::mutate), but `f` may reject the change, in which
    /// case nothing is written and the state is unchanged.
    pub fn try_mutate<T, F>(&self, f: F) -> Result<(AppState, T), StoreError>
    where
        F: FnOnce(&mut AppState) -> Result<T, StateError>,
    {
        let mut cache = self.lock_cache();
        let mut next = match (&cache.state, cache.dirty) {
            (Some(state), true) => state.clone(),
            _ => self.read_persisted(cache.state.as_ref()),
        };
        let out = f(&mut next)?;
        next.reconcile_metrics();
        let encoded = serde_json::to_string(&next)?;

        cache.state = Some(next.clone());
        match self
            .inner
            .backend
            .write(&self.inner.key, &encoded, &self.inner.origin)
        {
            Ok(()) => {
                cache.dirty = false;
                Ok((next, out))
            }
            Err(source) => {
                warn!(key = %self.inner.key, error = %source, "state not persisted; keeping in-memory copy");
                cache.dirty = true;
                Err(StoreError::Persist {
                    source,
                    state: Box::new(next),
                })
            }
        }
    }

    /// Drop the persisted state and start over from the seed.
    pub fn reset(&self) -> Result<AppState, StoreError> {
        let mut cache = self.lock_cache();
        self.inner
            .backend
            .remove(&self.inner.key, &self.inner.origin)?;
        *cache = Cache::default();
        let state = self.read_persisted(None);
        cache.state = Some(state.clone());
        Ok(state)
    }

    /// Re-read after another writer changed the key. Their write wins over an
    /// unpersisted local mutation.
    pub fn refresh(&self) -> AppState {
        self.lock_cache().dirty = false;
        self.load()
    }

    /// Observe writes made by other handles sharing the backend.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            store: self.clone(),
            rx: self.inner.backend.subscribe(),
        }
    }

    fn read_persisted(&self, fallback: Option<&AppState>) -> AppState {
        let key = &self.inner.key;
        match self.inner.backend.read(key) {
            Ok(Some(raw)) => match decode(key, &raw) {
                Some(mut state) => {
                    let assigned = state.fill_missing_ids();
                    if assigned > 0 {
                        debug!(key = %key, assigned, "assigned ids to stored records");
                        self.write_back(&state, "could not persist repaired ids");
                    }
                    state
                }
                None => seed_state(),
            },
            Ok(None) => {
                let seed = seed_state();
                self.write_back(&seed, "could not persist seed state");
                seed
            }
            Err(e) => {
                warn!(key = %key, error = %e, "cannot read persisted state");
                fallback.cloned().unwrap_or_else(seed_state)
            }
        }
    }

    /// Best-effort write made on the read path. Failure only costs a warning.
    fn write_back(&self, state: &AppState, failure: &str) {
        let key = &self.inner.key;
        if let Ok(encoded) = serde_json::to_string(state) {
            if let Err(e) = self.inner.backend.write(key, &encoded, &self.inner.origin) {
                warn!(key = %key, error = %e, "{failure}");
            }
        }
    }
}

/// Parse a persisted blob. Anything that is not a JSON object is treated as
/// absent; inside an object, unreadable fields and records degrade on their
/// own (see `lexdesk_core::lenient`).
fn decode(key: &str, raw: &str) -> Option<AppState> {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!(key = %key, error = %e, "persisted state is corrupt; using seed");
            return None;
        }
    };
    if !value.is_object() {
        warn!(key = %key, "persisted state is not an object; using seed");
        return None;
    }
    let mut state: AppState = match serde_json::from_value(value) {
        Ok(s) => s,
        Err(e) => {
            warn!(key = %key, error = %e, "persisted state is unreadable; using seed");
            return None;
        }
    };
    if state.schema_version > SCHEMA_VERSION {
        warn!(
            key = %key,
            found = state.schema_version,
            supported = SCHEMA_VERSION,
            "persisted state written by a newer version; loading best-effort"
        );
    }
    state.reconcile_metrics();
    Some(state)
}

/// Change feed for one [`StateStore`]: yields the fresh state each time
/// another handle writes the store's key.
pub struct Subscription {
    store: StateStore,
    rx: broadcast::Receiver<StorageEvent>,
}

impl Subscription {
    fn is_foreign(&self, event: &StorageEvent) -> bool {
        event.key == self.store.inner.key
            && event.origin.as_deref() != Some(self.store.inner.origin.as_str())
    }

    /// Wait for the next foreign change. `None` once the backend is gone.
    pub async fn changed(&mut self) -> Option<AppState> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.is_foreign(&event) => return Some(self.store.refresh()),
                Ok(_) => continue,
                Err(RecvError::Lagged(missed)) => {
                    debug!(missed, "change feed lagged; reloading");
                    return Some(self.store.refresh());
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Drain pending notifications without waiting. Returns the fresh state
    /// if any of them was a foreign change.
    pub fn try_changed(&mut self) -> Option<AppState> {
        let mut changed = false;
        loop {
            match self.rx.try_recv() {
                Ok(event) => changed |= self.is_foreign(&event),
                Err(TryRecvError::Lagged(_)) => changed = true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        changed.then(|| self.store.refresh())
    }
}

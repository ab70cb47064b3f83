use crate::StoreMap;
use crate::error::StoreError;
use crate::options::StoreOptions;
use crate::persistence::{EncryptedFile, json_kind};
use estore_bridge::{ChannelSet, WindowHandle, WindowId};
use parking_lot::RwLock;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, trace, warn};

#[derive(Debug)]
struct StoreInner {
    name: String,
    channels: ChannelSet,
    defaults: StoreMap,
    file: EncryptedFile,
    state: Mutex<StoreMap>,
    observers: RwLock<Vec<WindowHandle>>,
}

/// The authoritative copy of one named store.
///
/// Every mutation persists before it returns and then pushes the full store to each observer
/// on the store's `UPDATED` channel. Mutations are serialized: the state lock is held across
/// the write, so the order observed on disk and by observers is the order of the calls.
///
/// Cheap to clone; clones share the same store.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    inner: Arc<StoreInner>,
}

impl StoreHandle {
    /// Loads (or seeds) the store file described by already validated `options`.
    ///
    /// Corrupt or unreadable files are replaced by the defaults. When the platform encryption
    /// is unavailable a warning is logged and the fallback key is used.
    ///
    /// # Errors
    /// Returns a write error if seeding the file fails.
    pub(crate) async fn open(options: StoreOptions, file: EncryptedFile) -> Result<Self, StoreError> {
        if !file.is_encryption_available() {
            warn!(
                store = %options.store_name,
                "Encryption is not available. Data will be encrypted via hardcoded plaintext password."
            );
        }

        let state = file.load(&options.defaults).await?;
        debug!(store = %options.store_name, path = %file.path().display(), keys = state.len(), "Store opened");

        Ok(Self {
            inner: Arc::new(StoreInner {
                channels: ChannelSet::for_store(&options.store_name),
                name: options.store_name,
                defaults: options.defaults,
                file,
                state: Mutex::new(state),
                observers: RwLock::new(options.observers),
            }),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Location of the backing file: `<data_dir>/<name>.<ext>`.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.file.path()
    }

    #[must_use]
    pub fn channels(&self) -> &ChannelSet {
        &self.inner.channels
    }

    /// The creation-time defaults. Never changes.
    #[must_use]
    pub fn defaults(&self) -> &StoreMap {
        &self.inner.defaults
    }

    /// Current value at `key`.
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.inner.state.lock().await.get(key).cloned()
    }

    /// Current value at `key`; if absent, stores `fallback` first.
    ///
    /// The write is persisted and pushed like any other mutation, so later reads see it.
    ///
    /// # Errors
    /// Propagates the write error when materializing the fallback.
    pub async fn get_or_insert(&self, key: &str, fallback: Value) -> Result<Value, StoreError> {
        let mut state = self.inner.state.lock().await;
        if let Some(value) = state.get(key) {
            return Ok(value.clone());
        }
        state.insert(key.to_owned(), fallback.clone());
        self.commit(&state).await?;
        Ok(fallback)
    }

    /// Sets one key.
    ///
    /// # Errors
    /// Propagates the write error.
    pub async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut state = self.inner.state.lock().await;
        state.insert(key.to_owned(), value);
        self.commit(&state).await
    }

    /// Shallow-merges `values` into the store: top-level keys are overwritten wholesale.
    ///
    /// # Errors
    /// Propagates the write error.
    pub async fn set_many(&self, values: StoreMap) -> Result<(), StoreError> {
        let mut state = self.inner.state.lock().await;
        state.extend(values);
        self.commit(&state).await
    }

    /// Removes `key`. Absent keys are not an error; the store is still persisted and pushed.
    ///
    /// # Errors
    /// Propagates the write error.
    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut state = self.inner.state.lock().await;
        state.remove(key);
        self.commit(&state).await
    }

    pub async fn has(&self, key: &str) -> bool {
        self.inner.state.lock().await.contains_key(key)
    }

    pub async fn size(&self) -> usize {
        self.inner.state.lock().await.len()
    }

    /// # Errors
    /// Propagates the write error.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let mut state = self.inner.state.lock().await;
        state.clear();
        self.commit(&state).await
    }

    /// Replaces the store with a fresh copy of the defaults.
    ///
    /// # Errors
    /// Propagates the write error.
    pub async fn reset(&self) -> Result<(), StoreError> {
        let mut state = self.inner.state.lock().await;
        state.clone_from(&self.inner.defaults);
        self.commit(&state).await
    }

    /// Snapshot of the whole store. Changing it does not affect the store.
    pub async fn get_store(&self) -> StoreMap {
        self.inner.state.lock().await.clone()
    }

    /// Replaces the whole store, as a `SET` request does.
    ///
    /// # Errors
    /// Propagates the write error.
    pub async fn replace(&self, values: StoreMap) -> Result<(), StoreError> {
        let mut state = self.inner.state.lock().await;
        *state = values;
        self.commit(&state).await
    }

    /// Empties memory and removes the backing file. Observers are not notified.
    ///
    /// A later mutation writes the file again.
    ///
    /// # Errors
    /// Returns [`StoreError::Storage`] if the file exists but cannot be removed.
    pub async fn delete_store(&self) -> Result<(), StoreError> {
        let mut state = self.inner.state.lock().await;
        state.clear();
        let removed = self.inner.file.delete().await?;
        debug!(store = %self.inner.name, removed, "Store deleted");
        Ok(())
    }

    /// Answers a `GET` request.
    ///
    /// An empty store is first seeded from the requester's default object, if it sent one.
    ///
    /// # Errors
    /// Propagates the write error when seeding.
    pub async fn snapshot_or_seed(&self, seed: Value) -> Result<StoreMap, StoreError> {
        let mut state = self.inner.state.lock().await;
        if state.is_empty() {
            match seed {
                Value::Object(map) if !map.is_empty() => {
                    *state = map;
                    self.commit(&state).await?;
                },
                Value::Object(_) | Value::Null => {},
                other => {
                    error!(store = %self.inner.name, kind = json_kind(&other), "GET seed is not an object, ignored");
                },
            }
        }
        Ok(state.clone())
    }

    /// Replaces the observer list with a single window.
    pub fn set_observer(&self, window: WindowHandle) {
        *self.inner.observers.write() = vec![window];
    }

    /// Adds a window to the observers. Returns `false` if it was already observing.
    pub fn add_observer(&self, window: WindowHandle) -> bool {
        let mut observers = self.inner.observers.write();
        if observers.contains(&window) {
            return false;
        }
        observers.push(window);
        true
    }

    /// Returns `false` if the window was not observing.
    pub fn remove_observer(&self, window: WindowId) -> bool {
        let mut observers = self.inner.observers.write();
        let before = observers.len();
        observers.retain(|w| w.id() != window);
        observers.len() != before
    }

    #[must_use]
    pub fn observers(&self) -> Vec<WindowId> {
        self.inner.observers.read().iter().map(WindowHandle::id).collect()
    }

    /// Persists `state`, then pushes it to every observer. Called with the state lock held.
    async fn commit(&self, state: &MutexGuard<'_, StoreMap>) -> Result<(), StoreError> {
        self.inner.file.save(state).await?;

        let observers = self.inner.observers.read().clone();
        if observers.is_empty() {
            return Ok(());
        }
        let payload = Value::Object((**state).clone());
        let channel = self.inner.channels.updated();
        for window in &observers {
            let delivered = window.send(channel, payload.clone());
            trace!(store = %self.inner.name, window = %window.id(), delivered, "Pushed update");
        }
        Ok(())
    }
}

use crate::StoreMap;
use crate::error::{ProxyError, ProxyErrorExt};
use crate::mirror::Mirror;
use estore_bridge::{BridgeEndpoint, ChannelSet, DEFAULT_STORE_NAME, ListenerId, Sandbox};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, warn};

/// Lifecycle of a proxy store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyState {
    Uninitialized,
    /// The initial `GET` is in flight.
    Initializing,
    Ready,
    /// The push listener is gone; every operation fails.
    Destroyed,
}

/// Which store to mirror and what to seed it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyOptions {
    pub store_name: String,
    /// Sent with the initial `GET` so an empty store is seeded, and restored by `reset`.
    pub defaults: StoreMap,
}

impl Default for ProxyOptions {
    fn default() -> Self {
        Self { store_name: DEFAULT_STORE_NAME.to_owned(), defaults: StoreMap::new() }
    }
}

impl ProxyOptions {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self { store_name: name.into(), ..Self::default() }
    }

    #[must_use]
    pub fn with_defaults(mut self, defaults: StoreMap) -> Self {
        self.defaults = defaults;
        self
    }
}

#[derive(Debug)]
struct ProxyInner {
    name: String,
    channels: ChannelSet,
    defaults: StoreMap,
    bridge: BridgeEndpoint,
    mirror: Mirror,
    /// `None` once destroyed.
    listener: Mutex<Option<ListenerId>>,
}

impl Drop for ProxyInner {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.get_mut().take() {
            self.bridge.off(listener);
        }
    }
}

/// Sandboxed, imperative mirror of one authoritative store.
///
/// Reads are served from the local mirror. Writes update the mirror, then send the whole
/// object through `SET` and wait for the acknowledgment. Pushes from the privileged side are
/// shallow-merged into the mirror as they arrive.
///
/// Clones share the same mirror and listener.
#[derive(Debug, Clone)]
pub struct ProxyStore {
    inner: Arc<ProxyInner>,
}

impl ProxyStore {
    /// Starts listening for pushes, then requests the snapshot.
    ///
    /// # Errors
    /// * [`ProxyError::Bridge`] if the sandbox has no bridge or the request fails.
    /// * [`ProxyError::MalformedPayload`] if the snapshot is not an object.
    pub async fn create(sandbox: &Sandbox, options: ProxyOptions) -> Result<Self, ProxyError> {
        let bridge = sandbox.bridge()?.clone();
        let channels = ChannelSet::for_store(&options.store_name);
        let name = options.store_name;

        let mirror = Mirror::default();
        let listener = {
            let mirror = mirror.clone();
            let store = name.clone();
            bridge.on(channels.updated(), move |payload| {
                mirror.apply_push(&store, payload);
            })
        };

        let snapshot = match bridge.invoke(channels.get(), Value::Object(options.defaults.clone())).await {
            Ok(Value::Object(snapshot)) => snapshot,
            Ok(other) => {
                bridge.off(listener);
                error!(store = %name, payload = %other, "Initial store is not an object");
                return Err(ProxyError::MalformedPayload {
                    message: "Initial store is not an object".into(),
                    context: Some(name.into()),
                });
            },
            Err(err) => {
                bridge.off(listener);
                return Err(ProxyError::Bridge { source: err, context: Some(name.into()) });
            },
        };
        mirror.seed(snapshot);
        debug!(store = %name, window = %bridge.window(), keys = mirror.read(StoreMap::len), "Proxy store ready");

        Ok(Self {
            inner: Arc::new(ProxyInner {
                name,
                channels,
                defaults: options.defaults,
                bridge,
                mirror,
                listener: Mutex::new(Some(listener)),
            }),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn channels(&self) -> &ChannelSet {
        &self.inner.channels
    }

    #[must_use]
    pub fn state(&self) -> ProxyState {
        if self.inner.listener.lock().is_some() { ProxyState::Ready } else { ProxyState::Destroyed }
    }

    /// # Errors
    /// Returns [`ProxyError::Destroyed`] after [`ProxyStore::destroy`].
    pub fn get(&self, key: &str) -> Result<Option<Value>, ProxyError> {
        self.ensure_ready()?;
        Ok(self.inner.mirror.read(|map| map.get(key).cloned()))
    }

    /// # Errors
    /// Returns [`ProxyError::Destroyed`] after [`ProxyStore::destroy`].
    pub fn has(&self, key: &str) -> Result<bool, ProxyError> {
        self.ensure_ready()?;
        Ok(self.inner.mirror.read(|map| map.contains_key(key)))
    }

    /// # Errors
    /// Returns [`ProxyError::Destroyed`] after [`ProxyStore::destroy`].
    pub fn size(&self) -> Result<usize, ProxyError> {
        self.ensure_ready()?;
        Ok(self.inner.mirror.read(StoreMap::len))
    }

    /// Copy of the mirrored object.
    ///
    /// # Errors
    /// Returns [`ProxyError::Destroyed`] after [`ProxyStore::destroy`].
    pub fn get_store(&self) -> Result<StoreMap, ProxyError> {
        self.ensure_ready()?;
        Ok(self.inner.mirror.snapshot())
    }

    /// Watches the mirror; every push and local write marks it changed.
    ///
    /// # Errors
    /// Returns [`ProxyError::Destroyed`] after [`ProxyStore::destroy`].
    pub fn watch(&self) -> Result<watch::Receiver<StoreMap>, ProxyError> {
        self.ensure_ready()?;
        Ok(self.inner.mirror.subscribe())
    }

    /// # Errors
    /// Returns [`ProxyError::Destroyed`] after destroy, or [`ProxyError::Bridge`] if the
    /// privileged side rejects the write.
    pub async fn set(&self, key: &str, value: Value) -> Result<(), ProxyError> {
        self.ensure_ready()?;
        let map = self.inner.mirror.modify(|map| {
            map.insert(key.to_owned(), value);
        });
        self.push(map).await
    }

    /// Shallow-merges `values` into the store.
    ///
    /// # Errors
    /// See [`ProxyStore::set`].
    pub async fn set_many(&self, values: StoreMap) -> Result<(), ProxyError> {
        self.ensure_ready()?;
        let map = self.inner.mirror.merge(values);
        self.push(map).await
    }

    /// # Errors
    /// See [`ProxyStore::set`].
    pub async fn delete(&self, key: &str) -> Result<(), ProxyError> {
        self.ensure_ready()?;
        let map = self.inner.mirror.modify(|map| {
            map.remove(key);
        });
        self.push(map).await
    }

    /// # Errors
    /// See [`ProxyStore::set`].
    pub async fn clear(&self) -> Result<(), ProxyError> {
        self.ensure_ready()?;
        let map = self.inner.mirror.modify(StoreMap::clear);
        self.push(map).await
    }

    /// Restores the defaults this proxy was created with.
    ///
    /// # Errors
    /// See [`ProxyStore::set`].
    pub async fn reset(&self) -> Result<(), ProxyError> {
        self.ensure_ready()?;
        let defaults = self.inner.defaults.clone();
        self.inner.mirror.replace(defaults.clone());
        self.push(defaults).await
    }

    /// Empties the mirror and the authoritative store.
    ///
    /// The file itself stays on disk; only the privileged side can remove it.
    ///
    /// # Errors
    /// See [`ProxyStore::set`].
    pub async fn delete_store(&self) -> Result<(), ProxyError> {
        self.ensure_ready()?;
        self.inner.mirror.replace(StoreMap::new());
        self.push(StoreMap::new()).await
    }

    /// Stops listening for pushes. Every later call fails with [`ProxyError::Destroyed`].
    ///
    /// # Errors
    /// Returns [`ProxyError::Destroyed`] if already destroyed.
    pub fn destroy(&self) -> Result<(), ProxyError> {
        let listener = self.inner.listener.lock().take().ok_or_else(|| ProxyError::destroyed(&self.inner.name))?;
        self.inner.bridge.off(listener);
        debug!(store = %self.inner.name, "Proxy store destroyed");
        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), ProxyError> {
        if self.inner.listener.lock().is_none() {
            return Err(ProxyError::destroyed(&self.inner.name));
        }
        Ok(())
    }

    async fn push(&self, map: StoreMap) -> Result<(), ProxyError> {
        let ack = self
            .inner
            .bridge
            .invoke(self.inner.channels.set(), Value::Object(map))
            .await
            .context(self.inner.name.clone())?;
        if ack != Value::Bool(true) {
            warn!(store = %self.inner.name, ack = %ack, "Unexpected SET acknowledgment");
        }
        Ok(())
    }
}

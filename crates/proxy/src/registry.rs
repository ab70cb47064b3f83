use crate::error::ProxyError;
use crate::proxy::{ProxyOptions, ProxyState, ProxyStore};
use estore_bridge::Sandbox;
use fxhash::FxHashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
enum Slot {
    Initializing,
    Ready(ProxyStore),
}

#[derive(Debug)]
struct RegistryInner {
    sandbox: Sandbox,
    slots: Mutex<FxHashMap<String, Slot>>,
    creating: tokio::sync::Mutex<()>,
}

/// One proxy per store name within a sandbox.
#[derive(Debug, Clone)]
pub struct ProxyRegistry {
    inner: Arc<RegistryInner>,
}

impl ProxyRegistry {
    #[must_use]
    pub fn new(sandbox: Sandbox) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                sandbox,
                slots: Mutex::default(),
                creating: tokio::sync::Mutex::new(()),
            }),
        }
    }

    #[must_use]
    pub fn sandbox(&self) -> &Sandbox {
        &self.inner.sandbox
    }

    /// Returns the proxy for `options.store_name`, creating it on first request.
    ///
    /// Later calls return the same proxy and ignore their options.
    ///
    /// # Errors
    /// See [`ProxyStore::create`]. A failed creation leaves the name uninitialized.
    pub async fn create(&self, options: ProxyOptions) -> Result<ProxyStore, ProxyError> {
        let _gate = self.inner.creating.lock().await;
        if let Some(Slot::Ready(proxy)) = self.inner.slots.lock().get(&options.store_name) {
            return Ok(proxy.clone());
        }

        let name = options.store_name.clone();
        self.inner.slots.lock().insert(name.clone(), Slot::Initializing);

        match ProxyStore::create(&self.inner.sandbox, options).await {
            Ok(proxy) => {
                self.inner.slots.lock().insert(name, Slot::Ready(proxy.clone()));
                Ok(proxy)
            },
            Err(err) => {
                self.inner.slots.lock().remove(&name);
                Err(err)
            },
        }
    }

    /// The proxy created for `name`.
    ///
    /// # Errors
    /// Returns [`ProxyError::NotInitialized`] unless `create` completed for `name`.
    pub fn get(&self, name: &str) -> Result<ProxyStore, ProxyError> {
        match self.inner.slots.lock().get(name) {
            Some(Slot::Ready(proxy)) => Ok(proxy.clone()),
            Some(Slot::Initializing) | None => Err(ProxyError::not_initialized(name)),
        }
    }

    #[must_use]
    pub fn state(&self, name: &str) -> ProxyState {
        match self.inner.slots.lock().get(name) {
            Some(Slot::Ready(proxy)) => proxy.state(),
            Some(Slot::Initializing) => ProxyState::Initializing,
            None => ProxyState::Uninitialized,
        }
    }

    /// Destroys and forgets the proxy for `name`. Returns `false` if there was none.
    pub fn reset(&self, name: &str) -> bool {
        let removed = self.inner.slots.lock().remove(name);
        let Some(Slot::Ready(proxy)) = removed else {
            return false;
        };
        if proxy.destroy().is_ok() {
            debug!(store = name, sandbox = %self.inner.sandbox.label(), "Proxy reset");
        }
        true
    }
}

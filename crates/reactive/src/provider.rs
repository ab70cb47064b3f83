use crate::context::{PROVIDER, SetStore, StoreContext};
use crate::error::ReactiveError;
use crate::selection::Selection;
use estore_bridge::{BridgeEndpoint, ChannelSet, DEFAULT_STORE_NAME, ListenerId, Sandbox};
use estore_proxy::{Mirror, StoreMap};
use parking_lot::Mutex;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

#[derive(Debug)]
pub(crate) struct ProviderInner {
    pub(crate) name: String,
    channels: ChannelSet,
    bridge: BridgeEndpoint,
    pub(crate) mirror: Mirror,
    listener: Mutex<Option<ListenerId>>,
}

impl ProviderInner {
    fn detach(&self) -> bool {
        let Some(listener) = self.listener.lock().take() else {
            return false;
        };
        self.bridge.off(listener);
        true
    }
}

/// Merges `partial` locally, then forwards the merged object without waiting.
pub(crate) fn set_store(inner: &Arc<ProviderInner>, partial: StoreMap) -> JoinHandle<Result<(), ReactiveError>> {
    let merged = inner.mirror.merge(partial);
    let inner = Arc::clone(inner);
    tokio::spawn(async move {
        match inner.bridge.invoke(inner.channels.set(), Value::Object(merged)).await {
            Ok(_) => Ok(()),
            Err(err) => {
                error!(store = %inner.name, error = %err, "Error setting store");
                Err(err.into())
            },
        }
    })
}

impl Drop for ProviderInner {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.get_mut().take() {
            self.bridge.off(listener);
        }
    }
}

/// Reactive state for one store, bound to the lifetime of a UI scope.
///
/// Mounting issues one `GET` and starts merging pushed updates into local state. The
/// listener is removed on [`StoreProvider::unmount`] or when the last clone is dropped, so it
/// never outlives the scope that owns the provider.
#[derive(Debug, Clone)]
pub struct StoreProvider {
    inner: Arc<ProviderInner>,
}

impl StoreProvider {
    /// Mounts a provider for the default store.
    ///
    /// # Errors
    /// Returns [`ReactiveError::Bridge`] if `sandbox` was never preloaded.
    pub async fn mount(sandbox: &Sandbox) -> Result<Self, ReactiveError> {
        Self::mount_named(sandbox, DEFAULT_STORE_NAME).await
    }

    /// Mounts a provider for the store called `name`.
    ///
    /// A failed or malformed initial snapshot is logged and leaves the state empty; pushes still
    /// fill it in later. A push that lands before the snapshot wins over it.
    ///
    /// # Errors
    /// Returns [`ReactiveError::Bridge`] if `sandbox` was never preloaded.
    pub async fn mount_named(sandbox: &Sandbox, name: &str) -> Result<Self, ReactiveError> {
        let bridge = sandbox.bridge()?.clone();
        let channels = ChannelSet::for_store(name);
        let mirror = Mirror::default();

        let listener = {
            let mirror = mirror.clone();
            let store = name.to_owned();
            bridge.on(channels.updated(), move |payload| {
                mirror.apply_push(&store, payload);
            })
        };

        match bridge.invoke(channels.get(), Value::Null).await {
            Ok(Value::Object(initial)) => mirror.seed(initial),
            Ok(other) => error!(store = name, payload = %other, "Initial store is not an object"),
            Err(err) => error!(store = name, error = %err, "Error getting initial store"),
        }
        debug!(store = name, window = %bridge.window(), "Store provider mounted");

        Ok(Self {
            inner: Arc::new(ProviderInner {
                name: name.to_owned(),
                channels,
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
    pub fn is_mounted(&self) -> bool {
        self.inner.listener.lock().is_some()
    }

    /// Current state and setter, as the hooks see them inside [`StoreProvider::scope`].
    #[must_use]
    pub fn context(&self) -> StoreContext {
        StoreContext { store: self.inner.mirror.snapshot(), set_store: self.setter() }
    }

    pub(crate) fn inner_mirror(&self) -> &Mirror {
        &self.inner.mirror
    }

    #[must_use]
    pub fn setter(&self) -> SetStore {
        SetStore::new(Arc::clone(&self.inner))
    }

    /// Optimistic write. See [`SetStore::call`].
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime.
    pub fn set_store(&self, partial: StoreMap) -> JoinHandle<Result<(), ReactiveError>> {
        set_store(&self.inner, partial)
    }

    /// Subscribes to a projection of the state.
    pub fn select<R, F>(&self, selector: F) -> Selection<R, F>
    where
        F: Fn(&StoreMap, &SetStore) -> R,
        R: PartialEq,
    {
        Selection::new(self.inner.mirror.subscribe(), self.setter(), selector)
    }

    /// Runs `future` with this provider as the one the hooks resolve to.
    pub async fn scope<F: Future>(&self, future: F) -> F::Output {
        PROVIDER.scope(self.clone(), future).await
    }

    /// Synchronous counterpart of [`StoreProvider::scope`].
    pub fn sync_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        PROVIDER.sync_scope(self.clone(), f)
    }

    /// Removes the push listener. Local state stops following the privileged side.
    pub fn unmount(&self) {
        if self.inner.detach() {
            debug!(store = %self.inner.name, "Store provider unmounted");
        } else {
            warn!(store = %self.inner.name, "Store provider was already unmounted");
        }
    }
}

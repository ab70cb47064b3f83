use crate::error::ReactiveError;
use crate::provider::{self, ProviderInner, StoreProvider};
use crate::selection::Selection;
use estore_proxy::StoreMap;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;

tokio::task_local! {
    pub(crate) static PROVIDER: StoreProvider;
}

/// Optimistic setter handed to UI code.
#[derive(Clone)]
pub struct SetStore {
    inner: Arc<ProviderInner>,
}

impl fmt::Debug for SetStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetStore").field("store", &self.inner.name).finish()
    }
}

impl SetStore {
    pub(crate) const fn new(inner: Arc<ProviderInner>) -> Self {
        Self { inner }
    }

    /// Shallow-merges `partial` into local state right away and sends the merged object
    /// through `SET` in the background.
    ///
    /// Local state does not wait for the acknowledgment. Awaiting the returned handle is
    /// optional; a failed write is also logged.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime.
    pub fn call(&self, partial: StoreMap) -> JoinHandle<Result<(), ReactiveError>> {
        provider::set_store(&self.inner, partial)
    }
}

/// The `{ store, set_store }` pair.
#[derive(Debug, Clone)]
pub struct StoreContext {
    /// State at the time the context was taken.
    pub store: StoreMap,
    pub set_store: SetStore,
}

fn outside_provider(hook: &'static str) -> ReactiveError {
    ReactiveError::OutsideProvider {
        message: format!("{hook} must be used within a StoreProvider scope").into(),
        context: None,
    }
}

/// The nearest provider's state and setter.
///
/// # Errors
/// Returns [`ReactiveError::OutsideProvider`] when no [`StoreProvider::scope`] is active.
pub fn use_encrypted_store() -> Result<StoreContext, ReactiveError> {
    PROVIDER.try_with(StoreProvider::context).map_err(|_| outside_provider("use_encrypted_store"))
}

/// Projects the nearest provider's state through `selector`.
///
/// # Errors
/// Returns [`ReactiveError::OutsideProvider`] when no [`StoreProvider::scope`] is active.
pub fn use_encrypted_store_with<R>(selector: impl FnOnce(&StoreMap, &SetStore) -> R) -> Result<R, ReactiveError> {
    PROVIDER
        .try_with(|provider| {
            let setter = provider.setter();
            provider.inner_mirror().read(|store| selector(store, &setter))
        })
        .map_err(|_| outside_provider("use_encrypted_store_with"))
}

/// Subscribes to a projection of the nearest provider's state.
///
/// # Errors
/// Returns [`ReactiveError::OutsideProvider`] when no [`StoreProvider::scope`] is active.
pub fn use_store_selector<R, F>(selector: F) -> Result<Selection<R, F>, ReactiveError>
where
    F: Fn(&StoreMap, &SetStore) -> R,
    R: PartialEq,
{
    let provider = PROVIDER.try_with(Clone::clone).map_err(|_| outside_provider("use_store_selector"))?;
    Ok(provider.select(selector))
}

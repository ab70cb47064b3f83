use crate::error::{StoreError, StoreErrorExt};
use crate::options::StoreOptions;
use crate::persistence::EncryptedFile;
use crate::service;
use crate::settings::StoreConfig;
use crate::store::StoreHandle;
use estore_bridge::MainBridge;
use estore_storage::Storage;
use estore_vault::SafeStorage;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

struct RegistryInner {
    storage: Storage,
    safe: Arc<dyn SafeStorage>,
    bridge: Option<MainBridge>,
    stores: RwLock<FxHashMap<String, StoreHandle>>,
    /// Serializes `create` so two callers racing on one name open the file once.
    creating: Mutex<()>,
}

impl std::fmt::Debug for RegistryInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryInner")
            .field("root", &self.storage.root())
            .field("bridged", &self.bridge.is_some())
            .field("stores", &self.stores.read().keys().cloned().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Name → store map owned by the application's startup code.
///
/// At most one [`StoreHandle`] exists per name; asking again returns the first one and ignores
/// the new options. Separate registries are fully isolated, which keeps tests independent.
#[derive(Debug, Clone)]
pub struct StoreRegistry {
    inner: Arc<RegistryInner>,
}

impl StoreRegistry {
    /// A registry whose stores are not reachable over a bridge.
    #[must_use]
    pub fn new(storage: Storage, safe: Arc<dyn SafeStorage>) -> Self {
        Self::build(storage, safe, None)
    }

    /// A registry that answers `GET`/`SET` for every store it creates on `bridge`.
    #[must_use]
    pub fn with_bridge(storage: Storage, safe: Arc<dyn SafeStorage>, bridge: MainBridge) -> Self {
        Self::build(storage, safe, Some(bridge))
    }

    /// Connects the data directory and builds the cipher described by `config`.
    ///
    /// # Errors
    /// Returns [`StoreError::Storage`] if the directory cannot be created and
    /// [`StoreError::Vault`] if key derivation fails.
    pub async fn from_config(config: &StoreConfig, bridge: Option<MainBridge>) -> Result<Self, StoreError> {
        let storage = Storage::builder()
            .root(&config.data_dir)
            .connect()
            .await
            .context("Opening data directory")?;
        let safe = config.encryption.safe_storage()?;
        info!(root = %storage.root().display(), bridged = bridge.is_some(), "Store registry ready");
        Ok(Self::build(storage, safe, bridge))
    }

    fn build(storage: Storage, safe: Arc<dyn SafeStorage>, bridge: Option<MainBridge>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                storage,
                safe,
                bridge,
                stores: RwLock::default(),
                creating: Mutex::new(()),
            }),
        }
    }

    /// Returns the store named in `options`, opening it on first request.
    ///
    /// When the registry has a bridge, the store's `GET` and `SET` channels are registered as
    /// part of opening it.
    ///
    /// # Errors
    /// * [`StoreError::InvalidOptions`] for a bad name or extension.
    /// * [`StoreError::Storage`] / [`StoreError::Vault`] if seeding the file fails.
    /// * [`StoreError::Bridge`] if another component already owns one of the store's channels.
    pub async fn create(&self, options: StoreOptions) -> Result<StoreHandle, StoreError> {
        if let Some(existing) = self.get(&options.store_name) {
            debug!(store = %options.store_name, "Store already open, options ignored");
            return Ok(existing);
        }

        let _gate = self.inner.creating.lock().await;
        if let Some(existing) = self.get(&options.store_name) {
            return Ok(existing);
        }

        options.validate()?;
        let name = options.store_name.clone();
        let file = EncryptedFile::new(self.inner.storage.clone(), Arc::clone(&self.inner.safe), options.file_name())?;
        let store = StoreHandle::open(options, file).await?;

        if let Some(bridge) = &self.inner.bridge {
            service::register(&store, bridge)
                .inspect_err(|err| {
                    warn!(
                        store = %name,
                        path = %store.path().display(),
                        error = %err,
                        "Store file is on disk but the store was not registered"
                    );
                })
                .context(name.clone())?;
        }

        self.inner.stores.write().insert(name.clone(), store.clone());
        info!(store = %name, path = %store.path().display(), channels = %store.channels(), "Store created");
        Ok(store)
    }

    /// The store registered under `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<StoreHandle> {
        self.inner.stores.read().get(name).cloned()
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.inner.stores.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.inner.storage
    }

    #[must_use]
    pub fn bridge(&self) -> Option<&MainBridge> {
        self.inner.bridge.as_ref()
    }
}

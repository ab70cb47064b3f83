use crate::engine::{Storage, StorageInner};
use crate::error::{StorageError, StorageErrorExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tokio::fs;
use tracing::info;

mod state {
    use std::path::PathBuf;

    pub(crate) trait DataDir {}

    /// No user data directory chosen yet.
    #[derive(Debug, Default)]
    pub struct Unset;

    /// The user data directory the store files live in.
    #[derive(Debug)]
    pub struct DataDirSet(pub(crate) PathBuf);

    impl DataDir for Unset {}
    impl DataDir for DataDirSet {}
}

pub use state::{DataDirSet, Unset};

/// Configures where store files live. [`StorageBuilder::connect`] only exists once a root
/// directory has been given.
#[allow(private_bounds)]
#[derive(Debug)]
pub struct StorageBuilder<D: state::DataDir = Unset> {
    dir: D,
    create_missing: bool,
}

impl Default for StorageBuilder<Unset> {
    fn default() -> Self {
        Self { dir: Unset, create_missing: true }
    }
}

#[allow(private_bounds)]
impl<D: state::DataDir> StorageBuilder<D> {
    /// Whether a missing root directory is created on connect. Defaults to `true`.
    #[must_use]
    pub const fn create(mut self, enable: bool) -> Self {
        self.create_missing = enable;
        self
    }
}

impl StorageBuilder<Unset> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "Storage needs a root before it can connect"]
    pub fn root(self, path: impl Into<PathBuf>) -> StorageBuilder<DataDirSet> {
        StorageBuilder { dir: DataDirSet(path.into()), create_missing: self.create_missing }
    }
}

impl StorageBuilder<DataDirSet> {
    /// Opens the data directory.
    ///
    /// The resolved root is canonical, so every store path derived from it is absolute. Temp
    /// files left behind by a crash mid-save are swept before the handle is returned.
    ///
    /// # Errors
    /// Returns [`StorageError::Io`] if the directory is missing and creation is disabled, or if
    /// it cannot be resolved.
    pub async fn connect(self) -> Result<Storage, StorageError> {
        let DataDirSet(dir) = self.dir;

        if self.create_missing {
            fs::create_dir_all(&dir)
                .await
                .context(format!("Creating data directory {}", dir.display()))?;
        }
        let root = fs::canonicalize(&dir)
            .await
            .context(format!("Resolving data directory {}", dir.display()))?;

        let storage = Storage { inner: Arc::new(StorageInner { root, tmp_counter: AtomicU64::new(1) }) };
        let swept = storage.purge_tmp().await;
        info!(path = %storage.root().display(), swept, "Data directory ready");

        Ok(storage)
    }
}

use crate::builder::StorageBuilder;
use crate::error::{StorageError, StorageErrorExt};
use crate::{maintenance, security};
use std::io::ErrorKind;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct StorageInner {
    /// Canonical physical root; every resolved path starts with it.
    pub(crate) root: PathBuf,
    pub(crate) tmp_counter: AtomicU64,
}

/// A cheaply clonable handle to a sandboxed directory of blobs.
///
/// # Example
///
/// ```rust
/// use estore_storage::{Storage, StorageError};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), StorageError> {
///     # let tmp = tempfile::tempdir().unwrap();
///     let storage = Storage::builder().root(tmp.path().join("data")).connect().await?;
///
///     storage.write("settings.json", b"blob").await?;
///     assert_eq!(storage.read("settings.json").await?, b"blob");
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Storage {
    pub(crate) inner: Arc<StorageInner>,
}

impl Deref for Storage {
    type Target = StorageInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Storage {
    #[must_use = "The storage is not usable until you call .connect()"]
    pub fn builder() -> StorageBuilder {
        StorageBuilder::new()
    }

    /// The canonical root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a relative path to its physical location inside the root.
    ///
    /// # Errors
    /// Returns [`StorageError::PathTraversalAttempt`] for absolute paths or paths that would leave
    /// the root, and [`StorageError::Io`] if an existing ancestor cannot be verified.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
        security::resolve_path(&self.root, path)
    }

    /// Reads a whole file.
    ///
    /// # Errors
    /// Returns [`StorageError::FileNotFound`] if the file is absent.
    pub async fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, StorageError> {
        let resolved = self.resolve(path)?;

        fs::read(&resolved).await.map_err(|err| match err.kind() {
            ErrorKind::NotFound => StorageError::FileNotFound {
                message: resolved.display().to_string().into(),
                context: None,
            },
            _ => StorageError::Io {
                source: err,
                context: Some(format!("Reading {}", resolved.display()).into()),
            },
        })
    }

    /// Replaces the file contents atomically.
    ///
    /// The bytes go to a unique temp file next to the target, are synced, and then renamed over
    /// it, so readers observe either the previous contents or the new ones in full. Missing
    /// parent directories are created.
    ///
    /// # Errors
    /// Returns [`StorageError::PathTraversalAttempt`] if the path leaves the root and
    /// [`StorageError::Io`] on any filesystem failure.
    pub async fn write(&self, path: impl AsRef<Path>, data: &[u8]) -> Result<(), StorageError> {
        let resolved = self.resolve(path)?;

        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)
                .await
                .context(format!("Creating parent of {}", resolved.display()))?;
        }

        let temp = self.tmp_path(&resolved);
        if let Err(err) = Self::write_synced(&temp, data).await {
            let _ = fs::remove_file(&temp).await;
            return Err(err);
        }

        if let Err(err) = fs::rename(&temp, &resolved).await {
            if err.kind() != ErrorKind::AlreadyExists {
                let _ = fs::remove_file(&temp).await;
                return Err(StorageError::Io {
                    source: err,
                    context: Some(format!("Replacing {}", resolved.display()).into()),
                });
            }
            fs::remove_file(&resolved)
                .await
                .context(format!("Removing previous {}", resolved.display()))?;
            fs::rename(&temp, &resolved)
                .await
                .context(format!("Replacing {}", resolved.display()))?;
        }

        if let Some(parent) = resolved.parent() {
            Self::sync_dir(parent).await;
        }

        debug!(path = %resolved.display(), bytes = data.len(), "Blob written");
        Ok(())
    }

    /// Removes a file.
    ///
    /// # Errors
    /// Returns [`StorageError::FileNotFound`] if there was nothing to remove.
    pub async fn delete(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        let resolved = self.resolve(path)?;

        fs::remove_file(&resolved).await.map_err(|err| match err.kind() {
            ErrorKind::NotFound => StorageError::FileNotFound {
                message: resolved.display().to_string().into(),
                context: None,
            },
            _ => StorageError::Io {
                source: err,
                context: Some(format!("Deleting {}", resolved.display()).into()),
            },
        })?;

        debug!(path = %resolved.display(), "Blob deleted");
        Ok(())
    }

    /// # Errors
    /// Fails only when the path cannot be resolved inside the root.
    pub fn exists(&self, path: impl AsRef<Path>) -> Result<bool, StorageError> {
        Ok(self.resolve(path)?.is_file())
    }

    /// Sweeps temp files older than a few minutes. Returns how many were removed.
    pub async fn purge_tmp(&self) -> usize {
        maintenance::purge_tmp(&self.root, None).await
    }

    /// Sweeps temp files older than `age`.
    pub async fn purge_tmp_older_than(&self, age: Duration) -> usize {
        maintenance::purge_tmp(&self.root, Some(age)).await
    }

    async fn write_synced(temp: &Path, data: &[u8]) -> Result<(), StorageError> {
        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(temp)
            .await
            .context(format!("Creating {}", temp.display()))?;
        file.write_all(data).await.context("Writing temp file")?;
        file.sync_all().await.context("Syncing temp file")
    }

    fn tmp_path(&self, target: &Path) -> PathBuf {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let name = target.file_name().and_then(|s| s.to_str()).unwrap_or("blob");
        target.with_file_name(format!("{name}{}{}-{n}", maintenance::TMP_MARKER, std::process::id()))
    }

    async fn sync_dir(path: &Path) {
        match fs::File::open(path).await {
            Ok(dir) => {
                if let Err(err) = dir.sync_all().await {
                    debug!(path = %path.display(), error = %err, "Directory sync skipped");
                }
            },
            Err(err) => warn!(path = %path.display(), error = %err, "Directory open failed"),
        }
    }
}

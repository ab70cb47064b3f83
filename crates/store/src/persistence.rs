use crate::error::{StoreError, StoreErrorExt};
use crate::StoreMap;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use estore_storage::Storage;
use estore_vault::SafeStorage;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};

/// One store file: JSON text, encrypted, then base64 encoded.
#[derive(Debug, Clone)]
pub struct EncryptedFile {
    storage: Storage,
    safe: Arc<dyn SafeStorage>,
    file_name: String,
    path: PathBuf,
}

impl EncryptedFile {
    /// Binds `file_name` inside the storage root.
    ///
    /// # Errors
    /// Returns [`StoreError::Storage`] if the name would resolve outside the root.
    pub fn new(
        storage: Storage,
        safe: Arc<dyn SafeStorage>,
        file_name: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let file_name = file_name.into();
        let path = storage.resolve(&file_name).context("Resolving store file")?;
        Ok(Self { storage, safe, file_name, path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn is_encryption_available(&self) -> bool {
        self.safe.is_encryption_available()
    }

    /// Reads the store, healing the file from `defaults` when it is absent or unreadable.
    ///
    /// Any failure between reading the bytes and parsing the object is logged and replaced by
    /// a copy of `defaults`, which is written back immediately.
    ///
    /// # Errors
    /// Only the healing write can fail; see [`EncryptedFile::save`].
    pub async fn load(&self, defaults: &StoreMap) -> Result<StoreMap, StoreError> {
        match self.read().await {
            Ok(Some(map)) => {
                debug!(path = %self.path.display(), keys = map.len(), "Store file loaded");
                return Ok(map);
            },
            Ok(None) => {
                debug!(path = %self.path.display(), "No store file yet, seeding from defaults");
            },
            Err(err) => {
                error!(path = %self.path.display(), error = %err, "Store file unreadable, restoring defaults");
            },
        }

        let fresh = defaults.clone();
        self.save(&fresh).await?;
        Ok(fresh)
    }

    /// Replaces the file with the encrypted form of `map`.
    ///
    /// # Errors
    /// Returns [`StoreError::Vault`] if encryption fails or [`StoreError::Storage`] if the write
    /// does.
    pub async fn save(&self, map: &StoreMap) -> Result<(), StoreError> {
        let blob = self.encode(map)?;
        self.storage
            .write(&self.file_name, blob.as_bytes())
            .await
            .context(format!("Writing {}", self.file_name))?;
        debug!(path = %self.path.display(), bytes = blob.len(), "Store file saved");
        Ok(())
    }

    /// Removes the file. Returns `false` if there was none.
    ///
    /// # Errors
    /// Returns [`StoreError::Storage`] on I/O failure other than absence.
    pub async fn delete(&self) -> Result<bool, StoreError> {
        match self.storage.delete(&self.file_name).await {
            Ok(()) => Ok(true),
            Err(err) if err.is_not_found() => {
                debug!(path = %self.path.display(), "Store file already absent");
                Ok(false)
            },
            Err(err) => Err(err).context(format!("Deleting {}", self.file_name)),
        }
    }

    /// `None` when the file does not exist.
    async fn read(&self) -> Result<Option<StoreMap>, StoreError> {
        match self.storage.read(&self.file_name).await {
            Ok(bytes) => self.decode(&bytes).map(Some),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err).context(format!("Reading {}", self.file_name)),
        }
    }

    fn encode(&self, map: &StoreMap) -> Result<String, StoreError> {
        let json = serde_json::to_string(map).context("Serializing store")?;
        let sealed = self.safe.encrypt_string(&json).context("Encrypting store")?;
        Ok(STANDARD.encode(sealed))
    }

    fn decode(&self, bytes: &[u8]) -> Result<StoreMap, StoreError> {
        let sealed = STANDARD.decode(bytes.trim_ascii()).context("Decoding store blob")?;
        let json = self.safe.decrypt_string(&sealed).context("Decrypting store blob")?;
        match serde_json::from_str::<Value>(&json).context("Parsing store JSON")? {
            Value::Object(map) => Ok(map),
            other => Err(StoreError::Malformed {
                message: format!("expected an object, found {}", json_kind(&other)).into(),
                context: Some(self.file_name.clone().into()),
            }),
        }
    }
}

pub(crate) const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

use crate::error::{StoreError, StoreErrorExt};
use config::{Config, Environment, File};
use estore_vault::{Aes, ChaCha, SafeStorage, SecureStorage, Vault};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Prefix of environment overrides, e.g. `ESTORE__ENCRYPTION__SECRET`.
pub const ENV_PREFIX: &str = "ESTORE";
const DEFAULT_CONFIG_FILE: &str = "estore";

/// Where store files live and how they are encrypted.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// Application data directory; every store file is `<data_dir>/<name>.<ext>`.
    pub data_dir: PathBuf,
    pub encryption: EncryptionConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { data_dir: PathBuf::from("data"), encryption: EncryptionConfig::default() }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CipherKind {
    #[default]
    Aes,
    ChaCha,
}

#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EncryptionConfig {
    /// Platform secret. Without one, blobs are sealed with the built-in fallback key and
    /// encryption is reported as unavailable.
    pub secret: Option<String>,
    pub salt: String,
    pub machine_id: String,
    pub cipher: CipherKind,
    pub compression: bool,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            secret: None,
            salt: "estore".to_owned(),
            machine_id: "local".to_owned(),
            cipher: CipherKind::Aes,
            compression: false,
        }
    }
}

impl fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("salt", &self.salt)
            .field("machine_id", &self.machine_id)
            .field("cipher", &self.cipher)
            .field("compression", &self.compression)
            .finish()
    }
}

impl EncryptionConfig {
    /// Builds the string-encryption capability described by this section.
    ///
    /// # Errors
    /// Returns [`StoreError::Vault`] if key derivation fails.
    pub fn safe_storage(&self) -> Result<Arc<dyn SafeStorage>, StoreError> {
        Ok(match (self.cipher, &self.secret) {
            (CipherKind::Aes, Some(secret)) => Arc::new(SecureStorage::new(self.vault::<Aes>(secret)?)),
            (CipherKind::ChaCha, Some(secret)) => {
                Arc::new(SecureStorage::new(self.vault::<ChaCha>(secret)?))
            },
            (CipherKind::Aes, None) => Arc::new(SecureStorage::<Aes>::obfuscated()?),
            (CipherKind::ChaCha, None) => Arc::new(SecureStorage::<ChaCha>::obfuscated()?),
        })
    }

    fn vault<C: estore_vault::VaultCipher>(&self, secret: &str) -> Result<Vault<C>, StoreError> {
        let vault = Vault::<C>::builder()
            .compression(self.compression)
            .derived_keys(secret, &self.salt, &self.machine_id)
            .context("Deriving store key")?
            .build()
            .context("Building store vault")?;
        Ok(vault)
    }
}

/// Loads [`StoreConfig`] from a file layered with `ESTORE__*` environment variables.
///
/// With no explicit path an `estore.*` file in the working directory is used when present.
/// Nested keys use double underscores: `ESTORE__DATA_DIR`, `ESTORE__ENCRYPTION__CIPHER`.
///
/// # Errors
/// Returns [`StoreError::Config`] if an explicit file is missing or any value fails to parse.
///
/// # Example
/// ```rust
/// use estore_store::load_config;
///
/// let config = load_config(None).unwrap_or_default();
/// assert!(!config.data_dir.as_os_str().is_empty());
/// ```
pub fn load_config(path: Option<&Path>) -> Result<StoreConfig, StoreError> {
    let file = match path {
        Some(path) => File::from(path).required(true),
        None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let config = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .convert_case(config::Case::Snake)
                .try_parsing(true),
        )
        .build()
        .context("Failed to build config")?
        .try_deserialize::<StoreConfig>()
        .context("Failed to deserialize config")?;

    info!(data_dir = %config.data_dir.display(), cipher = ?config.encryption.cipher, "Store config loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();

        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert!(config.encryption.secret.is_none());
        assert_eq!(config.encryption.cipher, CipherKind::Aes);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "data_dir = \"/var/lib/app\"\n[encryption]\nsecret = \"s3cret\"\ncipher = \"chacha\"\ncompression = true"
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/app"));
        assert_eq!(config.encryption.cipher, CipherKind::ChaCha);
        assert!(config.encryption.compression);
        assert_eq!(config.encryption.salt, "estore", "unset keys keep their defaults");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = load_config(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(result, Err(StoreError::Config { .. })));
    }

    #[test]
    fn test_secret_is_redacted_in_debug() {
        let config = EncryptionConfig { secret: Some("hunter2".into()), ..Default::default() };
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn test_safe_storage_availability_follows_secret() {
        let fallback = EncryptionConfig::default().safe_storage().unwrap();
        assert!(!fallback.is_encryption_available());

        let keyed = EncryptionConfig { secret: Some("k".into()), ..Default::default() };
        assert!(keyed.safe_storage().unwrap().is_encryption_available());
    }
}

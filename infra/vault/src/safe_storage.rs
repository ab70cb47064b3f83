use crate::engine::Vault;
use crate::error::{VaultError, VaultErrorExt};
use crate::types::{Aes, VaultCipher};

/// Associated data bound to every store blob.
const STORE_AAD: &[u8] = b"estore.v1.blob";

/// Key material used when no platform secret is available.
///
/// Anyone holding the binary can recover it, which is why storages built from it report
/// encryption as unavailable.
const FALLBACK_PASSWORD: &str = "estore.fallback.plaintext-password";
const FALLBACK_SALT: &str = "estore.fallback.salt";
const FALLBACK_ID: &str = "estore.fallback";

/// The platform string-encryption capability.
///
/// This is the whole surface the persistence layer relies on. Implementations must be safe to
/// share between threads because one instance usually serves every store in the process.
pub trait SafeStorage: Send + Sync + std::fmt::Debug + 'static {
    /// Whether strings are protected by a real secret rather than the built-in fallback.
    fn is_encryption_available(&self) -> bool;

    /// Encrypts `plain` into an opaque byte blob.
    ///
    /// # Errors
    /// Returns [`VaultError::Encryption`] if the cipher fails.
    fn encrypt_string(&self, plain: &str) -> Result<Vec<u8>, VaultError>;

    /// Reverses [`SafeStorage::encrypt_string`].
    ///
    /// # Errors
    /// Returns a [`VaultError`] if the blob is malformed, fails authentication, or is not UTF-8.
    fn decrypt_string(&self, blob: &[u8]) -> Result<String, VaultError>;
}

/// [`SafeStorage`] backed by a [`Vault`].
pub struct SecureStorage<C = Aes>
where
    C: VaultCipher,
{
    vault: Vault<C>,
    available: bool,
}

impl<C: VaultCipher> std::fmt::Debug for SecureStorage<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureStorage")
            .field("vault", &self.vault)
            .field("available", &self.available)
            .finish()
    }
}

impl<C: VaultCipher> Clone for SecureStorage<C> {
    fn clone(&self) -> Self {
        Self { vault: self.vault.clone(), available: self.available }
    }
}

impl<C: VaultCipher> SecureStorage<C> {
    /// Wraps a vault keyed from a real platform secret.
    #[must_use]
    pub const fn new(vault: Vault<C>) -> Self {
        Self { vault, available: true }
    }

    /// Builds a storage keyed from the hardcoded fallback password.
    ///
    /// Data is still encrypted, but [`SafeStorage::is_encryption_available`] returns `false`.
    ///
    /// # Errors
    /// Returns a [`VaultError`] if the fallback key cannot be derived.
    pub fn obfuscated() -> Result<Self, VaultError> {
        let vault = Vault::<C>::builder()
            .derived_keys(FALLBACK_PASSWORD, FALLBACK_SALT, FALLBACK_ID)?
            .build()?;
        Ok(Self { vault, available: false })
    }

    #[must_use]
    pub const fn vault(&self) -> &Vault<C> {
        &self.vault
    }
}

impl<C: VaultCipher> SafeStorage for SecureStorage<C> {
    fn is_encryption_available(&self) -> bool {
        self.available
    }

    fn encrypt_string(&self, plain: &str) -> Result<Vec<u8>, VaultError> {
        self.vault.seal_bytes(plain.as_bytes(), STORE_AAD)
    }

    fn decrypt_string(&self, blob: &[u8]) -> Result<String, VaultError> {
        let bytes = self.vault.unseal_bytes(blob, STORE_AAD)?;
        String::from_utf8(bytes).context("Decrypted store blob")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChaCha;

    #[test]
    fn test_obfuscated_reports_unavailable() {
        let storage = SecureStorage::<Aes>::obfuscated().unwrap();

        assert!(!storage.is_encryption_available());
        let blob = storage.encrypt_string("{}").unwrap();
        assert_eq!(storage.decrypt_string(&blob).unwrap(), "{}");
    }

    #[test]
    fn test_obfuscated_blobs_open_across_instances() {
        let first = SecureStorage::<ChaCha>::obfuscated().unwrap();
        let second = SecureStorage::<ChaCha>::obfuscated().unwrap();

        let blob = first.encrypt_string(r#"{"a":1}"#).unwrap();
        assert_eq!(second.decrypt_string(&blob).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn test_secret_storage_cannot_open_fallback_blobs() {
        let fallback = SecureStorage::<Aes>::obfuscated().unwrap();
        let vault = Vault::<Aes>::builder().derived_keys("secret", "salt", "host").unwrap().build().unwrap();
        let secure = SecureStorage::new(vault);

        assert!(secure.is_encryption_available());
        let blob = fallback.encrypt_string("hidden").unwrap();
        assert!(secure.decrypt_string(&blob).is_err());
    }

    #[test]
    fn test_ciphertext_does_not_contain_plaintext() {
        let storage = SecureStorage::<Aes>::obfuscated().unwrap();
        let blob = storage.encrypt_string("very-recognisable-token").unwrap();

        assert!(!blob.windows(b"recognisable".len()).any(|w| w == b"recognisable"));
    }

    #[test]
    fn test_invalid_utf8_is_an_encoding_error() {
        let storage = SecureStorage::<Aes>::obfuscated().unwrap();
        let blob = storage.vault().seal_bytes([0xFFu8, 0xFE], STORE_AAD).unwrap();

        assert!(matches!(storage.decrypt_string(&blob), Err(VaultError::Encoding { .. })));
    }
}

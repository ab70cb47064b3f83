use crate::engine::{Vault, VaultInner};
use crate::error::VaultError;
use crate::types::{Aes, VaultCipher};
use aead::Key;
use hkdf::Hkdf;
use private::Sealed;
use sha2::Sha256;
use std::marker::PhantomData;
use std::sync::Arc;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// HKDF info prefix; the machine id is appended to bind the key to a host.
const KEY_INFO_PREFIX: &[u8] = b"estore.v1:";

#[derive(Debug, Default, ZeroizeOnDrop)]
pub struct NoKey;
#[derive(Debug, Zeroize, ZeroizeOnDrop)]
pub struct WithKey {
    key: [u8; 32],
}

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoKey {}
impl Sealed for WithKey {}

/// A builder for secure initialization of the [`Vault`].
///
/// Raw key material is zeroed as soon as the builder is dropped or consumed by `build`.
#[allow(private_bounds)]
#[derive(Debug, Zeroize, ZeroizeOnDrop)]
pub struct VaultBuilder<C: VaultCipher = Aes, K: Sealed + ZeroizeOnDrop = NoKey> {
    #[zeroize(skip)]
    _cipher: PhantomData<C>,
    compression: bool,
    key: K,
}

impl<C: VaultCipher> Default for VaultBuilder<C> {
    fn default() -> Self {
        Self { _cipher: PhantomData, compression: false, key: NoKey }
    }
}

impl<C: VaultCipher> VaultBuilder<C> {
    /// Creates a new empty builder with compression disabled.
    #[must_use = "Builder must be configured with a key before use"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives the store key with HKDF-SHA256.
    ///
    /// # Arguments
    /// * `ikm`: Input keying material (platform secret).
    /// * `salt`: Uniquifies keys across installations.
    /// * `id`: Binds the key to a specific machine.
    ///
    /// # Errors
    /// Returns [`VaultError::Encryption`] if key expansion fails.
    pub fn derived_keys(
        self,
        ikm: impl AsRef<[u8]>,
        salt: impl AsRef<[u8]>,
        id: impl AsRef<[u8]>,
    ) -> Result<VaultBuilder<C, WithKey>, VaultError> {
        let (_, hk) = Hkdf::<Sha256>::extract(Some(salt.as_ref()), ikm.as_ref());
        let mut key = [0u8; 32];

        let mut info = Vec::from(KEY_INFO_PREFIX);
        info.extend_from_slice(id.as_ref());

        hk.expand(&info, &mut key).map_err(|_| VaultError::Encryption {
            message: "HKDF expansion failed for store key".into(),
            context: None,
        })?;

        info.zeroize();

        Ok(VaultBuilder { _cipher: PhantomData, compression: self.compression, key: WithKey { key } })
    }

    /// Uses a raw 32-byte key as-is.
    #[must_use]
    pub fn raw_key(self, key: [u8; 32]) -> VaultBuilder<C, WithKey> {
        VaultBuilder { _cipher: PhantomData, compression: self.compression, key: WithKey { key } }
    }
}

#[allow(private_bounds)]
impl<C: VaultCipher, K: Sealed + ZeroizeOnDrop> VaultBuilder<C, K> {
    /// Toggles LZ4 compression of plaintext before encryption.
    ///
    /// The flag is recorded in every payload header, so blobs sealed with either setting stay
    /// readable.
    #[must_use]
    pub const fn compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }
}

impl<C: VaultCipher> VaultBuilder<C, WithKey> {
    /// Finalizes vault construction and zeroes the builder.
    ///
    /// # Errors
    /// Returns [`VaultError::InvalidConfiguration`] if the cipher rejects the key.
    pub fn build(mut self) -> Result<Vault<C>, VaultError> {
        let key = Key::<C>::try_from(&self.key.key[..]).map_err(|_| {
            VaultError::InvalidConfiguration {
                message: format!("Invalid key length {}, must be 32 bytes", self.key.key.len())
                    .into(),
                context: Some("Store key".into()),
            }
        })?;
        let inner = VaultInner { cipher: C::new(&key), compression: self.compression };

        self.zeroize();

        Ok(Vault { inner: Arc::new(inner) })
    }
}

use aead::Nonce;
use aead::inout::InOutBuf;
use std::sync::Arc;

use crate::builder::VaultBuilder;
use crate::error::VaultError;
use crate::types::{Aes, BLOB_FORMAT, LZ4_FLAG, NONCE_SIZE, PREAMBLE_LEN, SEALED_OVERHEAD, TAG_SIZE, VaultCipher};

#[allow(unreachable_pub)]
pub struct VaultInner<C = Aes>
where
    C: VaultCipher,
{
    pub cipher: C,
    pub compression: bool,
}

impl<C: VaultCipher> std::fmt::Debug for VaultInner<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultInner")
            .field("cipher", &std::any::type_name::<C>())
            .field("compression", &self.compression)
            .finish()
    }
}

/// A cheaply clonable handle to a keyed AEAD cipher.
///
/// The key never leaves the builder un-zeroized; the vault only keeps the initialized cipher.
///
/// ### Example
/// ```rust
/// use estore_vault::{ChaCha, Vault, VaultError};
///
/// # fn main() -> Result<(), VaultError> {
/// let vault = Vault::<ChaCha>::builder().derived_keys("ikm", "salt", "machine")?.build()?;
///
/// let sealed = vault.seal_bytes(b"settings", b"ctx")?;
/// assert_eq!(vault.unseal_bytes(&sealed, b"ctx")?, b"settings");
/// # Ok(())
/// # }
/// ```
pub struct Vault<C = Aes>
where
    C: VaultCipher,
{
    pub(crate) inner: Arc<VaultInner<C>>,
}

impl<C: VaultCipher> std::fmt::Debug for Vault<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Vault").field(&self.inner).finish()
    }
}

impl<C: VaultCipher> Clone for Vault<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<C> Vault<C>
where
    C: VaultCipher,
{
    /// Returns a new [`VaultBuilder`] to configure the vault.
    #[must_use]
    pub fn builder() -> VaultBuilder<C> {
        VaultBuilder::<C>::new()
    }

    /// Returns `true` if sealed payloads are LZ4-compressed before encryption.
    #[must_use]
    pub fn compression(&self) -> bool {
        self.inner.compression
    }

    fn next_nonce() -> Result<Nonce<C>, VaultError> {
        let mut nonce = Nonce::<C>::default();
        getrandom::fill(&mut nonce).map_err(|e| VaultError::Encryption {
            message: e.to_string().into(),
            context: Some("System RNG unavailable for nonce generation".into()),
        })?;
        Ok(nonce)
    }

    /// Encrypts raw bytes, binding them to `context` as associated data.
    ///
    /// # Errors
    /// * [`VaultError::Encryption`] If nonce generation or the AEAD encryption fails.
    pub fn seal_bytes(&self, data: impl AsRef<[u8]>, context: &[u8]) -> Result<Vec<u8>, VaultError> {
        let data = data.as_ref();
        let compressed = self.inner.compression.then(|| lz4_flex::compress_prepend_size(data));
        let (body, flags) = match &compressed {
            Some(packed) => (packed.as_slice(), LZ4_FLAG),
            None => (data, 0),
        };

        let nonce = Self::next_nonce()?;

        let mut buf = Vec::with_capacity(SEALED_OVERHEAD + body.len());
        buf.push(BLOB_FORMAT);
        buf.push(flags);
        buf.extend_from_slice(&nonce);
        buf.extend_from_slice(body);

        let tag = {
            let (_, rest) = buf.split_at_mut(PREAMBLE_LEN + NONCE_SIZE);
            self.inner
                .cipher
                .encrypt_inout_detached(&nonce, context, InOutBuf::from(rest))
                .map_err(|_| VaultError::Encryption {
                    message: "Encryption failed".into(),
                    context: Some("AEAD encryption failed".into()),
                })?
        };

        buf.extend_from_slice(tag.as_slice());
        Ok(buf)
    }

    /// Decrypts a payload produced by [`Vault::seal_bytes`] with the same `context`.
    ///
    /// # Errors
    /// * [`VaultError::InvalidPayload`] If the payload is truncated or has an unknown format byte.
    /// * [`VaultError::Decryption`] If the key, context, or data does not authenticate.
    /// * [`VaultError::Decompression`] If the LZ4 stream is corrupt.
    pub fn unseal_bytes(
        &self,
        payload: impl AsRef<[u8]>,
        context: &[u8],
    ) -> Result<Vec<u8>, VaultError> {
        let blob = payload.as_ref();
        if blob.len() < SEALED_OVERHEAD {
            return Err(too_short(blob.len()));
        }
        let Some((&[format, flags], sealed)) = blob.split_first_chunk::<PREAMBLE_LEN>() else {
            return Err(too_short(blob.len()));
        };
        if format != BLOB_FORMAT {
            return Err(VaultError::InvalidPayload {
                message: "Unknown blob format".into(),
                context: Some(format!("format={format}").into()),
            });
        }

        let (nonce, rest) = sealed.split_at(NONCE_SIZE);
        let (ciphertext, tag) = rest.split_at(rest.len() - TAG_SIZE);
        let nonce = Nonce::<C>::try_from(nonce).map_err(|_| VaultError::Decryption {
            message: "Nonce has the wrong size".into(),
            context: None,
        })?;
        let tag = tag.try_into().map_err(|_| VaultError::Decryption {
            message: "Tag has the wrong size".into(),
            context: None,
        })?;

        let mut buf = ciphertext.to_vec();
        self.inner
            .cipher
            .decrypt_inout_detached(&nonce, context, InOutBuf::from(&mut buf[..]), &tag)
            .map_err(|_| VaultError::Decryption {
                message: "Blob did not authenticate".into(),
                context: Some("Wrong key, context, or tampered file".into()),
            })?;

        if flags & LZ4_FLAG == 0 {
            return Ok(buf);
        }
        lz4_flex::decompress_size_prepended(&buf).map_err(|e| VaultError::Decompression {
            message: e.to_string().into(),
            context: Some("Inflating unsealed blob".into()),
        })
    }
}

fn too_short(len: usize) -> VaultError {
    VaultError::InvalidPayload {
        message: format!("Blob is {len} bytes, a sealed document needs at least {SEALED_OVERHEAD}").into(),
        context: None,
    }
}

use aead::{AeadInOut, KeyInit};
use aes_gcm::Aes256Gcm;
use chacha20poly1305::ChaCha20Poly1305;

/// Default cipher for store files.
pub type Aes = Aes256Gcm;
/// Software-friendly alternative for hosts without AES acceleration.
pub type ChaCha = ChaCha20Poly1305;

/// An AEAD cipher a [`crate::Vault`] can be keyed with.
pub trait VaultCipher: AeadInOut + KeyInit + Send + Sync + 'static {}
impl<T: AeadInOut + KeyInit + Send + Sync + 'static> VaultCipher for T {}

// Sealed blob: [format][flags][nonce; 12][ciphertext][tag; 16]
pub(crate) const BLOB_FORMAT: u8 = 1;
pub(crate) const PREAMBLE_LEN: usize = 2;
pub(crate) const NONCE_SIZE: usize = 12;
pub(crate) const TAG_SIZE: usize = 16;

pub(crate) const LZ4_FLAG: u8 = 0b0000_0001;

/// An empty document still carries preamble, nonce and tag.
pub(crate) const SEALED_OVERHEAD: usize = PREAMBLE_LEN + NONCE_SIZE + TAG_SIZE;

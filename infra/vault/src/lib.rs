//! The encryption primitive behind every persisted store blob.
//!
//! Store files never hold plaintext. This crate seals the JSON text of a store with an AEAD
//! cipher and exposes the result through the [`SafeStorage`] capability, which is all the
//! persistence layer ever sees: `is_encryption_available`, `encrypt_string`, `decrypt_string`.
//!
//! ## Payload Format
//!
//! ```text
//! [FORMAT(1)][FLAGS(1)][NONCE(12)][CIPHERTEXT(N)][TAG(16)]
//! ```
//!
//! The format byte lets the layout evolve; the flags byte records whether the plaintext was
//! LZ4-compressed before encryption. Nonces are random 96-bit values drawn per seal.
//!
//! ## Availability
//!
//! A [`SecureStorage`] built from platform key material reports encryption as available.
//! [`SecureStorage::obfuscated`] derives its key from a password compiled into the binary: the
//! blob is still unreadable to casual inspection, but anyone with the binary can open it, so
//! it reports encryption as *unavailable* and callers are expected to warn about it.
//!
//! ## Example
//!
//! ```rust
//! use estore_vault::{Aes, SafeStorage, SecureStorage, Vault, VaultError};
//!
//! # fn main() -> Result<(), VaultError> {
//! let vault = Vault::<Aes>::builder().derived_keys("platform-secret", "salt", "machine-id")?.build()?;
//! let storage = SecureStorage::new(vault);
//!
//! let sealed = storage.encrypt_string(r#"{"theme":"dark"}"#)?;
//! assert_eq!(storage.decrypt_string(&sealed)?, r#"{"theme":"dark"}"#);
//! assert!(storage.is_encryption_available());
//! # Ok(())
//! # }
//! ```

mod builder;
mod engine;
mod error;
mod safe_storage;
mod types;

pub use builder::VaultBuilder;
pub use engine::Vault;
pub use error::{VaultError, VaultErrorExt};
pub use safe_storage::{SafeStorage, SecureStorage};
pub use types::{Aes, ChaCha, VaultCipher};

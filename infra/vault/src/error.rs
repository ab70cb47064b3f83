//! # Vault Errors
//!
//! [`VaultError`] covers every way sealing or unsealing a store blob can fail.

use std::borrow::Cow;

/// Why a store blob could not be sealed or opened.
#[estore_derive::estore_error]
pub enum VaultError {
    /// The cipher or the system RNG refused to seal.
    #[error("Encryption error{}: {message}", format_context(.context))]
    Encryption { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The blob did not authenticate under this key and context.
    #[error("Decryption error{}: {message}", format_context(.context))]
    Decryption { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Decrypted bytes are not valid UTF-8 text.
    #[error("Encoding error{}: {source}", format_context(.context))]
    Encoding { source: std::string::FromUtf8Error, context: Option<Cow<'static, str>> },

    /// The unsealed LZ4 stream is corrupt.
    #[error("Decompression error{}: {message}", format_context(.context))]
    Decompression { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Key material is missing or unusable.
    #[error("Invalid configuration{}: {message}", format_context(.context))]
    InvalidConfiguration { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Truncated blob or unknown format byte.
    #[error("Invalid payload{}: {message}", format_context(.context))]
    InvalidPayload { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

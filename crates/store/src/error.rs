use std::borrow::Cow;

/// Failures of the authoritative store.
///
/// Read-side corruption never shows up here: it is absorbed while loading. What does surface
/// are write-path failures, bad options and configuration problems.
#[estore_derive::estore_error]
pub enum StoreError {
    #[error("Storage error{}: {source}", format_context(.context))]
    Storage { source: estore_storage::StorageError, context: Option<Cow<'static, str>> },

    #[error("Encryption error{}: {source}", format_context(.context))]
    Vault { source: estore_vault::VaultError, context: Option<Cow<'static, str>> },

    #[error("Serialization error{}: {source}", format_context(.context))]
    Serialization { source: serde_json::Error, context: Option<Cow<'static, str>> },

    #[error("Blob encoding error{}: {source}", format_context(.context))]
    Encoding { source: base64::DecodeError, context: Option<Cow<'static, str>> },

    /// The decrypted blob is valid JSON but not an object.
    #[error("Malformed store data{}: {message}", format_context(.context))]
    Malformed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Bridge error{}: {source}", format_context(.context))]
    Bridge { source: estore_bridge::BridgeError, context: Option<Cow<'static, str>> },

    #[error("Configuration error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },

    #[error("Invalid store options{}: {message}", format_context(.context))]
    InvalidOptions { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal store error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

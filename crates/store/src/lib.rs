//! The authoritative side of an encrypted settings store.
//!
//! Lives in the privileged process. Each named store owns one file,
//! `<data_dir>/<name>.<ext>`, holding the base64 text of its encrypted JSON object.
//!
//! * Reads that hit a missing, corrupt or undecryptable file fall back to the store's
//!   defaults and rewrite the file. They never fail.
//! * Every mutation persists before returning. Write failures propagate to the caller.
//! * After each mutation the full store is pushed to every observer window on the store's
//!   `UPDATED` channel.
//!
//! A [`StoreRegistry`] built with a bridge also answers each store's `GET` and `SET` channels,
//! which is how sandboxed proxies reach it.
//!
//! # Example
//!
//! ```rust
//! use estore_store::{StoreError, StoreOptions, StoreRegistry};
//! use estore_storage::Storage;
//! use estore_vault::{Aes, SecureStorage};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), StoreError> {
//!     let dir = std::env::temp_dir().join("estore-doc-example");
//!     let storage = Storage::builder().root(&dir).connect().await?;
//!     let registry = StoreRegistry::new(storage, Arc::new(SecureStorage::<Aes>::obfuscated()?));
//!
//!     let options = StoreOptions::builder().store_name("doc").defaults(json!({"greeting": "hi"})).build()?;
//!     let store = registry.create(options).await?;
//!     store.reset().await?;
//!
//!     store.set("greeting", json!("hello")).await?;
//!     assert_eq!(store.get("greeting").await, Some(json!("hello")));
//!
//!     store.reset().await?;
//!     assert_eq!(store.get("greeting").await, Some(json!("hi")));
//!
//!     store.delete_store().await?;
//!     Ok(())
//! }
//! ```

mod error;
mod options;
mod persistence;
mod registry;
mod service;
mod settings;
mod store;

/// The value object of one store.
pub type StoreMap = serde_json::Map<String, serde_json::Value>;

pub use error::{StoreError, StoreErrorExt};
pub use estore_bridge::{ChannelSet, GET_CHANNEL, SET_CHANNEL, UPDATED_CHANNEL};
pub use options::{DEFAULT_FILE_EXTENSION, StoreOptions, StoreOptionsBuilder};
pub use persistence::EncryptedFile;
pub use registry::StoreRegistry;
pub use settings::{CipherKind, ENV_PREFIX, EncryptionConfig, StoreConfig, load_config};
pub use store::StoreHandle;

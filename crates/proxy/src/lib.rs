//! The sandboxed side of an encrypted settings store.
//!
//! A [`ProxyStore`] never touches the file or the key. It asks the privileged side for a
//! snapshot once, keeps a local [`Mirror`], merges every pushed update into it and forwards
//! writes back through `SET`. A sandbox that was never preloaded with a bridge cannot create
//! one at all.
//!
//! [`ProxyRegistry`] keeps one proxy per store name for a sandbox, so code anywhere in the
//! window can look it up once startup has created it.
//!
//! # Example
//!
//! ```rust
//! use estore_bridge::{BridgeError, GET_CHANNEL, MainBridge, SET_CHANNEL, Sandbox};
//! use estore_proxy::{ProxyError, ProxyOptions, ProxyRegistry};
//! use serde_json::{Value, json};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), ProxyError> {
//!     let main = MainBridge::new();
//!     main.handle(GET_CHANNEL, |_| async { Ok::<_, BridgeError>(json!({"theme": "dark"})) })?;
//!     main.handle(SET_CHANNEL, |_| async { Ok::<_, BridgeError>(Value::Bool(true)) })?;
//!     main.spawn()?;
//!
//!     let (_, endpoint) = main.open_window("settings");
//!     let registry = ProxyRegistry::new(Sandbox::preloaded("settings", endpoint));
//!     let store = registry.create(ProxyOptions::default()).await?;
//!
//!     assert_eq!(store.get("theme")?, Some(json!("dark")));
//!     store.set("theme", json!("light")).await?;
//!     assert_eq!(registry.get("store")?.get("theme")?, Some(json!("light")));
//!     Ok(())
//! }
//! ```

mod error;
mod mirror;
mod proxy;
mod registry;

/// The value object of one store, as mirrored in a sandbox.
pub type StoreMap = serde_json::Map<String, serde_json::Value>;

pub use error::{ProxyError, ProxyErrorExt};
pub use mirror::Mirror;
pub use proxy::{ProxyOptions, ProxyState, ProxyStore};
pub use registry::ProxyRegistry;

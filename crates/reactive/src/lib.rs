//! Reactive bindings over a sandboxed store.
//!
//! A [`StoreProvider`] holds the state of one store for a UI scope. Code running inside
//! [`StoreProvider::scope`] reaches it through the hooks:
//!
//! * [`use_encrypted_store`] returns the `{ store, set_store }` pair.
//! * [`use_encrypted_store_with`] projects the state through a selector.
//! * [`use_store_selector`] returns a [`Selection`] that wakes only when its projection
//!   changes.
//!
//! Writes are optimistic: `set_store` merges into local state first and forwards the merged
//! object through `SET` without waiting. Every hook fails with
//! [`ReactiveError::OutsideProvider`] when no provider scope is active.
//!
//! # Example
//!
//! ```rust
//! use estore_bridge::{BridgeError, GET_CHANNEL, MainBridge, SET_CHANNEL, Sandbox};
//! use estore_reactive::{ReactiveError, StoreProvider, use_encrypted_store_with};
//! use serde_json::{Value, json};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), ReactiveError> {
//!     let main = MainBridge::new();
//!     main.handle(GET_CHANNEL, |_| async { Ok::<_, BridgeError>(json!({"theme": "dark"})) })?;
//!     main.handle(SET_CHANNEL, |_| async { Ok::<_, BridgeError>(Value::Bool(true)) })?;
//!     main.spawn()?;
//!
//!     let (_, endpoint) = main.open_window("settings");
//!     let provider = StoreProvider::mount(&Sandbox::preloaded("settings", endpoint)).await?;
//!
//!     let theme = provider.sync_scope(|| use_encrypted_store_with(|store, _| store.get("theme").cloned()))?;
//!     assert_eq!(theme, Some(json!("dark")));
//!
//!     assert!(use_encrypted_store_with(|_, _| ()).is_err());
//!     Ok(())
//! }
//! ```

mod context;
mod error;
mod provider;
mod selection;

pub use context::{SetStore, StoreContext, use_encrypted_store, use_encrypted_store_with, use_store_selector};
pub use error::{ReactiveError, ReactiveErrorExt};
pub use estore_proxy::StoreMap;
pub use provider::StoreProvider;
pub use selection::Selection;

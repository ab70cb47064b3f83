//! # Bridge
//!
//! The narrow message channel between the privileged store process and sandboxed windows.
//!
//! * [`MainBridge`] is the privileged end: per-channel request handlers (`handle` /
//!   `remove_handler`) served strictly one request at a time, and [`WindowHandle`]s for pushing.
//! * [`BridgeEndpoint`] is the sandboxed end: `invoke` (request/response), `send`
//!   (fire-and-forget), and `on` / `off` / `subscribe` for pushes.
//! * [`Sandbox`] models a window's restricted context; the endpoint has to be preloaded into it
//!   before any store code can reach the privileged side.
//!
//! Payloads are `serde_json::Value`s and every delivery hands out its own copy, so neither side
//! can alias the other's state.
//!
//! # Example
//!
//! ```rust
//! use estore_bridge::{BridgeError, MainBridge, Sandbox};
//! use serde_json::json;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), BridgeError> {
//!     let main = MainBridge::new();
//!     main.handle("echo", |call| async move { Ok::<_, BridgeError>(call.payload) })?;
//!     main.spawn()?;
//!
//!     let (window, endpoint) = main.open_window("settings");
//!     let sandbox = Sandbox::new("settings");
//!     sandbox.preload(endpoint)?;
//!
//!     let bridge = sandbox.bridge()?;
//!     assert_eq!(bridge.invoke("echo", json!({"a": 1})).await?, json!({"a": 1}));
//!
//!     let mut pushes = bridge.subscribe("news");
//!     window.send("news", json!("hello"));
//!     assert_eq!(pushes.recv().await, Some(json!("hello")));
//!     Ok(())
//! }
//! ```

mod channel;
mod endpoint;
mod error;
mod router;
mod sandbox;
mod subscription;
mod window;

pub use channel::{ChannelSet, DEFAULT_STORE_NAME, GET_CHANNEL, SET_CHANNEL, UPDATED_CHANNEL};
pub use endpoint::{BridgeEndpoint, ListenerId};
pub use error::{BridgeError, BridgeErrorExt};
pub use router::{HandlerFuture, Invocation, MainBridge};
pub use sandbox::Sandbox;
pub use subscription::Subscription;
pub use window::{PushMessage, WindowHandle, WindowId};

use crate::persistence::json_kind;
use crate::store::StoreHandle;
use estore_bridge::{BridgeError, Invocation, MainBridge};
use serde_json::Value;
use tracing::{debug, error};

/// Answers the store's `GET` and `SET` channels on `bridge`.
///
/// * `GET`: responds with the full store, first seeding an empty store from the request's
///   object payload.
/// * `SET`: replaces the whole store with the request's object payload, persists it, pushes
///   it to every observer and responds `true`. Non-object payloads are rejected and leave the
///   store untouched.
///
/// # Errors
/// Returns [`BridgeError::Internal`] if either channel already has a handler.
pub(crate) fn register(store: &StoreHandle, bridge: &MainBridge) -> Result<(), BridgeError> {
    let channels = store.channels().clone();

    let getter = store.clone();
    bridge.handle(channels.get(), move |call: Invocation| {
        let store = getter.clone();
        async move {
            debug!(store = %store.name(), window = %call.sender, "GET");
            let snapshot = store.snapshot_or_seed(call.payload).await.map_err(BridgeError::handler)?;
            Ok(Value::Object(snapshot))
        }
    })?;

    let setter = store.clone();
    let registered = bridge.handle(channels.set(), move |call: Invocation| {
        let store = setter.clone();
        async move {
            let values = match call.payload {
                Value::Object(values) => values,
                other => {
                    let kind = json_kind(&other);
                    error!(store = %store.name(), window = %call.sender, kind, "SET payload is not an object, ignored");
                    return Err(BridgeError::Handler {
                        message: format!("expected an object, found {kind}").into(),
                        context: Some(store.name().to_owned().into()),
                    });
                },
            };
            debug!(store = %store.name(), window = %call.sender, keys = values.len(), "SET");
            store.replace(values).await.map_err(BridgeError::handler)?;
            Ok(Value::Bool(true))
        }
    });

    if let Err(err) = registered {
        bridge.remove_handler(channels.get());
        return Err(err);
    }
    Ok(())
}

use estore_bridge::{BridgeError, GET_CHANNEL, MainBridge, SET_CHANNEL, Sandbox};
use estore_reactive::{
    ReactiveError, StoreMap, StoreProvider, use_encrypted_store, use_encrypted_store_with, use_store_selector,
};
use estore_storage::Storage;
use estore_store::{StoreHandle, StoreOptions, StoreRegistry};
use estore_vault::{Aes, SecureStorage};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const WAIT: Duration = Duration::from_secs(1);
const QUIET: Duration = Duration::from_millis(50);

async fn privileged(defaults: Value) -> (TempDir, MainBridge, StoreHandle) {
    let temp = TempDir::new().unwrap();
    let storage = Storage::builder().root(temp.path()).connect().await.unwrap();
    let bridge = MainBridge::new();
    let registry =
        StoreRegistry::with_bridge(storage, Arc::new(SecureStorage::<Aes>::obfuscated().unwrap()), bridge.clone());
    let store = registry.create(StoreOptions::builder().defaults(defaults).build().unwrap()).await.unwrap();
    bridge.spawn().unwrap();
    (temp, bridge, store)
}

fn window(bridge: &MainBridge, store: &StoreHandle, label: &str) -> Sandbox {
    let (handle, endpoint) = bridge.open_window(label);
    store.add_observer(handle);
    Sandbox::preloaded(label, endpoint)
}

fn object(value: Value) -> StoreMap {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

#[tokio::test]
async fn test_mount_requires_preload() {
    let result = StoreProvider::mount(&Sandbox::new("bare")).await;

    assert!(matches!(result, Err(ReactiveError::Bridge { source: BridgeError::Unavailable { .. }, .. })));
}

#[tokio::test]
async fn test_hooks_fail_outside_provider() {
    assert!(matches!(use_encrypted_store(), Err(ReactiveError::OutsideProvider { .. })));
    assert!(matches!(use_encrypted_store_with(|store, _| store.len()), Err(ReactiveError::OutsideProvider { .. })));
    assert!(matches!(use_store_selector(|store, _| store.len()), Err(ReactiveError::OutsideProvider { .. })));
}

#[tokio::test]
async fn test_hooks_see_initial_store() {
    let (_temp, bridge, store) = privileged(json!({"theme": "dark"})).await;
    let provider = StoreProvider::mount(&window(&bridge, &store, "w")).await.unwrap();

    let context = provider.scope(async { use_encrypted_store() }).await.unwrap();
    assert_eq!(context.store, object(json!({"theme": "dark"})));

    let theme = provider.sync_scope(|| use_encrypted_store_with(|store, _| store.get("theme").cloned())).unwrap();
    assert_eq!(theme, Some(json!("dark")));
}

#[tokio::test]
async fn test_set_store_is_optimistic_and_sends_full_object() {
    let (_temp, bridge, store) = privileged(json!({"a": 1})).await;
    let provider = StoreProvider::mount(&window(&bridge, &store, "w")).await.unwrap();

    let pending = provider.set_store(object(json!({"b": 2})));
    assert_eq!(provider.context().store, object(json!({"a": 1, "b": 2})));

    pending.await.unwrap().unwrap();
    assert_eq!(store.get_store().await, object(json!({"a": 1, "b": 2})));
}

#[tokio::test]
async fn test_setter_from_context_writes_through() {
    let (_temp, bridge, store) = privileged(json!({})).await;
    let provider = StoreProvider::mount(&window(&bridge, &store, "w")).await.unwrap();

    let pending = provider
        .scope(async { use_encrypted_store().map(|ctx| ctx.set_store.call(object(json!({"k": "v"})))) })
        .await
        .unwrap();
    pending.await.unwrap().unwrap();

    assert_eq!(store.get("k").await, Some(json!("v")));
}

#[tokio::test]
async fn test_pushes_from_other_windows_update_state() {
    let (_temp, bridge, store) = privileged(json!({})).await;
    let first = StoreProvider::mount(&window(&bridge, &store, "first")).await.unwrap();
    let second = StoreProvider::mount(&window(&bridge, &store, "second")).await.unwrap();
    let mut count = second.select(|store, _| store.len());

    first.set_store(object(json!({"k": 1}))).await.unwrap().unwrap();

    assert_eq!(tokio::time::timeout(WAIT, count.changed()).await.unwrap(), Some(&1));
    assert_eq!(second.context().store, object(json!({"k": 1})));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_write_committed_during_mount_survives_the_snapshot() {
    let (_temp, bridge, store) = privileged(json!({})).await;
    let window_a = window(&bridge, &store, "a");
    let writer = window(&bridge, &store, "b").bridge().unwrap().clone();

    let (provider, ack) = tokio::join!(StoreProvider::mount(&window_a), writer.invoke(SET_CHANNEL, json!({"k": 1})));
    let provider = provider.unwrap();
    assert_eq!(ack.unwrap(), json!(true));

    let mut k = provider.select(|store, _| store.get("k").cloned());
    if k.get().is_none() {
        assert_eq!(tokio::time::timeout(WAIT, k.changed()).await.unwrap(), Some(&Some(json!(1))));
    }
    tokio::time::sleep(QUIET).await;
    assert_eq!(provider.context().store, object(json!({"k": 1})));
}

#[tokio::test]
async fn test_selection_ignores_unrelated_changes() {
    let (_temp, bridge, store) = privileged(json!({"theme": "dark", "volume": 1})).await;
    let provider = StoreProvider::mount(&window(&bridge, &store, "w")).await.unwrap();
    let mut theme = provider
        .scope(async { use_store_selector(|store, _| store.get("theme").cloned()) })
        .await
        .unwrap();
    assert_eq!(theme.get(), &Some(json!("dark")));

    store.set("volume", json!(5)).await.unwrap();
    assert!(tokio::time::timeout(QUIET, theme.changed()).await.is_err());

    store.set("theme", json!("light")).await.unwrap();
    assert_eq!(tokio::time::timeout(WAIT, theme.changed()).await.unwrap(), Some(&Some(json!("light"))));
}

#[tokio::test]
async fn test_unmount_stops_following_pushes() {
    let (_temp, bridge, store) = privileged(json!({"a": 1})).await;
    let provider = StoreProvider::mount(&window(&bridge, &store, "w")).await.unwrap();

    provider.unmount();
    assert!(!provider.is_mounted());
    store.set("a", json!(2)).await.unwrap();
    tokio::time::sleep(QUIET).await;

    assert_eq!(provider.context().store, object(json!({"a": 1})));
}

#[tokio::test]
async fn test_malformed_initial_store_is_ignored() {
    let bridge = MainBridge::new();
    bridge.handle(GET_CHANNEL, |_| async { Ok::<_, BridgeError>(json!(42)) }).unwrap();
    bridge.spawn().unwrap();
    let (_, endpoint) = bridge.open_window("w");

    let provider = StoreProvider::mount(&Sandbox::preloaded("w", endpoint)).await.unwrap();

    assert!(provider.context().store.is_empty());
    assert!(provider.is_mounted());
}

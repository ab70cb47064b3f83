use estore_bridge::{BridgeError, GET_CHANNEL, MainBridge, SET_CHANNEL, Sandbox};
use estore_proxy::{ProxyError, ProxyOptions, ProxyRegistry, ProxyState, ProxyStore, StoreMap};
use estore_storage::Storage;
use estore_store::{StoreHandle, StoreOptions, StoreRegistry};
use estore_vault::{Aes, SecureStorage};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const WAIT: Duration = Duration::from_secs(1);

struct Privileged {
    _temp: TempDir,
    bridge: MainBridge,
    store: StoreHandle,
}

async fn privileged(defaults: Value) -> Privileged {
    let temp = TempDir::new().unwrap();
    let storage = Storage::builder().root(temp.path()).connect().await.unwrap();
    let bridge = MainBridge::new();
    let registry =
        StoreRegistry::with_bridge(storage, Arc::new(SecureStorage::<Aes>::obfuscated().unwrap()), bridge.clone());
    let store = registry.create(StoreOptions::builder().defaults(defaults).build().unwrap()).await.unwrap();
    bridge.spawn().unwrap();
    Privileged { _temp: temp, bridge, store }
}

impl Privileged {
    fn window(&self, label: &str) -> Sandbox {
        let (handle, endpoint) = self.bridge.open_window(label);
        self.store.add_observer(handle);
        Sandbox::preloaded(label, endpoint)
    }
}

fn object(value: Value) -> StoreMap {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

#[tokio::test]
async fn test_create_without_preload_fails_loudly() {
    let err = ProxyStore::create(&Sandbox::new("bare"), ProxyOptions::default()).await.unwrap_err();

    assert!(matches!(err, ProxyError::Bridge { source: BridgeError::Unavailable { .. }, .. }));
    assert!(err.to_string().contains("Sandbox::preload()"));
}

#[tokio::test]
async fn test_create_mirrors_snapshot() {
    let main = privileged(json!({"theme": "dark", "volume": 3})).await;
    let proxy = ProxyStore::create(&main.window("w"), ProxyOptions::default()).await.unwrap();

    assert_eq!(proxy.state(), ProxyState::Ready);
    assert_eq!(proxy.get("theme").unwrap(), Some(json!("dark")));
    assert!(proxy.has("volume").unwrap());
    assert_eq!(proxy.size().unwrap(), 2);
}

#[tokio::test]
async fn test_create_seeds_an_empty_store() {
    let main = privileged(json!({})).await;
    let options = ProxyOptions::default().with_defaults(object(json!({"lang": "en"})));

    let proxy = ProxyStore::create(&main.window("w"), options).await.unwrap();

    assert_eq!(proxy.get("lang").unwrap(), Some(json!("en")));
    assert_eq!(main.store.get("lang").await, Some(json!("en")));
}

#[tokio::test]
async fn test_writes_reach_the_authoritative_store() {
    let main = privileged(json!({"a": 1, "b": {"x": 1}})).await;
    let proxy = ProxyStore::create(&main.window("w"), ProxyOptions::default()).await.unwrap();

    proxy.set_many(object(json!({"b": {"y": 2}}))).await.unwrap();
    assert_eq!(main.store.get_store().await, object(json!({"a": 1, "b": {"y": 2}})));

    proxy.delete("a").await.unwrap();
    assert!(!main.store.has("a").await);

    proxy.set("c", json!([1, 2])).await.unwrap();
    assert_eq!(main.store.get("c").await, Some(json!([1, 2])));

    proxy.clear().await.unwrap();
    assert_eq!(main.store.size().await, 0);
    assert_eq!(proxy.size().unwrap(), 0);
}

#[tokio::test]
async fn test_push_reaches_the_other_proxy() {
    let main = privileged(json!({})).await;
    let a = ProxyStore::create(&main.window("a"), ProxyOptions::default()).await.unwrap();
    let b = ProxyStore::create(&main.window("b"), ProxyOptions::default()).await.unwrap();
    let mut b_changes = b.watch().unwrap();

    a.set_many(object(json!({"k": 1}))).await.unwrap();

    tokio::time::timeout(WAIT, b_changes.changed()).await.unwrap().unwrap();
    assert_eq!(b.get_store().unwrap(), object(json!({"k": 1})));
}

#[tokio::test]
async fn test_write_committed_during_create_is_not_reverted() {
    let main = privileged(json!({})).await;
    let window_a = main.window("a");
    let writer = main.window("b").bridge().unwrap().clone();

    let (proxy, ack) = tokio::join!(
        ProxyStore::create(&window_a, ProxyOptions::default()),
        writer.invoke(SET_CHANNEL, json!({"k": 1})),
    );
    let proxy = proxy.unwrap();
    assert_eq!(ack.unwrap(), json!(true));

    let mut changes = proxy.watch().unwrap();
    tokio::time::timeout(WAIT, async {
        while !proxy.has("k").unwrap() {
            changes.changed().await.unwrap();
        }
    })
    .await
    .unwrap();

    proxy.set("theme", json!("dark")).await.unwrap();
    assert_eq!(main.store.get_store().await, object(json!({"k": 1, "theme": "dark"})));
}

#[tokio::test]
async fn test_reset_restores_proxy_defaults() {
    let main = privileged(json!({})).await;
    let options = ProxyOptions::default().with_defaults(object(json!({"greeting": "hi"})));
    let proxy = ProxyStore::create(&main.window("w"), options).await.unwrap();

    proxy.set("greeting", json!("hello")).await.unwrap();
    proxy.set("extra", json!(true)).await.unwrap();
    proxy.reset().await.unwrap();

    assert_eq!(proxy.get_store().unwrap(), object(json!({"greeting": "hi"})));
    assert_eq!(main.store.get_store().await, object(json!({"greeting": "hi"})));
}

#[tokio::test]
async fn test_delete_store_empties_both_sides() {
    let main = privileged(json!({"a": 1})).await;
    let proxy = ProxyStore::create(&main.window("w"), ProxyOptions::default()).await.unwrap();

    proxy.delete_store().await.unwrap();

    assert_eq!(proxy.size().unwrap(), 0);
    assert_eq!(main.store.size().await, 0);
}

#[tokio::test]
async fn test_destroyed_proxy_fails_every_call() {
    let main = privileged(json!({"a": 1})).await;
    let proxy = ProxyStore::create(&main.window("w"), ProxyOptions::default()).await.unwrap();

    proxy.destroy().unwrap();

    assert_eq!(proxy.state(), ProxyState::Destroyed);
    assert!(matches!(proxy.get("a"), Err(ProxyError::Destroyed { .. })));
    assert!(matches!(proxy.set("a", json!(2)).await, Err(ProxyError::Destroyed { .. })));
    assert!(matches!(proxy.destroy(), Err(ProxyError::Destroyed { .. })));
    assert_eq!(main.store.get("a").await, Some(json!(1)));
}

#[tokio::test]
async fn test_malformed_snapshot_is_rejected() {
    let bridge = MainBridge::new();
    bridge.handle(GET_CHANNEL, |_| async { Ok::<_, BridgeError>(json!("not an object")) }).unwrap();
    bridge.spawn().unwrap();
    let (_, endpoint) = bridge.open_window("w");

    let result = ProxyStore::create(&Sandbox::preloaded("w", endpoint.clone()), ProxyOptions::default()).await;

    assert!(matches!(result, Err(ProxyError::MalformedPayload { .. })));
    assert_eq!(endpoint.listener_count(), 0);
}

#[tokio::test]
async fn test_failed_snapshot_detaches_listener() {
    let bridge = MainBridge::new();
    bridge.spawn().unwrap();
    let (_, endpoint) = bridge.open_window("w");

    let result = ProxyStore::create(&Sandbox::preloaded("w", endpoint.clone()), ProxyOptions::default()).await;

    assert!(matches!(result, Err(ProxyError::Bridge { source: BridgeError::NoHandler { .. }, .. })));
    assert_eq!(endpoint.listener_count(), 0);
}

#[tokio::test]
async fn test_registry_lifecycle() {
    let main = privileged(json!({"a": 1})).await;
    let registry = ProxyRegistry::new(main.window("w"));

    assert_eq!(registry.state("store"), ProxyState::Uninitialized);
    assert!(matches!(registry.get("store"), Err(ProxyError::NotInitialized { .. })));

    let first = registry.create(ProxyOptions::default()).await.unwrap();
    let again = registry.create(ProxyOptions::default().with_defaults(object(json!({"z": 0})))).await.unwrap();
    first.set("b", json!(2)).await.unwrap();

    assert_eq!(again.get("b").unwrap(), Some(json!(2)));
    assert_eq!(registry.get("store").unwrap().get("a").unwrap(), Some(json!(1)));
    assert_eq!(registry.state("store"), ProxyState::Ready);

    assert!(registry.reset("store"));
    assert!(!registry.reset("store"));
    assert_eq!(first.state(), ProxyState::Destroyed);
    assert!(matches!(registry.get("store"), Err(ProxyError::NotInitialized { .. })));
}

#[tokio::test]
async fn test_named_store_proxy_uses_its_own_channels() {
    let temp = TempDir::new().unwrap();
    let storage = Storage::builder().root(temp.path()).connect().await.unwrap();
    let bridge = MainBridge::new();
    let registry =
        StoreRegistry::with_bridge(storage, Arc::new(SecureStorage::<Aes>::obfuscated().unwrap()), bridge.clone());
    registry.create(StoreOptions::builder().defaults(json!({"who": "default"})).build().unwrap()).await.unwrap();
    let prefs = registry
        .create(StoreOptions::builder().store_name("prefs").defaults(json!({"who": "prefs"})).build().unwrap())
        .await
        .unwrap();
    bridge.spawn().unwrap();
    let (_, endpoint) = bridge.open_window("w");

    let proxy = ProxyStore::create(&Sandbox::preloaded("w", endpoint), ProxyOptions::named("prefs")).await.unwrap();
    proxy.set("who", json!("changed")).await.unwrap();

    assert_eq!(prefs.get("who").await, Some(json!("changed")));
}

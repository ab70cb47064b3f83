#![allow(dead_code)]

use estore_bridge::MainBridge;
use estore_storage::Storage;
use estore_store::{StoreMap, StoreRegistry};
use estore_vault::{Aes, SafeStorage, SecureStorage};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;

pub fn safe_storage() -> Arc<dyn SafeStorage> {
    Arc::new(SecureStorage::<Aes>::obfuscated().unwrap())
}

pub async fn storage(temp: &TempDir) -> Storage {
    Storage::builder().root(temp.path()).connect().await.unwrap()
}

pub async fn setup_registry() -> (TempDir, StoreRegistry) {
    let temp = TempDir::new().unwrap();
    let registry = StoreRegistry::new(storage(&temp).await, safe_storage());
    (temp, registry)
}

pub async fn setup_bridged_registry() -> (TempDir, StoreRegistry, MainBridge) {
    let temp = TempDir::new().unwrap();
    let bridge = MainBridge::new();
    let registry = StoreRegistry::with_bridge(storage(&temp).await, safe_storage(), bridge.clone());
    (temp, registry, bridge)
}

pub fn object(value: Value) -> StoreMap {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture is not an object: {other}"),
    }
}

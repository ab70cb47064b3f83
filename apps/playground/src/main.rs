use anyhow::Context;
use estore::bridge::{MainBridge, Sandbox};
use estore::main::{StoreOptions, StoreRegistry, load_config};
use estore::renderer::reactive::{StoreProvider, use_store_selector};
use estore::renderer::{ProxyOptions, ProxyRegistry, StoreMap};
use estore_logger::{LevelFilter, Logger};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

const PUSH_WAIT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _logger = Logger::builder().name(env!("CARGO_PKG_NAME")).level(LevelFilter::INFO).console(true).init()?;

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = load_config(config_path.as_deref()).context("Loading store config")?;

    // Privileged side
    let bridge = MainBridge::new();
    let registry = StoreRegistry::from_config(&config, Some(bridge.clone())).await?;
    let (editor_window, editor_endpoint) = bridge.open_window("editor");
    let (preview_window, preview_endpoint) = bridge.open_window("preview");

    let options = StoreOptions::builder()
        .defaults(json!({"greeting": "hi", "theme": "dark"}))
        .observer(editor_window)
        .observer(preview_window)
        .build()?;
    let store = registry.create(options).await?;
    let launches = store.get_or_insert("launches", json!(0)).await?.as_u64().unwrap_or(0) + 1;
    store.set("launches", json!(launches)).await?;
    info!(path = %store.path().display(), launches, "Authoritative store ready");

    let serving = bridge.spawn()?;

    // Sandboxed side
    let editor = ProxyRegistry::new(Sandbox::preloaded("editor", editor_endpoint));
    let preview = StoreProvider::mount(&Sandbox::preloaded("preview", preview_endpoint)).await?;
    let mut theme = preview.scope(async { use_store_selector(|store, _| store.get("theme").cloned()) }).await?;
    info!(theme = ?theme.get(), "Preview mounted");

    let proxy = editor.create(ProxyOptions::default()).await?;
    let next = match proxy.get("theme")? {
        Some(Value::String(current)) if current == "dark" => "light",
        _ => "dark",
    };
    proxy.set("theme", json!(next)).await?;

    match tokio::time::timeout(PUSH_WAIT, theme.changed()).await {
        Ok(Some(value)) => info!(theme = ?value, "Preview followed the editor"),
        Ok(None) | Err(_) => warn!("Preview did not see the editor's write"),
    }

    let mut greeting = StoreMap::new();
    greeting.insert("greeting".to_owned(), json!("hello"));
    preview.set_store(greeting).await??;
    info!(store = %serde_json::Value::Object(store.get_store().await), "Final authoritative state");

    preview.unmount();
    editor.reset("store");
    serving.abort();
    Ok(())
}

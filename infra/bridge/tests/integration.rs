use estore_bridge::{BridgeError, MainBridge, Sandbox};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

fn echo_bridge() -> MainBridge {
    let main = MainBridge::new();
    main.handle("echo", |call| async move { Ok::<_, BridgeError>(call.payload) }).unwrap();
    main
}

#[tokio::test]
async fn test_invoke_round_trip() {
    let main = echo_bridge();
    main.spawn().unwrap();
    let (_, endpoint) = main.open_window("w");

    let answer = endpoint.invoke("echo", json!({"k": [1, 2]})).await.unwrap();
    assert_eq!(answer, json!({"k": [1, 2]}));
}

#[tokio::test]
async fn test_invoke_without_handler_fails() {
    let main = echo_bridge();
    main.spawn().unwrap();
    let (_, endpoint) = main.open_window("w");

    let err = endpoint.invoke("missing", Value::Null).await.unwrap_err();
    assert!(matches!(err, BridgeError::NoHandler { .. }));
}

#[tokio::test]
async fn test_handler_errors_travel_back() {
    let main = MainBridge::new();
    main.handle("fail", |_| async { Err::<Value, _>(BridgeError::handler("disk full")) }).unwrap();
    main.spawn().unwrap();
    let (_, endpoint) = main.open_window("w");

    let err = endpoint.invoke("fail", Value::Null).await.unwrap_err();
    assert!(err.to_string().contains("disk full"));
}

#[tokio::test]
async fn test_second_handler_is_rejected_until_removed() {
    let main = echo_bridge();

    assert!(main.handle("echo", |_| async { Ok::<_, BridgeError>(Value::Null) }).is_err());
    assert!(main.remove_handler("echo"));
    assert!(!main.has_handler("echo"));
    assert!(main.handle("echo", |_| async { Ok::<_, BridgeError>(Value::Null) }).is_ok());
}

#[tokio::test]
async fn test_serve_only_once() {
    let main = echo_bridge();
    main.spawn().unwrap();

    assert!(matches!(main.spawn(), Err(BridgeError::Internal { .. })));
}

#[tokio::test]
async fn test_requests_are_handled_one_at_a_time() {
    let main = MainBridge::new();
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    {
        let (active, peak) = (Arc::clone(&active), Arc::clone(&peak));
        main.handle("slow", move |_| {
            let (active, peak) = (Arc::clone(&active), Arc::clone(&peak));
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, BridgeError>(Value::Bool(true))
            }
        })
        .unwrap();
    }
    main.spawn().unwrap();

    let (_, a) = main.open_window("a");
    let (_, b) = main.open_window("b");
    let (ra, rb) = tokio::join!(a.invoke("slow", Value::Null), b.invoke("slow", Value::Null));

    assert!(ra.is_ok() && rb.is_ok());
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_fire_and_forget_send_reaches_handler() {
    let main = MainBridge::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    main.handle("log", move |call| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(call.payload);
            Ok::<_, BridgeError>(Value::Null)
        }
    })
    .unwrap();
    main.spawn().unwrap();
    let (_, endpoint) = main.open_window("w");

    endpoint.send("log", json!("ping")).unwrap();
    assert_eq!(rx.recv().await, Some(json!("ping")));
}

#[tokio::test]
async fn test_invoke_fails_when_privileged_side_is_gone() {
    let main = echo_bridge();
    let (_, endpoint) = main.open_window("w");
    let serving = main.spawn().unwrap();
    serving.abort();
    let _ = serving.await;

    let err = endpoint.invoke("echo", Value::Null).await.unwrap_err();
    assert!(matches!(err, BridgeError::Disconnected { .. }));
}

#[tokio::test]
async fn test_pushes_are_filtered_by_channel_and_ordered() {
    let main = MainBridge::new();
    let (window, endpoint) = main.open_window("w");
    let mut updates = endpoint.subscribe("updated");

    window.send("other", json!(0));
    for i in 1..=3 {
        window.send("updated", json!(i));
    }

    for i in 1..=3 {
        assert_eq!(updates.recv().await, Some(json!(i)));
    }
}

#[tokio::test]
async fn test_push_without_listeners_is_dropped() {
    let main = MainBridge::new();
    let (window, _endpoint) = main.open_window("w");

    assert_eq!(window.listener_count(), 0);
    assert_eq!(window.send("updated", json!({})), 0);
}

#[tokio::test]
async fn test_on_and_off() {
    let main = MainBridge::new();
    let (window, endpoint) = main.open_window("w");
    let (tx, mut rx) = mpsc::unbounded_channel();

    let id = endpoint.on("updated", move |payload| {
        let _ = tx.send(payload);
    });
    window.send("updated", json!({"a": 1}));
    assert_eq!(rx.recv().await, Some(json!({"a": 1})));

    assert!(endpoint.off(id));
    assert!(!endpoint.off(id));
    assert_eq!(endpoint.listener_count(), 0);

    window.send("updated", json!({"a": 2}));
    assert_eq!(rx.recv().await, None, "detached listener must drop its sender");
}

#[tokio::test]
async fn test_sandbox_requires_preload() {
    let main = MainBridge::new();
    let sandbox = Sandbox::new("renderer");

    let err = sandbox.bridge().unwrap_err();
    assert!(matches!(err, BridgeError::Unavailable { .. }));
    assert!(err.to_string().contains("preload"));

    let (_, endpoint) = main.open_window("renderer");
    sandbox.preload(endpoint.clone()).unwrap();
    assert!(sandbox.is_preloaded());
    assert!(sandbox.preload(endpoint).is_err(), "preload is allowed once");
}

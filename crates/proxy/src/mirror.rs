use crate::StoreMap;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::{error, trace};

/// Local, non-authoritative copy of a store's object.
///
/// Reconciled by the initial snapshot and by shallow merge (pushes and local writes). Readers
/// can watch it for changes.
#[derive(Debug, Clone)]
pub struct Mirror {
    state: Arc<watch::Sender<StoreMap>>,
    /// Set once a push has been merged; read and written under the watch lock.
    pushed: Arc<AtomicBool>,
}

impl Default for Mirror {
    fn default() -> Self {
        Self::new(StoreMap::new())
    }
}

impl Mirror {
    #[must_use]
    pub fn new(initial: StoreMap) -> Self {
        let (state, _) = watch::channel(initial);
        Self { state: Arc::new(state), pushed: Arc::new(AtomicBool::new(false)) }
    }

    #[must_use]
    pub fn snapshot(&self) -> StoreMap {
        self.state.borrow().clone()
    }

    /// Runs `f` against the current object without copying it.
    pub fn read<R>(&self, f: impl FnOnce(&StoreMap) -> R) -> R {
        f(&self.state.borrow())
    }

    pub fn replace(&self, map: StoreMap) {
        self.state.send_replace(map);
    }

    /// Applies the initial snapshot without clobbering pushes that overtook it.
    ///
    /// A push carries the whole store, so once one has landed the mirror is at least as new as
    /// the snapshot and only keys it lacks are taken from `snapshot`.
    pub fn seed(&self, snapshot: StoreMap) {
        let pushed = &self.pushed;
        self.state.send_modify(|map| {
            if pushed.load(Ordering::Acquire) {
                for (key, value) in snapshot {
                    map.entry(key).or_insert(value);
                }
            } else {
                *map = snapshot;
            }
        });
    }

    /// Applies `f` and returns the resulting object.
    pub fn modify(&self, f: impl FnOnce(&mut StoreMap)) -> StoreMap {
        let mut result = StoreMap::new();
        self.state.send_modify(|map| {
            f(map);
            result.clone_from(map);
        });
        result
    }

    /// Shallow merge: top-level keys of `delta` overwrite wholesale.
    pub fn merge(&self, delta: StoreMap) -> StoreMap {
        self.modify(|map| map.extend(delta))
    }

    /// Merges a pushed payload. Anything but an object is logged and ignored.
    pub fn apply_push(&self, store: &str, payload: Value) -> bool {
        match payload {
            Value::Object(delta) => {
                trace!(store, keys = delta.len(), "Merging pushed update");
                let pushed = &self.pushed;
                self.modify(|map| {
                    pushed.store(true, Ordering::Release);
                    map.extend(delta);
                });
                true
            },
            other => {
                error!(store, payload = %other, "Pushed update is not an object, ignored");
                false
            },
        }
    }

    /// Receives the latest object whenever it changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StoreMap> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> StoreMap {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_push_merge_is_shallow() {
        let mirror = Mirror::new(object(json!({"a": 1, "b": {"x": 1}})));

        assert!(mirror.apply_push("store", json!({"b": {"y": 2}})));

        assert_eq!(mirror.snapshot(), object(json!({"a": 1, "b": {"y": 2}})));
    }

    #[test]
    fn test_malformed_push_leaves_state_untouched() {
        let mirror = Mirror::new(object(json!({"a": 1})));

        assert!(!mirror.apply_push("store", json!("oops")));
        assert!(!mirror.apply_push("store", json!([1])));

        assert_eq!(mirror.snapshot(), object(json!({"a": 1})));
    }

    #[test]
    fn test_seed_replaces_when_nothing_was_pushed() {
        let mirror = Mirror::new(object(json!({"stale": true})));

        mirror.seed(object(json!({"a": 1})));

        assert_eq!(mirror.snapshot(), object(json!({"a": 1})));
    }

    #[test]
    fn test_seed_keeps_keys_from_an_earlier_push() {
        let mirror = Mirror::default();
        assert!(mirror.apply_push("store", json!({"k": 1, "theme": "light"})));

        mirror.seed(object(json!({"theme": "dark", "lang": "en"})));

        assert_eq!(mirror.snapshot(), object(json!({"k": 1, "theme": "light", "lang": "en"})));
    }

    #[test]
    fn test_local_merge_does_not_count_as_push() {
        let mirror = Mirror::default();
        mirror.merge(object(json!({"local": 1})));

        mirror.seed(object(json!({"a": 1})));

        assert_eq!(mirror.snapshot(), object(json!({"a": 1})));
    }

    #[test]
    fn test_subscribers_see_changes() {
        let mirror = Mirror::default();
        let mut rx = mirror.subscribe();

        let merged = mirror.merge(object(json!({"k": true})));

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), merged);
    }
}

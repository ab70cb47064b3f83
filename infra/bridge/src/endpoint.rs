use crate::error::BridgeError;
use crate::router::{Envelope, Invocation};
use crate::subscription::Subscription;
use crate::window::{PushMessage, WindowId};
use fxhash::FxHashMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::AbortHandle;
use tracing::trace;

/// Identifies a callback registered with [`BridgeEndpoint::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct EndpointInner {
    window: WindowId,
    requests: mpsc::UnboundedSender<Envelope>,
    pushes: broadcast::Sender<Arc<PushMessage>>,
    listeners: Mutex<FxHashMap<ListenerId, AbortHandle>>,
    next_listener: AtomicU64,
}

impl std::fmt::Debug for EndpointInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointInner")
            .field("window", &self.window)
            .field("listeners", &self.listeners.lock().len())
            .finish_non_exhaustive()
    }
}

impl Drop for EndpointInner {
    fn drop(&mut self) {
        for (_, task) in self.listeners.get_mut().drain() {
            task.abort();
        }
    }
}

/// The sandboxed end of the bridge: the only privileged capability a window can reach.
#[derive(Debug, Clone)]
pub struct BridgeEndpoint {
    inner: Arc<EndpointInner>,
}

impl BridgeEndpoint {
    pub(crate) fn new(
        window: WindowId,
        requests: mpsc::UnboundedSender<Envelope>,
        pushes: broadcast::Sender<Arc<PushMessage>>,
    ) -> Self {
        Self {
            inner: Arc::new(EndpointInner {
                window,
                requests,
                pushes,
                listeners: Mutex::default(),
                next_listener: AtomicU64::new(1),
            }),
        }
    }

    #[must_use]
    pub fn window(&self) -> WindowId {
        self.inner.window
    }

    /// Sends a request and waits for the privileged handler's answer.
    ///
    /// There is no timeout: a stalled privileged side stalls the caller.
    ///
    /// # Errors
    /// * [`BridgeError::NoHandler`] if nothing handles `channel`.
    /// * [`BridgeError::Handler`] if the handler failed.
    /// * [`BridgeError::Disconnected`] if the privileged side is gone.
    pub async fn invoke(&self, channel: &str, payload: Value) -> Result<Value, BridgeError> {
        let (reply, answer) = oneshot::channel();
        let call = self.call(channel, payload);

        self.inner
            .requests
            .send(Envelope::Invoke { call, reply })
            .map_err(|_| BridgeError::disconnected(channel))?;
        trace!(window = %self.inner.window, channel, "Request sent");

        answer.await.map_err(|_| BridgeError::disconnected(channel))?
    }

    /// Fire-and-forget message to the privileged side.
    ///
    /// # Errors
    /// Returns [`BridgeError::Disconnected`] if the privileged side is gone.
    pub fn send(&self, channel: &str, payload: Value) -> Result<(), BridgeError> {
        let call = self.call(channel, payload);
        self.inner
            .requests
            .send(Envelope::Send { call })
            .map_err(|_| BridgeError::disconnected(channel))
    }

    /// Starts receiving pushes on `channel`. Pushes sent before this call are not replayed.
    #[must_use]
    pub fn subscribe(&self, channel: &str) -> Subscription {
        Subscription::new(channel.into(), self.inner.pushes.subscribe())
    }

    /// Runs `listener` for every push on `channel` until [`BridgeEndpoint::off`].
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime.
    pub fn on<F>(&self, channel: &str, mut listener: F) -> ListenerId
    where
        F: FnMut(Value) + Send + 'static,
    {
        let mut subscription = self.subscribe(channel);
        let task = tokio::spawn(async move {
            while let Some(payload) = subscription.recv().await {
                listener(payload);
            }
        });

        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.lock().insert(id, task.abort_handle());
        trace!(window = %self.inner.window, channel, "Listener attached");
        id
    }

    /// Detaches a listener. Returns `false` if it was already gone.
    pub fn off(&self, id: ListenerId) -> bool {
        let Some(task) = self.inner.listeners.lock().remove(&id) else {
            return false;
        };
        task.abort();
        trace!(window = %self.inner.window, "Listener detached");
        true
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    fn call(&self, channel: &str, payload: Value) -> Invocation {
        Invocation { channel: channel.into(), sender: self.inner.window, payload }
    }
}

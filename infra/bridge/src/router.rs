use crate::endpoint::BridgeEndpoint;
use crate::error::BridgeError;
use crate::window::{PushMessage, WindowHandle, WindowId};
use fxhash::FxHashMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Pushes buffered per window before slow listeners start skipping.
const WINDOW_PUSH_CAPACITY: usize = 64;

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, BridgeError>> + Send>>;
type Handler = Arc<dyn Fn(Invocation) -> HandlerFuture + Send + Sync>;
type HandlerMap = Arc<RwLock<FxHashMap<Arc<str>, Handler>>>;

/// One request as seen by a privileged handler.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub channel: Arc<str>,
    pub sender: WindowId,
    pub payload: Value,
}

pub(crate) enum Envelope {
    Invoke { call: Invocation, reply: oneshot::Sender<Result<Value, BridgeError>> },
    Send { call: Invocation },
}

struct RouterInner {
    handlers: HandlerMap,
    requests: mpsc::UnboundedSender<Envelope>,
    inbox: Mutex<Option<mpsc::UnboundedReceiver<Envelope>>>,
    next_window: AtomicU64,
}

impl std::fmt::Debug for RouterInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterInner")
            .field("channels", &self.handlers.read().keys().cloned().collect::<Vec<_>>())
            .field("serving", &self.inbox.lock().is_none())
            .finish_non_exhaustive()
    }
}

/// The privileged end of the bridge.
///
/// Handlers are registered per channel. Requests from every window land in one queue and are
/// answered strictly one at a time by [`MainBridge::serve`], so two requests never run
/// concurrently against the same handler state.
#[derive(Debug, Clone)]
pub struct MainBridge {
    inner: Arc<RouterInner>,
}

impl Default for MainBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl MainBridge {
    #[must_use]
    pub fn new() -> Self {
        let (requests, inbox) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(RouterInner {
                handlers: Arc::default(),
                requests,
                inbox: Mutex::new(Some(inbox)),
                next_window: AtomicU64::new(1),
            }),
        }
    }

    /// Registers the handler answering `channel`.
    ///
    /// # Errors
    /// Returns [`BridgeError::Internal`] if the channel already has a handler.
    pub fn handle<F, Fut>(&self, channel: &str, handler: F) -> Result<(), BridgeError>
    where
        F: Fn(Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BridgeError>> + Send + 'static,
    {
        let mut handlers = self.inner.handlers.write();
        if handlers.contains_key(channel) {
            return Err(BridgeError::Internal {
                message: format!("Attempted to register a second handler for '{channel}'").into(),
                context: None,
            });
        }
        let boxed: Handler = Arc::new(move |call| -> HandlerFuture { Box::pin(handler(call)) });
        handlers.insert(channel.into(), boxed);
        debug!(channel, "Bridge handler registered");
        Ok(())
    }

    /// Drops the handler for `channel`. Returns `false` if none was registered.
    pub fn remove_handler(&self, channel: &str) -> bool {
        let removed = self.inner.handlers.write().remove(channel).is_some();
        if removed {
            debug!(channel, "Bridge handler removed");
        }
        removed
    }

    #[must_use]
    pub fn has_handler(&self, channel: &str) -> bool {
        self.inner.handlers.read().contains_key(channel)
    }

    /// Opens a new sandboxed window.
    ///
    /// Returns the privileged-side push handle and the endpoint to preload into the window.
    #[must_use]
    pub fn open_window(&self, label: &str) -> (WindowHandle, BridgeEndpoint) {
        let id = WindowId(self.inner.next_window.fetch_add(1, Ordering::Relaxed));
        let (pushes, _) = broadcast::channel::<Arc<PushMessage>>(WINDOW_PUSH_CAPACITY);

        let handle = WindowHandle::new(id, label.into(), pushes.clone());
        let endpoint = BridgeEndpoint::new(id, self.inner.requests.clone(), pushes);
        debug!(window = %id, label, "Window opened");

        (handle, endpoint)
    }

    /// Answers requests until every endpoint and this bridge are dropped.
    ///
    /// # Errors
    /// Returns [`BridgeError::Internal`] if the bridge is already being served.
    pub fn serve(&self) -> Result<impl Future<Output = ()> + Send + 'static, BridgeError> {
        let inbox = self.inner.inbox.lock().take().ok_or_else(|| BridgeError::Internal {
            message: "Bridge is already being served".into(),
            context: None,
        })?;
        Ok(run(Arc::clone(&self.inner.handlers), inbox))
    }

    /// Spawns [`MainBridge::serve`] onto the current runtime.
    ///
    /// # Errors
    /// Returns [`BridgeError::Internal`] if the bridge is already being served.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime.
    pub fn spawn(&self) -> Result<JoinHandle<()>, BridgeError> {
        let serving = self.serve()?;
        Ok(tokio::spawn(serving))
    }
}

async fn run(handlers: HandlerMap, mut inbox: mpsc::UnboundedReceiver<Envelope>) {
    info!("Bridge serving requests");

    while let Some(envelope) = inbox.recv().await {
        match envelope {
            Envelope::Invoke { call, reply } => {
                let channel = Arc::clone(&call.channel);
                let result = dispatch(&handlers, call).await;
                if reply.send(result).is_err() {
                    trace!(channel = %channel, "Caller went away before the reply");
                }
            },
            Envelope::Send { call } => {
                let channel = Arc::clone(&call.channel);
                if let Err(err) = dispatch(&handlers, call).await {
                    warn!(channel = %channel, error = %err, "Fire-and-forget message failed");
                }
            },
        }
    }

    info!("Bridge stopped: all endpoints closed");
}

async fn dispatch(handlers: &HandlerMap, call: Invocation) -> Result<Value, BridgeError> {
    let handler = handlers.read().get(&call.channel).cloned();
    let Some(handler) = handler else {
        return Err(BridgeError::NoHandler {
            message: format!("No handler registered for '{}'", call.channel).into(),
            context: None,
        });
    };
    trace!(channel = %call.channel, sender = %call.sender, "Dispatching request");
    handler(call).await
}

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

/// Identifies one sandboxed window for the lifetime of the privileged process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub(crate) u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

/// A message pushed from the privileged side into a window.
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub channel: Arc<str>,
    pub payload: Value,
}

/// Non-owning reference the privileged side uses to push into one window.
///
/// Holding a handle does not keep the window's listeners alive; pushing into a window nobody
/// listens to is silently dropped.
#[derive(Debug, Clone)]
pub struct WindowHandle {
    id: WindowId,
    label: Arc<str>,
    pushes: broadcast::Sender<Arc<PushMessage>>,
}

impl WindowHandle {
    pub(crate) const fn new(
        id: WindowId,
        label: Arc<str>,
        pushes: broadcast::Sender<Arc<PushMessage>>,
    ) -> Self {
        Self { id, label, pushes }
    }

    #[must_use]
    pub const fn id(&self) -> WindowId {
        self.id
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Fire-and-forget push. Returns how many listeners in the window received it.
    pub fn send(&self, channel: &str, payload: Value) -> usize {
        let message = Arc::new(PushMessage { channel: channel.into(), payload });
        match self.pushes.send(message) {
            Ok(count) => {
                trace!(window = %self.id, channel, count, "Push delivered");
                count
            },
            Err(_) => {
                trace!(window = %self.id, channel, "Push dropped: window has no listeners");
                0
            },
        }
    }

    /// Number of live subscriptions inside the window, across all channels.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.pushes.receiver_count()
    }
}

impl PartialEq for WindowHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for WindowHandle {}

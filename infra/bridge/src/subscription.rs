use crate::window::PushMessage;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Pushes for a single channel, in the order the privileged side sent them.
///
/// Dropping the subscription detaches it.
#[derive(Debug)]
pub struct Subscription {
    channel: Arc<str>,
    rx: broadcast::Receiver<Arc<PushMessage>>,
}

impl Subscription {
    pub(crate) const fn new(channel: Arc<str>, rx: broadcast::Receiver<Arc<PushMessage>>) -> Self {
        Self { channel, rx }
    }

    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Waits for the next payload on this channel. `None` once the window is gone.
    ///
    /// A receiver that falls behind skips to the oldest retained push; store pushes carry the
    /// full object, so the newest one always supersedes what was skipped.
    pub async fn recv(&mut self) -> Option<Value> {
        let mut skipped = 0u64;

        loop {
            match self.rx.recv().await {
                Ok(message) if *message.channel == *self.channel => {
                    if skipped > 0 {
                        warn!(channel = %self.channel, skipped, "Listener lagged behind pushes");
                    }
                    return Some(message.payload.clone());
                },
                Ok(_) => {},
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    skipped = skipped.saturating_add(n);
                    debug!(channel = %self.channel, skipped = n, "Listener lagging");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

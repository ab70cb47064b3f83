use crate::endpoint::BridgeEndpoint;
use crate::error::BridgeError;
use std::sync::{Arc, OnceLock};
use tracing::debug;

#[derive(Debug)]
struct SandboxInner {
    label: Arc<str>,
    bridge: OnceLock<BridgeEndpoint>,
}

/// A sandboxed execution context (one window's renderer side).
///
/// Starts with no privileged access at all. [`Sandbox::preload`] installs the bridge once;
/// everything that talks to the privileged side asks for it through [`Sandbox::bridge`].
#[derive(Debug, Clone)]
pub struct Sandbox {
    inner: Arc<SandboxInner>,
}

impl Sandbox {
    #[must_use]
    pub fn new(label: &str) -> Self {
        Self { inner: Arc::new(SandboxInner { label: label.into(), bridge: OnceLock::new() }) }
    }

    /// Creates a sandbox with `endpoint` already installed.
    #[must_use]
    pub fn preloaded(label: &str, endpoint: BridgeEndpoint) -> Self {
        let sandbox = Self::new(label);
        let _ = sandbox.inner.bridge.set(endpoint);
        sandbox
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Installs the bridge endpoint. Allowed exactly once per sandbox.
    ///
    /// # Errors
    /// Returns [`BridgeError::Internal`] if a bridge is already installed.
    pub fn preload(&self, endpoint: BridgeEndpoint) -> Result<(), BridgeError> {
        let window = endpoint.window();
        self.inner.bridge.set(endpoint).map_err(|_| BridgeError::Internal {
            message: "Bridge is already preloaded".into(),
            context: Some(self.inner.label.to_string().into()),
        })?;
        debug!(sandbox = %self.inner.label, %window, "Bridge preloaded");
        Ok(())
    }

    #[must_use]
    pub fn is_preloaded(&self) -> bool {
        self.inner.bridge.get().is_some()
    }

    /// The installed bridge.
    ///
    /// # Errors
    /// Returns [`BridgeError::Unavailable`] if [`Sandbox::preload`] was never called.
    pub fn bridge(&self) -> Result<&BridgeEndpoint, BridgeError> {
        self.inner.bridge.get().ok_or_else(|| BridgeError::Unavailable {
            message: "No bridge in this context. Please check that you called Sandbox::preload() \
                      for it during bootstrap"
                .into(),
            context: Some(self.inner.label.to_string().into()),
        })
    }
}

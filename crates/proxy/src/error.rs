use std::borrow::Cow;

/// Failures of a sandboxed proxy store.
///
/// Everything except [`ProxyError::Bridge`] is a wiring mistake in the calling code.
#[estore_derive::estore_error]
pub enum ProxyError {
    /// Looked up before `create` finished.
    #[error("Store is not initialized{}: {message}", format_context(.context))]
    NotInitialized { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Used after `destroy`.
    #[error("Store is destroyed{}: {message}", format_context(.context))]
    Destroyed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Bridge error{}: {source}", format_context(.context))]
    Bridge { source: estore_bridge::BridgeError, context: Option<Cow<'static, str>> },

    /// The privileged side answered with something other than an object.
    #[error("Malformed payload{}: {message}", format_context(.context))]
    MalformedPayload { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl ProxyError {
    pub(crate) fn not_initialized(name: &str) -> Self {
        Self::NotInitialized {
            message: "Make sure to call ProxyRegistry::create() first".into(),
            context: Some(name.to_owned().into()),
        }
    }

    pub(crate) fn destroyed(name: &str) -> Self {
        Self::Destroyed {
            message: "The proxy was destroyed and no longer tracks the store".into(),
            context: Some(name.to_owned().into()),
        }
    }
}

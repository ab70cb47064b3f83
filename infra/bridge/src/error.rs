use std::borrow::Cow;

/// Errors surfaced by either end of the bridge.
#[estore_derive::estore_error]
pub enum BridgeError {
    /// The sandboxed context has no bridge installed.
    #[error("Bridge unavailable{}: {message}", format_context(.context))]
    Unavailable { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// No privileged handler is registered for the invoked channel.
    #[error("No handler registered{}: {message}", format_context(.context))]
    NoHandler { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The other end went away before answering.
    #[error("Bridge disconnected{}: {message}", format_context(.context))]
    Disconnected { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The privileged handler ran and failed; `message` is its rendered error.
    #[error("Handler failed{}: {message}", format_context(.context))]
    Handler { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal bridge error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl BridgeError {
    /// Wraps any error raised inside a privileged handler so it can travel back to the caller.
    pub fn handler(err: impl std::fmt::Display) -> Self {
        Self::Handler { message: err.to_string().into(), context: None }
    }

    pub(crate) fn disconnected(channel: &str) -> Self {
        Self::Disconnected {
            message: "The privileged side is no longer serving requests".into(),
            context: Some(channel.to_owned().into()),
        }
    }
}

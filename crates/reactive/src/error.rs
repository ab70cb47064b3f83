use std::borrow::Cow;

#[estore_derive::estore_error]
pub enum ReactiveError {
    /// A hook ran outside [`crate::StoreProvider::scope`].
    #[error("No store provider{}: {message}", format_context(.context))]
    OutsideProvider { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Bridge error{}: {source}", format_context(.context))]
    Bridge { source: estore_bridge::BridgeError, context: Option<Cow<'static, str>> },
}

use estore_derive::estore_error;
use std::borrow::Cow;

#[estore_error]
pub enum BlobError {
    #[error("I/O failure{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn main() {
    let err: BlobError = "boom".into();
    let _ = err.to_string();
}

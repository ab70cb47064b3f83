#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros for the encrypted store infrastructure.
//!
//! Every crate in the workspace declares exactly one error enum with [`macro@estore_error`],
//! which keeps error wiring (`?` conversions, `.context(...)` annotations) uniform from the
//! vault up to the reactive bindings.

mod error;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Attribute macro for defining crate-level error enums.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]` unless already present.
/// * **Context Support**: Generates a companion `<Name>Ext` trait that adds `.context()`
///   to `Result<T, Name>` and to `Result<T, Source>` for every wrapped upstream error.
/// * **Standard Conversions**: Implements `From<Source>` for variants containing a `source`
///   field (or a field marked `#[source]`/`#[from]`), enabling the `?` operator.
/// * **Internal Fallback**: Provides `From<&'static str>` and `From<String>` when an
///   `Internal` variant is present.
/// * **Formatting Helper**: Emits a module-private `format_context` used inside `#[error(...)]`.
///
/// # Requirements
///
/// 1. The macro must be applied to an **enum** with named-field variants only.
/// 2. A `context` field must be typed `Option<Cow<'static, str>>`.
/// 3. Variants wrapping an upstream error must also carry a `context` field.
///
/// # Example
///
/// ```rust,ignore
/// use estore_derive::estore_error;
/// use std::borrow::Cow;
///
/// #[estore_error]
/// pub enum PersistError {
///     #[error("I/O failure{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn write_blob(path: &std::path::Path) -> Result<(), PersistError> {
///     std::fs::write(path, b"blob").context("Writing store blob")?;
///     Err("unreachable state".into())
/// }
/// ```
#[proc_macro_attribute]
pub fn estore_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    error::expand(input).into()
}

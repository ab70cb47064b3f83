//! Facade crate for the encrypted settings store.
//! Re-exports the bridge plus whichever process role is enabled.
//! Keep this crate thin: it composes the other crates, it does not implement store logic.
//!
//! ## Usage
//! - Privileged process: enable `main` and build a [`main::StoreRegistry`] over a bridge.
//! - Sandboxed process: enable `renderer`, preload the bridge into a [`bridge::Sandbox`] and
//!   use [`renderer::ProxyRegistry`] or [`renderer::reactive::StoreProvider`].

pub use estore_bridge as bridge;

/// The privileged side: persistence, authoritative stores and the bridge service.
#[cfg(feature = "main")]
pub mod main {
    pub use estore_storage::Storage;
    pub use estore_store::*;
    pub use estore_vault::{Aes, ChaCha, SafeStorage, SecureStorage, Vault};
}

/// The sandboxed side: imperative proxies and reactive bindings.
#[cfg(feature = "renderer")]
pub mod renderer {
    pub use estore_proxy::*;
    pub use estore_reactive as reactive;
}

/// Build-time enabled roles.
pub const ENABLED: &[&str] = &[
    #[cfg(feature = "main")]
    "main",
    #[cfg(feature = "renderer")]
    "renderer",
];

#[must_use]
pub fn is_enabled(role: &str) -> bool {
    ENABLED.contains(&role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_roles_match_features() {
        assert_eq!(is_enabled("main"), cfg!(feature = "main"));
        assert_eq!(is_enabled("renderer"), cfg!(feature = "renderer"));
        assert!(!is_enabled("server"));
    }
}

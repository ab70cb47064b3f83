use std::fmt;
use std::sync::Arc;

/// Request channel: sandboxed side asks for the full store snapshot.
pub const GET_CHANNEL: &str = "electron-store-get";
/// Request channel: sandboxed side replaces the whole store.
pub const SET_CHANNEL: &str = "electron-store-set";
/// Push channel: privileged side broadcasts the full store after every mutation.
pub const UPDATED_CHANNEL: &str = "electron-store-updated";

/// Name of the store that owns the bare channel names.
pub const DEFAULT_STORE_NAME: &str = "store";

/// The `GET`/`SET`/`UPDATED` triple for one named store.
///
/// The default store keeps the bare names so builds that only ever use one store stay
/// wire-compatible. Every other store appends `:<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelSet {
    get: Arc<str>,
    set: Arc<str>,
    updated: Arc<str>,
}

impl ChannelSet {
    #[must_use]
    pub fn for_store(name: &str) -> Self {
        if name == DEFAULT_STORE_NAME {
            return Self::default();
        }
        Self {
            get: format!("{GET_CHANNEL}:{name}").into(),
            set: format!("{SET_CHANNEL}:{name}").into(),
            updated: format!("{UPDATED_CHANNEL}:{name}").into(),
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.get
    }

    #[must_use]
    pub fn set(&self) -> &str {
        &self.set
    }

    #[must_use]
    pub fn updated(&self) -> &str {
        &self.updated
    }
}

impl Default for ChannelSet {
    fn default() -> Self {
        Self { get: GET_CHANNEL.into(), set: SET_CHANNEL.into(), updated: UPDATED_CHANNEL.into() }
    }
}

impl fmt::Display for ChannelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {} | {}", self.get, self.set, self.updated)
    }
}

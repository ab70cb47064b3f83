//! Sandboxed blob storage for encrypted store files.
//!
//! Every path handed to [`Storage`] is relative to a canonical root and is refused if it would
//! resolve outside of it. Writes are atomic: data lands in a unique `.estoretmp.` sibling, is
//! synced, then renamed over the target, so a crash never leaves a half-written store file.
//! Temp files orphaned by a crash are swept when the storage connects.

mod builder;
mod engine;
mod error;
mod maintenance;
mod security;

pub use builder::{DataDirSet, StorageBuilder, Unset};
pub use engine::Storage;
pub use error::{StorageError, StorageErrorExt};

//! # Logger
//!
//! Installs the process-wide `tracing` subscriber used by store processes.
//!
//! The privileged process usually logs to the console and to a rolling file next to its data
//! directory; sandboxed processes often log to the console only. Filters default to the
//! configured level and `RUST_LOG` still wins when it is set.
//!
//! ## Example
//!
//! ```rust
//! use estore_logger::{ConsoleFormat, LevelFilter, Logger};
//!
//! let _logger = Logger::builder()
//!     .name("settings-main")
//!     .console_format(ConsoleFormat::Compact)
//!     .level(LevelFilter::DEBUG)
//!     .init()
//!     .unwrap();
//! ```

mod builder;
mod error;

pub use builder::{ConsoleFormat, LoggerBuilder};
pub use error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;
pub use tracing_appender::rolling::Rotation;

use tracing_appender::non_blocking::WorkerGuard;

/// Handle to the installed subscriber.
///
/// Holds the file writer's worker guard; buffered lines are flushed when it drops, so keep it
/// alive for the lifetime of the process.
#[must_use = "Dropping this handle stops the background log writer"]
#[derive(Debug)]
pub struct Logger {
    name: String,
    guard: Option<WorkerGuard>,
}

impl Logger {
    /// Starts configuring the global subscriber.
    ///
    /// The name prefixes rolling log files (`<name>.<date>.log`).
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::default()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` when lines are also written to a rolling file.
    #[must_use]
    pub const fn writes_file(&self) -> bool {
        self.guard.is_some()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::debug!(logger = %self.name, "Flushing log file writer");
        }
    }
}

use crate::Logger;
use crate::error::LoggerError;
use private::Sealed;
use std::marker::PhantomData;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const DEFAULT_MAX_FILES: usize = 7;
const LOG_FILE_SUFFIX: &str = "log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Console line layout.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum ConsoleFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

#[derive(Debug)]
struct Settings {
    console: Option<ConsoleFormat>,
    level: LevelFilter,
    directives: Option<String>,
    directory: Option<PathBuf>,
    rotation: Rotation,
    max_files: usize,
    json_file: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            console: Some(ConsoleFormat::Compact),
            level: LevelFilter::INFO,
            directives: None,
            directory: None,
            rotation: Rotation::DAILY,
            max_files: DEFAULT_MAX_FILES,
            json_file: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct NoName;
#[derive(Debug)]
pub struct Named(String);
#[derive(Debug, Default)]
pub struct ConsoleOnly;
#[derive(Debug)]
pub struct WithFile;

mod private {
    pub trait Sealed {}
}
impl Sealed for NoName {}
impl Sealed for Named {}
impl Sealed for ConsoleOnly {}
impl Sealed for WithFile {}

/// Configures and installs the global subscriber.
///
/// A name is required before [`LoggerBuilder::init`] becomes available; file-only knobs appear
/// after [`LoggerBuilder::directory`].
#[allow(private_bounds)]
#[derive(Debug, Default)]
pub struct LoggerBuilder<N: Sealed = NoName, F: Sealed = ConsoleOnly> {
    settings: Settings,
    name: N,
    _file: PhantomData<F>,
}

#[allow(private_bounds)]
impl<F: Sealed> LoggerBuilder<NoName, F> {
    #[must_use]
    pub fn name(self, name: impl Into<String>) -> LoggerBuilder<Named, F> {
        LoggerBuilder { settings: self.settings, name: Named(name.into()), _file: PhantomData }
    }
}

#[allow(private_bounds)]
impl<N: Sealed, F: Sealed> LoggerBuilder<N, F> {
    /// Default level for targets without an explicit directive.
    #[must_use]
    pub const fn level(mut self, level: LevelFilter) -> Self {
        self.settings.level = level;
        self
    }

    /// Extra directives such as `estore_store=trace,estore_bridge=debug`.
    #[must_use]
    pub fn env_filter(mut self, directives: impl Into<String>) -> Self {
        self.settings.directives = Some(directives.into());
        self
    }

    /// Enables or disables console output.
    #[must_use]
    pub const fn console(mut self, enabled: bool) -> Self {
        self.settings.console = if enabled { Some(ConsoleFormat::Compact) } else { None };
        self
    }

    /// Enables console output with the given layout.
    #[must_use]
    pub const fn console_format(mut self, format: ConsoleFormat) -> Self {
        self.settings.console = Some(format);
        self
    }

    /// Also writes to rolling files inside `directory`.
    #[must_use]
    pub fn directory(mut self, directory: impl Into<PathBuf>) -> LoggerBuilder<N, WithFile> {
        self.settings.directory = Some(directory.into());
        LoggerBuilder { settings: self.settings, name: self.name, _file: PhantomData }
    }
}

#[allow(private_bounds)]
impl<N: Sealed> LoggerBuilder<N, WithFile> {
    #[must_use]
    pub const fn rotation(mut self, rotation: Rotation) -> Self {
        self.settings.rotation = rotation;
        self
    }

    /// How many rotated files to keep.
    #[must_use]
    pub const fn max_files(mut self, max: usize) -> Self {
        self.settings.max_files = max;
        self
    }

    /// Writes file lines as JSON objects.
    #[must_use]
    pub const fn json(mut self) -> Self {
        self.settings.json_file = true;
        self
    }
}

#[allow(private_bounds)]
impl<F: Sealed> LoggerBuilder<Named, F> {
    /// Installs the subscriber for the whole process.
    ///
    /// # Errors
    /// * [`LoggerError::InvalidConfiguration`] for an empty name, zero `max_files`, bad
    ///   directives, or when no output is enabled.
    /// * [`LoggerError::Appender`] if the log directory cannot be used.
    /// * [`LoggerError::Subscriber`] if a global subscriber is already installed.
    pub fn init(self) -> Result<Logger, LoggerError> {
        let Named(name) = self.name;
        let settings = self.settings;
        validate(&settings, &name)?;

        let filter = env_filter(&settings)?;
        let mut layers: Vec<BoxedLayer> = Vec::new();

        match settings.console {
            Some(ConsoleFormat::Compact) => layers.push(layer().compact().boxed()),
            Some(ConsoleFormat::Pretty) => layers.push(layer().pretty().boxed()),
            Some(ConsoleFormat::Json) => layers.push(layer().json().boxed()),
            None => {},
        }

        let guard = match &settings.directory {
            Some(directory) => {
                std::fs::create_dir_all(directory).map_err(|e| LoggerError::Internal {
                    message: e.to_string().into(),
                    context: Some(format!("Creating log directory {}", directory.display()).into()),
                })?;

                let appender = RollingFileAppender::builder()
                    .rotation(settings.rotation.clone())
                    .filename_prefix(&name)
                    .filename_suffix(LOG_FILE_SUFFIX)
                    .max_log_files(settings.max_files)
                    .build(directory)?;
                let (writer, guard) = tracing_appender::non_blocking(appender);

                let file = layer().with_writer(writer).with_ansi(false);
                layers.push(if settings.json_file { file.json().boxed() } else { file.boxed() });
                Some(guard)
            },
            None => None,
        };

        if layers.is_empty() {
            return Err(LoggerError::InvalidConfiguration {
                message: "Neither console nor file output is enabled".into(),
                context: None,
            });
        }

        tracing_subscriber::registry().with(layers).with(filter).try_init()?;
        tracing::debug!(logger = %name, file = guard.is_some(), "Logging initialised");

        Ok(Logger { name, guard })
    }
}

fn validate(settings: &Settings, name: &str) -> Result<(), LoggerError> {
    if name.trim().is_empty() {
        return Err(LoggerError::InvalidConfiguration {
            message: "Logger name cannot be empty".into(),
            context: None,
        });
    }
    if settings.directory.is_some() && settings.max_files == 0 {
        return Err(LoggerError::InvalidConfiguration {
            message: "max_files must be greater than zero".into(),
            context: None,
        });
    }
    Ok(())
}

fn env_filter(settings: &Settings) -> Result<EnvFilter, LoggerError> {
    let builder = EnvFilter::builder().with_default_directive(settings.level.into());
    match &settings.directives {
        None => Ok(builder.from_env_lossy()),
        Some(directives) => builder.parse(directives).map_err(|e| {
            LoggerError::InvalidConfiguration {
                message: format!("Invalid filter '{directives}': {e}").into(),
                context: None,
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_builder_defaults() {
        let builder = Logger::builder().name("settings");

        assert_eq!(builder.settings.console, Some(ConsoleFormat::Compact));
        assert_eq!(builder.settings.level, LevelFilter::INFO);
        assert!(builder.settings.directory.is_none());
    }

    #[test]
    fn test_builder_file_settings() {
        let builder = Logger::builder()
            .name("settings")
            .console(false)
            .directory("/tmp/estore-logs")
            .max_files(3)
            .rotation(Rotation::HOURLY)
            .json()
            .env_filter("estore_store=trace");

        assert!(builder.settings.console.is_none());
        assert_eq!(builder.settings.max_files, 3);
        assert!(builder.settings.json_file);
        assert_eq!(builder.settings.directives.as_deref(), Some("estore_store=trace"));
    }

    #[test]
    fn test_validation_rejects_bad_settings() {
        let blank = Logger::builder().name("  ").init();
        assert!(matches!(blank, Err(LoggerError::InvalidConfiguration { .. })));

        let silent = Logger::builder().name("silent").console(false).init();
        assert!(matches!(silent, Err(LoggerError::InvalidConfiguration { .. })));

        let no_files = Logger::builder().name("files").directory("/tmp/x").max_files(0).init();
        assert!(matches!(no_files, Err(LoggerError::InvalidConfiguration { .. })));

        let bad_filter = Logger::builder().name("filter").env_filter("=[").init();
        assert!(matches!(bad_filter, Err(LoggerError::InvalidConfiguration { .. })));
    }

    #[test]
    #[serial]
    fn test_file_output_is_created() -> Result<(), LoggerError> {
        let tmp = tempdir().map_err(|e| LoggerError::Internal {
            message: e.to_string().into(),
            context: Some("Creating temp dir".into()),
        })?;
        let dir = tmp.path().join("logs");

        let logger = Logger::builder().name("unit-file").console(false).directory(&dir).init()?;
        assert!(logger.writes_file());

        tracing::info!(store = "store", "persisted");
        std::thread::sleep(Duration::from_millis(20));
        drop(logger);

        let has_log = std::fs::read_dir(&dir)
            .map_err(|e| LoggerError::Internal { message: e.to_string().into(), context: None })?
            .flatten()
            .any(|e| e.path().extension().and_then(|x| x.to_str()) == Some(LOG_FILE_SUFFIX));
        assert!(has_log, "a rolling log file should exist");
        Ok(())
    }
}

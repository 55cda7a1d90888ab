//! # Logging setup for the `vxsym` binary
//!
//! One `tracing` registry with up to two formatted layers, each filtered on
//! its own:
//!
//! - a console layer on stderr (stdout carries the recovery report)
//! - a file layer behind a non-blocking writer, when a log file is asked for
//!
//! Either layer renders as pretty text or as JSON lines.
//!
//! ```rust,no_run
//! use vxsym_utils::init_logging;
//!
//! // The guard flushes the file writer on drop.
//! let _guard = init_logging().expect("Failed to initialize logging");
//! tracing::info!(image = "fw.bin", "loading firmware");
//! ```
//!
//! ## Environment
//!
//! - `RUST_LOG`: filter directives, e.g. `vxsym_core::symbols=debug`
//! - `VXSYM_LOG_FORMAT`: `pretty` (default) or `json`
//! - `VXSYM_LOG_FILE`: also append events to this file

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, fs, io};

use chrono::Utc;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Environment variable selecting the output format.
pub const LOG_FORMAT_ENV: &str = "VXSYM_LOG_FORMAT";

/// Environment variable naming an extra log file.
pub const LOG_FILE_ENV: &str = "VXSYM_LOG_FILE";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// How events are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Multi-line text with source locations, coloured on a terminal
    #[default]
    Pretty,
    /// One JSON object per line, with the current span list attached
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        const PRETTY: &[&str] = &["pretty", "text", "human"];
        const JSON: &[&str] = &["json", "jsonl", "ndjson"];

        if PRETTY.iter().any(|name| s.eq_ignore_ascii_case(name)) {
            Ok(LogFormat::Pretty)
        } else if JSON.iter().any(|name| s.eq_ignore_ascii_case(name)) {
            Ok(LogFormat::Json)
        } else {
            Err(LoggingError::InvalidFormat(s.to_string()))
        }
    }
}

/// Maximum verbosity requested with `--log-level`
///
/// Accepts whatever [`tracing::Level`] parses (`error` to `trace`, any case,
/// or `1` to `5`) plus the spelling `warning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogLevel(Level);

impl LogLevel
{
    pub const ERROR: Self = LogLevel(Level::ERROR);
    pub const WARN: Self = LogLevel(Level::WARN);
    pub const INFO: Self = LogLevel(Level::INFO);
    pub const DEBUG: Self = LogLevel(Level::DEBUG);
    pub const TRACE: Self = LogLevel(Level::TRACE);
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        level.0
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        if s.eq_ignore_ascii_case("warning") {
            return Ok(LogLevel::WARN);
        }
        s.parse::<Level>()
            .map(LogLevel)
            .map_err(|_| LoggingError::InvalidLevel(s.to_string()))
    }
}

/// Keeps the background file writer running.
///
/// Buffered lines are flushed when the guard is dropped, so hold it until
/// the program exits.
#[derive(Default)]
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard
{
    _file: Option<WorkerGuard>,
}

/// Console logging configured entirely from the environment
///
/// See the module docs for the variables read. Without `RUST_LOG` the
/// filter is `info`.
///
/// ## Errors
///
/// - `InvalidFormat` for an unknown `VXSYM_LOG_FORMAT`
/// - `FileError` when the `VXSYM_LOG_FILE` directory can't be created
/// - `InitializationFailed` when a subscriber is already installed
pub fn init_logging() -> Result<LogGuard, LoggingError>
{
    let format = match env::var(LOG_FORMAT_ENV) {
        Ok(value) => value.parse()?,
        Err(_) => LogFormat::Pretty,
    };
    let log_file = env::var_os(LOG_FILE_ENV).map(PathBuf::from);

    init_logging_internal(format, None, log_file.as_deref(), true)
}

/// Console logging at a fixed level, ignoring `RUST_LOG`
///
/// `VXSYM_LOG_FILE` is still honoured.
///
/// ## Example
///
/// ```rust,no_run
/// use vxsym_utils::{LogFormat, LogLevel, init_logging_with_level};
///
/// let _guard = init_logging_with_level(LogLevel::DEBUG, LogFormat::Pretty)
///     .expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns an error if logging is already initialized or file logging fails.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LogGuard, LoggingError>
{
    let log_file = env::var_os(LOG_FILE_ENV).map(PathBuf::from);
    init_logging_internal(format, Some(level.into()), log_file.as_deref(), true)
}

/// Initialize file-only logging into `dir`
///
/// The file is named `YYYY-MM-DD-vxsym.log` (UTC date) and appended to.
/// Nothing is written to the console. With `level` set to `None`, `RUST_LOG`
/// decides, defaulting to `INFO`.
///
/// ## Example
///
/// ```rust,no_run
/// use std::path::Path;
///
/// use vxsym_utils::{LogFormat, init_logging_to_dir};
///
/// let (path, _guard) = init_logging_to_dir(Path::new("logs"), None, LogFormat::Json)
///     .expect("Failed to initialize logging");
/// eprintln!("logging to {}", path.display());
/// ```
///
/// ## Errors
///
/// Returns an error if logging is already initialized or `dir` cannot be
/// created.
pub fn init_logging_to_dir(
    dir: &Path,
    level: Option<LogLevel>,
    format: LogFormat,
) -> Result<(PathBuf, LogGuard), LoggingError>
{
    let log_file = dated_log_file(dir, Utc::now().format("%Y-%m-%d"));
    let guard = init_logging_internal(format, level.map(Into::into), Some(&log_file), false)?;
    Ok((log_file, guard))
}

fn dated_log_file(dir: &Path, date: impl Display) -> PathBuf
{
    dir.join(format!("{date}-vxsym.log"))
}

/// Build the filter for one layer
///
/// Priority:
/// 1. An explicit level (from `--log-level`)
/// 2. `RUST_LOG`, including module-specific directives
/// 3. `INFO`
fn env_filter(explicit_level: Option<Level>) -> EnvFilter
{
    match explicit_level {
        Some(level) => EnvFilter::new(level.to_string()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string())),
    }
}

fn fmt_layer<W>(format: LogFormat, writer: W, ansi: bool, filter: EnvFilter) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_writer(writer);

    match format {
        LogFormat::Pretty => layer.with_ansi(ansi).with_filter(filter).boxed(),
        LogFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter)
            .boxed(),
    }
}

fn init_logging_internal(
    format: LogFormat,
    explicit_level: Option<Level>,
    log_file: Option<&Path>,
    console: bool,
) -> Result<LogGuard, LoggingError>
{
    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut file_worker = None;

    if console {
        layers.push(fmt_layer(format, io::stderr, true, env_filter(explicit_level)));
    }

    if let Some(path) = log_file {
        let file_name = path
            .file_name()
            .ok_or_else(|| LoggingError::InvalidPath(path.to_path_buf()))?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        // The file name already carries whatever date it needs.
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (writer, worker) = tracing_appender::non_blocking(appender);
        layers.push(fmt_layer(format, writer, false, env_filter(explicit_level)));
        file_worker = Some(worker);
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;

    Ok(LogGuard { _file: file_worker })
}

/// Why logging could not be set up
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// `--log-format` or `VXSYM_LOG_FORMAT` named no known format
    #[error("Unknown log format: {0}. Use 'pretty' or 'json'")]
    InvalidFormat(String),

    /// `--log-level` named no known level
    #[error("Unknown log level: {0}. Use 'error', 'warn', 'info', 'debug', or 'trace'")]
    InvalidLevel(String),

    /// The log file path has no file name
    #[error("Invalid log file path: {}", .0.display())]
    InvalidPath(PathBuf),

    /// A global subscriber is already installed
    #[error("Logging already initialized: {0}")]
    InitializationFailed(String),

    /// The log directory could not be created
    #[error("Can't prepare log file: {0}")]
    FileError(#[from] io::Error),
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_log_format_names()
    {
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("NDJSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!(matches!("xml".parse::<LogFormat>(), Err(LoggingError::InvalidFormat(_))));
        assert_eq!(LogFormat::default(), LogFormat::Pretty);
    }

    #[test]
    fn test_log_level_names()
    {
        assert_eq!("error".parse::<LogLevel>().unwrap(), LogLevel::ERROR);
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::WARN);
        assert_eq!("Debug".parse::<LogLevel>().unwrap(), LogLevel::DEBUG);
        assert_eq!("5".parse::<LogLevel>().unwrap(), LogLevel::TRACE);
        assert!(matches!("loud".parse::<LogLevel>(), Err(LoggingError::InvalidLevel(_))));
        assert_eq!(Level::from(LogLevel::INFO), Level::INFO);
    }

    #[test]
    fn test_dated_log_file()
    {
        let path = dated_log_file(Path::new("/var/log/vxsym"), "2026-10-16");
        assert_eq!(path, PathBuf::from("/var/log/vxsym/2026-10-16-vxsym.log"));
    }
}

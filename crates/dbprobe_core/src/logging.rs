//! Structured logging setup with stderr and optional file output.
//!
//! Provides:
//! - Stderr output, keeping stdout free for the schema document
//! - Optional daily rotating log file
//! - Build-type conditional log levels
//! - Stderr-only fallback when file logging fails
//! - Environment variable override via DBPROBE_LOG or RUST_LOG

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory for the rolling log file. `None` logs to stderr only.
    pub log_dir: Option<PathBuf>,
    /// Whether stderr is a terminal (enables ANSI colors)
    pub is_tty: bool,
    /// Optional custom log filter
    pub log_filter: Option<String>,
    /// Only report errors on stderr
    pub quiet: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            is_tty: atty::is(atty::Stream::Stderr),
            log_filter: None,
            quiet: false,
        }
    }
}

impl LogConfig {
    /// Create a stderr-only logging configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also write to a daily rotating file in `dir`.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Set custom log filter.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }

    /// Only report errors on stderr.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }
}

/// Guard that must be held for the lifetime of the application.
///
/// Dropping this guard flushes pending log entries.
pub struct LoggingGuard {
    _worker_guard: Option<WorkerGuard>,
}

/// Initialize logging with the given configuration.
///
/// If file logging initialization fails, falls back to stderr only. A
/// subscriber that is already installed is left in place.
pub fn init_logging(config: LogConfig) -> LoggingGuard {
    let Some(dir) = config.log_dir.as_deref() else {
        return init_stderr_logging(&config);
    };

    match init_file_logging(&config, dir) {
        Ok(guard) => LoggingGuard { _worker_guard: Some(guard) },
        Err(e) => {
            eprintln!("Warning: Failed to initialize file logging: {}. Using stderr only.", e);
            init_stderr_logging(&config)
        }
    }
}

/// Initialize stderr-only logging.
fn init_stderr_logging(config: &LogConfig) -> LoggingGuard {
    let env_filter = build_env_filter(config.log_filter.as_deref(), config.quiet);

    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .with_ansi(config.is_tty)
        .with_target(false)
        .with_thread_ids(false)
        .try_init();

    LoggingGuard { _worker_guard: None }
}

/// Initialize file + stderr logging.
fn init_file_logging(
    config: &LogConfig,
    dir: &std::path::Path,
) -> Result<WorkerGuard, Box<dyn std::error::Error + Send + Sync>> {
    std::fs::create_dir_all(dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("dbprobe")
        .filename_suffix("log")
        .build(dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_level = if config.quiet { tracing::Level::ERROR } else { tracing::Level::INFO };
    let combined = std::io::stderr.with_max_level(stderr_level).and(non_blocking);

    let env_filter = build_env_filter(config.log_filter.as_deref(), false);

    tracing_subscriber::fmt()
        .with_writer(combined)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .try_init()?;

    Ok(guard)
}

/// Build the environment filter from config or defaults.
fn build_env_filter(custom_filter: Option<&str>, quiet: bool) -> EnvFilter {
    // Priority: custom filter > DBPROBE_LOG > RUST_LOG > default
    if let Some(filter) = custom_filter {
        return EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(default_log_filter()));
    }
    if quiet {
        return EnvFilter::new("error");
    }

    EnvFilter::try_from_env("DBPROBE_LOG")
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(default_log_filter()))
}

/// Get the default log filter based on build type.
pub fn default_log_filter() -> &'static str {
    #[cfg(debug_assertions)]
    {
        "info,dbprobe=debug,dbprobe_core=debug,tokio_postgres=warn,rusqlite=warn"
    }
    #[cfg(not(debug_assertions))]
    {
        "warn,dbprobe=info,dbprobe_core=info,tokio_postgres=warn,rusqlite=warn"
    }
}

/// Get the default log directory.
pub fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("dbprobe")
        .join("logs")
}

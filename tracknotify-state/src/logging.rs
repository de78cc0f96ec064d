//! Logging setup for tracknotify processes
//!
//! The library crates only emit `tracing` events; a process installs one
//! subscriber at start-up through this module.

use std::str::FromStr;

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No subscriber, every event is dropped
    Silent,
    /// Compact human readable lines on stderr
    Development,
    /// Verbose output with thread ids and source locations
    Debug,
    /// One JSON object per line, for service managers and log shippers
    Json,
}

impl FromStr for LoggingMode {
    type Err = LoggingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "silent" | "off" => Ok(LoggingMode::Silent),
            "development" | "dev" => Ok(LoggingMode::Development),
            "debug" => Ok(LoggingMode::Debug),
            "json" => Ok(LoggingMode::Json),
            other => Err(LoggingError::InvalidEnv(format!(
                "{MODE_VAR}={other} (expected silent, development, debug or json)"
            ))),
        }
    }
}

/// Logging configuration error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid environment variable: {0}")]
    InvalidEnv(String),
}

const MODE_VAR: &str = "TRACKNOTIFY_LOG_MODE";
const LEVEL_VAR: &str = "TRACKNOTIFY_LOG_LEVEL";

/// Install a global subscriber for `mode`.
///
/// # Environment Variables
///
/// - `TRACKNOTIFY_LOG_LEVEL`: filter directives, e.g. `debug` or
///   `tracknotify_monitor=trace`
/// - `RUST_LOG`: used when `TRACKNOTIFY_LOG_LEVEL` is unset
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let result = match mode {
        LoggingMode::Silent => return Ok(()),
        LoggingMode::Development => Registry::default()
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .compact(),
            )
            .with(create_env_filter("info"))
            .try_init(),
        LoggingMode::Debug => Registry::default()
            .with(
                fmt::layer()
                    .pretty()
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(create_env_filter("debug"))
            .try_init(),
        LoggingMode::Json => Registry::default()
            .with(fmt::layer().json().with_current_span(false))
            .with(create_env_filter("info"))
            .try_init(),
    };

    result.map_err(|e| LoggingError::TracingInit(e.to_string()))
}

/// Install a subscriber chosen by `TRACKNOTIFY_LOG_MODE`.
///
/// Unset means [`LoggingMode::Development`]: the monitor runs in the
/// background and its log is the only place failures show up.
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    let mode = match std::env::var(MODE_VAR) {
        Ok(value) => value.parse()?,
        Err(_) => LoggingMode::Development,
    };

    init_logging(mode)
}

fn create_env_filter(default_level: &str) -> EnvFilter {
    if let Ok(level) = std::env::var(LEVEL_VAR) {
        EnvFilter::new(level)
    } else if let Ok(rust_log) = std::env::var("RUST_LOG") {
        EnvFilter::new(rust_log)
    } else {
        EnvFilter::new(default_level)
    }
}

/// Check whether a global subscriber has been installed
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_silent_mode() {
        assert!(init_logging(LoggingMode::Silent).is_ok());
    }

    #[rstest]
    #[case("silent", LoggingMode::Silent)]
    #[case("off", LoggingMode::Silent)]
    #[case("Development", LoggingMode::Development)]
    #[case("dev", LoggingMode::Development)]
    #[case(" debug ", LoggingMode::Debug)]
    #[case("JSON", LoggingMode::Json)]
    fn test_parse_modes(#[case] value: &str, #[case] mode: LoggingMode) {
        assert_eq!(value.parse::<LoggingMode>().unwrap(), mode);
    }

    #[test]
    fn test_parse_invalid_mode() {
        let error = "loud".parse::<LoggingMode>().unwrap_err();
        assert!(error.to_string().contains("TRACKNOTIFY_LOG_MODE=loud"));
    }
}

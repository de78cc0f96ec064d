//! Configuration types for the tracknotify-monitor crate
//!
//! [`MonitorConfig`] controls resubscription, sink timeouts and the
//! appearance of notifications, and optionally names an external scrobble
//! command.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};

/// Environment variable holding the scrobble command line
pub const SCROBBLE_CMD_VAR: &str = "TRACKNOTIFY_SCROBBLE_CMD";

/// Environment variable holding the sink timeout in seconds
pub const SINK_TIMEOUT_VAR: &str = "TRACKNOTIFY_SINK_TIMEOUT_SECS";

/// Urgency hint passed to the desktop notification daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Normal,
    Critical,
}

impl Urgency {
    /// Name understood by `notify-send --urgency`
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Normal => "normal",
            Urgency::Critical => "critical",
        }
    }
}

/// How notifications present themselves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Application name shown by the notification daemon
    /// Default: "tracknotify"
    pub app_name: String,

    /// Icon name from the desktop icon theme
    /// Default: "audio-volume-high"
    pub icon: String,

    /// Default: [`Urgency::Low`]
    pub urgency: Urgency,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            app_name: "tracknotify".to_string(),
            icon: "audio-volume-high".to_string(),
            urgency: Urgency::Low,
        }
    }
}

/// External program receiving scrobbles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrobbleCommand {
    pub program: String,
    /// Arguments placed before the per-track arguments
    pub args: Vec<String>,
}

impl ScrobbleCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Split a whitespace separated command line.
    ///
    /// Returns `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
        })
    }
}

/// Configuration for the monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Evented state variable to subscribe to
    /// Default: "LastChange"
    pub event_variable: String,

    /// Subscribe attempts before giving up, for the first subscription and
    /// after every loss
    /// Default: 5
    pub max_resubscribe_attempts: u32,

    /// Delay before the second resubscription attempt, doubled for each
    /// further attempt
    /// Default: 2 seconds
    pub resubscribe_backoff_base: Duration,

    /// Upper bound for a single resubscription delay
    /// Default: 60 seconds
    pub max_resubscribe_backoff: Duration,

    /// Upper bound for one sink invocation
    /// Default: 10 seconds
    pub sink_timeout: Duration,

    pub notification: NotificationConfig,

    /// Scrobble command, `None` disables scrobbling
    /// Default: None
    pub scrobble: Option<ScrobbleCommand>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            event_variable: "LastChange".to_string(),
            max_resubscribe_attempts: 5,
            resubscribe_backoff_base: Duration::from_secs(2),
            max_resubscribe_backoff: Duration::from_secs(60),
            sink_timeout: Duration::from_secs(10),
            notification: NotificationConfig::default(),
            scrobble: None,
        }
    }
}

impl MonitorConfig {
    /// Create a new MonitorConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `TRACKNOTIFY_SCROBBLE_CMD` and
    /// `TRACKNOTIFY_SINK_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(line) = std::env::var(SCROBBLE_CMD_VAR) {
            config.scrobble = ScrobbleCommand::parse(&line);
        }

        if let Ok(value) = std::env::var(SINK_TIMEOUT_VAR) {
            let secs: u64 = value.trim().parse().map_err(|_| {
                MonitorError::Configuration(format!(
                    "{SINK_TIMEOUT_VAR} must be a whole number of seconds, got {value:?}"
                ))
            })?;
            config.sink_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Create a MonitorConfig that gives up on lost subscriptions quickly
    pub fn fail_fast() -> Self {
        Self {
            max_resubscribe_attempts: 1,
            resubscribe_backoff_base: Duration::from_millis(100),
            max_resubscribe_backoff: Duration::from_secs(1),
            sink_timeout: Duration::from_secs(2),
            ..Default::default()
        }
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<()> {
        if self.event_variable.trim().is_empty() {
            return Err(MonitorError::Configuration(
                "Event variable must not be empty".to_string(),
            ));
        }

        if self.max_resubscribe_attempts == 0 {
            return Err(MonitorError::Configuration(
                "Max resubscribe attempts must be greater than 0".to_string(),
            ));
        }

        if self.resubscribe_backoff_base > self.max_resubscribe_backoff {
            return Err(MonitorError::Configuration(
                "Invalid resubscribe backoff: base must not exceed max".to_string(),
            ));
        }

        if self.sink_timeout == Duration::ZERO {
            return Err(MonitorError::Configuration(
                "Sink timeout must be greater than 0".to_string(),
            ));
        }

        if let Some(command) = &self.scrobble {
            if command.program.trim().is_empty() {
                return Err(MonitorError::Configuration(
                    "Scrobble program must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Delay before resubscription attempt `attempt` (1-based).
    ///
    /// The first attempt runs immediately.
    pub fn resubscribe_delay(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let multiplier = 2u32.saturating_pow(attempt - 2);
        self.resubscribe_backoff_base
            .saturating_mul(multiplier)
            .min(self.max_resubscribe_backoff)
    }

    // Builder pattern methods for fluent configuration

    pub fn with_event_variable(mut self, variable: impl Into<String>) -> Self {
        self.event_variable = variable.into();
        self
    }

    pub fn with_resubscribe(mut self, attempts: u32, base: Duration, max: Duration) -> Self {
        self.max_resubscribe_attempts = attempts;
        self.resubscribe_backoff_base = base;
        self.max_resubscribe_backoff = max;
        self
    }

    pub fn with_sink_timeout(mut self, timeout: Duration) -> Self {
        self.sink_timeout = timeout;
        self
    }

    pub fn with_notification(mut self, notification: NotificationConfig) -> Self {
        self.notification = notification;
        self
    }

    pub fn with_scrobble(mut self, command: ScrobbleCommand) -> Self {
        self.scrobble = Some(command);
        self
    }
}

//! Error types for the tracknotify-monitor crate.

use std::time::Duration;

use thiserror::Error;

use crate::subscription::ServiceId;

/// Errors that can occur while setting up or driving the monitor
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The subscription backend refused a subscription
    #[error("Failed to subscribe to {service_id}: {reason}")]
    Subscription { service_id: ServiceId, reason: String },

    /// The background worker is gone
    #[error("Background worker disconnected")]
    WorkerDisconnected,

    /// The background worker could not be started
    #[error("Failed to start background worker: {0}")]
    WorkerStart(String),

    /// A subscription already exists for this service
    #[error("Service {0} is already registered")]
    AlreadyRegistered(ServiceId),

    /// No subscription exists for this service
    #[error("Service {0} is not registered")]
    UnknownService(ServiceId),
}

/// Errors from a single sink invocation.
///
/// Sink errors are logged and counted; they never reach the event path.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The sink's external program could not be started
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The sink's external program exited unsuccessfully
    #[error("{program} exited with {status}")]
    ExitStatus { program: String, status: String },

    /// Any other I/O failure while talking to the sink
    #[error("Sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The sink did not finish within the configured timeout
    #[error("Sink timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let error = MonitorError::AlreadyRegistered(ServiceId::new("uuid:RINCON_1"));
        assert_eq!(error.to_string(), "Service RINCON_1 is already registered");

        let error = SinkError::ExitStatus {
            program: "notify-send".to_string(),
            status: "exit status: 1".to_string(),
        };
        assert_eq!(error.to_string(), "notify-send exited with exit status: 1");

        let error = SinkError::Timeout(Duration::from_secs(10));
        assert!(error.to_string().contains("10s"));
    }
}

//! Notification sinks

use async_trait::async_trait;

use super::{process, NotificationRequest, NotificationSink};
use crate::error::SinkError;

/// Writes notifications to the log instead of the desktop
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn show(&self, request: &NotificationRequest) -> Result<(), SinkError> {
        tracing::info!(app = %request.app_name, "{}", request.summary);
        Ok(())
    }
}

/// Shows notifications through `notify-send` or a compatible program
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    program: String,
}

impl Default for CommandNotifier {
    fn default() -> Self {
        Self::new("notify-send")
    }
}

impl CommandNotifier {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Command line arguments for `request`
    pub fn arguments(request: &NotificationRequest) -> Vec<String> {
        vec![
            "-a".to_string(),
            request.app_name.clone(),
            "-i".to_string(),
            request.icon.clone(),
            "-u".to_string(),
            request.urgency.as_str().to_string(),
            request.summary.clone(),
        ]
    }
}

#[async_trait]
impl NotificationSink for CommandNotifier {
    fn name(&self) -> &'static str {
        "notify-send"
    }

    async fn show(&self, request: &NotificationRequest) -> Result<(), SinkError> {
        process::run(&self.program, &Self::arguments(request)).await
    }
}

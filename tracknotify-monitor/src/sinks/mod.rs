//! Destinations for accepted track changes
//!
//! A sink is anything that wants to hear about a new track: the desktop
//! notification daemon, a scrobbler, a log. Sinks are best effort. They run
//! on the dispatcher's worker, never on the event path, and their failures
//! are logged and counted but not retried.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use tracknotify_parser::Track;

use crate::config::{NotificationConfig, Urgency};
use crate::error::SinkError;

pub mod notify;
mod process;
pub mod scrobble;

pub use notify::{CommandNotifier, LogNotifier};
pub use scrobble::{CommandScrobbler, ScrobbleKind, ScrobbleSubmission};

/// A rendered "now playing" notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    /// e.g. "Playing Help! by The Beatles"
    pub summary: String,
    pub app_name: String,
    pub icon: String,
    pub urgency: Urgency,
}

impl NotificationRequest {
    /// Render `track`, or `None` when it has neither title nor artist
    pub fn for_track(track: &Track, config: &NotificationConfig) -> Option<Self> {
        let summary = track.now_playing()?;
        Some(Self {
            summary,
            app_name: config.app_name.clone(),
            icon: config.icon.clone(),
            urgency: config.urgency,
        })
    }
}

/// Shows notifications
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Short name used in log lines
    fn name(&self) -> &'static str;

    async fn show(&self, request: &NotificationRequest) -> Result<(), SinkError>;
}

/// Receives scrobbles
#[async_trait]
pub trait ScrobbleSink: Send + Sync {
    /// Short name used in log lines
    fn name(&self) -> &'static str;

    async fn submit(&self, submission: &ScrobbleSubmission) -> Result<(), SinkError>;
}

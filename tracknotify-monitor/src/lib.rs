//! # tracknotify-monitor
//!
//! Passive now-playing monitor for UPnP AVTransport renderers.
//!
//! ## Overview
//!
//! Renderers publish their transport state through the evented `LastChange`
//! variable. Every delivery runs the same short cycle:
//!
//! 1. **Extraction**: the `CurrentTrackMetaData` DIDL-Lite fragment is pulled
//!    out of the event and turned into a [`Track`]
//! 2. **Change detection**: the renderer's [`TrackTracker`] decides whether
//!    the track differs from the one announced last
//! 3. **Dispatch**: accepted changes are queued for the notification and
//!    scrobble sinks, which run on their own thread
//!
//! Malformed or empty events are logged and dropped; nothing in the cycle is
//! fatal.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tracknotify_monitor::prelude::*;
//!
//! tracknotify_state::logging::init_logging_from_env()?;
//!
//! let config = MonitorConfig::from_env()?;
//! let monitor = Arc::new(TrackMonitor::from_config(config.clone())?);
//! let manager = SubscriptionManager::start(config, Arc::new(my_backend), monitor)?;
//!
//! manager.add_service("uuid:RINCON_000E58A0123401400")?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! SubscriptionBackend ──events──▶ worker thread ──on_event──▶ TrackMonitor
//!                                                              │
//!                                    sink thread ◀──queues─────┘
//!                                    ├─ NotificationSink
//!                                    └─ ScrobbleSink
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod manager;
pub mod monitor;
pub mod sinks;
pub mod subscription;
mod worker;

// Re-export main types for convenience
pub use config::{MonitorConfig, NotificationConfig, ScrobbleCommand, Urgency};
pub use dispatch::{DispatchStats, SinkDispatcher, StatsSnapshot};
pub use error::{MonitorError, Result, SinkError};
pub use manager::SubscriptionManager;
pub use monitor::{EventOutcome, TrackMonitor};
pub use sinks::{
    CommandNotifier, CommandScrobbler, LogNotifier, NotificationRequest, NotificationSink,
    ScrobbleKind, ScrobbleSink, ScrobbleSubmission,
};
pub use subscription::{
    BackendError, ServiceId, Subscription, SubscriptionBackend, SubscriptionEvent,
    SubscriptionState,
};

// Re-export commonly used types from dependencies
pub use tracknotify_parser::{ParseError, ParseStage, Track};
pub use tracknotify_state::TrackTracker;

/// Prelude module for convenient imports
///
/// ```rust
/// use tracknotify_monitor::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        EventOutcome, MonitorConfig, MonitorError, NotificationSink, Result, ScrobbleSink,
        ServiceId, SubscriptionBackend, SubscriptionEvent, SubscriptionManager, Track,
        TrackMonitor,
    };
}

//! The event pipeline
//!
//! [`TrackMonitor::on_event`] is the single entry point for raw AVTransport
//! events. Each call runs extraction and change detection inline and hands
//! accepted changes to the sink dispatcher.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use tracknotify_parser::{extract_track, ParseError, Track};
use tracknotify_state::TrackTracker;

use crate::config::MonitorConfig;
use crate::dispatch::{DispatchStats, SinkDispatcher, StatsSnapshot};
use crate::error::Result;
use crate::sinks::{
    CommandNotifier, CommandScrobbler, NotificationRequest, NotificationSink, ScrobbleSink,
    ScrobbleSubmission,
};
use crate::subscription::ServiceId;

/// What happened to one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// A new track was accepted and queued for the sinks
    Dispatched(Track),
    /// Same track as the one already announced
    Duplicate,
    /// No title or artist in the event
    Empty,
    /// The event or its metadata was not well-formed XML
    Malformed(ParseError),
    /// The monitor no longer accepts events
    ShutDown,
}

impl EventOutcome {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, EventOutcome::Dispatched(_))
    }
}

/// Now-playing monitor for any number of renderers
///
/// Safe to call from many delivery threads at once. Every renderer gets its
/// own [`TrackTracker`], so two renderers never suppress each other's tracks.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use tracknotify_monitor::{LogNotifier, MonitorConfig, ServiceId, TrackMonitor};
///
/// let monitor = TrackMonitor::new(MonitorConfig::default(), Arc::new(LogNotifier), None)?;
/// let service = ServiceId::new("uuid:RINCON_000E58A0123401400");
///
/// # let raw_event = "<Event/>";
/// let outcome = monitor.on_event(&service, raw_event);
/// println!("{:?} -> {:?}", outcome, monitor.now_playing(&service));
///
/// monitor.shutdown();
/// # Ok::<(), tracknotify_monitor::MonitorError>(())
/// ```
pub struct TrackMonitor {
    config: MonitorConfig,
    sessions: RwLock<HashMap<ServiceId, Arc<TrackTracker>>>,
    dispatcher: SinkDispatcher,
    stats: Arc<DispatchStats>,
    /// Held shared by every `on_event` call; shutdown takes it exclusively
    open: RwLock<bool>,
}

impl TrackMonitor {
    /// Create a monitor with explicit sinks
    pub fn new(
        config: MonitorConfig,
        notifier: Arc<dyn NotificationSink>,
        scrobbler: Option<Arc<dyn ScrobbleSink>>,
    ) -> Result<Self> {
        config.validate()?;

        let stats = Arc::new(DispatchStats::new());
        let dispatcher =
            SinkDispatcher::start(notifier, scrobbler, config.sink_timeout, Arc::clone(&stats))?;

        tracing::info!(
            "Track monitor started (scrobbling {})",
            if dispatcher.scrobbles() { "on" } else { "off" }
        );

        Ok(Self {
            config,
            sessions: RwLock::new(HashMap::new()),
            dispatcher,
            stats,
            open: RwLock::new(true),
        })
    }

    /// Create a monitor using `notify-send` and, if configured, the
    /// scrobble command
    pub fn from_config(config: MonitorConfig) -> Result<Self> {
        let notifier: Arc<dyn NotificationSink> = Arc::new(CommandNotifier::default());
        let scrobbler = config
            .scrobble
            .clone()
            .map(|command| Arc::new(CommandScrobbler::new(command)) as Arc<dyn ScrobbleSink>);

        Self::new(config, notifier, scrobbler)
    }

    /// Process one raw event from `service_id`.
    ///
    /// Never blocks on a sink. Malformed and empty events are logged and
    /// dropped; they leave the stored track alone.
    pub fn on_event(&self, service_id: &ServiceId, raw: &str) -> EventOutcome {
        let open = self.open.read();
        if !*open {
            tracing::debug!("Dropping event from {}: monitor is shut down", service_id);
            return EventOutcome::ShutDown;
        }

        self.stats.event_received();

        let track = match extract_track(raw) {
            Ok(track) => track,
            Err(e) => {
                self.stats.parse_failure();
                tracing::warn!("Dropping event from {} ({:?} stage): {}", service_id, e.stage(), e);
                return EventOutcome::Malformed(e);
            }
        };

        if !track.is_actionable() {
            self.stats.empty_event();
            tracing::debug!("Event from {} carries no title or artist", service_id);
            return EventOutcome::Empty;
        }

        let session = self.session(service_id);
        let observation = session.observe_with(track, |accepted| self.dispatch(service_id, accepted));

        if observation.should_notify {
            EventOutcome::Dispatched(observation.effective)
        } else {
            self.stats.duplicate_suppressed();
            EventOutcome::Duplicate
        }
    }

    /// Last announced track of `service_id`, `None` for an unknown service
    pub fn now_playing(&self, service_id: &ServiceId) -> Option<Track> {
        self.sessions
            .read()
            .get(service_id)
            .map(|session| session.current())
    }

    /// Services that have delivered at least one actionable event
    pub fn services(&self) -> Vec<ServiceId> {
        let mut services: Vec<ServiceId> = self.sessions.read().keys().cloned().collect();
        services.sort();
        services
    }

    /// Drop the stored track of a service that went away.
    ///
    /// Returns true if the service was known.
    pub fn forget(&self, service_id: &ServiceId) -> bool {
        self.sessions.write().remove(service_id).is_some()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop accepting events and wait for queued sink work to finish.
    ///
    /// Events already inside `on_event` complete normally. Idempotent.
    pub fn shutdown(&self) {
        {
            let mut open = self.open.write();
            if !*open {
                return;
            }
            *open = false;
        }

        self.dispatcher.shutdown();

        let stats = self.stats.snapshot();
        tracing::info!(
            "Track monitor shut down after {} events ({} tracks announced)",
            stats.events_received,
            stats.notifications_dispatched
        );
    }

    pub fn is_shut_down(&self) -> bool {
        !*self.open.read()
    }

    fn session(&self, service_id: &ServiceId) -> Arc<TrackTracker> {
        if let Some(session) = self.sessions.read().get(service_id) {
            return Arc::clone(session);
        }

        let mut sessions = self.sessions.write();
        Arc::clone(sessions.entry(service_id.clone()).or_insert_with(|| {
            tracing::debug!("New session for {}", service_id);
            Arc::new(TrackTracker::new())
        }))
    }

    /// Runs under the session lock; must not block.
    fn dispatch(&self, service_id: &ServiceId, track: &Track) {
        let notification = NotificationRequest::for_track(track, &self.config.notification);
        let scrobble = self
            .dispatcher
            .scrobbles()
            .then(|| ScrobbleSubmission::new(track.clone(), Utc::now()));

        if self.dispatcher.enqueue(notification, scrobble) {
            self.stats.notification_dispatched();
            tracing::info!(
                "{}: {}",
                service_id,
                track.now_playing().unwrap_or_default()
            );
        } else {
            tracing::warn!("Sink queues closed, dropping announcement for {}", service_id);
        }
    }
}

impl Drop for TrackMonitor {
    fn drop(&mut self) {
        tracing::debug!(
            "TrackMonitor dropping, {} sessions",
            self.sessions.read().len()
        );
    }
}

//! Shared fixtures: recording sinks, a scripted backend and event builders

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracknotify_monitor::{
    BackendError, NotificationRequest, NotificationSink, ScrobbleSink, ScrobbleSubmission,
    ServiceId, SinkError, SubscriptionBackend, SubscriptionEvent,
};

// ============================================================================
// Events
// ============================================================================

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// A LastChange event announcing the given fields
pub fn last_change(class: Option<&str>, title: Option<&str>, artist: Option<&str>) -> String {
    let mut body = String::new();
    if let Some(class) = class {
        body.push_str(&format!("<upnp:class>{}</upnp:class>", escape(class)));
    }
    if let Some(title) = title {
        body.push_str(&format!("<dc:title>{}</dc:title>", escape(title)));
    }
    if let Some(artist) = artist {
        body.push_str(&format!("<upnp:artist>{}</upnp:artist>", escape(artist)));
    }
    let didl = format!(r#"<DIDL-Lite xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/"><item id="-1">{body}</item></DIDL-Lite>"#);

    format!(
        r#"<Event xmlns="urn:schemas-upnp-org:metadata-1-0/AVT/"><InstanceID val="0"><TransportState val="PLAYING"/><CurrentTrackMetaData val="{}"/></InstanceID></Event>"#,
        escape(&didl)
    )
}

pub fn song(title: &str, artist: &str) -> String {
    last_change(Some("object.item.audioItem.musicTrack"), Some(title), Some(artist))
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

// ============================================================================
// Sinks
// ============================================================================

/// Records every notification, optionally slowly or failing
#[derive(Default)]
pub struct RecordingNotifier {
    pub shown: Mutex<Vec<String>>,
    pub delay: Option<Duration>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn summaries(&self) -> Vec<String> {
        self.shown.lock().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording-notifier"
    }

    async fn show(&self, request: &NotificationRequest) -> Result<(), SinkError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.shown.lock().push(request.summary.clone());
        if self.fail {
            return Err(SinkError::Io(std::io::Error::other("notification daemon gone")));
        }
        Ok(())
    }
}

/// Records every scrobble, optionally failing
#[derive(Default)]
pub struct RecordingScrobbler {
    pub submitted: Mutex<Vec<ScrobbleSubmission>>,
    pub fail: bool,
}

impl RecordingScrobbler {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn submissions(&self) -> Vec<ScrobbleSubmission> {
        self.submitted.lock().clone()
    }
}

#[async_trait]
impl ScrobbleSink for RecordingScrobbler {
    fn name(&self) -> &'static str {
        "recording-scrobbler"
    }

    async fn submit(&self, submission: &ScrobbleSubmission) -> Result<(), SinkError> {
        self.submitted.lock().push(submission.clone());
        if self.fail {
            return Err(SinkError::ExitStatus {
                program: "scrobbler".to_string(),
                status: "exit status: 2".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Backend
// ============================================================================

/// In-memory backend the test drives by hand
#[derive(Default)]
pub struct ScriptedBackend {
    /// Number of subscribe calls to reject before accepting
    pub reject_first: AtomicU32,
    pub subscribe_calls: AtomicU32,
    /// Payload sent through the channel from inside `subscribe`, like a
    /// renderer's initial NOTIFY
    pub initial_event: Option<String>,
    /// Time `subscribe` keeps running after the initial event
    pub latency: Option<Duration>,
    channels: Mutex<HashMap<ServiceId, mpsc::UnboundedSender<SubscriptionEvent>>>,
    pub unsubscribed: Mutex<Vec<ServiceId>>,
}

impl ScriptedBackend {
    pub fn rejecting(count: u32) -> Self {
        Self {
            reject_first: AtomicU32::new(count),
            ..Default::default()
        }
    }

    /// Sends `payload` before the subscribe call returns, `latency` later
    pub fn announcing(payload: &str, latency: Duration) -> Self {
        Self {
            initial_event: Some(payload.to_string()),
            latency: Some(latency),
            ..Default::default()
        }
    }

    pub fn is_subscribed(&self, service_id: &ServiceId) -> bool {
        self.channels.lock().contains_key(service_id)
    }

    fn send(&self, service_id: &ServiceId, event: SubscriptionEvent) -> bool {
        match self.channels.lock().get(service_id) {
            Some(channel) => channel.send(event).is_ok(),
            None => false,
        }
    }

    /// Publish a LastChange payload
    pub fn publish(&self, service_id: &ServiceId, payload: &str) -> bool {
        self.publish_variable(service_id, "LastChange", payload)
    }

    pub fn publish_variable(&self, service_id: &ServiceId, variable: &str, payload: &str) -> bool {
        self.send(
            service_id,
            SubscriptionEvent::Delivered {
                service_id: service_id.clone(),
                variable: variable.to_string(),
                payload: payload.to_string(),
            },
        )
    }

    /// Report the subscription lost and stop delivering
    pub fn lose(&self, service_id: &ServiceId, reason: &str) -> bool {
        let sent = self.send(
            service_id,
            SubscriptionEvent::Lost {
                service_id: service_id.clone(),
                reason: reason.to_string(),
            },
        );
        self.channels.lock().remove(service_id);
        sent
    }

    /// Report the subscription lost but keep the channel for a later renewal
    pub fn interrupt(&self, service_id: &ServiceId, reason: &str) -> bool {
        self.send(
            service_id,
            SubscriptionEvent::Lost {
                service_id: service_id.clone(),
                reason: reason.to_string(),
            },
        )
    }

    pub fn renew(&self, service_id: &ServiceId) -> bool {
        self.send(
            service_id,
            SubscriptionEvent::Renewed {
                service_id: service_id.clone(),
            },
        )
    }
}

#[async_trait]
impl SubscriptionBackend for ScriptedBackend {
    async fn subscribe(
        &self,
        service_id: &ServiceId,
        variable: &str,
        events: mpsc::UnboundedSender<SubscriptionEvent>,
    ) -> Result<(), BackendError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.reject_first.load(Ordering::SeqCst);
        if remaining > 0 {
            self.reject_first.store(remaining - 1, Ordering::SeqCst);
            return Err(BackendError::new("renderer unreachable"));
        }

        if let Some(payload) = &self.initial_event {
            let _ = events.send(SubscriptionEvent::Delivered {
                service_id: service_id.clone(),
                variable: variable.to_string(),
                payload: payload.clone(),
            });
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        self.channels.lock().insert(service_id.clone(), events);
        Ok(())
    }

    async fn unsubscribe(&self, service_id: &ServiceId) -> Result<(), BackendError> {
        self.channels.lock().remove(service_id);
        self.unsubscribed.lock().push(service_id.clone());
        Ok(())
    }
}

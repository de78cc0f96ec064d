//! Background sink dispatch
//!
//! Spawns a thread with its own tokio runtime that feeds accepted track
//! changes to the sinks. The event path only pushes onto unbounded queues,
//! so a slow or stuck sink can never hold up extraction or change detection.
//! Notifications and scrobbles have separate queues; each queue is processed
//! in acceptance order.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{MonitorError, Result, SinkError};
use crate::sinks::{NotificationRequest, NotificationSink, ScrobbleSink, ScrobbleSubmission};

/// Pipeline counters, updated without locks
#[derive(Debug, Default)]
pub struct DispatchStats {
    events_received: AtomicU64,
    parse_failures: AtomicU64,
    empty_events: AtomicU64,
    duplicates_suppressed: AtomicU64,
    notifications_dispatched: AtomicU64,
    sink_failures: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub events_received: u64,
    pub parse_failures: u64,
    pub empty_events: u64,
    pub duplicates_suppressed: u64,
    /// Accepted track changes handed to the sinks
    pub notifications_dispatched: u64,
    /// Sink invocations that failed or timed out
    pub sink_failures: u64,
}

impl DispatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            empty_events: self.empty_events.load(Ordering::Relaxed),
            duplicates_suppressed: self.duplicates_suppressed.load(Ordering::Relaxed),
            notifications_dispatched: self.notifications_dispatched.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn event_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn parse_failure(&self) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn empty_event(&self) {
        self.empty_events.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn duplicate_suppressed(&self) {
        self.duplicates_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn notification_dispatched(&self) {
        self.notifications_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn sink_failure(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }
}

struct Queues {
    notifications: mpsc::UnboundedSender<NotificationRequest>,
    scrobbles: Option<mpsc::UnboundedSender<ScrobbleSubmission>>,
}

/// Owns the sink worker thread and its queues
pub struct SinkDispatcher {
    queues: RwLock<Option<Queues>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SinkDispatcher {
    /// Start the worker thread.
    ///
    /// Every sink call is bounded by `sink_timeout`; failures and timeouts
    /// are logged and counted in `stats`.
    pub fn start(
        notifier: Arc<dyn NotificationSink>,
        scrobbler: Option<Arc<dyn ScrobbleSink>>,
        sink_timeout: Duration,
        stats: Arc<DispatchStats>,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                tracing::error!("Failed to create tokio runtime for sink worker: {}", e);
                MonitorError::WorkerStart(e.to_string())
            })?;

        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let (scrobble_tx, scrobble_rx) = if scrobbler.is_some() {
            let (tx, rx) = mpsc::unbounded_channel();
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        let worker = thread::Builder::new()
            .name("tracknotify-sinks".to_string())
            .spawn(move || {
                runtime.block_on(run_sinks(
                    notifier,
                    notify_rx,
                    scrobbler.zip(scrobble_rx),
                    sink_timeout,
                    stats,
                ));
            })
            .map_err(|e| {
                tracing::error!("Failed to spawn sink worker: {}", e);
                MonitorError::WorkerStart(e.to_string())
            })?;

        Ok(Self {
            queues: RwLock::new(Some(Queues {
                notifications: notify_tx,
                scrobbles: scrobble_tx,
            })),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Queue work for the sinks without blocking.
    ///
    /// Returns false once the dispatcher has been shut down.
    pub fn enqueue(
        &self,
        notification: Option<NotificationRequest>,
        scrobble: Option<ScrobbleSubmission>,
    ) -> bool {
        let queues = self.queues.read();
        let Some(queues) = queues.as_ref() else {
            return false;
        };

        if let Some(request) = notification {
            if queues.notifications.send(request).is_err() {
                return false;
            }
        }
        if let (Some(submission), Some(scrobbles)) = (scrobble, queues.scrobbles.as_ref()) {
            if scrobbles.send(submission).is_err() {
                return false;
            }
        }
        true
    }

    /// Whether a scrobble sink is attached
    pub fn scrobbles(&self) -> bool {
        self.queues
            .read()
            .as_ref()
            .map_or(false, |queues| queues.scrobbles.is_some())
    }

    /// Close the queues, let the worker finish what is queued and join it.
    ///
    /// Idempotent.
    pub fn shutdown(&self) {
        drop(self.queues.write().take());

        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                tracing::warn!("Sink worker panicked during shutdown");
            }
        }
    }
}

impl Drop for SinkDispatcher {
    fn drop(&mut self) {
        // Closing the queues lets the worker drain and exit on its own
        drop(self.queues.write().take());
    }
}

async fn run_sinks(
    notifier: Arc<dyn NotificationSink>,
    notifications: mpsc::UnboundedReceiver<NotificationRequest>,
    scrobbler: Option<(Arc<dyn ScrobbleSink>, mpsc::UnboundedReceiver<ScrobbleSubmission>)>,
    limit: Duration,
    stats: Arc<DispatchStats>,
) {
    tracing::debug!("Sink worker started");

    let notify_name = notifier.name();
    let notify = drain(notifications, notify_name, limit, &stats, |request| {
        let notifier = Arc::clone(&notifier);
        async move { notifier.show(&request).await }
    });

    let scrobble = async {
        if let Some((scrobbler, submissions)) = scrobbler {
            let scrobble_name = scrobbler.name();
            drain(submissions, scrobble_name, limit, &stats, |submission| {
                let scrobbler = Arc::clone(&scrobbler);
                async move { scrobbler.submit(&submission).await }
            })
            .await;
        }
    };

    tokio::join!(notify, scrobble);

    tracing::debug!("Sink worker shut down");
}

async fn drain<T, F, Fut>(
    mut queue: mpsc::UnboundedReceiver<T>,
    sink: &'static str,
    limit: Duration,
    stats: &DispatchStats,
    mut deliver: F,
) where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = std::result::Result<(), SinkError>>,
{
    while let Some(item) = queue.recv().await {
        let outcome = match tokio::time::timeout(limit, deliver(item)).await {
            Ok(result) => result,
            Err(_) => Err(SinkError::Timeout(limit)),
        };

        match outcome {
            Ok(()) => tracing::trace!("Sink {} delivered", sink),
            Err(e) => {
                stats.sink_failure();
                tracing::warn!("Sink {} failed: {}", sink, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Urgency;
    use async_trait::async_trait;

    struct Recorder {
        seen: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl NotificationSink for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn show(&self, request: &NotificationRequest) -> std::result::Result<(), SinkError> {
            self.seen.lock().push(request.summary.clone());
            if self.fail {
                Err(SinkError::Io(std::io::Error::other("boom")))
            } else {
                Ok(())
            }
        }
    }

    fn request(summary: &str) -> NotificationRequest {
        NotificationRequest {
            summary: summary.to_string(),
            app_name: "tracknotify".to_string(),
            icon: "audio-volume-high".to_string(),
            urgency: Urgency::Low,
        }
    }

    #[test]
    fn test_shutdown_drains_in_order() {
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
            fail: false,
        });
        let stats = Arc::new(DispatchStats::new());
        let dispatcher =
            SinkDispatcher::start(recorder.clone(), None, Duration::from_secs(1), stats.clone())
                .unwrap();

        for summary in ["one", "two", "three"] {
            assert!(dispatcher.enqueue(Some(request(summary)), None));
        }
        dispatcher.shutdown();

        assert_eq!(*recorder.seen.lock(), vec!["one", "two", "three"]);
        assert_eq!(stats.snapshot().sink_failures, 0);
        assert!(!dispatcher.enqueue(Some(request("late")), None));
    }

    #[test]
    fn test_failures_are_counted() {
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
            fail: true,
        });
        let stats = Arc::new(DispatchStats::new());
        let dispatcher =
            SinkDispatcher::start(recorder.clone(), None, Duration::from_secs(1), stats.clone())
                .unwrap();

        dispatcher.enqueue(Some(request("a")), None);
        dispatcher.enqueue(Some(request("b")), None);
        dispatcher.shutdown();

        assert_eq!(recorder.seen.lock().len(), 2);
        assert_eq!(stats.snapshot().sink_failures, 2);
    }

    #[test]
    fn test_scrobbles_dropped_without_scrobbler() {
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
            fail: false,
        });
        let dispatcher = SinkDispatcher::start(
            recorder,
            None,
            Duration::from_secs(1),
            Arc::new(DispatchStats::new()),
        )
        .unwrap();

        assert!(!dispatcher.scrobbles());
        dispatcher.shutdown();
        dispatcher.shutdown();
    }
}

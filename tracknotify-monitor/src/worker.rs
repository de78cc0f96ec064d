//! Background worker thread for subscriptions
//!
//! Spawns a thread with its own tokio runtime that talks to the async
//! [`SubscriptionBackend`], feeds deliveries into the [`TrackMonitor`] and
//! resubscribes lost subscriptions, while [`SubscriptionManager`] exposes a
//! sync API.
//!
//! [`SubscriptionManager`]: crate::manager::SubscriptionManager

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle as TaskHandle;

use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::monitor::TrackMonitor;
use crate::subscription::{
    ServiceId, Subscription, SubscriptionBackend, SubscriptionEvent, SubscriptionState,
};

/// Subscription records shared by the manager and the worker
pub(crate) type Registry = Arc<RwLock<HashMap<ServiceId, Subscription>>>;

/// Commands sent from the sync SubscriptionManager to the background worker
#[derive(Debug)]
pub(crate) enum Command {
    /// Start subscribing to a registered service
    Subscribe { service_id: ServiceId },
    /// Tear down a service that was removed from the registry
    Unsubscribe { service_id: ServiceId },
    /// Unsubscribe everything and stop
    Shutdown,
}

/// Spawns the background subscription worker thread
pub(crate) fn spawn_subscription_worker(
    config: MonitorConfig,
    backend: Arc<dyn SubscriptionBackend>,
    monitor: Arc<TrackMonitor>,
    registry: Registry,
    commands: mpsc::UnboundedReceiver<Command>,
) -> Result<JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            tracing::error!("Failed to create tokio runtime for subscription worker: {}", e);
            MonitorError::WorkerStart(e.to_string())
        })?;

    thread::Builder::new()
        .name("tracknotify-subscriptions".to_string())
        .spawn(move || {
            let worker = Worker::new(config, backend, monitor, registry);
            runtime.block_on(worker.run(commands));
        })
        .map_err(|e| {
            tracing::error!("Failed to spawn subscription worker: {}", e);
            MonitorError::WorkerStart(e.to_string())
        })
}

struct Worker {
    config: Arc<MonitorConfig>,
    backend: Arc<dyn SubscriptionBackend>,
    monitor: Arc<TrackMonitor>,
    registry: Registry,
    events_tx: mpsc::UnboundedSender<SubscriptionEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<SubscriptionEvent>>,
    attempts: HashMap<ServiceId, TaskHandle<()>>,
}

impl Worker {
    fn new(
        config: MonitorConfig,
        backend: Arc<dyn SubscriptionBackend>,
        monitor: Arc<TrackMonitor>,
        registry: Registry,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            config: Arc::new(config),
            backend,
            monitor,
            registry,
            events_tx,
            events_rx: Some(events_rx),
            attempts: HashMap::new(),
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let Some(mut events) = self.events_rx.take() else {
            return;
        };

        tracing::info!("Subscription worker started");

        loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(Command::Subscribe { service_id }) => self.subscribe(service_id),
                    Some(Command::Unsubscribe { service_id }) => self.unsubscribe(&service_id).await,
                    Some(Command::Shutdown) | None => {
                        tracing::info!("Subscription worker received shutdown command");
                        break;
                    }
                },

                Some(event) = events.recv() => self.handle_event(event),
            }
        }

        self.shutdown().await;
        tracing::info!("Subscription worker shut down");
    }

    fn subscribe(&mut self, service_id: ServiceId) {
        tracing::debug!("Worker: subscribing to {}", service_id);
        self.spawn_attempts(service_id, SubscriptionState::Pending);
    }

    async fn unsubscribe(&mut self, service_id: &ServiceId) {
        tracing::debug!("Worker: unsubscribing from {}", service_id);

        if let Some(task) = self.attempts.remove(service_id) {
            task.abort();
        }
        if let Err(e) = self.backend.unsubscribe(service_id).await {
            tracing::warn!("Failed to unsubscribe from {}: {}", service_id, e);
        }
        self.monitor.forget(service_id);
    }

    fn handle_event(&mut self, event: SubscriptionEvent) {
        match event {
            SubscriptionEvent::Delivered {
                service_id,
                variable,
                payload,
            } => self.deliver(&service_id, &variable, &payload),

            SubscriptionEvent::Lost { service_id, reason } => {
                let lost = update(&self.registry, &service_id, |subscription| {
                    if subscription.state != SubscriptionState::Active {
                        return false;
                    }
                    subscription.state = SubscriptionState::Lost;
                    subscription.connected = false;
                    subscription.last_error = Some(reason.clone());
                    true
                });

                if lost == Some(true) {
                    tracing::warn!("Subscription to {} lost: {}", service_id, reason);
                    self.spawn_attempts(service_id, SubscriptionState::Resubscribing);
                } else {
                    tracing::debug!("Ignoring loss report for inactive {}", service_id);
                }
            }

            SubscriptionEvent::Renewed { service_id } => {
                let restored = update(&self.registry, &service_id, |subscription| {
                    let was = subscription.state;
                    if was == SubscriptionState::Pending {
                        return None;
                    }
                    subscription.state = SubscriptionState::Active;
                    subscription.connected = true;
                    subscription.last_error = None;
                    Some(was)
                });

                match restored.flatten() {
                    Some(SubscriptionState::Active) => {
                        tracing::debug!("Subscription to {} renewed", service_id);
                    }
                    Some(was) => {
                        if let Some(task) = self.attempts.remove(&service_id) {
                            task.abort();
                        }
                        tracing::info!("Subscription to {} restored by renewal ({:?})", service_id, was);
                    }
                    None => tracing::debug!("Ignoring renewal for unconfirmed {}", service_id),
                }
            }
        }
    }

    /// Hand one delivery to the monitor, inline and in arrival order
    fn deliver(&self, service_id: &ServiceId, variable: &str, payload: &str) {
        let accepted = update(&self.registry, service_id, |subscription| {
            if !subscription.state.accepts_events() || subscription.variable != variable {
                return false;
            }
            subscription.events_delivered += 1;
            subscription.last_event_at = Some(Utc::now());
            true
        });

        match accepted {
            Some(true) => {
                let outcome = self.monitor.on_event(service_id, payload);
                tracing::debug!("Event from {}: {:?}", service_id, outcome);
            }
            Some(false) => tracing::debug!(
                "Dropping {} event from {}",
                variable,
                service_id
            ),
            None => tracing::debug!("Dropping event from unregistered {}", service_id),
        }
    }

    fn spawn_attempts(&mut self, service_id: ServiceId, first_state: SubscriptionState) {
        if let Some(previous) = self.attempts.remove(&service_id) {
            previous.abort();
        }

        let task = tokio::spawn(subscribe_with_retry(
            service_id.clone(),
            first_state,
            Arc::clone(&self.config),
            Arc::clone(&self.backend),
            Arc::clone(&self.registry),
            self.events_tx.clone(),
        ));
        self.attempts.insert(service_id, task);
    }

    async fn shutdown(&mut self) {
        for (_, task) in self.attempts.drain() {
            task.abort();
        }

        let services: Vec<ServiceId> = self.registry.read().keys().cloned().collect();
        for service_id in services {
            if let Err(e) = self.backend.unsubscribe(&service_id).await {
                tracing::warn!("Failed to unsubscribe from {} during shutdown: {}", service_id, e);
            }
            update(&self.registry, &service_id, |subscription| {
                subscription.connected = false;
            });
        }
    }
}

/// Subscribe with exponential backoff.
///
/// - Attempt 1: immediately
/// - Attempt 2: after `resubscribe_backoff_base`
/// - Attempt n: after `resubscribe_backoff_base * 2^(n-2)`, capped at
///   `max_resubscribe_backoff`
///
/// Gives up when the service is removed from the registry meanwhile.
async fn subscribe_with_retry(
    service_id: ServiceId,
    first_state: SubscriptionState,
    config: Arc<MonitorConfig>,
    backend: Arc<dyn SubscriptionBackend>,
    registry: Registry,
    events: mpsc::UnboundedSender<SubscriptionEvent>,
) {
    let variable = config.event_variable.clone();

    for attempt in 1..=config.max_resubscribe_attempts {
        let delay = config.resubscribe_delay(attempt);
        if !delay.is_zero() {
            tracing::debug!("Retrying {} in {:?}", service_id, delay);
            tokio::time::sleep(delay).await;
        }

        let state = if attempt == 1 { first_state } else { SubscriptionState::Resubscribing };
        if update(&registry, &service_id, |s| s.state = state).is_none() {
            return;
        }

        match backend.subscribe(&service_id, &variable, events.clone()).await {
            Ok(()) => {
                update(&registry, &service_id, |subscription| {
                    subscription.state = SubscriptionState::Active;
                    subscription.connected = true;
                    subscription.last_error = None;
                });
                tracing::info!("Subscribed to {} on {}", variable, service_id);
                return;
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to subscribe to {} (attempt {}/{}): {}",
                    service_id,
                    attempt,
                    config.max_resubscribe_attempts,
                    e
                );
                let recorded = update(&registry, &service_id, |subscription| {
                    subscription.last_error = Some(e.to_string());
                });
                if recorded.is_none() {
                    return;
                }
            }
        }
    }

    let error = update(&registry, &service_id, |subscription| {
        subscription.state = SubscriptionState::Failed;
        subscription.connected = false;
        MonitorError::Subscription {
            service_id: service_id.clone(),
            reason: subscription
                .last_error
                .clone()
                .unwrap_or_else(|| "no attempts made".to_string()),
        }
    });
    if let Some(error) = error {
        tracing::warn!("Giving up: {}", error);
    }
}

/// Apply `change` to a registered subscription, `None` if not registered
fn update<T>(
    registry: &Registry,
    service_id: &ServiceId,
    change: impl FnOnce(&mut Subscription) -> T,
) -> Option<T> {
    registry.write().get_mut(service_id).map(change)
}

//! Sync-first subscription manager
//!
//! Owns the subscription records and the background worker. All methods are
//! blocking-free: they update the records and hand the network work to the
//! worker thread.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::monitor::TrackMonitor;
use crate::subscription::{ServiceId, Subscription, SubscriptionBackend};
use crate::worker::{spawn_subscription_worker, Command, Registry};

/// Keeps one subscription per AVTransport service and feeds every delivery
/// into a [`TrackMonitor`]
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use tracknotify_monitor::{MonitorConfig, SubscriptionManager, TrackMonitor};
///
/// let config = MonitorConfig::from_env()?;
/// let monitor = Arc::new(TrackMonitor::from_config(config.clone())?);
/// let manager = SubscriptionManager::start(config, backend, monitor)?;
///
/// // Called by discovery whenever a renderer shows up
/// manager.add_service("uuid:RINCON_000E58A0123401400")?;
///
/// for subscription in manager.subscriptions() {
///     println!("{}: {:?}", subscription.service_id, subscription.state);
/// }
///
/// manager.shutdown();
/// ```
pub struct SubscriptionManager {
    /// Send commands to background worker
    command_tx: mpsc::UnboundedSender<Command>,

    /// Subscription records, updated by the worker
    registry: Registry,

    monitor: Arc<TrackMonitor>,

    variable: String,

    worker: Option<JoinHandle<()>>,
}

impl SubscriptionManager {
    /// Validate `config` and start the background worker
    pub fn start(
        config: MonitorConfig,
        backend: Arc<dyn SubscriptionBackend>,
        monitor: Arc<TrackMonitor>,
    ) -> Result<Self> {
        config.validate()?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let registry: Registry = Arc::new(RwLock::new(HashMap::new()));
        let variable = config.event_variable.clone();

        let worker = spawn_subscription_worker(
            config,
            backend,
            Arc::clone(&monitor),
            Arc::clone(&registry),
            command_rx,
        )?;

        Ok(Self {
            command_tx,
            registry,
            monitor,
            variable,
            worker: Some(worker),
        })
    }

    /// Register a service and start subscribing to it.
    ///
    /// The subscription starts out [`Pending`](crate::SubscriptionState::Pending)
    /// and becomes active once the backend confirms it.
    pub fn add_service(&self, service_id: impl Into<ServiceId>) -> Result<()> {
        let service_id = service_id.into();

        {
            let mut registry = self.registry.write();
            if registry.contains_key(&service_id) {
                return Err(MonitorError::AlreadyRegistered(service_id));
            }
            registry.insert(
                service_id.clone(),
                Subscription::new(service_id.clone(), self.variable.clone()),
            );
        }

        tracing::debug!("Registered service {}", service_id);

        if self
            .command_tx
            .send(Command::Subscribe {
                service_id: service_id.clone(),
            })
            .is_err()
        {
            self.registry.write().remove(&service_id);
            return Err(MonitorError::WorkerDisconnected);
        }

        Ok(())
    }

    /// Unsubscribe from a service that went away and forget its track
    pub fn remove_service(&self, service_id: impl Into<ServiceId>) -> Result<()> {
        let service_id = service_id.into();

        if self.registry.write().remove(&service_id).is_none() {
            return Err(MonitorError::UnknownService(service_id));
        }

        tracing::debug!("Removed service {}", service_id);

        self.command_tx
            .send(Command::Unsubscribe { service_id })
            .map_err(|_| MonitorError::WorkerDisconnected)
    }

    /// Snapshot of every subscription, ordered by service id
    pub fn subscriptions(&self) -> Vec<Subscription> {
        let mut subscriptions: Vec<Subscription> = self.registry.read().values().cloned().collect();
        subscriptions.sort_by(|a, b| a.service_id.cmp(&b.service_id));
        subscriptions
    }

    pub fn subscription(&self, service_id: &ServiceId) -> Option<Subscription> {
        self.registry.read().get(service_id).cloned()
    }

    pub fn monitor(&self) -> &Arc<TrackMonitor> {
        &self.monitor
    }

    /// Unsubscribe everything, stop the worker and drain the sinks
    pub fn shutdown(mut self) {
        self.stop_worker();
        self.monitor.shutdown();
    }

    fn stop_worker(&mut self) {
        let _ = self.command_tx.send(Command::Shutdown);

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("Subscription worker panicked during shutdown");
            }
        }
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        tracing::debug!(
            "SubscriptionManager dropping, {} subscriptions",
            self.registry.read().len()
        );

        // Send shutdown command to worker
        let _ = self.command_tx.send(Command::Shutdown);
    }
}

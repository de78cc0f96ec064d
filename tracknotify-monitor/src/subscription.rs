//! Subscription records and the backend seam
//!
//! The network side of UPnP eventing (discovery, SUBSCRIBE/RENEW requests,
//! the NOTIFY callback server) lives behind [`SubscriptionBackend`]. The
//! backend pushes [`SubscriptionEvent`]s onto the channel it is handed; one
//! channel carries events in publication order.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Identifier of one evented AVTransport service: the renderer's device
/// UUID.
///
/// Accepts a bare UUID, a UDN (`uuid:RINCON_...`) or a full USN
/// (`uuid:RINCON_...::urn:schemas-upnp-org:service:AVTransport:1`); all
/// three name the same service.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ServiceId(String);

impl ServiceId {
    pub fn new(id: impl AsRef<str>) -> Self {
        let id = id.as_ref().trim();
        let device = id.split_once("::").map_or(id, |(device, _)| device);
        let uuid = device.strip_prefix("uuid:").unwrap_or(device);
        Self(uuid.to_string())
    }

    /// The device UUID without the `uuid:` scheme
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceId {
    fn from(id: &str) -> Self {
        ServiceId::new(id)
    }
}

impl From<String> for ServiceId {
    fn from(id: String) -> Self {
        ServiceId::new(id)
    }
}

impl From<ServiceId> for String {
    fn from(id: ServiceId) -> Self {
        id.0
    }
}

/// Lifecycle of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubscriptionState {
    /// Registered, first subscribe request not yet confirmed
    Pending,
    /// Events are being delivered
    Active,
    /// The backend reported the subscription gone
    Lost,
    /// Waiting for or running a resubscription attempt
    Resubscribing,
    /// Every attempt failed; no further retries
    Failed,
}

impl SubscriptionState {
    /// Deliveries are handed to the monitor in these states.
    ///
    /// A renderer sends its initial NOTIFY, carrying the current track, as
    /// soon as it accepts a subscription, which can be before the subscribe
    /// call has returned.
    pub fn accepts_events(&self) -> bool {
        matches!(
            self,
            SubscriptionState::Pending | SubscriptionState::Active | SubscriptionState::Resubscribing
        )
    }
}

/// Bookkeeping for one subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub service_id: ServiceId,
    /// Evented variable, normally "LastChange"
    pub variable: String,
    pub state: SubscriptionState,
    /// False between a loss and the next successful (re)subscription
    pub connected: bool,
    pub events_delivered: u64,
    pub last_event_at: Option<DateTime<Utc>>,
    /// Most recent backend failure, cleared on success
    pub last_error: Option<String>,
}

impl Subscription {
    pub fn new(service_id: ServiceId, variable: impl Into<String>) -> Self {
        Self {
            service_id,
            variable: variable.into(),
            state: SubscriptionState::Pending,
            connected: false,
            events_delivered: 0,
            last_event_at: None,
            last_error: None,
        }
    }
}

/// What a backend reports about a subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEvent {
    /// A NOTIFY arrived for `variable`
    Delivered {
        service_id: ServiceId,
        variable: String,
        payload: String,
    },
    /// The subscription expired or the renderer went away
    Lost { service_id: ServiceId, reason: String },
    /// The backend renewed the subscription, restoring it if it was lost
    Renewed { service_id: ServiceId },
}

impl SubscriptionEvent {
    pub fn service_id(&self) -> &ServiceId {
        match self {
            SubscriptionEvent::Delivered { service_id, .. }
            | SubscriptionEvent::Lost { service_id, .. }
            | SubscriptionEvent::Renewed { service_id } => service_id,
        }
    }
}

/// Failure reported by a [`SubscriptionBackend`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct BackendError(pub String);

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Performs the actual UPnP subscriptions
#[async_trait]
pub trait SubscriptionBackend: Send + Sync {
    /// Subscribe to `variable` on `service_id`.
    ///
    /// On success the backend keeps `events` and sends every delivery, loss
    /// and renewal for this service through it, in publication order.
    async fn subscribe(
        &self,
        service_id: &ServiceId,
        variable: &str,
        events: mpsc::UnboundedSender<SubscriptionEvent>,
    ) -> Result<(), BackendError>;

    /// Drop the subscription and stop sending events for `service_id`
    async fn unsubscribe(&self, service_id: &ServiceId) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_udn_and_usn_name_the_same_service() {
        let bare = ServiceId::new("RINCON_123456789");
        assert_eq!(ServiceId::new("uuid:RINCON_123456789"), bare);
        assert_eq!(
            ServiceId::new("uuid:RINCON_123456789::urn:schemas-upnp-org:service:AVTransport:1"),
            bare
        );
        assert_eq!(ServiceId::from(" uuid:RINCON_123456789 ".to_string()), bare);
        assert_eq!(bare.as_str(), "RINCON_123456789");
    }

    #[test]
    fn test_deserialize_normalizes() {
        let id: ServiceId = serde_json::from_str(r#""uuid:RINCON_1::urn:x""#).unwrap();
        assert_eq!(id.as_str(), "RINCON_1");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""RINCON_1""#);
    }

    #[test]
    fn test_display() {
        let id = ServiceId::new("RINCON_123");
        assert_eq!(format!("{}", id), "RINCON_123");
    }

    #[test]
    fn test_new_subscription_is_pending() {
        let subscription = Subscription::new(ServiceId::new("a"), "LastChange");
        assert_eq!(subscription.state, SubscriptionState::Pending);
        assert!(!subscription.connected);
    }

    #[test]
    fn test_accepts_events() {
        assert!(SubscriptionState::Pending.accepts_events());
        assert!(SubscriptionState::Active.accepts_events());
        assert!(SubscriptionState::Resubscribing.accepts_events());
        assert!(!SubscriptionState::Lost.accepts_events());
        assert!(!SubscriptionState::Failed.accepts_events());
    }

    #[test]
    fn test_event_service_id() {
        let event = SubscriptionEvent::Lost {
            service_id: ServiceId::new("a"),
            reason: "expired".to_string(),
        };
        assert_eq!(event.service_id().as_str(), "a");
    }
}

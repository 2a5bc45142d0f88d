//! Push streams for device notifications.
//!
//! An [`EventStreamBridge`] turns notifications from an external [`NotificationSource`] into
//! events on one open subscription. Opening registers with the source and asks the permission
//! gate for the stream's rights; a denial closes the subscription. Malformed notifications are
//! logged and dropped without ending the stream.

mod bridge;
mod hub;
pub mod inbound;
mod sink;
pub mod status;

pub use bridge::{EventStreamBridge, StreamActivation, StreamState};
pub use hub::NotificationHub;
pub use inbound::{Clock, InboundSms, InboundSmsAssembler, SmsPart, SystemClock, ThreadResolver};
pub use sink::{event_channel, ChannelSink, EventSink, StreamEvent};
pub use status::{DeliveryState, SmsStatusAssembler, SmsStatusNotification};

use std::sync::Arc;

use smsbridge_core_types::BridgeError;
use thiserror::Error;
use uuid::Uuid;

/// Handle returned by a source for one listener registration.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct RegistrationId(pub Uuid);

impl RegistrationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RegistrationId {
    fn default() -> Self {
        Self::new()
    }
}

/// Receives raw notifications from a source.
pub trait NotificationListener<N>: Send + Sync {
    fn on_notification(&self, notification: N);
}

/// External producer of notifications (a broadcast receiver registration on the device).
pub trait NotificationSource<N>: Send + Sync {
    fn register(
        &self,
        listener: Arc<dyn NotificationListener<N>>,
    ) -> Result<RegistrationId, BridgeError>;
    /// Returns false when `id` was not registered.
    fn unregister(&self, id: RegistrationId) -> bool;
}

/// Why a notification could not be turned into an event.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("notification carries no message parts")]
    Empty,
    #[error("notification is missing '{0}'")]
    MissingField(&'static str),
    #[error("unknown notification action '{0}'")]
    UnknownAction(String),
    #[error("lookup failed: {0}")]
    Lookup(String),
}

/// Builds the event payload for one notification.
pub trait EventAssembler<N>: Send + Sync {
    fn assemble(&self, notification: N) -> Result<serde_json::Value, AssemblyError>;
}

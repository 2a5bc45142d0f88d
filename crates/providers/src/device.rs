//! Boundaries to the device services the providers read from and write to.

use std::sync::Arc;

use async_trait::async_trait;
use permissions_broker::GrantState;
use serde::{Deserialize, Serialize};
use smsbridge_core_types::BridgeError;
use smsbridge_event_bus::{
    Clock, InboundSms, NotificationSource, SmsStatusNotification, ThreadResolver,
};
use smsbridge_record_query::RawRow;

/// Forward-only cursor over a query result.
pub type RowCursor = Box<dyn Iterator<Item = RawRow> + Send>;

/// Tabular content store addressed by URI.
#[async_trait]
pub trait ContentResolver: Send + Sync {
    /// `Ok(None)` when the store refuses to open a cursor. A `projection` of `None` returns
    /// every column.
    async fn query(
        &self,
        uri: &str,
        projection: Option<&[&str]>,
    ) -> Result<Option<RowCursor>, BridgeError>;

    /// Raw bytes behind `uri`, or `None` when nothing is stored there.
    async fn open_asset(&self, uri: &str) -> Result<Option<Vec<u8>>, BridgeError>;
}

/// Text message handed to the transport.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingSms {
    pub address: String,
    pub body: String,
    /// Correlation id echoed on the status stream.
    pub sent_id: i32,
    pub sub_id: Option<i32>,
}

#[async_trait]
pub trait SmsTransport: Send + Sync {
    /// Whether messages can be routed through a specific SIM subscription.
    fn supports_subscription_routing(&self) -> bool;
    async fn send_text(&self, message: OutgoingSms) -> Result<(), BridgeError>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimSlot {
    pub imei: String,
    pub state: String,
}

pub trait SimInventory: Send + Sync {
    fn sim_count(&self) -> usize;
    fn sim_slot(&self, index: usize) -> Result<SimSlot, BridgeError>;
}

/// Every collaborator a plugin needs, bundled so one device implementation can serve them all.
#[derive(Clone)]
pub struct Device {
    pub resolver: Arc<dyn ContentResolver>,
    pub transport: Arc<dyn SmsTransport>,
    pub sims: Arc<dyn SimInventory>,
    pub grants: Arc<dyn GrantState>,
    pub threads: Arc<dyn ThreadResolver>,
    pub clock: Arc<dyn Clock>,
    pub inbound: Arc<dyn NotificationSource<InboundSms>>,
    pub status: Arc<dyn NotificationSource<SmsStatusNotification>>,
}

//! Send/delivery status notifications for outgoing messages.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{AssemblyError, EventAssembler};

pub const SMS_SENT_ACTION: &str = "SMS_SENT";
pub const SMS_DELIVERED_ACTION: &str = "SMS_DELIVERED";

/// Raw status broadcast: which report it is, the correlation id given at send time and
/// whether the transport reported success.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsStatusNotification {
    pub action: String,
    pub sent_id: Option<i32>,
    pub result_ok: bool,
}

impl SmsStatusNotification {
    pub fn sent(sent_id: i32, result_ok: bool) -> Self {
        Self {
            action: SMS_SENT_ACTION.to_string(),
            sent_id: Some(sent_id),
            result_ok,
        }
    }

    pub fn delivered(sent_id: i32, result_ok: bool) -> Self {
        Self {
            action: SMS_DELIVERED_ACTION.to_string(),
            sent_id: Some(sent_id),
            result_ok,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    Sent,
    Delivered,
    Fail,
}

/// Builds `{sentId, state}` events.
#[derive(Clone, Copy, Debug, Default)]
pub struct SmsStatusAssembler;

impl EventAssembler<SmsStatusNotification> for SmsStatusAssembler {
    fn assemble(&self, notification: SmsStatusNotification) -> Result<Value, AssemblyError> {
        let sent_id = notification
            .sent_id
            .ok_or(AssemblyError::MissingField("sentId"))?;
        let reported = match notification.action.as_str() {
            SMS_SENT_ACTION => DeliveryState::Sent,
            SMS_DELIVERED_ACTION => DeliveryState::Delivered,
            other => return Err(AssemblyError::UnknownAction(other.to_string())),
        };
        let state = if notification.result_ok {
            reported
        } else {
            DeliveryState::Fail
        };
        Ok(json!({ "sentId": sent_id, "state": state }))
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use smsbridge_core_types::{BridgeError, MethodCall, Payload, PermissionRight, Reply};
use tracing::info;

use crate::device::{OutgoingSms, SmsTransport};
use crate::facade::Capability;

pub const SEND_SMS_ACTION: &str = "sendSMS";

/// `sendSMS`. Success only means the transport accepted the message; delivery is reported on
/// the status stream under the same `sentId`.
pub struct Sender {
    transport: Arc<dyn SmsTransport>,
}

impl Sender {
    pub fn new(transport: Arc<dyn SmsTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl Capability for Sender {
    type Request = OutgoingSms;

    const NAME: &'static str = "sender";
    const RIGHTS: &'static [PermissionRight] =
        &[PermissionRight::SendSms, PermissionRight::ReadPhoneState];
    const DENIED_MESSAGE: &'static str = "permission denied for sending sms";

    fn handles(&self, action: &str) -> bool {
        action == SEND_SMS_ACTION
    }

    fn parse(&self, call: &MethodCall) -> Result<OutgoingSms, BridgeError> {
        let args = &call.arguments;
        Ok(OutgoingSms {
            address: args.require_str("address")?,
            body: args.require_str("body")?,
            sent_id: args.require_i32("sentId")?,
            sub_id: args.opt_i32("subId")?,
        })
    }

    async fn execute(&self, message: OutgoingSms) -> Reply {
        if message.sub_id.is_some() && !self.transport.supports_subscription_routing() {
            return Err(BridgeError::Unsupported(
                "this version of android does not support multicard SIM".into(),
            ));
        }
        let sent_id = message.sent_id;
        self.transport.send_text(message).await?;
        info!(target = "providers", sent_id, "message handed to transport");
        Ok(Payload::null())
    }
}

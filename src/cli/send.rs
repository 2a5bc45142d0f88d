use anyhow::Result;
use clap::Args;
use smsbridge_core_types::MethodCall;
use smsbridge_providers::SEND_CHANNEL;

use super::output::print_reply;
use crate::session::Session;

#[derive(Args, Clone, Debug)]
pub struct SendArgs {
    /// Destination phone number
    pub address: String,

    /// Message text
    pub body: String,

    /// Correlates the status events of this message
    #[arg(long, default_value_t = 0)]
    pub sent_id: i32,

    /// Subscription (SIM) to send from
    #[arg(long)]
    pub sub_id: Option<i32>,
}

pub fn send_call(args: SendArgs) -> MethodCall {
    let mut call = MethodCall::new("sendSMS")
        .arg("address", args.address)
        .arg("body", args.body)
        .arg("sentId", args.sent_id);
    if let Some(sub_id) = args.sub_id {
        call = call.arg("subId", sub_id);
    }
    call
}

pub async fn cmd_send(args: SendArgs, session: &Session, pretty: bool) -> Result<()> {
    print_reply(session.call(SEND_CHANNEL, send_call(args)).await, pretty)
}

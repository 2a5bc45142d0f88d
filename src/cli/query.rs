use anyhow::Result;
use clap::Args;
use smsbridge_core_types::MethodCall;
use smsbridge_providers::QUERY_CHANNEL;
use smsbridge_record_query::MessageBox;

use super::output::print_reply;
use crate::session::Session;

#[derive(Args, Clone, Debug, Default)]
pub struct MessagesArgs {
    /// Records to skip after filtering
    #[arg(long)]
    pub start: Option<i64>,

    /// Maximum records to return (0 or less for all)
    #[arg(long)]
    pub count: Option<i64>,

    /// Only messages of this conversation thread
    #[arg(long)]
    pub thread_id: Option<i64>,

    /// Only messages exchanged with this address
    #[arg(long)]
    pub address: Option<String>,
}

impl MessagesArgs {
    fn into_call(self, source: MessageBox) -> MethodCall {
        let mut call = MethodCall::new(source.action());
        if let Some(start) = self.start {
            call = call.arg("start", start);
        }
        if let Some(count) = self.count {
            call = call.arg("count", count);
        }
        if let Some(thread_id) = self.thread_id {
            call = call.arg("thread_id", thread_id);
        }
        if let Some(address) = self.address {
            call = call.arg("address", address);
        }
        call
    }
}

#[derive(Args, Clone, Debug)]
pub struct ContactArgs {
    /// Phone number to look up
    pub address: String,
}

#[derive(Args, Clone, Debug)]
pub struct PhotoArgs {
    /// Photo path as returned by `contact` (e.g. /contacts/12/photo)
    pub uri: String,

    /// Read the full-size asset instead of the thumbnail
    #[arg(long)]
    pub full_size: bool,
}

pub async fn cmd_messages(
    source: MessageBox,
    args: MessagesArgs,
    session: &Session,
    pretty: bool,
) -> Result<()> {
    let reply = session.call(QUERY_CHANNEL, args.into_call(source)).await;
    print_reply(reply, pretty)
}

pub async fn cmd_contact(args: ContactArgs, session: &Session, pretty: bool) -> Result<()> {
    let call = MethodCall::new("getContact").arg("address", args.address);
    print_reply(session.call(QUERY_CHANNEL, call).await, pretty)
}

pub async fn cmd_photo(args: PhotoArgs, session: &Session, pretty: bool) -> Result<()> {
    let call = MethodCall::new("getContactPhoto")
        .arg("photoUri", args.uri)
        .arg("fullSize", args.full_size);
    print_reply(session.call(QUERY_CHANNEL, call).await, pretty)
}

pub async fn cmd_profile(session: &Session, pretty: bool) -> Result<()> {
    let call = MethodCall::new("getUserProfile");
    print_reply(session.call(QUERY_CHANNEL, call).await, pretty)
}

pub async fn cmd_sims(session: &Session, pretty: bool) -> Result<()> {
    let call = MethodCall::new("getSimCards");
    print_reply(session.call(QUERY_CHANNEL, call).await, pretty)
}

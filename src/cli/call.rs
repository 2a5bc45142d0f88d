use anyhow::{Context, Result};
use clap::Args;
use smsbridge_core_types::{Arguments, MethodCall};

use super::output::print_reply;
use crate::session::Session;

/// Raw method call, for channels and actions without a dedicated subcommand.
#[derive(Args, Clone, Debug)]
pub struct CallArgs {
    /// Channel name (e.g. `sms`)
    pub channel: String,

    /// Action name (e.g. `getInbox`)
    pub action: String,

    /// Arguments as a JSON object
    #[arg(long, default_value = "{}")]
    pub args: String,
}

pub async fn cmd_call(args: CallArgs, session: &Session, pretty: bool) -> Result<()> {
    let value: serde_json::Value =
        serde_json::from_str(&args.args).context("Failed to parse --args as JSON")?;
    let arguments = Arguments::from_json(value).context("Invalid call arguments")?;
    let call = MethodCall::with_arguments(args.action, arguments);
    print_reply(session.call(&args.channel, call).await, pretty)
}

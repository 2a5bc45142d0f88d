use anyhow::Result;
use clap::Args;
use serde_json::{json, Value};
use smsbridge_event_bus::{event_channel, StreamEvent};
use smsbridge_providers::{INBOUND_CHANNEL, SEND_CHANNEL, STATUS_CHANNEL};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use super::output::print_json;
use super::send::{send_call, SendArgs};
use crate::session::Session;

#[derive(Args, Clone, Debug, Default)]
pub struct ListenArgs {
    /// Do not replay the fixture's incoming messages
    #[arg(long)]
    pub no_replay: bool,

    /// Send a message to this address while listening, to produce status events
    #[arg(long, value_name = "ADDRESS")]
    pub send_to: Option<String>,

    /// Body of the message sent with --send-to
    #[arg(long, default_value = "ping")]
    pub body: String,
}

/// Open both event streams, drive the fixture, and print every event as one JSON line.
pub async fn cmd_listen(args: ListenArgs, session: &Session, pretty: bool) -> Result<()> {
    let (inbound_sink, mut inbound) = event_channel();
    let (status_sink, mut status) = event_channel();
    session.listen(INBOUND_CHANNEL, inbound_sink).await?;
    session.listen(STATUS_CHANNEL, status_sink).await?;

    if !args.no_replay {
        let replayed = session.device().replay_incoming();
        info!(target = "smsbridge", replayed, "replayed incoming messages");
    }
    if let Some(address) = args.send_to {
        let call = send_call(SendArgs {
            address,
            body: args.body,
            sent_id: 1,
            sub_id: None,
        });
        if let Err(err) = session.call(SEND_CHANNEL, call).await {
            warn!(
                target = "smsbridge",
                code = err.code(),
                "send while listening failed: {err}"
            );
        }
    }
    session.settle().await;

    for channel in [INBOUND_CHANNEL, STATUS_CHANNEL] {
        session.plugin().cancel(channel);
    }
    for event in drain(INBOUND_CHANNEL, &mut inbound)
        .into_iter()
        .chain(drain(STATUS_CHANNEL, &mut status))
    {
        print_json(&event, pretty)?;
    }
    Ok(())
}

fn drain(channel: &str, rx: &mut UnboundedReceiver<StreamEvent>) -> Vec<Value> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(match event {
            StreamEvent::Data(data) => json!({"channel": channel, "event": "data", "data": data}),
            StreamEvent::Error(error) => {
                json!({"channel": channel, "event": "error", "error": error})
            }
            StreamEvent::End => json!({"channel": channel, "event": "end"}),
        });
    }
    events
}

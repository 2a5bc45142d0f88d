use std::sync::Arc;

use smsbridge_core_types::{BridgeError, ErrorPayload};
use tokio::sync::mpsc;

/// Host-side end of an open subscription.
pub trait EventSink: Send + Sync {
    fn success(&self, event: serde_json::Value);
    fn error(&self, error: &BridgeError);
    fn end_of_stream(&self);
}

/// What a [`ChannelSink`] forwards.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    Data(serde_json::Value),
    Error(ErrorPayload),
    End,
}

/// Sink that forwards into an unbounded mpsc channel so callers can await events.
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<StreamEvent>,
}

impl ChannelSink {
    fn forward(&self, event: StreamEvent) {
        // A closed receiver means the host stopped listening; nothing else to do.
        let _ = self.tx.send(event);
    }
}

impl EventSink for ChannelSink {
    fn success(&self, event: serde_json::Value) {
        self.forward(StreamEvent::Data(event));
    }

    fn error(&self, error: &BridgeError) {
        self.forward(StreamEvent::Error(error.payload()));
    }

    fn end_of_stream(&self) {
        self.forward(StreamEvent::End);
    }
}

pub fn event_channel() -> (Arc<ChannelSink>, mpsc::UnboundedReceiver<StreamEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(ChannelSink { tx }), rx)
}

use std::fmt;

use base64::Engine as _;
use serde::{Serialize, Serializer};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::error::BridgeError;

/// Successful reply body.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Value(serde_json::Value),
    Bytes(Vec<u8>),
}

impl Payload {
    pub fn null() -> Self {
        Payload::Value(serde_json::Value::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Payload::Value(serde_json::Value::Null))
    }

    pub fn as_value(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Value(value) => Some(value),
            Payload::Bytes(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Payload::Bytes(bytes) => Some(bytes),
            Payload::Value(_) => None,
        }
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Value(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(bytes)
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Payload::Value(value) => value.serialize(serializer),
            Payload::Bytes(bytes) => serializer
                .serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes)),
        }
    }
}

pub type Reply = Result<Payload, BridgeError>;

/// Create a linked sink/handle pair for one request.
pub fn response_channel() -> (ResultSink, ResponseHandle) {
    let (tx, rx) = oneshot::channel();
    (ResultSink { tx }, ResponseHandle { rx })
}

/// Single-use reply slot; every method consumes the sink.
pub struct ResultSink {
    tx: oneshot::Sender<Reply>,
}

impl ResultSink {
    pub fn success(self, payload: impl Into<Payload>) {
        self.reply(Ok(payload.into()));
    }

    pub fn error(self, error: BridgeError) {
        self.reply(Err(error));
    }

    pub fn not_implemented(self, method: &str) {
        self.reply(Err(BridgeError::NotImplemented(method.to_string())));
    }

    pub fn reply(self, reply: Reply) {
        // The caller may have stopped waiting; nothing is left to notify then.
        let _ = self.tx.send(reply);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl fmt::Debug for ResultSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSink")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Receiving side of a [`ResultSink`].
#[derive(Debug)]
pub struct ResponseHandle {
    rx: oneshot::Receiver<Reply>,
}

impl ResponseHandle {
    /// Wait for the reply. A sink dropped unanswered yields [`BridgeError::Abandoned`].
    pub async fn wait(self) -> Reply {
        self.rx.await.unwrap_or(Err(BridgeError::Abandoned))
    }

    /// Non-blocking check, `None` while the request is still pending.
    pub fn try_take(&mut self) -> Option<Reply> {
        match self.rx.try_recv() {
            Ok(reply) => Some(reply),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(BridgeError::Abandoned)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reply_is_delivered_once() {
        let (sink, handle) = response_channel();
        sink.success(serde_json::json!([1, 2]));
        let reply = handle.wait().await.unwrap();
        assert_eq!(reply, Payload::Value(serde_json::json!([1, 2])));
    }

    #[test]
    fn pending_then_abandoned() {
        let (sink, mut handle) = response_channel();
        assert!(handle.try_take().is_none());
        drop(sink);
        assert_eq!(handle.try_take(), Some(Err(BridgeError::Abandoned)));
    }

    #[test]
    fn bytes_serialize_as_base64() {
        let encoded = serde_json::to_value(Payload::Bytes(vec![1, 2, 3])).unwrap();
        assert_eq!(encoded, serde_json::json!("AQID"));
    }
}

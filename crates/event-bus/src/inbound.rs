//! Incoming SMS notifications.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use smsbridge_core_types::BridgeError;

use crate::{AssemblyError, EventAssembler};

/// `status_on_icc` value for a message already read on the SIM.
pub const STATUS_ON_ICC_READ: i32 = 1;

/// One PDU of a received message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsPart {
    pub originating_address: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub timestamp_millis: i64,
    #[serde(default)]
    pub status_on_icc: i32,
}

/// A received-SMS notification; long messages arrive split over several parts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundSms {
    pub parts: Vec<SmsPart>,
}

impl InboundSms {
    pub fn new(parts: Vec<SmsPart>) -> Self {
        Self { parts }
    }

    /// Message bodies concatenated in arrival order.
    pub fn body(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| part.body.as_deref())
            .collect()
    }
}

/// Maps an address to its conversation thread.
pub trait ThreadResolver: Send + Sync {
    fn thread_id_for(&self, address: &str) -> Result<i64, BridgeError>;
}

pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Builds `{address, date, date_sent, read, thread_id, body}` events.
pub struct InboundSmsAssembler {
    threads: Arc<dyn ThreadResolver>,
    clock: Arc<dyn Clock>,
}

impl InboundSmsAssembler {
    pub fn new(threads: Arc<dyn ThreadResolver>, clock: Arc<dyn Clock>) -> Self {
        Self { threads, clock }
    }
}

impl EventAssembler<InboundSms> for InboundSmsAssembler {
    fn assemble(&self, notification: InboundSms) -> Result<Value, AssemblyError> {
        let first = notification.parts.first().ok_or(AssemblyError::Empty)?;
        let address = first
            .originating_address
            .clone()
            .ok_or(AssemblyError::MissingField("address"))?;
        let thread_id = self
            .threads
            .thread_id_for(&address)
            .map_err(|err| AssemblyError::Lookup(err.to_string()))?;
        let read = i32::from(first.status_on_icc == STATUS_ON_ICC_READ);

        Ok(json!({
            "address": address,
            "date": self.clock.now_millis(),
            "date_sent": first.timestamp_millis,
            "read": read,
            "thread_id": thread_id,
            "body": notification.body(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedThreads;

    impl ThreadResolver for FixedThreads {
        fn thread_id_for(&self, address: &str) -> Result<i64, BridgeError> {
            match address {
                "555" => Ok(12),
                _ => Err(BridgeError::io("no thread")),
            }
        }
    }

    struct FixedClock;

    impl Clock for FixedClock {
        fn now_millis(&self) -> i64 {
            42
        }
    }

    fn assembler() -> InboundSmsAssembler {
        InboundSmsAssembler::new(Arc::new(FixedThreads), Arc::new(FixedClock))
    }

    fn part(body: &str) -> SmsPart {
        SmsPart {
            originating_address: Some("555".into()),
            body: Some(body.into()),
            timestamp_millis: 7,
            status_on_icc: 0,
        }
    }

    #[test]
    fn multipart_bodies_are_joined() {
        let event = assembler()
            .assemble(InboundSms::new(vec![part("hel"), part("lo")]))
            .unwrap();
        assert_eq!(
            event,
            json!({
                "address": "555",
                "date": 42,
                "date_sent": 7,
                "read": 0,
                "thread_id": 12,
                "body": "hello",
            })
        );
    }

    #[test]
    fn read_flag_follows_icc_status() {
        let mut first = part("x");
        first.status_on_icc = STATUS_ON_ICC_READ;
        let event = assembler().assemble(InboundSms::new(vec![first])).unwrap();
        assert_eq!(event["read"], 1);
    }

    #[test]
    fn empty_and_unresolvable_notifications_fail() {
        assert_eq!(
            assembler().assemble(InboundSms::default()),
            Err(AssemblyError::Empty)
        );

        let mut stranger = part("x");
        stranger.originating_address = Some("999".into());
        assert!(matches!(
            assembler().assemble(InboundSms::new(vec![stranger])),
            Err(AssemblyError::Lookup(_))
        ));
    }
}

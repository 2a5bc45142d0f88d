use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};
use smsbridge_core_types::{Arguments, BridgeError};

use crate::record::{decode, DecodedRecord, FieldValue};
use crate::row::RawRow;

/// Message folder a query reads from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageBox {
    Inbox,
    Sent,
    Draft,
}

impl MessageBox {
    pub const ALL: [MessageBox; 3] = [MessageBox::Inbox, MessageBox::Sent, MessageBox::Draft];

    pub fn uri(self) -> &'static str {
        match self {
            MessageBox::Inbox => "content://sms/inbox",
            MessageBox::Sent => "content://sms/sent",
            MessageBox::Draft => "content://sms/draft",
        }
    }

    pub fn action(self) -> &'static str {
        match self {
            MessageBox::Inbox => "getInbox",
            MessageBox::Sent => "getSent",
            MessageBox::Draft => "getDraft",
        }
    }

    pub fn from_action(action: &str) -> Option<Self> {
        MessageBox::ALL
            .into_iter()
            .find(|source| source.action() == action)
    }
}

/// Immutable description of one message query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuerySpec {
    pub source: MessageBox,
    pub thread_id: Option<i64>,
    pub address: Option<String>,
    pub offset: usize,
    pub limit: Option<NonZeroUsize>,
}

impl QuerySpec {
    pub fn new(source: MessageBox) -> Self {
        Self {
            source,
            thread_id: None,
            address: None,
            offset: 0,
            limit: None,
        }
    }

    /// Build from call arguments: `start`, `count`, `thread_id`, `address`.
    ///
    /// A non-positive `start` means no offset, a non-positive `count` means unbounded and a
    /// negative `thread_id` means no thread filter.
    pub fn from_arguments(source: MessageBox, args: &Arguments) -> Result<Self, BridgeError> {
        let offset = args
            .opt_i64("start")?
            .map(|start| usize::try_from(start.max(0)).unwrap_or(usize::MAX))
            .unwrap_or(0);
        let limit = args
            .opt_i64("count")?
            .and_then(|count| usize::try_from(count).ok())
            .and_then(NonZeroUsize::new);
        let thread_id = args.opt_i64("thread_id")?.filter(|id| *id >= 0);
        let address = args.opt_str("address")?;
        Ok(Self {
            source,
            thread_id,
            address,
            offset,
            limit,
        })
    }

    pub fn with_thread_id(mut self, thread_id: i64) -> Self {
        self.thread_id = Some(thread_id);
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Zero clears the limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = NonZeroUsize::new(limit);
        self
    }

    /// Equality predicates only; a record lacking the filtered field never matches.
    pub fn matches(&self, record: &DecodedRecord) -> bool {
        if let Some(thread_id) = self.thread_id {
            if record.get("thread_id").and_then(FieldValue::as_i64) != Some(thread_id) {
                return false;
            }
        }
        if let Some(address) = &self.address {
            if record.get("address").and_then(FieldValue::as_str) != Some(address.as_str()) {
                return false;
            }
        }
        true
    }

    /// Filter, then skip `offset` matches, then stop after `limit` emitted records.
    pub fn paginate<I>(&self, records: I) -> Paginated<'_, I::IntoIter>
    where
        I: IntoIterator<Item = DecodedRecord>,
    {
        Paginated {
            inner: records.into_iter(),
            spec: self,
            to_skip: self.offset,
            remaining: self.limit.map(NonZeroUsize::get),
        }
    }
}

/// Lazy single-pass view produced by [`QuerySpec::paginate`]. Pulls nothing from the
/// underlying iterator once the limit is reached.
pub struct Paginated<'a, I> {
    inner: I,
    spec: &'a QuerySpec,
    to_skip: usize,
    remaining: Option<usize>,
}

impl<I> Iterator for Paginated<'_, I>
where
    I: Iterator<Item = DecodedRecord>,
{
    type Item = DecodedRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == Some(0) {
            return None;
        }
        loop {
            let record = self.inner.next()?;
            if !self.spec.matches(&record) {
                continue;
            }
            if self.to_skip > 0 {
                self.to_skip -= 1;
                continue;
            }
            if let Some(remaining) = self.remaining.as_mut() {
                *remaining -= 1;
            }
            return Some(record);
        }
    }
}

/// Collect the page described by `spec`, preserving input order.
pub fn run<I>(records: I, spec: &QuerySpec) -> Vec<DecodedRecord>
where
    I: IntoIterator<Item = DecodedRecord>,
{
    spec.paginate(records).collect()
}

/// Decode rows one at a time and page them; rows past the limit are never decoded.
pub fn query_rows<I>(rows: I, spec: &QuerySpec) -> Vec<DecodedRecord>
where
    I: IntoIterator<Item = RawRow>,
{
    run(rows.into_iter().map(decode), spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_map_to_sources() {
        assert_eq!(MessageBox::from_action("getSent"), Some(MessageBox::Sent));
        assert_eq!(MessageBox::from_action("getContact"), None);
        assert_eq!(MessageBox::Draft.uri(), "content://sms/draft");
    }

    #[test]
    fn sentinel_arguments_disable_filters() {
        let args = Arguments::new()
            .with("start", -5i64)
            .with("count", -1i64)
            .with("thread_id", -1i64);
        let spec = QuerySpec::from_arguments(MessageBox::Inbox, &args).unwrap();
        assert_eq!(spec, QuerySpec::new(MessageBox::Inbox));
    }

    #[test]
    fn mistyped_argument_is_rejected() {
        let args = Arguments::new().with("count", "two");
        let err = QuerySpec::from_arguments(MessageBox::Inbox, &args).unwrap_err();
        assert_eq!(err.code(), "#02");
    }
}

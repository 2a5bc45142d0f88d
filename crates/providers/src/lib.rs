//! Request/response providers and event streams of the SMS bridge.
//!
//! Each [`Facade`] wraps one [`Capability`]: it validates the call, parks it behind the
//! capability's permission gate and replies once the rights are granted or denied. The
//! [`SmsPlugin`] registry routes calls by channel and action, fans lifecycle transitions out to
//! every provider, and offers permission results to each gate in turn.

pub mod capabilities;
pub mod device;
mod facade;
pub mod fixture;
pub mod lifecycle;
mod plugin;
mod streams;

pub use crate::device::{
    ContentResolver, Device, OutgoingSms, RowCursor, SimInventory, SimSlot, SmsTransport,
};
pub use crate::facade::{Capability, Facade, Provider};
pub use crate::fixture::{FixtureDevice, FixtureError, FixtureSpec};
pub use crate::lifecycle::{Attachment, Lifecycle, SurfaceDetach};
pub use crate::plugin::{SmsPlugin, QUERY_CHANNEL, SEND_CHANNEL};
pub use crate::streams::{
    inbound_stream, status_stream, StreamProvider, INBOUND_CHANNEL, STATUS_CHANNEL,
};

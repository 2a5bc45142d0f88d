//! Shared primitives for the SMS bridge crates.
//!
//! Values that cross the host boundary (method calls, replies, error payloads) and the
//! permission vocabulary live here so every provider speaks the same types.

mod args;
mod error;
mod permission;
mod reply;

pub use args::{ArgValue, Arguments, MethodCall};
pub use error::{BridgeError, CollaboratorKind, ErrorClass, ErrorPayload};
pub use permission::{PermissionRight, PermissionStatus};
pub use reply::{response_channel, Payload, Reply, ResponseHandle, ResultSink};

use smsbridge_core_types::{BridgeError, Reply, ResultSink};

/// Work parked by the gate while a prompt is outstanding.
///
/// Granting hands the value to an [`OperationRunner`](crate::OperationRunner); denying or
/// dropping it calls [`Deferred::reject`].
pub trait Deferred: Send + Sync + 'static {
    fn reject(self, error: BridgeError);
}

/// Snapshot of one external request: the action, its parsed arguments and the reply slot.
#[derive(Debug)]
pub struct PendingOperation<A> {
    action: String,
    request: A,
    sink: ResultSink,
}

impl<A> PendingOperation<A> {
    pub fn new(action: impl Into<String>, request: A, sink: ResultSink) -> Self {
        Self {
            action: action.into(),
            request,
            sink,
        }
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn request(&self) -> &A {
        &self.request
    }

    pub fn complete(self, reply: Reply) {
        self.sink.reply(reply);
    }

    pub fn into_parts(self) -> (A, ResultSink) {
        (self.request, self.sink)
    }
}

impl<A> Deferred for PendingOperation<A>
where
    A: Send + Sync + 'static,
{
    fn reject(self, error: BridgeError) {
        self.sink.error(error);
    }
}

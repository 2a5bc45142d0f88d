use std::sync::Arc;

use async_trait::async_trait;
use permissions_broker::{
    GateEvent, GrantState, OperationRunner, PendingOperation, PermissionGate, PermissionMap,
    PermissionPrompter, RequestId, RequestIds, Resolution, SurfaceBinding,
};
use smsbridge_core_types::{
    BridgeError, MethodCall, PermissionRight, PermissionStatus, Reply, ResultSink,
};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::lifecycle::{Attachment, Lifecycle, SurfaceDetach};

/// One device capability: which actions it answers, the rights it needs and the read or write
/// it performs once they are granted.
#[async_trait]
pub trait Capability: Send + Sync + 'static {
    /// Parsed arguments, parked with the reply slot while a prompt is outstanding.
    type Request: Send + Sync + 'static;

    const NAME: &'static str;
    const RIGHTS: &'static [PermissionRight];
    const DENIED_MESSAGE: &'static str = "permission denied";

    fn handles(&self, action: &str) -> bool;

    /// Validate arguments. Runs before any permission check.
    fn parse(&self, call: &MethodCall) -> Result<Self::Request, BridgeError>;

    async fn execute(&self, request: Self::Request) -> Reply;
}

/// Method-call surface shared by every provider.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;
    fn handles(&self, action: &str) -> bool;
    fn attachment(&self) -> Attachment;

    /// Answer `call` through `sink`, now or after a permission prompt resolves.
    async fn on_method_call(&self, call: MethodCall, sink: ResultSink);

    async fn on_permission_result(
        &self,
        request_id: RequestId,
        grants: &[PermissionStatus],
    ) -> Resolution;

    fn attach_host(&self);
    fn attach_surface(&self, prompter: Arc<dyn PermissionPrompter>) -> Result<(), BridgeError>;
    fn detach_surface(&self, reason: SurfaceDetach);
    fn detach_host(&self);

    fn set_permission_map(&self, map: PermissionMap);
    fn subscribe(&self) -> broadcast::Receiver<GateEvent>;
}

/// Request/response provider for a single capability.
pub struct Facade<C: Capability> {
    capability: C,
    gate: PermissionGate<PendingOperation<C::Request>>,
    lifecycle: Lifecycle,
}

impl<C: Capability> Facade<C> {
    pub fn new(capability: C, grants: Arc<dyn GrantState>, ids: Arc<RequestIds>) -> Self {
        Self {
            capability,
            gate: PermissionGate::new(C::NAME, C::DENIED_MESSAGE, grants, ids),
            lifecycle: Lifecycle::new(C::NAME),
        }
    }

    pub fn capability(&self) -> &C {
        &self.capability
    }

    pub fn gate(&self) -> &PermissionGate<PendingOperation<C::Request>> {
        &self.gate
    }

    fn bindings(&self) -> [&dyn SurfaceBinding; 1] {
        [&self.gate]
    }
}

#[async_trait]
impl<C: Capability> OperationRunner<PendingOperation<C::Request>> for Facade<C> {
    async fn run(&self, pending: PendingOperation<C::Request>) {
        let action = pending.action().to_string();
        let (request, sink) = pending.into_parts();
        let reply = self.capability.execute(request).await;
        if let Err(err) = &reply {
            warn!(
                target = "providers",
                provider = C::NAME,
                %action,
                code = err.code(),
                "operation failed: {err}"
            );
        }
        sink.reply(reply);
    }
}

#[async_trait]
impl<C: Capability> Provider for Facade<C> {
    fn name(&self) -> &'static str {
        C::NAME
    }

    fn handles(&self, action: &str) -> bool {
        self.capability.handles(action)
    }

    fn attachment(&self) -> Attachment {
        self.lifecycle.state()
    }

    async fn on_method_call(&self, call: MethodCall, sink: ResultSink) {
        if !self.capability.handles(&call.method) {
            sink.not_implemented(&call.method);
            return;
        }
        let request = match self.capability.parse(&call) {
            Ok(request) => request,
            Err(err) => {
                debug!(
                    target = "providers",
                    provider = C::NAME,
                    action = %call.method,
                    "rejected arguments: {err}"
                );
                sink.error(err);
                return;
            }
        };
        if !self.lifecycle.state().is_hosted() {
            sink.error(BridgeError::Detached);
            return;
        }

        let pending = PendingOperation::new(call.method, request, sink);
        self.gate.request(C::RIGHTS, pending, self).await;
    }

    async fn on_permission_result(
        &self,
        request_id: RequestId,
        grants: &[PermissionStatus],
    ) -> Resolution {
        self.gate.resolve(request_id, grants, self).await
    }

    fn attach_host(&self) {
        self.lifecycle.attach_host();
    }

    fn attach_surface(&self, prompter: Arc<dyn PermissionPrompter>) -> Result<(), BridgeError> {
        self.lifecycle
            .attach_surface(prompter, &self.bindings())
            .map(|_| ())
    }

    fn detach_surface(&self, reason: SurfaceDetach) {
        self.lifecycle.detach_surface(reason, &self.bindings());
    }

    fn detach_host(&self) {
        self.lifecycle.detach_host(&self.bindings());
    }

    fn set_permission_map(&self, map: PermissionMap) {
        self.gate.set_permission_map(map);
    }

    fn subscribe(&self) -> broadcast::Receiver<GateEvent> {
        self.gate.subscribe()
    }
}

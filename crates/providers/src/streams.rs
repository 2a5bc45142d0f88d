use std::sync::Arc;

use permissions_broker::{
    GateEvent, PermissionMap, PermissionPrompter, RequestId, RequestIds, Resolution,
    SurfaceBinding,
};
use smsbridge_core_types::{BridgeError, PermissionRight, PermissionStatus};
use smsbridge_event_bus::{
    EventSink, EventStreamBridge, InboundSms, InboundSmsAssembler, SmsStatusAssembler,
    SmsStatusNotification, StreamState,
};
use tokio::sync::broadcast;

use crate::device::Device;
use crate::lifecycle::{Attachment, Lifecycle, SurfaceDetach};

pub const INBOUND_CHANNEL: &str = "plugins.babariviere.com/recvSMS";
pub const STATUS_CHANNEL: &str = "plugins.babariviere.com/statusSMS";

/// An event stream with the same attachment lifecycle as the request/response providers.
pub struct StreamProvider<N: 'static> {
    bridge: EventStreamBridge<N>,
    lifecycle: Lifecycle,
}

impl<N: Send + 'static> StreamProvider<N> {
    pub fn new(bridge: EventStreamBridge<N>) -> Self {
        let lifecycle = Lifecycle::new(bridge.name());
        Self { bridge, lifecycle }
    }

    pub fn name(&self) -> &'static str {
        self.bridge.name()
    }

    pub fn state(&self) -> StreamState {
        self.bridge.state()
    }

    pub fn attachment(&self) -> Attachment {
        self.lifecycle.state()
    }

    pub async fn on_listen(&self, sink: Arc<dyn EventSink>) -> Result<(), BridgeError> {
        if !self.lifecycle.state().is_hosted() {
            sink.error(&BridgeError::Detached);
            sink.end_of_stream();
            return Err(BridgeError::Detached);
        }
        self.bridge.on_open(sink).await
    }

    pub fn on_cancel(&self) -> bool {
        self.bridge.on_cancel()
    }

    pub async fn on_permission_result(
        &self,
        request_id: RequestId,
        grants: &[PermissionStatus],
    ) -> Resolution {
        self.bridge.on_permission_result(request_id, grants).await
    }

    pub fn attach_host(&self) {
        self.lifecycle.attach_host();
    }

    pub fn attach_surface(
        &self,
        prompter: Arc<dyn PermissionPrompter>,
    ) -> Result<(), BridgeError> {
        self.lifecycle
            .attach_surface(prompter, &self.bindings())
            .map(|_| ())
    }

    pub fn detach_surface(&self, reason: SurfaceDetach) {
        self.lifecycle.detach_surface(reason, &self.bindings());
    }

    /// Also closes an open subscription; the source must not keep a listener for a host
    /// that is gone.
    pub fn detach_host(&self) {
        if self.lifecycle.detach_host(&self.bindings()) {
            self.bridge.on_cancel();
        }
    }

    pub fn set_permission_map(&self, map: PermissionMap) {
        self.bridge.gate().set_permission_map(map);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GateEvent> {
        self.bridge.gate().subscribe()
    }

    fn bindings(&self) -> [&dyn SurfaceBinding; 1] {
        [self.bridge.gate()]
    }
}

/// Received messages: `{address, date, date_sent, read, thread_id, body}`.
pub fn inbound_stream(device: &Device, ids: Arc<RequestIds>) -> StreamProvider<InboundSms> {
    StreamProvider::new(EventStreamBridge::new(
        INBOUND_CHANNEL,
        vec![PermissionRight::ReceiveSms, PermissionRight::ReadSms],
        Arc::clone(&device.inbound),
        Arc::new(InboundSmsAssembler::new(
            Arc::clone(&device.threads),
            Arc::clone(&device.clock),
        )),
        Arc::clone(&device.grants),
        ids,
    ))
}

/// Send and delivery reports: `{sentId, state}`.
pub fn status_stream(
    device: &Device,
    ids: Arc<RequestIds>,
) -> StreamProvider<SmsStatusNotification> {
    StreamProvider::new(EventStreamBridge::new(
        STATUS_CHANNEL,
        vec![PermissionRight::ReceiveSms],
        Arc::clone(&device.status),
        Arc::new(SmsStatusAssembler),
        Arc::clone(&device.grants),
        ids,
    ))
}

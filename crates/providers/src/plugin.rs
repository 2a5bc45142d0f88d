use std::sync::Arc;

use permissions_broker::{
    GateEvent, PermissionMap, PermissionPrompter, RequestId, RequestIds, Resolution,
};
use smsbridge_core_types::{BridgeError, MethodCall, PermissionStatus, ResultSink};
use smsbridge_event_bus::{EventSink, InboundSms, SmsStatusNotification};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::capabilities::{ContactPhoto, Contacts, Messages, Sender, SimCards, UserProfile};
use crate::device::Device;
use crate::facade::{Capability, Facade, Provider};
use crate::lifecycle::SurfaceDetach;
use crate::streams::{
    inbound_stream, status_stream, StreamProvider, INBOUND_CHANNEL, STATUS_CHANNEL,
};

/// Method channel for queries.
pub const QUERY_CHANNEL: &str = "sms";
pub const SEND_CHANNEL: &str = "plugins.babariviere.com/sendSMS";

/// Every provider and stream behind one host registration.
///
/// All gates draw request ids from one allocator, so a permission result can be offered to
/// each of them in turn until one claims it.
pub struct SmsPlugin {
    ids: Arc<RequestIds>,
    queries: Vec<Arc<dyn Provider>>,
    sender: Arc<dyn Provider>,
    inbound: StreamProvider<InboundSms>,
    status: StreamProvider<SmsStatusNotification>,
}

fn facade<C: Capability>(
    capability: C,
    device: &Device,
    ids: &Arc<RequestIds>,
) -> Arc<dyn Provider> {
    Arc::new(Facade::new(
        capability,
        Arc::clone(&device.grants),
        Arc::clone(ids),
    ))
}

impl SmsPlugin {
    pub fn new(device: &Device) -> Self {
        Self::with_ids(device, Arc::new(RequestIds::default()))
    }

    pub fn with_ids(device: &Device, ids: Arc<RequestIds>) -> Self {
        let queries = vec![
            facade(Messages::new(Arc::clone(&device.resolver)), device, &ids),
            facade(Contacts::new(Arc::clone(&device.resolver)), device, &ids),
            facade(ContactPhoto::new(Arc::clone(&device.resolver)), device, &ids),
            facade(SimCards::new(Arc::clone(&device.sims)), device, &ids),
            facade(UserProfile::new(Arc::clone(&device.resolver)), device, &ids),
        ];
        let sender = facade(Sender::new(Arc::clone(&device.transport)), device, &ids);

        Self {
            inbound: inbound_stream(device, Arc::clone(&ids)),
            status: status_stream(device, Arc::clone(&ids)),
            ids,
            queries,
            sender,
        }
    }

    pub fn request_ids(&self) -> &Arc<RequestIds> {
        &self.ids
    }

    /// Request/response providers in routing order.
    pub fn providers(&self) -> impl Iterator<Item = &Arc<dyn Provider>> {
        self.queries.iter().chain(std::iter::once(&self.sender))
    }

    pub fn inbound(&self) -> &StreamProvider<InboundSms> {
        &self.inbound
    }

    pub fn status(&self) -> &StreamProvider<SmsStatusNotification> {
        &self.status
    }

    pub async fn on_method_call(&self, channel: &str, call: MethodCall, sink: ResultSink) {
        let routes = match channel {
            QUERY_CHANNEL => self.queries.as_slice(),
            SEND_CHANNEL => std::slice::from_ref(&self.sender),
            _ => {
                warn!(target = "providers", channel, "call on unknown channel");
                sink.error(BridgeError::NotImplemented(format!("channel '{channel}'")));
                return;
            }
        };
        match routes.iter().find(|provider| provider.handles(&call.method)) {
            Some(provider) => {
                debug!(
                    target = "providers",
                    provider = provider.name(),
                    action = %call.method,
                    "routing call"
                );
                provider.on_method_call(call, sink).await;
            }
            None => sink.not_implemented(&call.method),
        }
    }

    /// Open the event stream registered under `channel`.
    pub async fn listen(
        &self,
        channel: &str,
        sink: Arc<dyn EventSink>,
    ) -> Result<(), BridgeError> {
        match channel {
            INBOUND_CHANNEL => self.inbound.on_listen(sink).await,
            STATUS_CHANNEL => self.status.on_listen(sink).await,
            _ => {
                let err = BridgeError::NotImplemented(format!("stream '{channel}'"));
                sink.error(&err);
                sink.end_of_stream();
                Err(err)
            }
        }
    }

    pub fn cancel(&self, channel: &str) -> bool {
        match channel {
            INBOUND_CHANNEL => self.inbound.on_cancel(),
            STATUS_CHANNEL => self.status.on_cancel(),
            _ => false,
        }
    }

    /// Offer a permission result to every gate; the first one holding `request_id` consumes it.
    pub async fn on_permission_result(
        &self,
        request_id: RequestId,
        grants: &[PermissionStatus],
    ) -> Resolution {
        for provider in self.providers() {
            if provider
                .on_permission_result(request_id, grants)
                .await
                .is_handled()
            {
                return Resolution::Handled;
            }
        }
        if self
            .inbound
            .on_permission_result(request_id, grants)
            .await
            .is_handled()
        {
            return Resolution::Handled;
        }
        let resolution = self.status.on_permission_result(request_id, grants).await;
        if !resolution.is_handled() {
            debug!(target = "providers", %request_id, "permission result not for this plugin");
        }
        resolution
    }

    pub fn attach_host(&self) {
        for provider in self.providers() {
            provider.attach_host();
        }
        self.inbound.attach_host();
        self.status.attach_host();
    }

    pub fn attach_surface(
        &self,
        prompter: Arc<dyn PermissionPrompter>,
    ) -> Result<(), BridgeError> {
        for provider in self.providers() {
            provider.attach_surface(Arc::clone(&prompter))?;
        }
        self.inbound.attach_surface(Arc::clone(&prompter))?;
        self.status.attach_surface(prompter)
    }

    pub fn detach_surface(&self, reason: SurfaceDetach) {
        for provider in self.providers() {
            provider.detach_surface(reason);
        }
        self.inbound.detach_surface(reason);
        self.status.detach_surface(reason);
    }

    pub fn detach_host(&self) {
        for provider in self.providers() {
            provider.detach_host();
        }
        self.inbound.detach_host();
        self.status.detach_host();
    }

    pub fn set_permission_map(&self, map: &PermissionMap) {
        for provider in self.providers() {
            provider.set_permission_map(map.clone());
        }
        self.inbound.set_permission_map(map.clone());
        self.status.set_permission_map(map.clone());
    }

    /// One audit receiver per gate.
    pub fn subscribe(&self) -> Vec<broadcast::Receiver<GateEvent>> {
        self.providers()
            .map(|provider| provider.subscribe())
            .chain([self.inbound.subscribe(), self.status.subscribe()])
            .collect()
    }
}

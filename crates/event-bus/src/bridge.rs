use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use permissions_broker::{
    Deferred, GrantState, OperationRunner, PermissionGate, RequestId, RequestIds, Resolution,
};
use smsbridge_core_types::{BridgeError, PermissionRight, PermissionStatus};
use tracing::{debug, info, warn};

use crate::sink::EventSink;
use crate::{EventAssembler, NotificationListener, NotificationSource, RegistrationId};

/// Observable subscription state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Listening,
}

/// Parked permission request for one subscription generation. Resolving an activation that
/// belongs to an earlier generation (cancelled or reopened since) does nothing.
pub struct StreamActivation {
    stream: Weak<dyn StreamControl>,
    generation: u64,
}

impl Deferred for StreamActivation {
    fn reject(self, error: BridgeError) {
        if let Some(stream) = self.stream.upgrade() {
            stream.deny(self.generation, error);
        }
    }
}

trait StreamControl: Send + Sync {
    fn deny(&self, generation: u64, error: BridgeError);
    fn granted(&self, generation: u64);
}

struct Relay<N> {
    stream: &'static str,
    sink: Arc<dyn EventSink>,
    assembler: Arc<dyn EventAssembler<N>>,
    active: AtomicBool,
}

impl<N> Relay<N> {
    fn activate(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

impl<N: Send + 'static> NotificationListener<N> for Relay<N> {
    fn on_notification(&self, notification: N) {
        if !self.active.load(Ordering::SeqCst) {
            return;
        }
        match self.assembler.assemble(notification) {
            Ok(event) => self.sink.success(event),
            Err(err) => warn!(
                target = "event-bus",
                stream = self.stream,
                "dropping malformed notification: {err}"
            ),
        }
    }
}

enum Subscription<N> {
    Idle,
    Listening {
        generation: u64,
        registration: RegistrationId,
        relay: Arc<Relay<N>>,
    },
}

struct StreamInner<N> {
    name: &'static str,
    rights: Vec<PermissionRight>,
    source: Arc<dyn NotificationSource<N>>,
    assembler: Arc<dyn EventAssembler<N>>,
    gate: PermissionGate<StreamActivation>,
    state: Mutex<Subscription<N>>,
    generation: AtomicU64,
}

impl<N: Send + 'static> StreamInner<N> {
    /// Take the live subscription out, if any, leaving the state idle.
    fn take_subscription(&self) -> Option<(RegistrationId, Arc<Relay<N>>)> {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, Subscription::Idle) {
            Subscription::Idle => None,
            Subscription::Listening {
                registration,
                relay,
                ..
            } => Some((registration, relay)),
        }
    }

    fn release(&self, registration: RegistrationId, relay: &Relay<N>) {
        relay.deactivate();
        if !self.source.unregister(registration) {
            debug!(
                target = "event-bus",
                stream = self.name,
                "source had already dropped the registration"
            );
        }
    }
}

impl<N: Send + 'static> StreamControl for StreamInner<N> {
    fn deny(&self, generation: u64, error: BridgeError) {
        let taken = {
            let mut state = self.state.lock();
            match &*state {
                Subscription::Listening {
                    generation: current,
                    ..
                } if *current == generation => {
                    match std::mem::replace(&mut *state, Subscription::Idle) {
                        Subscription::Listening {
                            registration,
                            relay,
                            ..
                        } => Some((registration, relay)),
                        Subscription::Idle => None,
                    }
                }
                _ => None,
            }
        };
        let Some((registration, relay)) = taken else {
            return;
        };
        warn!(
            target = "event-bus",
            stream = self.name,
            "closing stream: {error}"
        );
        self.release(registration, &relay);
        relay.sink.end_of_stream();
    }

    /// Notifications flow only once the rights of the live generation are granted.
    fn granted(&self, generation: u64) {
        let state = self.state.lock();
        match &*state {
            Subscription::Listening {
                generation: current,
                relay,
                ..
            } if *current == generation => {
                relay.activate();
                debug!(
                    target = "event-bus",
                    stream = self.name,
                    generation,
                    "stream rights granted; forwarding notifications"
                );
            }
            _ => debug!(
                target = "event-bus",
                stream = self.name,
                generation,
                "grant for a stale subscription ignored"
            ),
        }
    }
}

#[async_trait]
impl<N: Send + 'static> OperationRunner<StreamActivation> for StreamInner<N> {
    async fn run(&self, activation: StreamActivation) {
        if let Some(stream) = activation.stream.upgrade() {
            stream.granted(activation.generation);
        }
    }
}

impl<N> Drop for StreamInner<N> {
    fn drop(&mut self) {
        if let Subscription::Listening {
            registration,
            relay,
            ..
        } = std::mem::replace(self.state.get_mut(), Subscription::Idle)
        {
            relay.deactivate();
            self.source.unregister(registration);
        }
    }
}

/// One subscription slot over a notification source: `Idle → Listening → Idle`.
pub struct EventStreamBridge<N: 'static> {
    inner: Arc<StreamInner<N>>,
}

impl<N: Send + 'static> EventStreamBridge<N> {
    pub fn new(
        name: &'static str,
        rights: Vec<PermissionRight>,
        source: Arc<dyn NotificationSource<N>>,
        assembler: Arc<dyn EventAssembler<N>>,
        grants: Arc<dyn GrantState>,
        ids: Arc<RequestIds>,
    ) -> Self {
        let gate = PermissionGate::new(name, "permission denied", grants, ids);
        Self {
            inner: Arc::new(StreamInner {
                name,
                rights,
                source,
                assembler,
                gate,
                state: Mutex::new(Subscription::Idle),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn gate(&self) -> &PermissionGate<StreamActivation> {
        &self.inner.gate
    }

    pub fn state(&self) -> StreamState {
        match &*self.inner.state.lock() {
            Subscription::Idle => StreamState::Idle,
            Subscription::Listening { .. } => StreamState::Listening,
        }
    }

    /// Start listening and request the stream's rights. An already open subscription is
    /// cancelled first. Registration failure reports the error on `sink` and ends it.
    pub async fn on_open(&self, sink: Arc<dyn EventSink>) -> Result<(), BridgeError> {
        if self.on_cancel() {
            info!(
                target = "event-bus",
                stream = self.inner.name,
                "replacing open subscription"
            );
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let relay = Arc::new(Relay {
            stream: self.inner.name,
            sink: Arc::clone(&sink),
            assembler: Arc::clone(&self.inner.assembler),
            active: AtomicBool::new(false),
        });
        let registration = match self.inner.source.register(relay.clone()) {
            Ok(id) => id,
            Err(err) => {
                warn!(
                    target = "event-bus",
                    stream = self.inner.name,
                    "registration failed: {err}"
                );
                sink.error(&err);
                sink.end_of_stream();
                return Err(err);
            }
        };
        *self.inner.state.lock() = Subscription::Listening {
            generation,
            registration,
            relay,
        };
        debug!(
            target = "event-bus",
            stream = self.inner.name,
            generation,
            "listening"
        );

        let control: Arc<dyn StreamControl> = self.inner.clone();
        let activation = StreamActivation {
            stream: Arc::downgrade(&control),
            generation,
        };
        self.inner
            .gate
            .request(&self.inner.rights, activation, &*self.inner)
            .await;
        Ok(())
    }

    /// Stop listening. Safe to call when nothing is registered; returns whether a
    /// subscription was open.
    pub fn on_cancel(&self) -> bool {
        match self.inner.take_subscription() {
            Some((registration, relay)) => {
                self.inner.release(registration, &relay);
                debug!(target = "event-bus", stream = self.inner.name, "cancelled");
                true
            }
            None => false,
        }
    }

    pub async fn on_permission_result(
        &self,
        request_id: RequestId,
        grants: &[PermissionStatus],
    ) -> Resolution {
        self.inner
            .gate
            .resolve(request_id, grants, &*self.inner)
            .await
    }
}

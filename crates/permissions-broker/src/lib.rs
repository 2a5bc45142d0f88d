//! Permission gate for the SMS bridge providers.
//!
//! A provider hands every recognised request to its gate. When the rights are already held the
//! operation runs before [`PermissionGate::request`] returns; otherwise the gate parks it under a
//! fresh [`RequestId`], prompts through the attached surface, and resumes or fails it when the
//! matching result arrives through [`PermissionGate::resolve`].

pub mod config;
mod pending;

pub use crate::config::{ConfigError, PermissionMap};
pub use crate::pending::{Deferred, PendingOperation};

use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use smsbridge_core_types::{BridgeError, PermissionRight, PermissionStatus};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// First id handed out by [`RequestIds::default`].
pub const DEFAULT_REQUEST_ID_BASE: i32 = 1;

/// Identifier tagging one outstanding permission prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub i32);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic request id source. Gates that receive results from the same host channel must
/// share one allocator so their ids never collide.
#[derive(Debug)]
pub struct RequestIds {
    next: AtomicI32,
}

impl RequestIds {
    pub fn starting_at(base: i32) -> Arc<Self> {
        Arc::new(Self {
            next: AtomicI32::new(base),
        })
    }

    pub fn next(&self) -> RequestId {
        RequestId(self.next.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for RequestIds {
    fn default() -> Self {
        Self {
            next: AtomicI32::new(DEFAULT_REQUEST_ID_BASE),
        }
    }
}

/// Prompt issued to the interactive surface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRequest {
    pub request_id: RequestId,
    pub rights: Vec<PermissionRight>,
    /// Platform permission names, translated through the gate's permission map.
    pub permissions: Vec<String>,
}

/// Current grant state as reported by the platform.
pub trait GrantState: Send + Sync {
    fn is_granted(&self, right: PermissionRight) -> bool;
}

/// Interactive surface able to show a permission prompt. The outcome arrives later through
/// [`PermissionGate::resolve`], never from inside `prompt`.
#[async_trait]
pub trait PermissionPrompter: Send + Sync {
    async fn prompt(&self, request: PromptRequest) -> Result<(), BridgeError>;
}

/// Executes a parked operation once its rights are granted.
#[async_trait]
pub trait OperationRunner<P: Send + 'static>: Send + Sync {
    async fn run(&self, pending: P);
}

/// What [`PermissionGate::request`] did with the operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Rights were held; the operation already ran.
    Immediate,
    /// A prompt is outstanding under this id.
    Deferred(RequestId),
    /// The prompt could not be issued; the operation was failed.
    Rejected,
}

/// Whether a permission result belonged to this gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    Handled,
    NotMine,
}

impl Resolution {
    pub fn is_handled(self) -> bool {
        matches!(self, Resolution::Handled)
    }
}

/// Decision categories published on the audit channel.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum GateOutcome {
    Immediate,
    Prompted,
    Granted,
    Denied,
    Rejected,
    Dropped,
}

/// Event emitted whenever the gate takes a decision.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GateEvent {
    pub capability: String,
    pub request_id: Option<RequestId>,
    pub rights: Vec<PermissionRight>,
    pub outcome: GateOutcome,
    pub timestamp: SystemTime,
}

/// Lets lifecycle code drive a gate without knowing what it parks.
pub trait SurfaceBinding: Send + Sync {
    fn bind_prompter(&self, prompter: Option<Arc<dyn PermissionPrompter>>);
    /// Drop every outstanding operation; later results for their ids are "not mine".
    fn drop_pending(&self) -> usize;
}

struct PermissionRequest<P> {
    rights: Vec<PermissionRight>,
    pending: P,
}

/// Per-capability permission gate.
pub struct PermissionGate<P> {
    capability: String,
    denied_message: String,
    grants: Arc<dyn GrantState>,
    ids: Arc<RequestIds>,
    permission_map: RwLock<PermissionMap>,
    prompter: RwLock<Option<Arc<dyn PermissionPrompter>>>,
    pending: DashMap<RequestId, PermissionRequest<P>>,
    events: broadcast::Sender<GateEvent>,
}

impl<P: Deferred> PermissionGate<P> {
    pub fn new(
        capability: impl Into<String>,
        denied_message: impl Into<String>,
        grants: Arc<dyn GrantState>,
        ids: Arc<RequestIds>,
    ) -> Self {
        let (tx, _rx) = broadcast::channel(128);
        Self {
            capability: capability.into(),
            denied_message: denied_message.into(),
            grants,
            ids,
            permission_map: RwLock::new(config::default_permission_map()),
            prompter: RwLock::new(None),
            pending: DashMap::new(),
            events: tx,
        }
    }

    pub fn capability(&self) -> &str {
        &self.capability
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GateEvent> {
        self.events.subscribe()
    }

    pub fn set_permission_map(&self, map: PermissionMap) {
        *self.permission_map.write() = map;
    }

    pub fn has_prompter(&self) -> bool {
        self.prompter.read().is_some()
    }

    /// True iff every right is currently granted.
    pub fn has_all(&self, rights: &[PermissionRight]) -> bool {
        rights.iter().all(|right| self.grants.is_granted(*right))
    }

    pub fn outstanding(&self) -> usize {
        self.pending.len()
    }

    pub fn is_outstanding(&self, id: RequestId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Run `pending` now if `rights` are held, otherwise park it and issue exactly one prompt.
    pub async fn request(
        &self,
        rights: &[PermissionRight],
        pending: P,
        runner: &dyn OperationRunner<P>,
    ) -> Admission {
        if self.has_all(rights) {
            debug!(
                target = "permissions-broker",
                capability = %self.capability,
                "rights already granted; running immediately"
            );
            self.publish(None, rights, GateOutcome::Immediate);
            runner.run(pending).await;
            return Admission::Immediate;
        }

        let prompter = self.prompter.read().clone();
        let Some(prompter) = prompter else {
            warn!(
                target = "permissions-broker",
                capability = %self.capability,
                "prompt needed but no surface is attached"
            );
            self.publish(None, rights, GateOutcome::Rejected);
            pending.reject(BridgeError::NoSurface);
            return Admission::Rejected;
        };

        let permissions = match self.translate(rights) {
            Ok(names) => names,
            Err(err) => {
                self.publish(None, rights, GateOutcome::Rejected);
                pending.reject(err);
                return Admission::Rejected;
            }
        };

        let request_id = self.ids.next();
        match self.pending.entry(request_id) {
            Entry::Occupied(_) => {
                warn!(
                    target = "permissions-broker",
                    capability = %self.capability,
                    %request_id,
                    "request id already outstanding"
                );
                pending.reject(BridgeError::Internal(format!(
                    "permission request {request_id} is already outstanding"
                )));
                return Admission::Rejected;
            }
            Entry::Vacant(slot) => {
                slot.insert(PermissionRequest {
                    rights: rights.to_vec(),
                    pending,
                });
            }
        }

        let prompt = PromptRequest {
            request_id,
            rights: rights.to_vec(),
            permissions,
        };
        if let Err(err) = prompter.prompt(prompt).await {
            warn!(
                target = "permissions-broker",
                capability = %self.capability,
                %request_id,
                "failed to issue prompt: {err}"
            );
            if let Some((_, parked)) = self.pending.remove(&request_id) {
                self.publish(Some(request_id), rights, GateOutcome::Rejected);
                parked.pending.reject(err);
            }
            return Admission::Rejected;
        }

        debug!(
            target = "permissions-broker",
            capability = %self.capability,
            %request_id,
            "prompt issued"
        );
        self.publish(Some(request_id), rights, GateOutcome::Prompted);
        Admission::Deferred(request_id)
    }

    /// Consume the result for `request_id`. Ids this gate does not hold (another subsystem's,
    /// already resolved, or dropped on teardown) are ignored.
    pub async fn resolve(
        &self,
        request_id: RequestId,
        grants: &[PermissionStatus],
        runner: &dyn OperationRunner<P>,
    ) -> Resolution {
        let Some((_, parked)) = self.pending.remove(&request_id) else {
            return Resolution::NotMine;
        };

        if grants.iter().all(|status| status.is_granted()) {
            debug!(
                target = "permissions-broker",
                capability = %self.capability,
                %request_id,
                "permission granted"
            );
            self.publish(Some(request_id), &parked.rights, GateOutcome::Granted);
            runner.run(parked.pending).await;
        } else {
            warn!(
                target = "permissions-broker",
                capability = %self.capability,
                %request_id,
                "permission denied"
            );
            self.publish(Some(request_id), &parked.rights, GateOutcome::Denied);
            parked
                .pending
                .reject(BridgeError::PermissionDenied(self.denied_message.clone()));
        }
        Resolution::Handled
    }

    fn translate(&self, rights: &[PermissionRight]) -> Result<Vec<String>, BridgeError> {
        let map = self.permission_map.read();
        let mut translated = Vec::with_capacity(rights.len());
        for right in rights {
            let name = map.get(right.as_str()).cloned().ok_or_else(|| {
                BridgeError::Internal(format!("permission '{right}' missing in permission map"))
            })?;
            if !translated.contains(&name) {
                translated.push(name);
            }
        }
        Ok(translated)
    }

    fn publish(
        &self,
        request_id: Option<RequestId>,
        rights: &[PermissionRight],
        outcome: GateOutcome,
    ) {
        let event = GateEvent {
            capability: self.capability.clone(),
            request_id,
            rights: rights.to_vec(),
            outcome,
            timestamp: SystemTime::now(),
        };
        // No subscribers is the common case.
        let _ = self.events.send(event);
    }
}

impl<P: Deferred> SurfaceBinding for PermissionGate<P> {
    fn bind_prompter(&self, prompter: Option<Arc<dyn PermissionPrompter>>) {
        *self.prompter.write() = prompter;
    }

    fn drop_pending(&self) -> usize {
        let ids: Vec<RequestId> = self.pending.iter().map(|entry| *entry.key()).collect();
        let mut dropped = 0;
        for id in ids {
            if let Some((_, parked)) = self.pending.remove(&id) {
                self.publish(Some(id), &parked.rights, GateOutcome::Dropped);
                drop(parked);
                dropped += 1;
            }
        }
        if dropped > 0 {
            info!(
                target = "permissions-broker",
                capability = %self.capability,
                dropped,
                "dropped outstanding operations"
            );
        }
        dropped
    }
}

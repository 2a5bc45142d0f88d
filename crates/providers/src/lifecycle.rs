//! Host and surface attachment.
//!
//! A provider is first attached to a host (the application engine) and then, independently, to
//! an interactive surface able to show permission prompts. The surface can go away and come
//! back while the host attachment persists; a configuration change keeps outstanding
//! operations parked, a final detach drops them.

use std::sync::Arc;

use parking_lot::Mutex;
use permissions_broker::{PermissionPrompter, SurfaceBinding};
use serde::Serialize;
use smsbridge_core_types::BridgeError;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Attachment {
    Detached,
    Hosted,
    Surfaced,
}

impl Attachment {
    pub fn is_hosted(self) -> bool {
        !matches!(self, Attachment::Detached)
    }
}

/// Why the surface went away.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceDetach {
    /// Surface is being recreated; parked operations survive.
    ConfigChange,
    Final,
}

/// Attachment state for one provider. Every transition is idempotent and returns whether the
/// state actually changed.
pub struct Lifecycle {
    owner: &'static str,
    state: Mutex<Attachment>,
}

impl Lifecycle {
    pub fn new(owner: &'static str) -> Self {
        Self {
            owner,
            state: Mutex::new(Attachment::Detached),
        }
    }

    pub fn state(&self) -> Attachment {
        *self.state.lock()
    }

    pub fn attach_host(&self) -> bool {
        let mut state = self.state.lock();
        if state.is_hosted() {
            return false;
        }
        *state = Attachment::Hosted;
        debug!(target = "providers", provider = self.owner, "attached to host");
        true
    }

    /// Install `prompter` on every binding. Reattaching an already surfaced provider swaps in
    /// the new prompter.
    pub fn attach_surface(
        &self,
        prompter: Arc<dyn PermissionPrompter>,
        bindings: &[&dyn SurfaceBinding],
    ) -> Result<bool, BridgeError> {
        let mut state = self.state.lock();
        if !state.is_hosted() {
            return Err(BridgeError::Detached);
        }
        for binding in bindings {
            binding.bind_prompter(Some(Arc::clone(&prompter)));
        }
        let changed = *state != Attachment::Surfaced;
        *state = Attachment::Surfaced;
        debug!(target = "providers", provider = self.owner, "surface attached");
        Ok(changed)
    }

    pub fn detach_surface(&self, reason: SurfaceDetach, bindings: &[&dyn SurfaceBinding]) -> bool {
        let mut state = self.state.lock();
        if *state != Attachment::Surfaced {
            return false;
        }
        *state = Attachment::Hosted;
        drop(state);

        for binding in bindings {
            binding.bind_prompter(None);
        }
        if reason == SurfaceDetach::Final {
            self.drop_pending(bindings);
        }
        debug!(target = "providers", provider = self.owner, ?reason, "surface detached");
        true
    }

    pub fn detach_host(&self, bindings: &[&dyn SurfaceBinding]) -> bool {
        let mut state = self.state.lock();
        if *state == Attachment::Detached {
            return false;
        }
        *state = Attachment::Detached;
        drop(state);

        for binding in bindings {
            binding.bind_prompter(None);
        }
        self.drop_pending(bindings);
        debug!(target = "providers", provider = self.owner, "detached from host");
        true
    }

    fn drop_pending(&self, bindings: &[&dyn SurfaceBinding]) {
        let dropped: usize = bindings.iter().map(|binding| binding.drop_pending()).sum();
        if dropped > 0 {
            info!(
                target = "providers",
                provider = self.owner,
                dropped,
                "abandoned operations waiting on a prompt"
            );
        }
    }
}

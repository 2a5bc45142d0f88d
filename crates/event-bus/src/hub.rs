use std::sync::Arc;

use dashmap::DashMap;
use smsbridge_core_types::BridgeError;

use crate::{NotificationListener, NotificationSource, RegistrationId};

/// In-memory notification source; `emit` fans a notification out to every registered listener.
pub struct NotificationHub<N> {
    listeners: DashMap<RegistrationId, Arc<dyn NotificationListener<N>>>,
}

impl<N> NotificationHub<N>
where
    N: Clone + Send + 'static,
{
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            listeners: DashMap::new(),
        })
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver to every current listener and return how many were reached.
    pub fn emit(&self, notification: N) -> usize {
        // Snapshot first: a listener may unregister while handling the notification.
        let listeners: Vec<_> = self
            .listeners
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for listener in &listeners {
            listener.on_notification(notification.clone());
        }
        listeners.len()
    }
}

impl<N> NotificationSource<N> for NotificationHub<N>
where
    N: Clone + Send + 'static,
{
    fn register(
        &self,
        listener: Arc<dyn NotificationListener<N>>,
    ) -> Result<RegistrationId, BridgeError> {
        let id = RegistrationId::new();
        self.listeners.insert(id, listener);
        Ok(id)
    }

    fn unregister(&self, id: RegistrationId) -> bool {
        self.listeners.remove(&id).is_some()
    }
}

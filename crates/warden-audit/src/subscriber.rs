//! Callback subscribers.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::entry::LogEntry;

/// A synchronous log callback.
///
/// Callbacks run on the appending thread and should return quickly.
pub type LogCallback = Arc<dyn Fn(&LogEntry) + Send + Sync>;

/// Registration handle for a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Registry of synchronous log callbacks.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: RwLock<HashMap<SubscriberId, LogCallback>>,
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscriber_count", &self.len())
            .finish()
    }
}

impl SubscriberRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback.
    pub fn register(&self, callback: LogCallback) -> SubscriberId {
        let id = SubscriberId::new();
        self.subscribers
            .write()
            .unwrap_or_else(|e| {
                warn!("SubscriberRegistry lock poisoned, recovering");
                e.into_inner()
            })
            .insert(id, callback);
        debug!(subscriber_id = ?id, "Log subscriber registered");
        id
    }

    /// Unregister a callback. Returns `true` if it was registered.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let removed = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some();
        if removed {
            debug!(subscriber_id = ?id, "Log subscriber unregistered");
        }
        removed
    }

    /// Deliver `entry` to every callback.
    ///
    /// A panicking callback is logged and skipped; the others still run.
    /// Returns the number of callbacks that completed.
    pub fn notify(&self, entry: &LogEntry) -> usize {
        // Snapshot so callbacks may (un)subscribe without deadlocking.
        let callbacks: Vec<(SubscriberId, LogCallback)> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, cb)| (*id, Arc::clone(cb)))
            .collect();

        let mut delivered: usize = 0;
        for (id, callback) in callbacks {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                callback(entry);
            }));
            match result {
                Ok(()) => delivered = delivered.saturating_add(1),
                Err(e) => warn!(subscriber_id = ?id, error = ?e, "Log subscriber panicked"),
            }
        }
        delivered
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers
            .read()
            .map(|s| s.len())
            .unwrap_or_default()
    }

    /// Whether no callbacks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle returned by [`OperationLogger::subscribe`](crate::OperationLogger::subscribe).
///
/// Dropping it unsubscribes the callback.
#[derive(Debug)]
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: SubscriberId,
    registry: Weak<SubscriberRegistry>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriberId, registry: &Arc<SubscriberRegistry>) -> Self {
        Self {
            id,
            registry: Arc::downgrade(registry),
        }
    }

    /// The subscriber's ID.
    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Unsubscribe explicitly.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{LogCategory, LogLevel, LogStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn entry() -> LogEntry {
        LogEntry::new(
            LogLevel::Info,
            LogStatus::Info,
            LogCategory::System,
            "t",
            "m",
        )
    }

    #[test]
    fn test_panicking_subscriber_does_not_block_others() {
        let registry = SubscriberRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));

        registry.register(Arc::new(|_: &LogEntry| panic!("boom")));
        let h = Arc::clone(&hits);
        registry.register(Arc::new(move |_: &LogEntry| {
            h.fetch_add(1, Ordering::SeqCst);
        }));

        let delivered = registry.notify(&entry());
        assert_eq!(delivered, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscription_drop_unregisters() {
        let registry = Arc::new(SubscriberRegistry::new());
        let id = registry.register(Arc::new(|_: &LogEntry| {}));
        let sub = Subscription::new(id, &registry);
        assert_eq!(registry.len(), 1);
        sub.unsubscribe();
        assert!(registry.is_empty());
        assert!(!registry.unregister(id));
    }
}

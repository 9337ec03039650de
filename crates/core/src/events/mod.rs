//! In-process publish/subscribe keyed by event name.
//!
//! Delivery is synchronous and follows subscription order. Each handler
//! runs in isolation: a panicking subscriber is logged and skipped, and the
//! remaining subscribers still receive the event.

mod topic;

pub use topic::Topic;

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use serde_json::Value;

/// Subscriber callback. Receives the event payload (`Value::Null` when none).
pub type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Handle returned by `on`/`once`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    handlers: RwLock<HashMap<String, Vec<Subscription>>>,
    next_id: AtomicU64,
}

impl Registry {
    fn remove(&self, event: &str, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let Some(subs) = handlers.get_mut(event) else {
            return false;
        };
        let before = subs.len();
        subs.retain(|sub| sub.id != id);
        let removed = subs.len() != before;
        if subs.is_empty() {
            handlers.remove(event);
        }
        removed
    }
}

/// Cloneable event bus handle; clones share subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Registry>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.registry.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn insert(&self, event: &str, id: SubscriptionId, handler: Handler) {
        let mut handlers = self.registry.handlers.write().unwrap_or_else(PoisonError::into_inner);
        handlers
            .entry(event.to_string())
            .or_default()
            .push(Subscription { id, handler });
    }

    /// Subscribe `handler` to `event`.
    pub fn on<F>(&self, event: impl AsRef<str>, handler: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.insert(event.as_ref(), id, Arc::new(handler));
        id
    }

    /// Subscribe `handler` for a single delivery of `event`.
    ///
    /// The subscription is removed before the handler runs, so a panicking
    /// handler is still unsubscribed.
    pub fn once<F>(&self, event: impl AsRef<str>, handler: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let event = event.as_ref().to_string();
        let id = self.next_id();
        let registry: Weak<Registry> = Arc::downgrade(&self.registry);
        let fired = AtomicBool::new(false);
        let name = event.clone();

        let wrapper = move |payload: &Value| {
            if fired.swap(true, Ordering::SeqCst) {
                return;
            }
            if let Some(registry) = registry.upgrade() {
                registry.remove(&name, id);
            }
            handler(payload);
        };

        self.insert(&event, id, Arc::new(wrapper));
        id
    }

    /// Remove one subscription. Returns whether it was registered.
    pub fn off(&self, event: impl AsRef<str>, id: SubscriptionId) -> bool {
        self.registry.remove(event.as_ref(), id)
    }

    /// Remove every subscription for `event`.
    pub fn off_all(&self, event: impl AsRef<str>) {
        let mut handlers = self.registry.handlers.write().unwrap_or_else(PoisonError::into_inner);
        handlers.remove(event.as_ref());
    }

    /// Deliver `payload` to every subscriber of `event`.
    ///
    /// Handlers see a snapshot of the subscriber list, so subscribing or
    /// unsubscribing from inside a handler affects only later emits.
    /// Returns the number of handlers that completed without panicking.
    pub fn emit(&self, event: impl AsRef<str>, payload: &Value) -> usize {
        let event = event.as_ref();
        let snapshot: Vec<Handler> = {
            let handlers = self.registry.handlers.read().unwrap_or_else(PoisonError::into_inner);
            match handlers.get(event) {
                Some(subs) => subs.iter().map(|sub| Arc::clone(&sub.handler)).collect(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        for handler in snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(payload))) {
                Ok(()) => delivered += 1,
                Err(panic) => {
                    let reason = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    tracing::error!(event, reason, "event handler panicked");
                }
            }
        }
        delivered
    }

    /// Remove every subscription for every event.
    pub fn clear(&self) {
        self.registry
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of subscribers for `event`.
    pub fn count(&self, event: impl AsRef<str>) -> usize {
        self.registry
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event.as_ref())
            .map_or(0, Vec::len)
    }
}

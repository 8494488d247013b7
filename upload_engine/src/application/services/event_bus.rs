//! Event Bus (C4): typed pub/sub for `UploadTask` lifecycle events.
//!
//! Handlers are plain closures invoked synchronously, in registration
//! order, on whatever task calls `emit` — there is no queueing or replay.
//! A panicking handler is isolated with `catch_unwind` so it cannot take
//! down the emitting call site or block delivery to the next handler,
//! mirroring the "plugin exceptions are caught, logged, and swallowed"
//! rule from the manager's plugin system (C8).

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use upload_domain::value_objects::event::UploadEvent;

/// A subscribed handler. Boxed so the bus can hold a heterogeneous list
/// per topic (and one wildcard list).
type Handler = Arc<dyn Fn(&UploadEvent) + Send + Sync>;

struct Subscription {
    id: u64,
    topic: Option<String>,
    handler: Handler,
}

/// Synchronous, single-process event bus. Clone to share a handle; all
/// clones observe the same subscriber list.
#[derive(Clone, Default)]
pub struct EventBus {
    subscriptions: Arc<Mutex<Vec<Subscription>>>,
    next_id: Arc<Mutex<u64>>,
}

/// Handle returned by `on`, used to unsubscribe via `off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `handler` to `topic`. Pass `None` to subscribe to every
    /// topic (the wildcard subscription).
    pub fn on<F>(&self, topic: Option<&str>, handler: F) -> SubscriptionId
    where
        F: Fn(&UploadEvent) + Send + Sync + 'static,
    {
        let mut next_id = self.next_id.lock();
        let id = *next_id;
        *next_id += 1;
        drop(next_id);

        self.subscriptions.lock().push(Subscription {
            id,
            topic: topic.map(str::to_owned),
            handler: Arc::new(handler),
        });
        SubscriptionId(id)
    }

    /// Removes a previously registered subscription. A no-op if already
    /// removed.
    pub fn off(&self, id: SubscriptionId) {
        self.subscriptions.lock().retain(|s| s.id != id.0);
    }

    /// Delivers `event` to every matching subscriber, in registration
    /// order: topic-specific subscribers first, wildcard subscribers
    /// filling in among them in the order they were registered.
    pub fn emit(&self, event: UploadEvent) {
        let topic = event.topic();
        let subs: Vec<Handler> = self
            .subscriptions
            .lock()
            .iter()
            .filter(|s| s.topic.as_deref().is_none_or(|t| t == topic))
            .map(|s| s.handler.clone())
            .collect();

        for handler in subs {
            let event_ref = &event;
            let outcome = catch_unwind(AssertUnwindSafe(|| handler(event_ref)));
            if outcome.is_err() {
                warn!(topic, "event handler panicked; isolated and continuing");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn topic_subscribers_receive_only_their_topic() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = hits.clone();
        bus.on(Some("start"), move |_| {
            hits2.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(UploadEvent::Pause);
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        bus.emit(UploadEvent::Start);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn wildcard_subscriber_receives_every_topic() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = hits.clone();
        bus.on(None, move |_| {
            hits2.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(UploadEvent::Start);
        bus.emit(UploadEvent::Pause);
        bus.emit(UploadEvent::Cancel);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn off_removes_a_subscription() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = hits.clone();
        let id = bus.on(Some("start"), move |_| {
            hits2.fetch_add(1, Ordering::SeqCst);
        });
        bus.off(id);
        bus.emit(UploadEvent::Start);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn a_panicking_handler_does_not_stop_delivery_to_the_next() {
        let bus = EventBus::new();
        bus.on(Some("start"), |_| panic!("boom"));
        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = hits.clone();
        bus.on(Some("start"), move |_| {
            hits2.fetch_add(1, Ordering::SeqCst);
        });
        bus.emit(UploadEvent::Start);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}

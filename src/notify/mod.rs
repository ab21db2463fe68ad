//! Fan-out of notification events to subscribers.
//!
//! ```text
//! EventPump thread
//!   publish(event) -> load subscriber snapshot (no lock)
//!                       ├─> inline callback (runs on the pump thread)
//!                       └─> bounded queue ──> QueuedSubscription::recv()
//! ```
//!
//! Events reach every subscriber in the order the pump received them.
//! Subscribe and unsubscribe serialize on a writer lock and publish a new
//! snapshot; `publish` never takes that lock, so a subscriber churning its
//! registration cannot stall the pump.

mod filter;
mod queue;

pub use filter::*;
pub use queue::QueuedSubscription;

#[cfg(test)]
mod hub_test;

use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Weak;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::error;
use tracing::trace;

use crate::engine::EngineEvent;
use queue::EventQueue;

type Callback = Box<dyn Fn(&EngineEvent) + Send + Sync>;

enum Sink {
    Inline(Callback),
    Queued(Arc<EventQueue>),
}

struct Subscriber {
    id: u64,
    filter: EventKindSet,
    sink: Sink,
}

struct HubInner {
    subscribers: ArcSwap<Vec<Arc<Subscriber>>>,
    /// Serializes subscribe/unsubscribe; never taken by publish.
    writer: Mutex<()>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl HubInner {
    fn remove(
        &self,
        id: u64,
    ) {
        let _guard = self.writer.lock();
        let current = self.subscribers.load();
        if !current.iter().any(|s| s.id == id) {
            return;
        }
        let next: Vec<_> = current.iter().filter(|s| s.id != id).cloned().collect();
        self.subscribers.store(Arc::new(next));
        trace!(subscription_id = id, "subscriber removed");
    }
}

#[derive(Clone)]
pub struct NotificationHub {
    inner: Arc<HubInner>,
    default_capacity: usize,
}

/// Registration guard. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    hub: Weak<HubInner>,
}

impl NotificationHub {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                subscribers: ArcSwap::from_pointee(Vec::new()),
                writer: Mutex::new(()),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
            }),
            default_capacity,
        }
    }

    /// Registers a callback invoked on the pump thread for each matching
    /// event. Callbacks must return quickly.
    pub fn subscribe<F>(
        &self,
        filter: EventKindSet,
        callback: F,
    ) -> Subscription
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        self.insert(filter, Sink::Inline(Box::new(callback)))
    }

    /// Registers a bounded queue that drops its oldest entry when full.
    /// `capacity` of `None` uses the hub default.
    pub fn subscribe_queued(
        &self,
        filter: EventKindSet,
        capacity: Option<usize>,
    ) -> QueuedSubscription {
        let queue = Arc::new(EventQueue::new(capacity.unwrap_or(self.default_capacity)));
        let subscription = self.insert(filter, Sink::Queued(queue.clone()));
        // Checked after insertion so a concurrent close cannot miss this queue.
        if self.inner.closed.load(Ordering::SeqCst) {
            queue.close();
        }
        QueuedSubscription::new(subscription, queue)
    }

    pub fn unsubscribe(
        &self,
        subscription: Subscription,
    ) {
        drop(subscription)
    }

    fn insert(
        &self,
        filter: EventKindSet,
        sink: Sink,
    ) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let subscriber = Arc::new(Subscriber { id, filter, sink });

        {
            let _guard = self.inner.writer.lock();
            let mut next = Vec::clone(&self.inner.subscribers.load());
            next.push(subscriber);
            self.inner.subscribers.store(Arc::new(next));
        }
        trace!(subscription_id = id, ?filter, "subscriber added");

        Subscription {
            id,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Delivers `event` to every matching subscriber. Called only by the pump.
    pub(crate) fn publish(
        &self,
        event: &EngineEvent,
    ) {
        let kind = event.kind();
        let snapshot = self.inner.subscribers.load();

        for subscriber in snapshot.iter().filter(|s| s.filter.contains(kind)) {
            match &subscriber.sink {
                Sink::Inline(callback) => {
                    if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                        error!(
                            subscription_id = subscriber.id,
                            kind = kind.name(),
                            "subscriber panicked while handling event"
                        );
                    }
                }
                Sink::Queued(queue) => {
                    if !queue.push(event.clone()) {
                        trace!(subscription_id = subscriber.id, "queue full, evicted oldest event");
                    }
                }
            }
        }
    }

    /// Ends every queued subscription; later subscribers start closed.
    pub(crate) fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        for subscriber in self.inner.subscribers.load().iter() {
            if let Sink::Queued(queue) = &subscriber.sink {
                queue.close();
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.load().len()
    }
}

impl std::fmt::Debug for NotificationHub {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("NotificationHub")
            .field("subscribers", &self.subscriber_count())
            .field("closed", &self.inner.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn unsubscribe(self) {
        drop(self)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

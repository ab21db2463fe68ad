//! Bounded per-subscriber queue for asynchronous delivery.
//!
//! The pump must never block on a slow consumer: when the queue is full the
//! oldest entry is evicted and counted.

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::Subscription;
use crate::engine::EngineEvent;
use crate::metrics::DROPPED_NOTIFICATIONS;

#[derive(Debug)]
pub(crate) struct EventQueue {
    buffer: Mutex<VecDeque<EngineEvent>>,
    capacity: usize,
    dropped: AtomicU64,
    closed: AtomicBool,
    notify: Notify,
}

impl EventQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Never blocks. Returns false if an older entry had to be evicted.
    pub(crate) fn push(
        &self,
        event: EngineEvent,
    ) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return true;
        }

        let evicted = {
            let mut buffer = self.buffer.lock();
            let evicted = if buffer.len() >= self.capacity {
                buffer.pop_front();
                true
            } else {
                false
            };
            buffer.push_back(event);
            evicted
        };

        if evicted {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            DROPPED_NOTIFICATIONS.inc();
        }
        self.notify.notify_one();
        !evicted
    }

    pub(crate) fn try_pop(&self) -> Option<EngineEvent> {
        self.buffer.lock().pop_front()
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn len(&self) -> usize {
        self.buffer.lock().len()
    }
}

/// A subscription whose events are buffered for the consumer to pull.
///
/// Dropping it unsubscribes.
#[derive(Debug)]
pub struct QueuedSubscription {
    subscription: Subscription,
    queue: Arc<EventQueue>,
}

impl QueuedSubscription {
    pub(crate) fn new(
        subscription: Subscription,
        queue: Arc<EventQueue>,
    ) -> Self {
        Self { subscription, queue }
    }

    pub fn id(&self) -> u64 {
        self.subscription.id()
    }

    /// Next event in publish order, or `None` once the hub is closed and the
    /// buffer is drained.
    pub async fn recv(&self) -> Option<EngineEvent> {
        loop {
            if let Some(event) = self.queue.try_pop() {
                return Some(event);
            }
            if self.queue.is_closed() {
                return self.queue.try_pop();
            }
            self.queue.notify.notified().await;
        }
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.queue.try_pop()
    }

    /// Number of events evicted because the queue was full.
    pub fn dropped_count(&self) -> u64 {
        self.queue.dropped.load(Ordering::Relaxed)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn unsubscribe(self) {
        drop(self)
    }
}

impl Drop for QueuedSubscription {
    fn drop(&mut self) {
        self.queue.close();
    }
}

//! Reply correlation.
//!
//! Turns the engine's single event queue with echoed 64-bit tags into
//! per-request futures. Client call sites [`register`](ReplyCorrelator::register)
//! a waiter and submit with its tag; the event pump
//! [`resolve`](ReplyCorrelator::resolve)s it when the matching reply arrives.
//!
//! All state sits behind one mutex that is held only for map updates, never
//! while a waiter is blocked or being woken.


use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;
use tracing::trace;

use crate::engine::RESERVED_TAG;
use crate::metrics::LATE_REPLIES;
use crate::metrics::OUTSTANDING_REQUESTS;
use crate::CloseReason;
use crate::Error;
use crate::Result;

pub type RequestTag = u64;

/// Successful payload of a reply event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyPayload {
    Empty,
    Property(Option<String>),
}

/// What the pump hands to `resolve`: a payload, or the negative engine status.
pub type ReplyOutcome = std::result::Result<ReplyPayload, i32>;

type Slot = oneshot::Sender<Result<ReplyPayload>>;

struct CorrelatorState {
    waiters: HashMap<RequestTag, Slot>,
    next_tag: RequestTag,
    closed: Option<CloseReason>,
}

pub struct ReplyCorrelator {
    state: Mutex<CorrelatorState>,
}

/// The awaiting half of one outstanding request.
#[derive(Debug)]
pub struct PendingReply {
    tag: RequestTag,
    rx: oneshot::Receiver<Result<ReplyPayload>>,
}

impl ReplyCorrelator {
    pub fn new() -> Self {
        Self::starting_at(RESERVED_TAG + 1)
    }

    pub(crate) fn starting_at(first_tag: RequestTag) -> Self {
        Self {
            state: Mutex::new(CorrelatorState {
                waiters: HashMap::new(),
                next_tag: first_tag,
                closed: None,
            }),
        }
    }

    /// Allocates a fresh tag and its waiter. Never blocks.
    ///
    /// # Errors
    /// - `UseAfterClose` / `EngineShutdown` once the correlator is closed
    /// - `TagCollision` if the wrapped counter lands on an outstanding tag
    pub fn register(&self) -> Result<(RequestTag, PendingReply)> {
        let (tx, rx) = oneshot::channel();

        let tag = {
            let mut state = self.state.lock();
            if let Some(reason) = state.closed {
                return Err(reason.into());
            }

            let tag = state.next_tag;
            if state.waiters.contains_key(&tag) {
                return Err(Error::TagCollision { tag });
            }

            state.next_tag = match tag.wrapping_add(1) {
                RESERVED_TAG => RESERVED_TAG + 1,
                next => next,
            };
            state.waiters.insert(tag, tx);
            tag
        };

        OUTSTANDING_REQUESTS.inc();
        trace!(tag, "waiter registered");

        Ok((
            tag,
            PendingReply { tag, rx },
        ))
    }

    /// Fills the waiter registered under `tag`.
    ///
    /// Unknown or already-consumed tags are dropped silently: a reply racing
    /// a local timeout is expected. Returns whether a live waiter took the
    /// outcome.
    pub fn resolve(
        &self,
        tag: RequestTag,
        outcome: ReplyOutcome,
    ) -> bool {
        let slot = self.state.lock().waiters.remove(&tag);

        let Some(slot) = slot else {
            LATE_REPLIES.inc();
            debug!(tag, "dropping reply for unknown tag");
            return false;
        };
        OUTSTANDING_REQUESTS.dec();

        let result = outcome.map_err(|code| Error::ReplyError { code });
        if slot.send(result).is_err() {
            // The caller stopped waiting (timeout or abandoned future).
            LATE_REPLIES.inc();
            debug!(tag, "dropping reply for abandoned waiter");
            return false;
        }

        trace!(tag, "waiter resolved");
        true
    }

    /// Forgets a waiter whose submission the engine refused outright.
    pub fn discard(
        &self,
        tag: RequestTag,
    ) {
        if self.state.lock().waiters.remove(&tag).is_some() {
            OUTSTANDING_REQUESTS.dec();
        }
    }

    /// Closes the correlator and resolves every outstanding waiter with
    /// `Cancelled(reason)`. Only the first call has an effect.
    ///
    /// Returns the number of waiters cancelled.
    pub fn cancel_all(
        &self,
        reason: CloseReason,
    ) -> usize {
        let drained: Vec<(RequestTag, Slot)> = {
            let mut state = self.state.lock();
            if state.closed.is_some() {
                return 0;
            }
            state.closed = Some(reason);
            state.waiters.drain().collect()
        };

        let count = drained.len();
        OUTSTANDING_REQUESTS.sub(count as i64);
        for (tag, slot) in drained {
            trace!(tag, %reason, "cancelling waiter");
            let _ = slot.send(Err(Error::Cancelled(reason)));
        }

        debug!(count, %reason, "correlator closed");
        count
    }

    pub fn outstanding(&self) -> usize {
        self.state.lock().waiters.len()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed.is_some()
    }
}

impl Default for ReplyCorrelator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReplyCorrelator {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ReplyCorrelator")
            .field("outstanding", &state.waiters.len())
            .field("next_tag", &state.next_tag)
            .field("closed", &state.closed)
            .finish()
    }
}

impl PendingReply {
    pub fn tag(&self) -> RequestTag {
        self.tag
    }

    /// Suspends until the reply arrives or `timeout` elapses. `None` waits
    /// indefinitely.
    ///
    /// A timed-out waiter stays registered; its late reply is discarded by
    /// the correlator.
    pub async fn wait(
        self,
        timeout: Option<Duration>,
    ) -> Result<ReplyPayload> {
        let tag = self.tag;
        let received = match timeout {
            None => self.rx.await,
            Some(after) => match tokio::time::timeout(after, self.rx).await {
                Ok(received) => received,
                Err(_) => {
                    debug!(tag, ?after, "wait for reply timed out");
                    return Err(Error::Timeout { after });
                }
            },
        };

        // A dropped slot means the correlator itself went away.
        received.unwrap_or(Err(Error::Cancelled(CloseReason::Closed)))
    }
}

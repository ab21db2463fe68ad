//! The single consumer of the engine's event queue.
//!
//! One dedicated OS thread per open handle blocks in [`Engine::wait_event`],
//! decodes each result once, and routes it:
//!
//! ```text
//! wait_event() -> decode()
//!   ├─ NONE                    -> check stop flag, poll again
//!   ├─ *_REPLY (tag != 0)      -> ReplyCorrelator::resolve
//!   ├─ SHUTDOWN                -> cancel_all, publish, exit
//!   ├─ other notification      -> NotificationHub::publish
//!   ├─ unconsumed native kind  -> skip quietly
//!   └─ malformed payload       -> log, count, poll again
//! ```
//!
//! The pump never calls back into the command facade, so a waiter can never
//! be blocked on a reply that only this thread could produce.


use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use crate::config::LogConfig;
use crate::config::PumpConfig;
use crate::constants::PUMP_THREAD_NAME;
use crate::correlator::ReplyCorrelator;
use crate::correlator::ReplyOutcome;
use crate::correlator::ReplyPayload;
use crate::engine::decode;
use crate::engine::Engine;
use crate::engine::EngineEvent;
use crate::engine::LogMessage;
use crate::engine::RESERVED_TAG;
use crate::metrics::EVENTS_RECEIVED;
use crate::metrics::MALFORMED_EVENTS;
use crate::notify::NotificationHub;
use crate::CloseReason;
use crate::Error;
use crate::Result;

pub(crate) struct EventPump<E: Engine> {
    engine: Arc<E>,
    correlator: Arc<ReplyCorrelator>,
    hub: NotificationHub,
    stop: Arc<AtomicBool>,
    wait_timeout_secs: f64,
    forward_logs: bool,
}

/// Owner-side handle to a running pump.
pub(crate) struct PumpHandle {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl<E: Engine> EventPump<E> {
    pub(crate) fn new(
        engine: Arc<E>,
        correlator: Arc<ReplyCorrelator>,
        hub: NotificationHub,
        pump_config: &PumpConfig,
        log_config: &LogConfig,
    ) -> Self {
        Self {
            engine,
            correlator,
            hub,
            stop: Arc::new(AtomicBool::new(false)),
            wait_timeout_secs: pump_config.wait_timeout_secs,
            forward_logs: log_config.forward_to_tracing,
        }
    }

    /// Starts the pump thread and returns once it is polling.
    pub(crate) fn spawn(self) -> Result<PumpHandle> {
        let stop = self.stop.clone();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);

        let thread = std::thread::Builder::new()
            .name(PUMP_THREAD_NAME.into())
            .spawn(move || {
                let _ = ready_tx.send(());
                self.run();
            })
            .map_err(Error::PumpSpawn)?;

        if ready_rx.recv().is_err() {
            // The thread died before signalling; surface it as a spawn failure.
            let _ = thread.join();
            return Err(Error::PumpSpawn(std::io::Error::other("event pump exited during startup")));
        }

        Ok(PumpHandle { stop, thread })
    }

    pub(crate) fn run(self) {
        info!("event pump started");

        loop {
            if self.stop.load(Ordering::Acquire) {
                debug!("event pump received stop request");
                break;
            }

            let raw = self.engine.wait_event(self.wait_timeout_secs);
            let event = match decode(raw) {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(e) if e.is_unconsumed_kind() => {
                    trace!(error = %e, "ignoring unconsumed engine event");
                    continue;
                }
                Err(e) => {
                    MALFORMED_EVENTS.inc();
                    warn!(error = %e, "skipping malformed engine event");
                    continue;
                }
            };

            EVENTS_RECEIVED.with_label_values(&[event.kind().name()]).inc();
            trace!(kind = event.kind().name(), "engine event received");

            if !self.dispatch(event) {
                break;
            }
        }

        info!("event pump stopped");
    }

    /// Routes one decoded event. Returns false when the pump must exit.
    fn dispatch(
        &self,
        event: EngineEvent,
    ) -> bool {
        match event {
            EngineEvent::CommandReply(reply) | EngineEvent::SetPropertyReply(reply) => {
                self.resolve(reply.tag, outcome(reply.error, ReplyPayload::Empty));
            }
            EngineEvent::GetPropertyReply(reply) => {
                self.resolve(reply.tag, outcome(reply.error, ReplyPayload::Property(reply.value)));
            }
            EngineEvent::Shutdown => {
                let cancelled = self.correlator.cancel_all(CloseReason::EngineShutdown);
                info!(cancelled, "engine shut down");
                self.hub.publish(&EngineEvent::Shutdown);
                return false;
            }
            EngineEvent::LogMessage(ref message) => {
                if self.forward_logs {
                    forward_log(message);
                }
                self.hub.publish(&event);
            }
            other => self.hub.publish(&other),
        }
        true
    }

    fn resolve(
        &self,
        tag: u64,
        outcome: ReplyOutcome,
    ) {
        if tag == RESERVED_TAG {
            debug!("dropping reply to untagged request");
            return;
        }
        self.correlator.resolve(tag, outcome);
    }
}

impl PumpHandle {
    /// Asks the pump to exit after its current poll. The caller must also
    /// wake the engine so a blocked `wait_event` returns.
    pub(crate) fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// True when called from the pump thread itself, e.g. by an inline
    /// subscriber. Joining from there would deadlock.
    pub(crate) fn is_current_thread(&self) -> bool {
        self.thread.thread().id() == std::thread::current().id()
    }

    pub(crate) fn join(self) {
        if self.thread.join().is_err() {
            warn!("event pump thread panicked");
        }
    }
}

fn outcome(
    error: i32,
    payload: ReplyPayload,
) -> ReplyOutcome {
    if error < 0 {
        Err(error)
    } else {
        Ok(payload)
    }
}

fn forward_log(message: &LogMessage) {
    let text = message.text.trim_end();
    let prefix = message.prefix.as_str();
    match message.level.as_str() {
        "fatal" | "error" => tracing::error!(target: "mpv", prefix, "{}", text),
        "warn" => tracing::warn!(target: "mpv", prefix, "{}", text),
        "info" | "status" => tracing::info!(target: "mpv", prefix, "{}", text),
        "v" | "debug" => tracing::debug!(target: "mpv", prefix, "{}", text),
        _ => tracing::trace!(target: "mpv", prefix, "{}", text),
    }
}

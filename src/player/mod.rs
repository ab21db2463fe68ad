//! Handle owner and command facade.
//!
//! [`Player`] owns one engine instance for its whole lifetime:
//!
//! ```text
//! Created --open--> Opening --ok--> Ready --close--> Closing --> Closed
//!                      └--err--> Created
//! ```
//!
//! While `Ready`, the facade methods may be called concurrently from any
//! task. Each tagged request registers a waiter with the correlator before it
//! is submitted, so the reply can never arrive ahead of its waiter.

mod state;

pub use state::PlayerState;


use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use parking_lot::Mutex;
use parking_lot::RwLock;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::config::PlayerConfig;
use crate::correlator::ReplyCorrelator;
use crate::correlator::ReplyPayload;
use crate::correlator::RequestTag;
use crate::engine::EndFile;
use crate::engine::EndFileReason;
use crate::engine::Engine;
use crate::engine::EngineEvent;
use crate::engine::EventKind;
use crate::metrics::register_custom_metrics;
use crate::metrics::REPLY_LATENCY;
use crate::notify::EventKindSet;
use crate::notify::NotificationHub;
use crate::notify::QueuedSubscription;
use crate::notify::Subscription;
use crate::pump::EventPump;
use crate::pump::PumpHandle;
use crate::CloseReason;
use crate::Error;
use crate::Result;
use state::AtomicState;

/// How a [`Player::play_to_end`] call finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEnd {
    /// The file ended without an error (eof, stop or quit).
    Finished(EndFile),
    /// The engine shut itself down before the file ended.
    EngineShutdown,
}

struct PlayerInner<E: Engine> {
    config: PlayerConfig,
    state: AtomicState,
    /// Present between a successful open and close. Submissions hold the read
    /// lock so close cannot destroy the engine under an in-flight call.
    engine: RwLock<Option<Arc<E>>>,
    correlator: Arc<ReplyCorrelator>,
    hub: NotificationHub,
    pump: Mutex<Option<PumpHandle>>,
    /// Serializes open and close.
    lifecycle: Mutex<()>,
}

/// Cheaply cloneable handle to one engine instance.
pub struct Player<E: Engine> {
    inner: Arc<PlayerInner<E>>,
}

impl<E: Engine> Clone for Player<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E: Engine> std::fmt::Debug for Player<E> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("state", &self.state())
            .field("correlator", &self.inner.correlator)
            .finish()
    }
}

impl<E: Engine> Player<E> {
    /// Creates a player in the `Created` state. Nothing touches an engine
    /// until [`open`](Self::open).
    pub fn new(config: PlayerConfig) -> Self {
        register_custom_metrics();

        let hub = NotificationHub::new(config.notify.queue_capacity);
        Self {
            inner: Arc::new(PlayerInner {
                config,
                state: AtomicState::new(PlayerState::Created),
                engine: RwLock::new(None),
                correlator: Arc::new(ReplyCorrelator::new()),
                hub,
                pump: Mutex::new(None),
                lifecycle: Mutex::new(()),
            }),
        }
    }

    pub fn state(&self) -> PlayerState {
        self.inner.state.load()
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.inner.config
    }

    /// Number of tagged requests still waiting for a reply.
    pub fn outstanding_requests(&self) -> usize {
        self.inner.correlator.outstanding()
    }

    /// Takes ownership of a freshly created engine: applies the configured
    /// options, initializes it and starts the event pump.
    ///
    /// On failure the engine is terminated and the player returns to
    /// `Created`, so `open` may be retried with a new engine. An engine handed
    /// to a player that is already open or closed is terminated as well.
    pub fn open(
        &self,
        engine: E,
    ) -> Result<()> {
        let _lifecycle = self.inner.lifecycle.lock();

        let rejected = match self.state() {
            PlayerState::Created => None,
            PlayerState::Opening | PlayerState::Ready => Some(Error::AlreadyOpen),
            PlayerState::Closing | PlayerState::Closed => Some(Error::UseAfterClose),
        };
        if let Some(e) = rejected {
            // The engine is ours now; it must not outlive this call unterminated.
            engine.terminate_destroy();
            return Err(e);
        }
        self.inner.state.store(PlayerState::Opening);
        debug!("opening engine");

        let engine = Arc::new(engine);
        match self.start(engine.clone()) {
            Ok(pump) => {
                *self.inner.pump.lock() = Some(pump);
                *self.inner.engine.write() = Some(engine);
                self.inner.state.store(PlayerState::Ready);
                info!("engine ready");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to open engine");
                engine.terminate_destroy();
                self.inner.state.store(PlayerState::Created);
                Err(e)
            }
        }
    }

    fn start(
        &self,
        engine: Arc<E>,
    ) -> Result<PumpHandle> {
        let config = &self.inner.config;

        for option in &config.engine.options {
            let code = engine.set_option_string(&option.name, &option.value);
            if code != 0 {
                return Err(Error::InvalidOption {
                    name: option.name.clone(),
                    code,
                });
            }
            debug!(name = %option.name, value = %option.value, "engine option applied");
        }

        let code = engine.initialize();
        if code != 0 {
            return Err(Error::EngineRejected {
                operation: "initialize",
                code,
            });
        }

        if config.log.enabled() {
            let code = engine.request_log_messages(&config.log.min_level);
            if code != 0 {
                return Err(Error::EngineRejected {
                    operation: "request_log_messages",
                    code,
                });
            }
        }

        EventPump::new(
            engine,
            self.inner.correlator.clone(),
            self.inner.hub.clone(),
            &config.pump,
            &config.log,
        )
        .spawn()
    }

    /// Cancels every outstanding request, stops the pump and destroys the
    /// engine. Calling it again is a no-op.
    pub fn close(&self) {
        self.inner.close();
    }

    /// Registers an inline callback; see [`NotificationHub::subscribe`].
    /// May be called in any state, including before `open`.
    pub fn subscribe<F>(
        &self,
        filter: EventKindSet,
        callback: F,
    ) -> Subscription
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        self.inner.hub.subscribe(filter, callback)
    }

    /// Registers a bounded drop-oldest queue; see
    /// [`NotificationHub::subscribe_queued`].
    pub fn subscribe_queued(
        &self,
        filter: EventKindSet,
        capacity: Option<usize>,
    ) -> QueuedSubscription {
        self.inner.hub.subscribe_queued(filter, capacity)
    }

    /// Sets an engine option synchronously; no reply event is involved.
    pub fn set_option(
        &self,
        name: &str,
        value: &str,
    ) -> Result<()> {
        let code = self.with_engine(|engine| engine.set_option_string(name, value))?;
        if code != 0 {
            return Err(Error::InvalidOption {
                name: name.to_string(),
                code,
            });
        }
        Ok(())
    }

    /// Sets a property through a tagged request and waits for its reply.
    pub async fn set_property_string(
        &self,
        name: &str,
        value: &str,
    ) -> Result<()> {
        self.request(
            "set_property",
            |engine, tag| engine.set_property_async(tag, name, value),
            self.inner.config.request.reply_timeout(),
        )
        .await
        .map_err(|e| {
            e.map_reply(|code| Error::PropertyRejected {
                name: name.to_string(),
                code,
            })
        })?;
        Ok(())
    }

    /// Sets a property with the blocking primitive. The calling thread waits
    /// inside the engine, so prefer [`set_property_string`](Self::set_property_string)
    /// from async code.
    pub fn set_property_blocking(
        &self,
        name: &str,
        value: &str,
    ) -> Result<()> {
        let code = self.with_engine(|engine| engine.set_property_string(name, value))?;
        if code != 0 {
            return Err(Error::PropertyRejected {
                name: name.to_string(),
                code,
            });
        }
        Ok(())
    }

    /// Reads a property as a string. `None` when the engine has no value.
    pub async fn get_property_string(
        &self,
        name: &str,
    ) -> Result<Option<String>> {
        let payload = self
            .request(
                "get_property",
                |engine, tag| engine.get_property_async(tag, name),
                self.inner.config.request.reply_timeout(),
            )
            .await
            .map_err(|e| {
                e.map_reply(|code| Error::PropertyRejected {
                    name: name.to_string(),
                    code,
                })
            })?;

        match payload {
            ReplyPayload::Property(value) => Ok(value),
            ReplyPayload::Empty => Ok(None),
        }
    }

    /// Runs a command and waits for its reply with the configured timeout.
    pub async fn run_command<S>(
        &self,
        args: &[S],
    ) -> Result<()>
    where
        S: AsRef<str>,
    {
        self.run_command_with_timeout(args, self.inner.config.request.reply_timeout())
            .await
    }

    /// Runs a command and waits for its reply. `None` waits indefinitely.
    pub async fn run_command_with_timeout<S>(
        &self,
        args: &[S],
        timeout: Option<Duration>,
    ) -> Result<()>
    where
        S: AsRef<str>,
    {
        let args = owned_args(args)?;
        self.request("command", |engine, tag| engine.command_async(tag, &args), timeout)
            .await
            .map_err(|e| e.map_reply(|code| Error::CommandFailed { code }))?;
        Ok(())
    }

    /// Runs a command with the blocking primitive.
    pub fn run_command_blocking<S>(
        &self,
        args: &[S],
    ) -> Result<()>
    where
        S: AsRef<str>,
    {
        let args = owned_args(args)?;
        let code = self.with_engine(|engine| engine.command(&args))?;
        if code < 0 {
            return Err(Error::CommandFailed { code });
        }
        Ok(())
    }

    /// Loads `url`, replacing the current file, and waits until it ends.
    ///
    /// Returns `PlaybackFailed` when the file ended with an error reason.
    pub async fn play_to_end(
        &self,
        url: &str,
    ) -> Result<PlaybackEnd> {
        // Subscribe first so no event of the new file is missed.
        let events = self.subscribe_queued(
            EventKindSet::of(&[EventKind::StartFile, EventKind::EndFile, EventKind::Shutdown]),
            None,
        );

        self.run_command(&["loadfile", url]).await?;
        debug!(url, "file queued for playback");

        // END_FILE of whatever played before arrives ahead of our START_FILE.
        let mut current = None;
        while let Some(event) = events.recv().await {
            match event {
                EngineEvent::StartFile(start) => current = Some(start.playlist_entry_id),
                EngineEvent::EndFile(end) if current == Some(end.playlist_entry_id) => match end.reason {
                    EndFileReason::Error => {
                        warn!(url, code = end.error, "playback failed");
                        return Err(Error::PlaybackFailed { code: end.error });
                    }
                    EndFileReason::Redirect => {
                        debug!(url, "playback redirected");
                        current = None;
                    }
                    _ => return Ok(PlaybackEnd::Finished(end)),
                },
                EngineEvent::Shutdown => return Ok(PlaybackEnd::EngineShutdown),
                _ => {}
            }
        }

        Err(Error::Cancelled(CloseReason::Closed))
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state() {
            PlayerState::Ready => Ok(()),
            PlayerState::Created | PlayerState::Opening => Err(Error::NotReady),
            PlayerState::Closing | PlayerState::Closed => Err(Error::UseAfterClose),
        }
    }

    fn with_engine<T, F>(
        &self,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(&E) -> T,
    {
        self.ensure_ready()?;
        let engine = self.inner.engine.read();
        match engine.as_ref() {
            Some(engine) => Ok(f(engine)),
            None => Err(Error::UseAfterClose),
        }
    }

    /// Register, submit, await. The waiter exists before the engine sees the tag.
    async fn request<F>(
        &self,
        operation: &'static str,
        submit: F,
        timeout: Option<Duration>,
    ) -> Result<ReplyPayload>
    where
        F: FnOnce(&E, RequestTag) -> i32,
    {
        self.ensure_ready()?;
        let (tag, pending) = self.inner.correlator.register()?;

        let submitted = self.with_engine(|engine| submit(engine, tag));
        match submitted {
            Ok(code) if code < 0 => {
                self.inner.correlator.discard(tag);
                return Err(Error::EngineRejected { operation, code });
            }
            Ok(_) => {}
            Err(e) => {
                self.inner.correlator.discard(tag);
                return Err(e);
            }
        }

        let started = Instant::now();
        let result = pending.wait(timeout).await;
        REPLY_LATENCY
            .with_label_values(&[operation])
            .observe(started.elapsed().as_secs_f64() * 1000.0);
        debug!(tag, operation, ok = result.is_ok(), "request completed");
        result
    }
}

fn owned_args<S: AsRef<str>>(args: &[S]) -> Result<Vec<String>> {
    if args.is_empty() {
        return Err(Error::EmptyCommand);
    }
    Ok(args.iter().map(|a| a.as_ref().to_string()).collect())
}

impl<E: Engine> PlayerInner<E> {
    fn close(&self) {
        // Claiming Ready -> Closing needs no lock, so a close from the pump
        // thread never waits on a closer that is about to join it.
        if !self.state.transition(PlayerState::Ready, PlayerState::Closing) {
            let _lifecycle = self.lifecycle.lock();

            match self.state.load() {
                PlayerState::Closing | PlayerState::Closed => return,
                PlayerState::Created | PlayerState::Opening => {
                    self.correlator.cancel_all(CloseReason::Closed);
                    self.hub.close();
                    self.state.store(PlayerState::Closed);
                    debug!("closed a player that was never opened");
                    return;
                }
                // Open completed while we waited for the lock.
                PlayerState::Ready => {
                    if !self.state.transition(PlayerState::Ready, PlayerState::Closing) {
                        return;
                    }
                }
            }
        }

        let cancelled = self.correlator.cancel_all(CloseReason::Closed);
        debug!(cancelled, "outstanding requests cancelled");

        let pump = self.pump.lock().take();
        if let Some(pump) = pump {
            pump.request_stop();
            if let Some(engine) = self.engine.read().as_ref() {
                engine.wakeup();
            }
            if pump.is_current_thread() {
                // Closed from an inline subscriber; the pump exits after this
                // callback returns.
                debug!("close called on the event pump thread");
            } else {
                pump.join();
            }
        }

        // Waits for in-flight submissions to leave the engine.
        if let Some(engine) = self.engine.write().take() {
            engine.terminate_destroy();
        }

        self.hub.close();
        self.state.store(PlayerState::Closed);
        info!("engine closed");
    }
}

impl<E: Engine> Drop for PlayerInner<E> {
    fn drop(&mut self) {
        if self.state.load() == PlayerState::Ready {
            debug!("last player handle dropped while open");
            self.close();
        }
    }
}

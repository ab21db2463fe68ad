use std::sync::atomic::AtomicI32;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use parking_lot::Mutex;

use crate::engine::status;
use crate::engine::Engine;
use crate::engine::EventKind;
use crate::engine::RawEvent;
use crate::engine::RawPayload;

/// A tagged request handed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Submission {
    SetProperty { tag: u64, name: String, value: String },
    GetProperty { tag: u64, name: String },
    Command { tag: u64, args: Vec<String> },
}

impl Submission {
    pub(crate) fn tag(&self) -> u64 {
        match self {
            Submission::SetProperty { tag, .. } | Submission::GetProperty { tag, .. } | Submission::Command { tag, .. } => *tag,
        }
    }
}

/// Produces the events an engine would emit for an accepted submission.
pub(crate) type Responder = Box<dyn Fn(&Submission) -> Vec<RawEvent> + Send + Sync>;

struct FakeInner {
    events_tx: Sender<RawEvent>,
    events_rx: Receiver<RawEvent>,
    options: Mutex<Vec<(String, String)>>,
    properties: Mutex<Vec<(String, String)>>,
    commands: Mutex<Vec<Vec<String>>>,
    submissions: Mutex<Vec<Submission>>,
    log_level: Mutex<Option<String>>,
    responder: Mutex<Option<Responder>>,
    initialize_status: AtomicI32,
    submit_status: AtomicI32,
    terminated: AtomicUsize,
    wakeups: AtomicUsize,
}

/// In-process engine: scripted replies, recorded calls.
///
/// Events pushed with [`emit`](FakeEngine::emit) or produced by the
/// responder are returned from `wait_event` in order.
#[derive(Clone)]
pub(crate) struct FakeEngine {
    inner: Arc<FakeInner>,
}

impl FakeEngine {
    pub(crate) fn new() -> Self {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        Self {
            inner: Arc::new(FakeInner {
                events_tx,
                events_rx,
                options: Mutex::new(Vec::new()),
                properties: Mutex::new(Vec::new()),
                commands: Mutex::new(Vec::new()),
                submissions: Mutex::new(Vec::new()),
                log_level: Mutex::new(None),
                responder: Mutex::new(None),
                initialize_status: AtomicI32::new(status::SUCCESS),
                submit_status: AtomicI32::new(status::SUCCESS),
                terminated: AtomicUsize::new(0),
                wakeups: AtomicUsize::new(0),
            }),
        }
    }

    /// Engine that acknowledges every submission with a successful reply.
    pub(crate) fn acknowledging() -> Self {
        let engine = Self::new();
        engine.respond_with(|submission| vec![success_reply(submission)]);
        engine
    }

    pub(crate) fn respond_with<F>(
        &self,
        responder: F,
    ) where
        F: Fn(&Submission) -> Vec<RawEvent> + Send + Sync + 'static,
    {
        *self.inner.responder.lock() = Some(Box::new(responder));
    }

    pub(crate) fn emit(
        &self,
        event: RawEvent,
    ) {
        let _ = self.inner.events_tx.send(event);
    }

    pub(crate) fn fail_initialize_with(
        &self,
        code: i32,
    ) {
        self.inner.initialize_status.store(code, Ordering::SeqCst);
    }

    /// Status returned by every subsequent tagged submission.
    pub(crate) fn refuse_submissions_with(
        &self,
        code: i32,
    ) {
        self.inner.submit_status.store(code, Ordering::SeqCst);
    }

    pub(crate) fn options(&self) -> Vec<(String, String)> {
        self.inner.options.lock().clone()
    }

    pub(crate) fn properties(&self) -> Vec<(String, String)> {
        self.inner.properties.lock().clone()
    }

    pub(crate) fn commands(&self) -> Vec<Vec<String>> {
        self.inner.commands.lock().clone()
    }

    pub(crate) fn submissions(&self) -> Vec<Submission> {
        self.inner.submissions.lock().clone()
    }

    pub(crate) fn log_level(&self) -> Option<String> {
        self.inner.log_level.lock().clone()
    }

    pub(crate) fn terminate_count(&self) -> usize {
        self.inner.terminated.load(Ordering::SeqCst)
    }

    pub(crate) fn wakeup_count(&self) -> usize {
        self.inner.wakeups.load(Ordering::SeqCst)
    }

    /// Waits until at least `count` tagged submissions were recorded.
    pub(crate) async fn wait_for_submissions(
        &self,
        count: usize,
    ) -> Vec<Submission> {
        loop {
            let submissions = self.submissions();
            if submissions.len() >= count {
                return submissions;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    fn submit(
        &self,
        submission: Submission,
    ) -> i32 {
        let code = self.inner.submit_status.load(Ordering::SeqCst);
        if code < 0 {
            return code;
        }
        self.inner.submissions.lock().push(submission.clone());
        let events = match self.inner.responder.lock().as_ref() {
            Some(responder) => responder(&submission),
            None => Vec::new(),
        };
        for event in events {
            self.emit(event);
        }
        status::SUCCESS
    }
}

impl Engine for FakeEngine {
    fn initialize(&self) -> i32 {
        self.inner.initialize_status.load(Ordering::SeqCst)
    }

    fn set_option_string(
        &self,
        name: &str,
        value: &str,
    ) -> i32 {
        if name.is_empty() || name.starts_with("bogus") {
            return status::OPTION_NOT_FOUND;
        }
        self.inner.options.lock().push((name.to_string(), value.to_string()));
        status::SUCCESS
    }

    fn set_property_string(
        &self,
        name: &str,
        value: &str,
    ) -> i32 {
        if name.starts_with("bogus") {
            return status::PROPERTY_NOT_FOUND;
        }
        self.inner.properties.lock().push((name.to_string(), value.to_string()));
        status::SUCCESS
    }

    fn set_property_async(
        &self,
        tag: u64,
        name: &str,
        value: &str,
    ) -> i32 {
        self.submit(Submission::SetProperty {
            tag,
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    fn get_property_async(
        &self,
        tag: u64,
        name: &str,
    ) -> i32 {
        self.submit(Submission::GetProperty {
            tag,
            name: name.to_string(),
        })
    }

    fn command(
        &self,
        args: &[String],
    ) -> i32 {
        if args.first().map(|a| a.starts_with("bogus")).unwrap_or(true) {
            return status::COMMAND;
        }
        self.inner.commands.lock().push(args.to_vec());
        status::SUCCESS
    }

    fn command_async(
        &self,
        tag: u64,
        args: &[String],
    ) -> i32 {
        self.submit(Submission::Command { tag, args: args.to_vec() })
    }

    fn request_log_messages(
        &self,
        min_level: &str,
    ) -> i32 {
        *self.inner.log_level.lock() = Some(min_level.to_string());
        status::SUCCESS
    }

    fn wait_event(
        &self,
        timeout_secs: f64,
    ) -> RawEvent {
        let received = if timeout_secs < 0.0 {
            self.inner.events_rx.recv().ok()
        } else {
            self.inner
                .events_rx
                .recv_timeout(Duration::from_secs_f64(timeout_secs))
                .ok()
        };
        received.unwrap_or_else(RawEvent::none)
    }

    fn wakeup(&self) {
        self.inner.wakeups.fetch_add(1, Ordering::SeqCst);
        self.emit(RawEvent::none());
    }

    fn terminate_destroy(&self) {
        self.inner.terminated.fetch_add(1, Ordering::SeqCst);
    }
}

/// The reply a well-behaved engine sends for an accepted submission.
pub(crate) fn success_reply(submission: &Submission) -> RawEvent {
    reply_with_status(submission, status::SUCCESS)
}

pub(crate) fn reply_with_status(
    submission: &Submission,
    code: i32,
) -> RawEvent {
    match submission {
        Submission::SetProperty { tag, name, .. } => RawEvent::new(
            EventKind::SetPropertyReply,
            code,
            *tag,
            RawPayload::Property {
                name: name.clone(),
                value: None,
            },
        ),
        Submission::GetProperty { tag, name } => RawEvent::new(
            EventKind::GetPropertyReply,
            code,
            *tag,
            RawPayload::Property {
                name: name.clone(),
                value: (code >= 0).then(|| format!("{}-value", name)),
            },
        ),
        Submission::Command { tag, .. } => RawEvent::new(EventKind::CommandReply, code, *tag, RawPayload::None),
    }
}

pub(crate) fn end_file(
    reason: i32,
    error: i32,
) -> RawEvent {
    RawEvent::new(
        EventKind::EndFile,
        0,
        0,
        RawPayload::EndFile {
            reason,
            error,
            playlist_entry_id: 1,
        },
    )
}

pub(crate) fn shutdown() -> RawEvent {
    RawEvent::new(EventKind::Shutdown, 0, 0, RawPayload::None)
}

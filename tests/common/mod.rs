use std::collections::HashMap;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use mpv_conduit::engine::status;
use mpv_conduit::engine::RawEvent;
use mpv_conduit::engine::RawPayload;
use mpv_conduit::Engine;
use mpv_conduit::EventKind;
use parking_lot::Mutex;

/// Minimal in-memory player: a property store, `loadfile` that plays every
/// file to its end immediately, and `quit` that shuts the engine down.
#[derive(Clone)]
pub struct ScriptedEngine {
    tx: Sender<RawEvent>,
    rx: Receiver<RawEvent>,
    properties: Arc<Mutex<HashMap<String, String>>>,
    next_entry: Arc<AtomicI64>,
    terminated: Arc<AtomicUsize>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            tx,
            rx,
            properties: Arc::new(Mutex::new(HashMap::new())),
            next_entry: Arc::new(AtomicI64::new(1)),
            terminated: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn terminate_count(&self) -> usize {
        self.terminated.load(Ordering::SeqCst)
    }

    fn push(
        &self,
        kind: EventKind,
        error: i32,
        tag: u64,
        data: RawPayload,
    ) {
        let _ = self.tx.send(RawEvent::new(kind, error, tag, data));
    }

    fn end_file(
        &self,
        entry: i64,
        reason: i32,
        error: i32,
    ) {
        self.push(
            EventKind::EndFile,
            0,
            0,
            RawPayload::EndFile {
                reason,
                error,
                playlist_entry_id: entry,
            },
        );
    }
}

impl Engine for ScriptedEngine {
    fn initialize(&self) -> i32 {
        status::SUCCESS
    }

    fn set_option_string(
        &self,
        name: &str,
        value: &str,
    ) -> i32 {
        self.set_property_string(name, value)
    }

    fn set_property_string(
        &self,
        name: &str,
        value: &str,
    ) -> i32 {
        self.properties.lock().insert(name.to_string(), value.to_string());
        status::SUCCESS
    }

    fn set_property_async(
        &self,
        tag: u64,
        name: &str,
        value: &str,
    ) -> i32 {
        let code = if name == "read-only" {
            status::PROPERTY_UNAVAILABLE
        } else {
            self.set_property_string(name, value)
        };
        self.push(
            EventKind::SetPropertyReply,
            code,
            tag,
            RawPayload::Property {
                name: name.to_string(),
                value: None,
            },
        );
        status::SUCCESS
    }

    fn get_property_async(
        &self,
        tag: u64,
        name: &str,
    ) -> i32 {
        let value = self.properties.lock().get(name).cloned();
        let code = if value.is_some() {
            status::SUCCESS
        } else {
            status::PROPERTY_NOT_FOUND
        };
        self.push(
            EventKind::GetPropertyReply,
            code,
            tag,
            RawPayload::Property {
                name: name.to_string(),
                value,
            },
        );
        status::SUCCESS
    }

    fn command(
        &self,
        args: &[String],
    ) -> i32 {
        match args.first().map(String::as_str) {
            Some("loadfile") | Some("quit") | Some("stop") => status::SUCCESS,
            _ => status::COMMAND,
        }
    }

    fn command_async(
        &self,
        tag: u64,
        args: &[String],
    ) -> i32 {
        let code = self.command(args);
        self.push(EventKind::CommandReply, code, tag, RawPayload::None);
        if code < 0 {
            return status::SUCCESS;
        }

        match args[0].as_str() {
            "loadfile" => {
                let entry = self.next_entry.fetch_add(1, Ordering::SeqCst);
                self.push(
                    EventKind::StartFile,
                    0,
                    0,
                    RawPayload::StartFile { playlist_entry_id: entry },
                );
                if args.get(1).map(|u| u.starts_with("missing")).unwrap_or(false) {
                    self.end_file(entry, 4, status::LOADING_FAILED);
                } else {
                    self.push(EventKind::FileLoaded, 0, 0, RawPayload::None);
                    self.push(EventKind::PlaybackRestart, 0, 0, RawPayload::None);
                    self.end_file(entry, 0, 0);
                }
            }
            "quit" => self.push(EventKind::Shutdown, 0, 0, RawPayload::None),
            _ => {}
        }
        status::SUCCESS
    }

    fn request_log_messages(
        &self,
        _min_level: &str,
    ) -> i32 {
        self.push(
            EventKind::LogMessage,
            0,
            0,
            RawPayload::LogMessage {
                prefix: "cplayer".into(),
                level: "info".into(),
                text: "log messages enabled\n".into(),
            },
        );
        status::SUCCESS
    }

    fn wait_event(
        &self,
        timeout_secs: f64,
    ) -> RawEvent {
        let event = if timeout_secs < 0.0 {
            self.rx.recv().ok()
        } else {
            self.rx.recv_timeout(Duration::from_secs_f64(timeout_secs)).ok()
        };
        event.unwrap_or_else(RawEvent::none)
    }

    fn wakeup(&self) {
        let _ = self.tx.send(RawEvent::none());
    }

    fn terminate_destroy(&self) {
        self.terminated.fetch_add(1, Ordering::SeqCst);
    }
}

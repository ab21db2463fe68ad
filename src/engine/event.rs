use super::RawEvent;
use super::RawPayload;
use crate::correlator::RequestTag;

/// Event kinds consumed by the client layer, with their native ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum EventKind {
    None = 0,
    Shutdown = 1,
    LogMessage = 2,
    GetPropertyReply = 3,
    SetPropertyReply = 4,
    CommandReply = 5,
    StartFile = 6,
    EndFile = 7,
    FileLoaded = 8,
    PlaybackRestart = 21,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        EventKind::None,
        EventKind::Shutdown,
        EventKind::LogMessage,
        EventKind::GetPropertyReply,
        EventKind::SetPropertyReply,
        EventKind::CommandReply,
        EventKind::StartFile,
        EventKind::EndFile,
        EventKind::FileLoaded,
        EventKind::PlaybackRestart,
    ];

    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|k| *k as u32 == id)
    }

    /// Reply kinds echo the tag of the request they answer.
    pub fn is_reply(self) -> bool {
        matches!(
            self,
            EventKind::GetPropertyReply | EventKind::SetPropertyReply | EventKind::CommandReply
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            EventKind::None => "none",
            EventKind::Shutdown => "shutdown",
            EventKind::LogMessage => "log-message",
            EventKind::GetPropertyReply => "get-property-reply",
            EventKind::SetPropertyReply => "set-property-reply",
            EventKind::CommandReply => "command-reply",
            EventKind::StartFile => "start-file",
            EventKind::EndFile => "end-file",
            EventKind::FileLoaded => "file-loaded",
            EventKind::PlaybackRestart => "playback-restart",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub prefix: String,
    pub level: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartFile {
    pub playlist_entry_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndFileReason {
    Eof,
    Stop,
    Quit,
    Error,
    Redirect,
    Unknown(i32),
}

impl From<i32> for EndFileReason {
    fn from(value: i32) -> Self {
        match value {
            0 => EndFileReason::Eof,
            2 => EndFileReason::Stop,
            3 => EndFileReason::Quit,
            4 => EndFileReason::Error,
            5 => EndFileReason::Redirect,
            other => EndFileReason::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndFile {
    pub reason: EndFileReason,
    /// Engine status when `reason` is `Error`, zero otherwise
    pub error: i32,
    pub playlist_entry_id: i64,
}

/// Reply to a tagged set-property or command request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    pub tag: RequestTag,
    pub error: i32,
}

/// Reply to a tagged get-property request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyReply {
    pub tag: RequestTag,
    pub error: i32,
    pub name: String,
    pub value: Option<String>,
}

/// A decoded engine event with a strongly-typed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Shutdown,
    LogMessage(LogMessage),
    GetPropertyReply(PropertyReply),
    SetPropertyReply(Reply),
    CommandReply(Reply),
    StartFile(StartFile),
    EndFile(EndFile),
    FileLoaded,
    PlaybackRestart,
}

impl EngineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EngineEvent::Shutdown => EventKind::Shutdown,
            EngineEvent::LogMessage(_) => EventKind::LogMessage,
            EngineEvent::GetPropertyReply(_) => EventKind::GetPropertyReply,
            EngineEvent::SetPropertyReply(_) => EventKind::SetPropertyReply,
            EngineEvent::CommandReply(_) => EventKind::CommandReply,
            EngineEvent::StartFile(_) => EventKind::StartFile,
            EngineEvent::EndFile(_) => EventKind::EndFile,
            EngineEvent::FileLoaded => EventKind::FileLoaded,
            EngineEvent::PlaybackRestart => EventKind::PlaybackRestart,
        }
    }
}

/// A single poll result that could not be decoded. Never surfaced to a
/// waiter; the pump logs it and moves on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedEvent {
    #[error("unknown event id {0}")]
    UnknownKind(u32),

    #[error("{} event is missing its payload", .0.name())]
    MissingPayload(EventKind),

    #[error("{} event carries a payload of the wrong shape", .0.name())]
    PayloadMismatch(EventKind),
}

impl MalformedEvent {
    /// A native kind outside the consumed set, e.g. `SEEK` or
    /// `VIDEO_RECONFIG`. Routine during playback, not a fault.
    pub fn is_unconsumed_kind(&self) -> bool {
        matches!(self, MalformedEvent::UnknownKind(_))
    }
}

/// Decodes one raw poll result. `NONE` decodes to `Ok(None)`.
pub fn decode(raw: RawEvent) -> Result<Option<EngineEvent>, MalformedEvent> {
    let kind = EventKind::from_id(raw.event_id).ok_or(MalformedEvent::UnknownKind(raw.event_id))?;
    let tag = raw.reply_userdata;

    let event = match (kind, raw.data) {
        (EventKind::None, _) => return Ok(None),
        (EventKind::Shutdown, _) => EngineEvent::Shutdown,
        (EventKind::FileLoaded, _) => EngineEvent::FileLoaded,
        (EventKind::PlaybackRestart, _) => EngineEvent::PlaybackRestart,

        (EventKind::SetPropertyReply, _) => EngineEvent::SetPropertyReply(Reply { tag, error: raw.error }),
        (EventKind::CommandReply, _) => EngineEvent::CommandReply(Reply { tag, error: raw.error }),

        (EventKind::GetPropertyReply, RawPayload::Property { name, value }) => {
            EngineEvent::GetPropertyReply(PropertyReply {
                tag,
                error: raw.error,
                name,
                value,
            })
        }
        (EventKind::LogMessage, RawPayload::LogMessage { prefix, level, text }) => {
            EngineEvent::LogMessage(LogMessage { prefix, level, text })
        }
        (EventKind::StartFile, RawPayload::StartFile { playlist_entry_id }) => {
            EngineEvent::StartFile(StartFile { playlist_entry_id })
        }
        (
            EventKind::EndFile,
            RawPayload::EndFile {
                reason,
                error,
                playlist_entry_id,
            },
        ) => EngineEvent::EndFile(EndFile {
            reason: reason.into(),
            error,
            playlist_entry_id,
        }),

        // A failed get-property reply carries no value to decode.
        (EventKind::GetPropertyReply, RawPayload::None) if raw.error < 0 => {
            EngineEvent::GetPropertyReply(PropertyReply {
                tag,
                error: raw.error,
                name: String::new(),
                value: None,
            })
        }
        (kind, RawPayload::None) => return Err(MalformedEvent::MissingPayload(kind)),
        (kind, _) => return Err(MalformedEvent::PayloadMismatch(kind)),
    };

    Ok(Some(event))
}

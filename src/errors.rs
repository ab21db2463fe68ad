//! Error hierarchy for the mpv client layer.
//!
//! Every public operation returns [`Result`]. Failures are grouped by where
//! they originate: the handle lifecycle, the reply correlation layer, and
//! statuses reported by the engine itself.

use std::io;
use std::time::Duration;

use config::ConfigError;

use crate::engine::status::describe;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

/// Why the correlator stopped accepting requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The owner called `close`.
    Closed,
    /// The engine emitted `SHUTDOWN` on its own.
    EngineShutdown,
}

impl std::fmt::Display for CloseReason {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            CloseReason::Closed => f.write_str("handle closed"),
            CloseReason::EngineShutdown => f.write_str("engine shut down"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Operation issued before `open` completed
    #[error("Engine handle is not ready")]
    NotReady,

    /// `open` called on a handle that is already open or opening
    #[error("Engine handle is already open")]
    AlreadyOpen,

    /// Operation issued after `close`
    #[error("Engine handle used after close")]
    UseAfterClose,

    /// The engine shut itself down; no further replies will arrive
    #[error("Engine has shut down")]
    EngineShutdown,

    /// Local wait for a reply exceeded its deadline
    #[error("Timed out after {after:?} waiting for reply")]
    Timeout { after: Duration },

    /// Outstanding request resolved by teardown
    #[error("Request cancelled: {0}")]
    Cancelled(CloseReason),

    /// Tag counter wrapped onto a tag that is still outstanding
    #[error("Request tag {tag} is still outstanding")]
    TagCollision { tag: u64 },

    /// `create()` returned no handle
    #[error("Failed to create engine instance")]
    EngineCreate,

    /// Synchronous primitive returned a failure status
    #[error("Engine rejected {operation}: {} (code {code})", describe(*.code))]
    EngineRejected { operation: &'static str, code: i32 },

    /// Reply event carried a negative status
    #[error("Engine replied with error: {} (code {code})", describe(*.code))]
    ReplyError { code: i32 },

    #[error("Invalid option {name}: {} (code {code})", describe(*.code))]
    InvalidOption { name: String, code: i32 },

    #[error("Property {name} rejected: {} (code {code})", describe(*.code))]
    PropertyRejected { name: String, code: i32 },

    #[error("Command failed: {} (code {code})", describe(*.code))]
    CommandFailed { code: i32 },

    #[error("Command argument list is empty")]
    EmptyCommand,

    /// Playback ended with an error reason
    #[error("Playback failed: {} (code {code})", describe(*.code))]
    PlaybackFailed { code: i32 },

    #[error("Failed to spawn event pump: {0}")]
    PumpSpawn(#[source] io::Error),

    #[error(transparent)]
    Metrics(#[from] prometheus::Error),

    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// Maps a reply-level failure onto the error type of the facade operation
    /// that issued the request. Lifecycle errors pass through untouched.
    pub(crate) fn map_reply<F>(
        self,
        f: F,
    ) -> Self
    where
        F: FnOnce(i32) -> Error,
    {
        match self {
            Error::ReplyError { code } => f(code),
            other => other,
        }
    }
}

impl From<CloseReason> for Error {
    fn from(reason: CloseReason) -> Self {
        match reason {
            CloseReason::Closed => Error::UseAfterClose,
            CloseReason::EngineShutdown => Error::EngineShutdown,
        }
    }
}

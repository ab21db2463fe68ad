//! Boundary to the embedded player engine.
//!
//! [`Engine`] is the set of primitives the client layer drives. Everything
//! above this trait is engine-agnostic: tests run against an in-process fake
//! and the `libmpv` feature provides [`LibMpv`] over the native library.

mod event;
pub mod status;

#[cfg(feature = "libmpv")]
mod ffi;

pub use event::*;
#[cfg(feature = "libmpv")]
pub use ffi::LibMpv;


#[cfg(test)]
use mockall::automock;

/// Tag value reserved for traffic that does not expect a reply.
pub const RESERVED_TAG: u64 = 0;

/// Owned copy of one result of [`Engine::wait_event`].
///
/// The native event is only valid until the next poll, so implementations
/// copy its payload out before returning.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub event_id: u32,
    pub error: i32,
    pub reply_userdata: u64,
    pub data: RawPayload,
}

impl RawEvent {
    pub fn none() -> Self {
        Self {
            event_id: EventKind::None as u32,
            error: 0,
            reply_userdata: RESERVED_TAG,
            data: RawPayload::None,
        }
    }

    pub fn new(
        kind: EventKind,
        error: i32,
        reply_userdata: u64,
        data: RawPayload,
    ) -> Self {
        Self {
            event_id: kind as u32,
            error,
            reply_userdata,
            data,
        }
    }
}

/// Kind-specific payload, undecoded.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    None,
    LogMessage {
        prefix: String,
        level: String,
        text: String,
    },
    Property {
        name: String,
        value: Option<String>,
    },
    StartFile {
        playlist_entry_id: i64,
    },
    EndFile {
        reason: i32,
        error: i32,
        playlist_entry_id: i64,
    },
}

/// Primitives exposed by one engine instance.
///
/// Synchronous primitives report failure with a non-zero status. Tagged
/// submissions (`*_async`) report a refused submission with a negative status;
/// otherwise their outcome arrives later as a reply event echoing `tag`.
///
/// After [`Engine::terminate_destroy`] no other method may be called.
#[cfg_attr(test, automock)]
pub trait Engine: Send + Sync + 'static {
    fn initialize(&self) -> i32;

    fn set_option_string(
        &self,
        name: &str,
        value: &str,
    ) -> i32;

    fn set_property_string(
        &self,
        name: &str,
        value: &str,
    ) -> i32;

    fn set_property_async(
        &self,
        tag: u64,
        name: &str,
        value: &str,
    ) -> i32;

    fn get_property_async(
        &self,
        tag: u64,
        name: &str,
    ) -> i32;

    fn command(
        &self,
        args: &[String],
    ) -> i32;

    fn command_async(
        &self,
        tag: u64,
        args: &[String],
    ) -> i32;

    fn request_log_messages(
        &self,
        min_level: &str,
    ) -> i32;

    /// Blocks for the next event. A negative timeout waits indefinitely; an
    /// expired wait returns an event of kind `NONE`.
    fn wait_event(
        &self,
        timeout_secs: f64,
    ) -> RawEvent;

    /// Makes a blocked `wait_event` return promptly.
    fn wakeup(&self);

    fn terminate_destroy(&self);
}

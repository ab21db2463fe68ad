//! Engine status codes.
//!
//! Values follow the libmpv convention: zero or positive is success,
//! negative values identify the failure.

pub const SUCCESS: i32 = 0;
pub const EVENT_QUEUE_FULL: i32 = -1;
pub const NOMEM: i32 = -2;
pub const UNINITIALIZED: i32 = -3;
pub const INVALID_PARAMETER: i32 = -4;
pub const OPTION_NOT_FOUND: i32 = -5;
pub const OPTION_FORMAT: i32 = -6;
pub const OPTION_ERROR: i32 = -7;
pub const PROPERTY_NOT_FOUND: i32 = -8;
pub const PROPERTY_FORMAT: i32 = -9;
pub const PROPERTY_UNAVAILABLE: i32 = -10;
pub const PROPERTY_ERROR: i32 = -11;
pub const COMMAND: i32 = -12;
pub const LOADING_FAILED: i32 = -13;
pub const AO_INIT_FAILED: i32 = -14;
pub const VO_INIT_FAILED: i32 = -15;
pub const NOTHING_TO_PLAY: i32 = -16;
pub const UNKNOWN_FORMAT: i32 = -17;
pub const UNSUPPORTED: i32 = -18;
pub const NOT_IMPLEMENTED: i32 = -19;
pub const GENERIC: i32 = -20;

/// Human-readable text for a status code.
pub fn describe(code: i32) -> &'static str {
    match code {
        c if c >= SUCCESS => "success",
        EVENT_QUEUE_FULL => "event queue full",
        NOMEM => "memory allocation failed",
        UNINITIALIZED => "core not initialized",
        INVALID_PARAMETER => "invalid parameter",
        OPTION_NOT_FOUND => "option not found",
        OPTION_FORMAT => "unsupported format for accessing option",
        OPTION_ERROR => "error setting option",
        PROPERTY_NOT_FOUND => "property not found",
        PROPERTY_FORMAT => "unsupported format for accessing property",
        PROPERTY_UNAVAILABLE => "property unavailable",
        PROPERTY_ERROR => "error accessing property",
        COMMAND => "error running command",
        LOADING_FAILED => "loading failed",
        AO_INIT_FAILED => "audio output initialization failed",
        VO_INIT_FAILED => "video output initialization failed",
        NOTHING_TO_PLAY => "no audio or video data played",
        UNKNOWN_FORMAT => "unrecognized file format",
        UNSUPPORTED => "not supported",
        NOT_IMPLEMENTED => "operation not implemented",
        GENERIC => "something happened",
        _ => "unknown error",
    }
}

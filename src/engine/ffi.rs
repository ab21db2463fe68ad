//! Native libmpv binding.
//!
//! Only the client API subset the correlation layer drives is declared.
//! Every event payload is copied into a [`RawPayload`] before
//! [`Engine::wait_event`] returns, so no engine-owned memory outlives a poll.
#![allow(non_camel_case_types, dead_code)]

use std::ffi::c_char;
use std::ffi::c_int;
use std::ffi::c_void;
use std::ffi::CStr;
use std::ffi::CString;
use std::ptr;
use std::sync::atomic::AtomicPtr;
use std::sync::atomic::Ordering;

use tracing::warn;

use super::status;
use super::Engine;
use super::EventKind;
use super::RawEvent;
use super::RawPayload;
use crate::Error;
use crate::Result;

const MPV_FORMAT_STRING: c_int = 1;

#[repr(C)]
struct mpv_handle {
    _private: [u8; 0],
}

#[repr(C)]
struct mpv_event {
    event_id: c_int,
    error: c_int,
    reply_userdata: u64,
    data: *mut c_void,
}

#[repr(C)]
struct mpv_event_log_message {
    prefix: *const c_char,
    level: *const c_char,
    text: *const c_char,
    log_level: c_int,
}

#[repr(C)]
struct mpv_event_property {
    name: *const c_char,
    format: c_int,
    data: *mut c_void,
}

#[repr(C)]
struct mpv_event_start_file {
    playlist_entry_id: i64,
}

#[repr(C)]
struct mpv_event_end_file {
    reason: c_int,
    error: c_int,
    playlist_entry_id: i64,
}

#[cfg_attr(windows, link(name = "mpv-2"))]
#[cfg_attr(not(windows), link(name = "mpv"))]
extern "C" {
    fn mpv_create() -> *mut mpv_handle;
    fn mpv_initialize(ctx: *mut mpv_handle) -> c_int;
    fn mpv_terminate_destroy(ctx: *mut mpv_handle);
    fn mpv_set_option_string(
        ctx: *mut mpv_handle,
        name: *const c_char,
        data: *const c_char,
    ) -> c_int;
    fn mpv_set_property_string(
        ctx: *mut mpv_handle,
        name: *const c_char,
        data: *const c_char,
    ) -> c_int;
    fn mpv_set_property_async(
        ctx: *mut mpv_handle,
        reply_userdata: u64,
        name: *const c_char,
        format: c_int,
        data: *mut c_void,
    ) -> c_int;
    fn mpv_get_property_async(
        ctx: *mut mpv_handle,
        reply_userdata: u64,
        name: *const c_char,
        format: c_int,
    ) -> c_int;
    fn mpv_command(
        ctx: *mut mpv_handle,
        args: *mut *const c_char,
    ) -> c_int;
    fn mpv_command_async(
        ctx: *mut mpv_handle,
        reply_userdata: u64,
        args: *mut *const c_char,
    ) -> c_int;
    fn mpv_wait_event(
        ctx: *mut mpv_handle,
        timeout: f64,
    ) -> *mut mpv_event;
    fn mpv_wakeup(ctx: *mut mpv_handle);
    fn mpv_request_log_messages(
        ctx: *mut mpv_handle,
        min_level: *const c_char,
    ) -> c_int;
}

/// One native mpv instance.
///
/// The context pointer is swapped to null by `terminate_destroy`; any later
/// call reports `UNINITIALIZED` instead of touching freed memory.
pub struct LibMpv {
    ctx: AtomicPtr<mpv_handle>,
}

// libmpv client handles are thread-safe; the event queue is drained by a
// single pump thread.
unsafe impl Send for LibMpv {}
unsafe impl Sync for LibMpv {}

impl LibMpv {
    pub fn create() -> Result<Self> {
        // SAFETY: mpv_create has no preconditions.
        let ctx = unsafe { mpv_create() };
        if ctx.is_null() {
            return Err(Error::EngineCreate);
        }
        Ok(Self {
            ctx: AtomicPtr::new(ctx),
        })
    }

    fn ctx(&self) -> Option<*mut mpv_handle> {
        let ctx = self.ctx.load(Ordering::Acquire);
        (!ctx.is_null()).then_some(ctx)
    }
}

fn c_string(value: &str) -> Option<CString> {
    match CString::new(value) {
        Ok(s) => Some(s),
        Err(_) => {
            warn!(value, "string contains an interior NUL byte");
            None
        }
    }
}

fn c_args(args: &[String]) -> Option<Vec<CString>> {
    args.iter().map(|a| c_string(a)).collect()
}

/// Null-terminated pointer array borrowing from `owned`.
fn argv(owned: &[CString]) -> Vec<*const c_char> {
    owned.iter().map(|s| s.as_ptr()).chain(std::iter::once(ptr::null())).collect()
}

/// # Safety
/// `p` must be null or point to a NUL-terminated string valid for the call.
unsafe fn copy_str(p: *const c_char) -> String {
    if p.is_null() {
        return String::new();
    }
    CStr::from_ptr(p).to_string_lossy().into_owned()
}

/// # Safety
/// `event` must be the pointer returned by the latest `mpv_wait_event`.
unsafe fn copy_payload(event: &mpv_event) -> RawPayload {
    if event.data.is_null() {
        return RawPayload::None;
    }

    match EventKind::from_id(event.event_id as u32) {
        Some(EventKind::LogMessage) => {
            let msg = &*(event.data as *const mpv_event_log_message);
            RawPayload::LogMessage {
                prefix: copy_str(msg.prefix),
                level: copy_str(msg.level),
                text: copy_str(msg.text),
            }
        }
        Some(EventKind::GetPropertyReply) => {
            let prop = &*(event.data as *const mpv_event_property);
            let value = if prop.format == MPV_FORMAT_STRING && !prop.data.is_null() {
                Some(copy_str(*(prop.data as *const *const c_char)))
            } else {
                None
            };
            RawPayload::Property {
                name: copy_str(prop.name),
                value,
            }
        }
        Some(EventKind::StartFile) => {
            let start = &*(event.data as *const mpv_event_start_file);
            RawPayload::StartFile {
                playlist_entry_id: start.playlist_entry_id,
            }
        }
        Some(EventKind::EndFile) => {
            let end = &*(event.data as *const mpv_event_end_file);
            RawPayload::EndFile {
                reason: end.reason,
                error: end.error,
                playlist_entry_id: end.playlist_entry_id,
            }
        }
        _ => RawPayload::None,
    }
}

impl Engine for LibMpv {
    fn initialize(&self) -> i32 {
        let Some(ctx) = self.ctx() else {
            return status::UNINITIALIZED;
        };
        unsafe { mpv_initialize(ctx) }
    }

    fn set_option_string(
        &self,
        name: &str,
        value: &str,
    ) -> i32 {
        let (Some(ctx), Some(name), Some(value)) = (self.ctx(), c_string(name), c_string(value)) else {
            return status::INVALID_PARAMETER;
        };
        unsafe { mpv_set_option_string(ctx, name.as_ptr(), value.as_ptr()) }
    }

    fn set_property_string(
        &self,
        name: &str,
        value: &str,
    ) -> i32 {
        let (Some(ctx), Some(name), Some(value)) = (self.ctx(), c_string(name), c_string(value)) else {
            return status::INVALID_PARAMETER;
        };
        unsafe { mpv_set_property_string(ctx, name.as_ptr(), value.as_ptr()) }
    }

    fn set_property_async(
        &self,
        tag: u64,
        name: &str,
        value: &str,
    ) -> i32 {
        let (Some(ctx), Some(name), Some(value)) = (self.ctx(), c_string(name), c_string(value)) else {
            return status::INVALID_PARAMETER;
        };
        // The engine copies the value before returning.
        let mut data = value.as_ptr();
        unsafe {
            mpv_set_property_async(
                ctx,
                tag,
                name.as_ptr(),
                MPV_FORMAT_STRING,
                &mut data as *mut *const c_char as *mut c_void,
            )
        }
    }

    fn get_property_async(
        &self,
        tag: u64,
        name: &str,
    ) -> i32 {
        let (Some(ctx), Some(name)) = (self.ctx(), c_string(name)) else {
            return status::INVALID_PARAMETER;
        };
        unsafe { mpv_get_property_async(ctx, tag, name.as_ptr(), MPV_FORMAT_STRING) }
    }

    fn command(
        &self,
        args: &[String],
    ) -> i32 {
        let (Some(ctx), Some(owned)) = (self.ctx(), c_args(args)) else {
            return status::INVALID_PARAMETER;
        };
        let mut ptrs = argv(&owned);
        unsafe { mpv_command(ctx, ptrs.as_mut_ptr()) }
    }

    fn command_async(
        &self,
        tag: u64,
        args: &[String],
    ) -> i32 {
        let (Some(ctx), Some(owned)) = (self.ctx(), c_args(args)) else {
            return status::INVALID_PARAMETER;
        };
        let mut ptrs = argv(&owned);
        unsafe { mpv_command_async(ctx, tag, ptrs.as_mut_ptr()) }
    }

    fn request_log_messages(
        &self,
        min_level: &str,
    ) -> i32 {
        let (Some(ctx), Some(level)) = (self.ctx(), c_string(min_level)) else {
            return status::INVALID_PARAMETER;
        };
        unsafe { mpv_request_log_messages(ctx, level.as_ptr()) }
    }

    fn wait_event(
        &self,
        timeout_secs: f64,
    ) -> RawEvent {
        let Some(ctx) = self.ctx() else {
            return RawEvent::none();
        };
        // SAFETY: the returned event stays valid until the next wait on this
        // handle, and only the pump thread waits.
        unsafe {
            let event = mpv_wait_event(ctx, timeout_secs);
            if event.is_null() {
                return RawEvent::none();
            }
            let event = &*event;
            RawEvent {
                event_id: event.event_id as u32,
                error: event.error,
                reply_userdata: event.reply_userdata,
                data: copy_payload(event),
            }
        }
    }

    fn wakeup(&self) {
        if let Some(ctx) = self.ctx() {
            unsafe { mpv_wakeup(ctx) }
        }
    }

    fn terminate_destroy(&self) {
        let ctx = self.ctx.swap(ptr::null_mut(), Ordering::AcqRel);
        if !ctx.is_null() {
            unsafe { mpv_terminate_destroy(ctx) }
        }
    }
}

impl Drop for LibMpv {
    fn drop(&mut self) {
        // No-op when the owner already terminated the handle.
        self.terminate_destroy();
    }
}

//! Client layer for driving an embedded mpv engine from async Rust.
//!
//! The engine exposes one event queue per instance and echoes a 64-bit tag on
//! every reply. This crate turns that into awaitable requests and typed
//! notifications:
//!
//! - [`Player`] owns the engine, its lifecycle and the request facade
//! - [`correlator`] matches reply events to waiting requests by tag
//! - [`notify`] fans notification events out to subscribers
//! - [`engine`] is the boundary trait plus event decoding; the `libmpv`
//!   feature adds the native binding
//!
//! ```ignore
//! let player = Player::new(PlayerConfig::new()?.validate()?);
//! player.open(LibMpv::create()?)?;
//! player.set_property_string("volume", "70").await?;
//! let end = player.play_to_end("https://example.com/live.m3u8").await?;
//! player.close();
//! ```

mod config;
mod constants;
pub mod correlator;
pub mod engine;
mod errors;
pub mod metrics;
pub mod notify;
mod player;
mod pump;

pub use config::*;
pub use errors::*;
pub use player::*;

pub use correlator::ReplyCorrelator;
pub use correlator::RequestTag;
pub use engine::Engine;
pub use engine::EngineEvent;
pub use engine::EventKind;
pub use notify::EventKindSet;
pub use notify::QueuedSubscription;
pub use notify::Subscription;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub(crate) mod test_utils;

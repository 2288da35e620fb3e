//! # XR Tour Player Library (xrtour-player)
//!
//! Playback coordinator for the audio / 360° video tour player.
//!
//! **Purpose:** Own a single persistent audio resource, fall back across
//! candidate sources when one fails, keep a panoramic video aligned with the
//! audio, and switch between audio-only and XR presentation without
//! disturbing playback. Visual surfaces talk to the coordinator over the
//! HTTP/SSE control interface.
//!
//! **Architecture:** one tokio task (the coordinator) serialises intents,
//! media events and timers; notifications leave over the EventBus and a
//! read-only snapshot is published into [`SharedState`].

pub mod api;
pub mod error;
pub mod events;
pub mod media;
pub mod orientation;
pub mod playback;
pub mod state;

pub use error::{Error, Result};
pub use playback::{Command, PlayerCoordinator, PlayerHandle};
pub use state::{PlayerSnapshot, SharedState};

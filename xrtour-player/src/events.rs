//! Event system for the xrtour player
//!
//! Hybrid communication, as in the rest of the service:
//! - **EventBus** (tokio::broadcast): coordinator → visual surfaces
//! - **Command channel** (tokio::mpsc): visual surfaces → coordinator
//! - **Media event channel** (tokio::mpsc): audio resource → coordinator
//! - **Shared state** (Arc<RwLock<T>>): read-only snapshot
//!
//! This module re-exports the shared event types from xrtour-common and
//! defines the internal media events.

pub use xrtour_common::events::{EventBus, NoticeLevel, PresentationMode, XrEvent};

/// Events observed on the audio playback resource
///
/// Not exposed via SSE. The resource emits them on an unbounded channel so
/// emission never blocks the emitter.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Resource started playing
    Play,

    /// Resource paused (explicitly, on source swap, or at the end)
    Pause,

    /// Playback reached the end of the source
    Ended,

    /// Periodic position update
    TimeUpdate {
        current_time: f64,
        /// 0 while unknown
        duration: f64,
    },

    /// Source metadata resolved
    LoadedMetadata { duration: f64 },

    /// Source failed to load or decode
    Error {
        /// Source the failure belongs to; stale failures are ignored
        source: String,
        message: String,
    },
}

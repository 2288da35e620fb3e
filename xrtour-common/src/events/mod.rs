//! Event types for the XR tour event system
//!
//! Provides the shared event definitions and the EventBus through which the
//! playback coordinator notifies visual surfaces. Surfaces only ever observe
//! these notifications; they never receive errors from the core directly.

mod mode_types;

pub use mode_types::{NoticeLevel, PresentationMode};

use crate::permission::OrientationPermission;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

type Timestamp = chrono::DateTime<chrono::Utc>;

/// XR tour event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum XrEvent {
    /// Audio started or stopped (mirrors the resource's play/pause events)
    PlaybackStateChanged {
        is_playing: bool,
        current_time: f64,
        timestamp: Timestamp,
    },

    /// Periodic position update from the audio resource
    PlaybackProgress {
        current_time: f64,
        duration: f64,
        timestamp: Timestamp,
    },

    /// Audio reached its end; position was reset to zero
    PlaybackEnded {
        source_url: String,
        timestamp: Timestamp,
    },

    /// The playback resource was reattached to a new source
    SourceChanged {
        source_url: String,
        source_index: usize,
        timestamp: Timestamp,
    },

    /// A source failed and the next fallback candidate is being tried
    ///
    /// Informational: playback has not failed terminally.
    FallbackAdvanced {
        failed_url: String,
        source_url: String,
        source_index: usize,
        timestamp: Timestamp,
    },

    /// Every fallback candidate failed; playback needs a user retry
    SourcesExhausted {
        attempted: usize,
        timestamp: Timestamp,
    },

    /// The play control was used as a retry after terminal failure
    PlaybackRetry {
        source_url: String,
        timestamp: Timestamp,
    },

    /// Play was rejected for a reason other than an unsupported source
    PlaybackError {
        message: String,
        timestamp: Timestamp,
    },

    MuteChanged {
        muted: bool,
        timestamp: Timestamp,
    },

    /// Synchronizer snapped the video back onto the audio position
    VideoResynced {
        video_time: f64,
        audio_time: f64,
        drift: f64,
        timestamp: Timestamp,
    },

    /// Presentation mode switched (audio-only ⇄ XR)
    ModeChanged {
        old_mode: PresentationMode,
        new_mode: PresentationMode,
        timestamp: Timestamp,
    },

    /// Image carousel moved to another slide
    SlideChanged {
        index: usize,
        content_id: Option<String>,
        timestamp: Timestamp,
    },

    /// The offscreen panorama finished warming up the slide's video
    XrContentPreloaded {
        content_id: Option<String>,
        video_src: String,
        timestamp: Timestamp,
    },

    /// Loading indicator shown or hidden
    XrLoading {
        visible: bool,
        /// True when hidden by the loading ceiling rather than readiness
        forced: bool,
        timestamp: Timestamp,
    },

    /// Camera orientation was reset to the neutral pose
    Recentered { timestamp: Timestamp },

    OrientationPermissionChanged {
        status: OrientationPermission,
        timestamp: Timestamp,
    },

    /// Toast-style user notice
    Notice {
        level: NoticeLevel,
        title: String,
        description: String,
        timestamp: Timestamp,
    },
}

impl XrEvent {
    /// Event type name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            XrEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            XrEvent::PlaybackProgress { .. } => "PlaybackProgress",
            XrEvent::PlaybackEnded { .. } => "PlaybackEnded",
            XrEvent::SourceChanged { .. } => "SourceChanged",
            XrEvent::FallbackAdvanced { .. } => "FallbackAdvanced",
            XrEvent::SourcesExhausted { .. } => "SourcesExhausted",
            XrEvent::PlaybackRetry { .. } => "PlaybackRetry",
            XrEvent::PlaybackError { .. } => "PlaybackError",
            XrEvent::MuteChanged { .. } => "MuteChanged",
            XrEvent::VideoResynced { .. } => "VideoResynced",
            XrEvent::ModeChanged { .. } => "ModeChanged",
            XrEvent::SlideChanged { .. } => "SlideChanged",
            XrEvent::XrContentPreloaded { .. } => "XrContentPreloaded",
            XrEvent::XrLoading { .. } => "XrLoading",
            XrEvent::Recentered { .. } => "Recentered",
            XrEvent::OrientationPermissionChanged { .. } => "OrientationPermissionChanged",
            XrEvent::Notice { .. } => "Notice",
        }
    }

    /// Build a user notice stamped with the current time
    pub fn notice(level: NoticeLevel, title: impl Into<String>, description: impl Into<String>) -> Self {
        XrEvent::Notice {
            level,
            title: title.into(),
            description: description.into(),
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Central event distribution bus
///
/// Thin wrapper over `tokio::sync::broadcast`. Slow subscribers lag and lose
/// the oldest events rather than blocking the coordinator.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<XrEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use xrtour_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(256);
    /// assert_eq!(event_bus.capacity(), 256);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<XrEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: XrEvent) -> Result<usize, broadcast::error::SendError<XrEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: XrEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eventbus_subscribe() {
        let bus = EventBus::new(16);
        assert_eq!(bus.subscriber_count(), 0);
        let _rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_eventbus_emit_no_subscribers() {
        let bus = EventBus::new(16);
        let event = XrEvent::Recentered {
            timestamp: chrono::Utc::now(),
        };
        assert!(bus.emit(event).is_err());
    }

    #[tokio::test]
    async fn test_eventbus_emit_with_subscriber() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit_lossy(XrEvent::ModeChanged {
            old_mode: PresentationMode::AudioOnly,
            new_mode: PresentationMode::Xr,
            timestamp: chrono::Utc::now(),
        });

        match rx.recv().await.unwrap() {
            XrEvent::ModeChanged { old_mode, new_mode, .. } => {
                assert_eq!(old_mode, PresentationMode::AudioOnly);
                assert_eq!(new_mode, PresentationMode::Xr);
            }
            other => panic!("Wrong event type received: {:?}", other),
        }
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = XrEvent::SourcesExhausted {
            attempted: 3,
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "SourcesExhausted");
        assert_eq!(json["attempted"], 3);
        assert_eq!(event.event_type(), "SourcesExhausted");
    }
}

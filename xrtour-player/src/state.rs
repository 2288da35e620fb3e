//! Shared player state
//!
//! The coordinator publishes a read-only [`PlayerSnapshot`] here after every
//! step; HTTP handlers read it without going through the coordinator.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;
use xrtour_common::OrientationPermission;

use crate::events::{EventBus, PresentationMode, XrEvent};
use crate::playback::PlaybackState;

/// Everything a visual surface needs to render the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub source_url: String,
    pub is_playing: bool,
    pub current_time: f64,
    pub duration: f64,
    pub is_muted: bool,
    pub load_error: bool,
    pub source_index: usize,
    /// Display name of the audio source
    pub audio_name: String,
    pub mode: PresentationMode,
    pub current_slide: usize,
    pub active_content_id: Option<String>,
    pub preloaded_content_id: Option<String>,
    pub preload_ready: bool,
    pub loading_visible: bool,
    pub orientation_permission: OrientationPermission,
    pub motion_tracking: bool,
    pub session_id: Uuid,
}

impl PlayerSnapshot {
    /// Snapshot of a freshly created session
    pub fn initial(session_id: Uuid, source_url: impl Into<String>) -> Self {
        let playback = PlaybackState::new(source_url);
        Self {
            source_url: playback.source_url,
            is_playing: playback.is_playing,
            current_time: playback.current_time,
            duration: playback.duration,
            is_muted: playback.is_muted,
            load_error: playback.load_error,
            source_index: playback.source_index,
            audio_name: String::new(),
            mode: PresentationMode::AudioOnly,
            current_slide: 0,
            active_content_id: None,
            preloaded_content_id: None,
            preload_ready: false,
            loading_visible: false,
            orientation_permission: OrientationPermission::Unknown,
            motion_tracking: false,
            session_id,
        }
    }

    /// Copy the playback fields from `playback`
    pub fn apply_playback(&mut self, playback: &PlaybackState) {
        self.source_url.clone_from(&playback.source_url);
        self.is_playing = playback.is_playing;
        self.current_time = playback.current_time;
        self.duration = playback.duration;
        self.is_muted = playback.is_muted;
        self.load_error = playback.load_error;
        self.source_index = playback.source_index;
    }
}

/// Shared state accessible by the coordinator and the HTTP layer
///
/// Uses RwLock for concurrent read access with one writer.
pub struct SharedState {
    snapshot: RwLock<PlayerSnapshot>,
    events: Arc<EventBus>,
}

impl SharedState {
    pub fn new(initial: PlayerSnapshot, events: Arc<EventBus>) -> Self {
        Self {
            snapshot: RwLock::new(initial),
            events,
        }
    }

    /// Latest published snapshot
    pub async fn get(&self) -> PlayerSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Publish a new snapshot (coordinator only)
    pub async fn set(&self, snapshot: PlayerSnapshot) {
        *self.snapshot.write().await = snapshot;
    }

    /// Subscribe to event stream for SSE
    pub fn subscribe_events(&self) -> broadcast::Receiver<XrEvent> {
        self.events.subscribe()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_replaces_snapshot() {
        let session = Uuid::new_v4();
        let state = SharedState::new(
            PlayerSnapshot::initial(session, "a.mp3"),
            Arc::new(EventBus::new(16)),
        );

        let mut next = state.get().await;
        next.is_playing = true;
        next.mode = PresentationMode::Xr;
        state.set(next).await;

        let read = state.get().await;
        assert!(read.is_playing);
        assert_eq!(read.mode, PresentationMode::Xr);
        assert_eq!(read.session_id, session);
    }

    #[test]
    fn test_snapshot_serializes_mode_snake_case() {
        let snapshot = PlayerSnapshot::initial(Uuid::nil(), "a.mp3");
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["mode"], "audio_only");
        assert_eq!(json["orientation_permission"], "unknown");
        assert_eq!(json["source_index"], 0);
    }
}

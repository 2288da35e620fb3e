//! Playback state management

use serde::{Deserialize, Serialize};

/// Observable state of the audio playback resource
///
/// Single source of truth for the transport bar and the synchronizer.
/// Only [`PlaybackOwner`](super::PlaybackOwner) mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    /// Currently requested audio source
    pub source_url: String,
    pub is_playing: bool,
    /// Seconds
    pub current_time: f64,
    /// Seconds; 0 until metadata resolves
    pub duration: f64,
    pub is_muted: bool,
    /// Set once every fallback source failed; cleared by a user retry
    pub load_error: bool,
    /// Index into the fallback list of the source being attempted
    pub source_index: usize,
}

impl PlaybackState {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            is_playing: false,
            current_time: 0.0,
            duration: 0.0,
            is_muted: false,
            load_error: false,
            source_index: 0,
        }
    }
}

//! Presentation-mode and notice type definitions

use serde::{Deserialize, Serialize};

/// Which visual surface is shown
///
/// The mode never affects playback; audio keeps running underneath both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationMode {
    /// Image carousel + transport bar
    #[default]
    AudioOnly,
    /// Panoramic video scene
    Xr,
}

impl std::fmt::Display for PresentationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PresentationMode::AudioOnly => write!(f, "audio_only"),
            PresentationMode::Xr => write!(f, "xr"),
        }
    }
}

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    /// Blocking error the user must act on
    Destructive,
}

//! Media resource boundaries
//!
//! The coordinator depends on three collaborators only through these traits:
//! - [`AudioResource`]: the single persistent audio element
//! - [`VideoSink`]: the panorama's video binding, an opaque play/pause/seek sink
//! - [`PanoramaSurface`]: a panoramic scene (visible or offscreen preload)
//!
//! [`headless`] provides wall-clock implementations used by the service binary.

pub mod headless;

use std::sync::Arc;
use thiserror::Error;

pub use headless::{HeadlessAudio, HeadlessCamera, HeadlessPanorama, HeadlessVideo};

/// Failure reported by a media resource
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MediaError {
    /// No decodable source is attached ("no supported sources")
    #[error("no supported sources: {0}")]
    UnsupportedSource(String),

    /// Playback was refused (autoplay policy, brief decode stall)
    #[error("playback rejected: {0}")]
    Rejected(String),

    /// Source could not be attached
    #[error("load failed: {0}")]
    Load(String),
}

impl MediaError {
    /// Whether this failure should be handled by trying another source
    pub fn is_unsupported_source(&self) -> bool {
        matches!(self, MediaError::UnsupportedSource(_))
    }
}

/// The persistent audio playback resource
///
/// Implementations report asynchronous outcomes (metadata, load errors,
/// progress, end of stream) as [`crate::events::MediaEvent`]s on the channel
/// they were constructed with.
pub trait AudioResource: Send + 'static {
    /// Currently attached source, if any
    fn source(&self) -> Option<&str>;

    /// Attach a new source, pausing and rewinding the resource
    ///
    /// Returns `Err` only for synchronous failures; decode failures arrive
    /// later as `MediaEvent::Error`.
    fn attach(&mut self, url: &str) -> Result<(), MediaError>;

    fn play(&mut self) -> Result<(), MediaError>;

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    /// Position in seconds
    fn current_time(&self) -> f64;

    fn set_current_time(&mut self, seconds: f64);

    fn set_muted(&mut self, muted: bool);

    fn is_muted(&self) -> bool;

    /// Advance internal clocks and emit progress events
    ///
    /// Called on the progress cadence. Resources that push their own events
    /// can leave the default.
    fn poll(&mut self) {}

    /// Detach the source and free decoding resources
    fn release(&mut self);
}

/// Video binding of a panoramic scene
///
/// Only the synchronizer issues commands to it.
pub trait VideoSink: Send + 'static {
    /// Position in seconds
    fn current_time(&self) -> f64;

    fn is_paused(&self) -> bool;

    fn play(&mut self) -> Result<(), MediaError>;

    fn pause(&mut self);

    fn seek_to(&mut self, seconds: f64);
}

/// Handle to a panorama's camera, obtained from the surface once it is built
pub trait CameraRig: Send + Sync {
    /// Reset yaw/pitch to the neutral pose. Must be idempotent.
    fn reset_orientation(&self);
}

/// A panoramic scene that renders one 360° video
pub trait PanoramaSurface: Send + 'static {
    type Video: VideoSink;

    /// Start constructing the scene for `video_src`
    fn load(&mut self, video_src: &str);

    /// Video source most recently passed to [`load`](Self::load)
    fn loaded_source(&self) -> Option<&str>;

    /// Scene finished constructing and its video can play
    fn is_ready(&self) -> bool;

    /// Video binding; `None` until the scene is constructed
    fn video_mut(&mut self) -> Option<&mut Self::Video>;

    /// Camera handle; `None` until the scene is constructed
    fn camera(&self) -> Option<Arc<dyn CameraRig>>;

    /// Show the surface and enable its camera controls (or hide/disable)
    fn set_active(&mut self, active: bool);

    /// Enable device-orientation camera rotation; disabled means a fixed viewpoint
    fn set_motion_tracking(&mut self, enabled: bool);

    fn release(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_source_classification() {
        assert!(MediaError::UnsupportedSource("x".into()).is_unsupported_source());
        assert!(!MediaError::Rejected("autoplay".into()).is_unsupported_source());
        assert!(!MediaError::Load("x".into()).is_unsupported_source());
    }
}

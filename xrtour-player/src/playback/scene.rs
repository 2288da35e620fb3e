//! Presentation mode and scene control
//!
//! Tracks the AUDIO_ONLY ⇄ XR mode, the current slide, and the two panorama
//! surfaces: the visible one shown in XR mode and the offscreen one that
//! warms up the current slide's video. Nothing here touches the audio
//! resource; switching modes never changes playback.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};
use xrtour_common::{ContentCatalog, XrContent};

use crate::events::{EventBus, NoticeLevel, PresentationMode, XrEvent};
use crate::media::PanoramaSurface;

pub struct SceneController<P: PanoramaSurface> {
    catalog: ContentCatalog,
    mode: PresentationMode,
    current_slide: usize,
    /// Content bound to the visible surface
    active: Option<XrContent>,
    /// Video source handed to the preload surface
    preloaded_video: Option<String>,
    preload_ready: bool,
    surface: P,
    preload: P,
    motion_tracking: bool,
    loading_visible: bool,
    /// Loading indicator is force-hidden at this deadline
    loading_deadline: Option<Instant>,
    loading_ceiling: Duration,
    events: Arc<EventBus>,
}

impl<P: PanoramaSurface> SceneController<P> {
    /// Start in audio-only mode with the first catalog entry preloading
    pub fn new(
        catalog: ContentCatalog,
        surface: P,
        preload: P,
        loading_ceiling: Duration,
        events: Arc<EventBus>,
    ) -> Self {
        let active = catalog.current_content(0).cloned();
        let mut scene = Self {
            catalog,
            mode: PresentationMode::AudioOnly,
            current_slide: 0,
            active: None,
            preloaded_video: None,
            preload_ready: false,
            surface,
            preload,
            motion_tracking: false,
            loading_visible: false,
            loading_deadline: None,
            loading_ceiling,
            events,
        };
        if let Some(content) = active {
            scene.start_preload(&content.video_src);
            scene.active = Some(content);
        }
        scene
    }

    pub fn mode(&self) -> PresentationMode {
        self.mode
    }

    pub fn catalog(&self) -> &ContentCatalog {
        &self.catalog
    }

    pub fn current_slide(&self) -> usize {
        self.current_slide
    }

    pub fn active_content(&self) -> Option<&XrContent> {
        self.active.as_ref()
    }

    /// Catalog id of the content warming up offscreen
    pub fn preloaded_content_id(&self) -> Option<&str> {
        let video_src = self.preloaded_video.as_deref()?;
        self.catalog
            .find_by_video_src(video_src)
            .map(|content| content.id.as_str())
    }

    pub fn preloaded_video(&self) -> Option<&str> {
        self.preloaded_video.as_deref()
    }

    pub fn preload_ready(&self) -> bool {
        self.preload_ready
    }

    pub fn loading_visible(&self) -> bool {
        self.loading_visible
    }

    pub fn motion_tracking(&self) -> bool {
        self.motion_tracking
    }

    pub fn surface(&self) -> &P {
        &self.surface
    }

    pub fn preload_surface(&self) -> &P {
        &self.preload
    }

    /// Video binding of the visible panorama, present only in XR mode
    pub fn video_mut(&mut self) -> Option<&mut P::Video> {
        if self.mode == PresentationMode::Xr {
            self.surface.video_mut()
        } else {
            None
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.loading_deadline
    }

    /// The carousel moved to `index`
    ///
    /// A slide with catalog content becomes the current content and its video
    /// starts preloading. Mode and audio are left alone.
    pub fn slide_changed(&mut self, index: usize) {
        self.current_slide = index;
        let content = self.catalog.current_content(index).cloned();

        let content_id = content.as_ref().map(|c| c.id.clone());
        match content {
            Some(content) => {
                debug!("Slide {} selects content {}", index, content.id);
                self.start_preload(&content.video_src);
                self.active = Some(content);
            }
            None => debug!("Slide {} has no XR content", index),
        }

        self.events.emit_lossy(XrEvent::SlideChanged {
            index,
            content_id,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Switch to XR mode; returns false if already there
    pub fn enter_xr(&mut self, now: Instant) -> bool {
        if self.mode == PresentationMode::Xr {
            return false;
        }

        if !self.preload_ready {
            self.events.emit_lossy(XrEvent::notice(
                NoticeLevel::Info,
                "Loading XR Experience",
                "Please wait while the XR content loads...",
            ));
        }

        // Show what was warmed up, not what the carousel points at now
        if let Some(preloaded) = self.preloaded_video.as_deref() {
            let differs = self
                .active
                .as_ref()
                .map_or(true, |active| active.video_src != preloaded);
            if differs {
                if let Some(matching) = self.catalog.find_by_video_src(preloaded) {
                    debug!("Adopting preloaded content {}", matching.id);
                    self.active = Some(matching.clone());
                }
            }
        }

        let scene_label = match &self.active {
            Some(content) => {
                self.surface.load(&content.video_src);
                content.scene_label.clone()
            }
            None => "XR".to_string(),
        };
        self.surface.set_motion_tracking(self.motion_tracking);
        self.surface.set_active(true);

        self.set_mode(PresentationMode::Xr);
        info!("Entered XR mode ({})", scene_label);
        self.events.emit_lossy(XrEvent::notice(
            NoticeLevel::Info,
            "XR Mode Activated",
            format!("Entering {} experience", scene_label),
        ));

        if !self.surface.is_ready() {
            self.show_loading(now);
        }
        true
    }

    /// Switch back to audio-only; returns false if not in XR mode
    pub fn exit_xr(&mut self) -> bool {
        if self.mode != PresentationMode::Xr {
            return false;
        }

        self.hide_loading(false);
        self.surface.set_active(false);
        self.set_mode(PresentationMode::AudioOnly);
        info!("Returned to audio-only mode");
        self.events.emit_lossy(XrEvent::notice(
            NoticeLevel::Info,
            "XR Mode Deactivated",
            "Returning to audio-only mode",
        ));
        true
    }

    /// Reset the camera to the neutral pose; XR mode only
    pub fn recenter(&mut self) -> bool {
        if self.mode != PresentationMode::Xr {
            debug!("Recenter ignored outside XR mode");
            return false;
        }
        let Some(camera) = self.surface.camera() else {
            warn!("Recenter requested before the panorama camera exists");
            return false;
        };

        camera.reset_orientation();
        self.events.emit_lossy(XrEvent::Recentered {
            timestamp: chrono::Utc::now(),
        });
        self.events.emit_lossy(XrEvent::notice(
            NoticeLevel::Info,
            "Recenter",
            "Recentering XR experience",
        ));
        true
    }

    /// Enable or disable device-orientation camera rotation
    pub fn set_motion_tracking(&mut self, enabled: bool) {
        self.motion_tracking = enabled;
        self.surface.set_motion_tracking(enabled);
    }

    /// Pick up readiness changes reported by the surfaces
    pub fn poll_surfaces(&mut self) {
        if !self.preload_ready && self.preload.is_ready() {
            if let Some(video_src) = self.preloaded_video.clone() {
                if self.preload.loaded_source() == Some(video_src.as_str()) {
                    self.preload_ready = true;
                    debug!("Preloaded {}", video_src);
                    self.events.emit_lossy(XrEvent::XrContentPreloaded {
                        content_id: self.preloaded_content_id().map(str::to_string),
                        video_src,
                        timestamp: chrono::Utc::now(),
                    });
                }
            }
        }

        if self.loading_visible && self.surface.is_ready() {
            self.hide_loading(false);
        }
    }

    /// Force-hide the loading indicator once its ceiling elapses
    pub fn fire_due(&mut self, now: Instant) {
        if self.loading_deadline.is_some_and(|at| at <= now) {
            warn!(
                "XR content not ready after {:?}, hiding loading indicator",
                self.loading_ceiling
            );
            self.hide_loading(true);
        }
    }

    pub fn teardown(&mut self) {
        self.loading_deadline = None;
        self.loading_visible = false;
        self.surface.release();
        self.preload.release();
    }

    fn start_preload(&mut self, video_src: &str) {
        self.preloaded_video = Some(video_src.to_string());
        self.preload_ready = false;
        self.preload.load(video_src);
    }

    fn set_mode(&mut self, new_mode: PresentationMode) {
        let old_mode = std::mem::replace(&mut self.mode, new_mode);
        self.events.emit_lossy(XrEvent::ModeChanged {
            old_mode,
            new_mode,
            timestamp: chrono::Utc::now(),
        });
    }

    fn show_loading(&mut self, now: Instant) {
        self.loading_visible = true;
        self.loading_deadline = Some(now + self.loading_ceiling);
        self.events.emit_lossy(XrEvent::XrLoading {
            visible: true,
            forced: false,
            timestamp: chrono::Utc::now(),
        });
    }

    fn hide_loading(&mut self, forced: bool) {
        self.loading_deadline = None;
        if !self.loading_visible {
            return;
        }
        self.loading_visible = false;
        self.events.emit_lossy(XrEvent::XrLoading {
            visible: false,
            forced,
            timestamp: chrono::Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{HeadlessCamera, HeadlessPanorama};

    fn scene() -> SceneController<HeadlessPanorama> {
        SceneController::new(
            ContentCatalog::default_tour(),
            HeadlessPanorama::new(),
            HeadlessPanorama::new(),
            Duration::from_secs(8),
            Arc::new(EventBus::new(64)),
        )
    }

    #[test]
    fn test_starts_audio_only_preloading_first_entry() {
        let mut scene = scene();
        assert_eq!(scene.mode(), PresentationMode::AudioOnly);
        assert_eq!(scene.preloaded_content_id(), Some("chinatown"));
        assert!(!scene.preload_ready());

        scene.poll_surfaces();
        assert!(scene.preload_ready());
        assert!(scene.video_mut().is_none(), "no video binding outside XR");
    }

    #[test]
    fn test_slide_change_updates_preload_only() {
        let mut scene = scene();
        scene.poll_surfaces();

        scene.slide_changed(1);
        assert_eq!(scene.current_slide(), 1);
        assert_eq!(scene.active_content().map(|c| c.id.as_str()), Some("forest"));
        assert_eq!(scene.preloaded_content_id(), Some("forest"));
        assert!(!scene.preload_ready());
        assert_eq!(scene.mode(), PresentationMode::AudioOnly);
    }

    #[test]
    fn test_slide_without_content_keeps_current() {
        let mut scene = scene();
        scene.slide_changed(42);
        assert_eq!(scene.current_slide(), 42);
        assert_eq!(scene.active_content().map(|c| c.id.as_str()), Some("chinatown"));
    }

    #[tokio::test]
    async fn test_enter_and_exit_are_idempotent() {
        let mut scene = scene();
        let now = Instant::now();

        assert!(scene.enter_xr(now));
        assert!(!scene.enter_xr(now));
        assert!(scene.surface().is_active());
        assert!(scene.video_mut().is_some());

        assert!(scene.exit_xr());
        assert!(!scene.exit_xr());
        assert!(!scene.surface().is_active());
    }

    #[tokio::test]
    async fn test_recenter_resets_camera_only_in_xr() {
        let mut scene = scene();
        assert!(!scene.recenter());

        scene.enter_xr(Instant::now());
        let camera: Arc<HeadlessCamera> = scene.surface().headless_camera();
        camera.rotate(90.0, 20.0);

        assert!(scene.recenter());
        assert!(scene.recenter());
        assert_eq!(camera.orientation(), (0.0, 0.0));
    }
}

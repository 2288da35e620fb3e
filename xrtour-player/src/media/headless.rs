//! Headless media backend
//!
//! Wall-clock implementations of the media traits so the service runs
//! without a browser. Positions advance with `tokio::time::Instant`, which
//! keeps them deterministic under a paused test clock.
//!
//! `HeadlessAudio` probes local files with symphonia on the blocking pool to
//! learn their duration and reject undecodable sources; the outcome arrives as
//! a `LoadedMetadata` or `Error` event. `http(s)://` sources are accepted with
//! an unknown duration.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{AudioResource, CameraRig, MediaError, PanoramaSurface, VideoSink};
use crate::events::MediaEvent;

/// Position clock that runs while playing
#[derive(Debug, Default, Clone)]
struct PlayClock {
    /// Position when the clock was last started, stopped or set
    anchor: f64,
    started: Option<Instant>,
}

impl PlayClock {
    fn position(&self) -> f64 {
        match self.started {
            Some(started) => self.anchor + started.elapsed().as_secs_f64(),
            None => self.anchor,
        }
    }

    fn is_running(&self) -> bool {
        self.started.is_some()
    }

    fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    fn stop(&mut self) {
        self.anchor = self.position();
        self.started = None;
    }

    fn set(&mut self, seconds: f64) {
        self.anchor = seconds.max(0.0);
        if self.started.is_some() {
            self.started = Some(Instant::now());
        }
    }
}

/// Probe outcome for the attached source
#[derive(Debug, Default)]
struct ProbeState {
    /// Bumped on every attach; results for an older attach are dropped
    generation: u64,
    duration: Option<f64>,
    failed: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One probe of a local file, run off the async executor
struct ProbeJob {
    url: String,
    generation: u64,
    probe: Arc<Mutex<ProbeState>>,
    events: mpsc::UnboundedSender<MediaEvent>,
}

impl ProbeJob {
    fn run(self) {
        let outcome = probe_duration(&self.url);

        // Held while emitting so a newer attach cannot interleave
        let mut probe = lock(&self.probe);
        if probe.generation != self.generation {
            debug!("Dropping probe result for replaced source {}", self.url);
            return;
        }

        let event = match outcome {
            Ok(Some(duration)) => {
                debug!("Probed {}: {:.2}s", self.url, duration);
                probe.duration = Some(duration);
                MediaEvent::LoadedMetadata { duration }
            }
            Ok(None) => {
                debug!("Attached {} with unknown duration", self.url);
                return;
            }
            Err(message) => {
                warn!("Failed to load {}: {}", self.url, message);
                probe.failed = true;
                MediaEvent::Error {
                    source: self.url,
                    message,
                }
            }
        };
        // Receiver gone means the coordinator has shut down
        let _ = self.events.send(event);
    }
}

/// Headless audio playback resource
pub struct HeadlessAudio {
    events: mpsc::UnboundedSender<MediaEvent>,
    source: Option<String>,
    probe: Arc<Mutex<ProbeState>>,
    clock: PlayClock,
    muted: bool,
}

impl HeadlessAudio {
    pub fn new(events: mpsc::UnboundedSender<MediaEvent>) -> Self {
        Self {
            events,
            source: None,
            probe: Arc::new(Mutex::new(ProbeState::default())),
            clock: PlayClock::default(),
            muted: false,
        }
    }

    /// Known duration of the attached source
    pub fn duration(&self) -> Option<f64> {
        lock(&self.probe).duration
    }

    fn emit(&self, event: MediaEvent) {
        // Receiver gone means the coordinator has shut down
        let _ = self.events.send(event);
    }
}

impl AudioResource for HeadlessAudio {
    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn attach(&mut self, url: &str) -> Result<(), MediaError> {
        if url.trim().is_empty() {
            return Err(MediaError::Load("empty source URL".to_string()));
        }

        let was_running = self.clock.is_running();
        self.clock = PlayClock::default();
        if was_running {
            self.emit(MediaEvent::Pause);
        }
        self.source = Some(url.to_string());

        let generation = {
            let mut probe = lock(&self.probe);
            probe.generation += 1;
            probe.duration = None;
            probe.failed = false;
            probe.generation
        };

        if is_remote(url) {
            debug!("Attached {} with unknown duration", url);
            return Ok(());
        }

        let job = ProbeJob {
            url: url.to_string(),
            generation,
            probe: Arc::clone(&self.probe),
            events: self.events.clone(),
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn_blocking(move || job.run());
            }
            Err(_) => job.run(),
        }
        Ok(())
    }

    fn play(&mut self) -> Result<(), MediaError> {
        let Some(source) = self.source.as_deref() else {
            return Err(MediaError::UnsupportedSource("no source attached".to_string()));
        };
        if lock(&self.probe).failed {
            return Err(MediaError::UnsupportedSource(source.to_string()));
        }
        if self.clock.is_running() {
            return Ok(());
        }

        if let Some(duration) = self.duration() {
            if self.clock.position() >= duration {
                self.clock.set(0.0);
            }
        }
        self.clock.start();
        self.emit(MediaEvent::Play);
        Ok(())
    }

    fn pause(&mut self) {
        if self.clock.is_running() {
            self.clock.stop();
            self.emit(MediaEvent::Pause);
        }
    }

    fn is_paused(&self) -> bool {
        !self.clock.is_running()
    }

    fn current_time(&self) -> f64 {
        let position = self.clock.position();
        match self.duration() {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.clock.set(seconds);
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn poll(&mut self) {
        if !self.clock.is_running() {
            return;
        }

        let duration = self.duration();
        let current_time = self.current_time();
        self.emit(MediaEvent::TimeUpdate {
            current_time,
            duration: duration.unwrap_or(0.0),
        });

        if let Some(duration) = duration {
            if current_time >= duration {
                self.clock.stop();
                self.clock.set(duration);
                self.emit(MediaEvent::Pause);
                self.emit(MediaEvent::Ended);
            }
        }
    }

    fn release(&mut self) {
        self.clock = PlayClock::default();
        self.source = None;
        let mut probe = lock(&self.probe);
        probe.generation += 1;
        probe.duration = None;
        probe.failed = false;
    }
}

fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Probe a local file for its duration
///
/// Blocking; `Ok(None)` when the container does not state a frame count.
fn probe_duration(url: &str) -> Result<Option<f64>, String> {
    let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
    let file = std::fs::File::open(path)
        .map_err(|e| format!("failed to open {}: {}", path.display(), e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| format!("no supported sources: {}", e))?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| "no supported sources: no audio track".to_string())?;

    let params = &track.codec_params;
    Ok(match (params.n_frames, params.sample_rate) {
        (Some(frames), Some(rate)) if rate > 0 => Some(frames as f64 / rate as f64),
        _ => None,
    })
}

/// Headless video sink
#[derive(Debug, Default)]
pub struct HeadlessVideo {
    clock: PlayClock,
}

impl HeadlessVideo {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VideoSink for HeadlessVideo {
    fn current_time(&self) -> f64 {
        self.clock.position()
    }

    fn is_paused(&self) -> bool {
        !self.clock.is_running()
    }

    fn play(&mut self) -> Result<(), MediaError> {
        self.clock.start();
        Ok(())
    }

    fn pause(&mut self) {
        self.clock.stop();
    }

    fn seek_to(&mut self, seconds: f64) {
        self.clock.set(seconds);
    }
}

/// Camera rig of a headless panorama: yaw/pitch in degrees
#[derive(Debug, Default)]
pub struct HeadlessCamera {
    orientation: Mutex<(f64, f64)>,
}

impl HeadlessCamera {
    /// Current (yaw, pitch)
    pub fn orientation(&self) -> (f64, f64) {
        self.orientation.lock().map(|o| *o).unwrap_or((0.0, 0.0))
    }

    /// Rotate the camera, as look controls or device orientation would
    pub fn rotate(&self, yaw: f64, pitch: f64) {
        if let Ok(mut orientation) = self.orientation.lock() {
            orientation.0 += yaw;
            orientation.1 = (orientation.1 + pitch).clamp(-90.0, 90.0);
        }
    }
}

impl CameraRig for HeadlessCamera {
    fn reset_orientation(&self) {
        if let Ok(mut orientation) = self.orientation.lock() {
            *orientation = (0.0, 0.0);
        }
    }
}

/// Headless panoramic scene; constructs instantly on load
#[derive(Debug, Default)]
pub struct HeadlessPanorama {
    source: Option<String>,
    video: Option<HeadlessVideo>,
    camera: Arc<HeadlessCamera>,
    active: bool,
    motion_tracking: bool,
}

impl HeadlessPanorama {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concrete camera, for callers that need to rotate it
    pub fn headless_camera(&self) -> Arc<HeadlessCamera> {
        Arc::clone(&self.camera)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn motion_tracking(&self) -> bool {
        self.motion_tracking
    }
}

impl PanoramaSurface for HeadlessPanorama {
    type Video = HeadlessVideo;

    fn load(&mut self, video_src: &str) {
        if self.source.as_deref() == Some(video_src) && self.video.is_some() {
            return;
        }
        debug!("Headless panorama loading {}", video_src);
        self.source = Some(video_src.to_string());
        self.video = Some(HeadlessVideo::new());
    }

    fn loaded_source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn is_ready(&self) -> bool {
        self.video.is_some()
    }

    fn video_mut(&mut self) -> Option<&mut HeadlessVideo> {
        self.video.as_mut()
    }

    fn camera(&self) -> Option<Arc<dyn CameraRig>> {
        if self.video.is_some() {
            let camera: Arc<dyn CameraRig> = self.camera.clone();
            Some(camera)
        } else {
            None
        }
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn set_motion_tracking(&mut self, enabled: bool) {
        self.motion_tracking = enabled;
    }

    fn release(&mut self) {
        self.video = None;
        self.source = None;
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn audio() -> (HeadlessAudio, mpsc::UnboundedReceiver<MediaEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (HeadlessAudio::new(tx), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_source_plays_with_unknown_duration() {
        let (mut audio, mut rx) = audio();
        audio.attach("https://example.com/a.mp3").unwrap();
        assert!(rx.try_recv().is_err(), "remote attach emits nothing");

        audio.play().unwrap();
        assert_eq!(rx.try_recv().unwrap(), MediaEvent::Play);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!((audio.current_time() - 2.0).abs() < 1e-6);

        audio.poll();
        match rx.try_recv().unwrap() {
            MediaEvent::TimeUpdate { current_time, duration } => {
                assert!((current_time - 2.0).abs() < 1e-6);
                assert_eq!(duration, 0.0);
            }
            other => panic!("Expected TimeUpdate, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_file_reports_error_event() {
        let (mut audio, mut rx) = audio();
        audio.attach("/definitely/not/here.mp3").unwrap();

        match rx.recv().await.unwrap() {
            MediaEvent::Error { source, .. } => assert_eq!(source, "/definitely/not/here.mp3"),
            other => panic!("Expected Error, got {:?}", other),
        }
        let err = audio.play().unwrap_err();
        assert!(err.is_unsupported_source());
    }

    #[test]
    fn test_probe_runs_inline_outside_a_runtime() {
        let (mut audio, mut rx) = audio();
        audio.attach("/definitely/not/here.mp3").unwrap();
        assert!(matches!(rx.try_recv(), Ok(MediaEvent::Error { .. })));
    }

    #[tokio::test]
    async fn test_probe_result_for_replaced_source_is_dropped() {
        let (mut audio, mut rx) = audio();
        audio.attach("/definitely/not/here.mp3").unwrap();
        audio.attach("https://example.com/a.mp3").unwrap();

        // Let the blocking probe finish
        tokio::time::sleep(Duration::from_millis(200)).await;
        while let Ok(event) = rx.try_recv() {
            // Only an error emitted before the second attach may show up
            assert!(matches!(event, MediaEvent::Error { .. }));
        }
        audio.play().unwrap();
        assert_eq!(audio.duration(), None);
    }

    #[test]
    fn test_empty_source_rejected_synchronously() {
        let (mut audio, _rx) = audio();
        assert!(matches!(audio.attach("  "), Err(MediaError::Load(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_pauses_and_rewinds() {
        let (mut audio, mut rx) = audio();
        audio.attach("https://example.com/a.mp3").unwrap();
        audio.play().unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;

        audio.attach("https://example.com/b.mp3").unwrap();
        assert!(audio.is_paused());
        assert_eq!(audio.current_time(), 0.0);

        assert_eq!(rx.try_recv().unwrap(), MediaEvent::Play);
        assert_eq!(rx.try_recv().unwrap(), MediaEvent::Pause);
    }

    #[test]
    fn test_camera_reset_is_idempotent() {
        let camera = HeadlessCamera::default();
        camera.rotate(45.0, 10.0);
        assert_eq!(camera.orientation(), (45.0, 10.0));

        camera.reset_orientation();
        camera.reset_orientation();
        assert_eq!(camera.orientation(), (0.0, 0.0));
    }

    #[test]
    fn test_panorama_ready_after_load() {
        let mut panorama = HeadlessPanorama::new();
        assert!(!panorama.is_ready());
        assert!(panorama.camera().is_none());

        panorama.load("scene.mp4");
        assert!(panorama.is_ready());
        assert_eq!(panorama.loaded_source(), Some("scene.mp4"));
        assert!(panorama.camera().is_some());

        panorama.release();
        assert!(!panorama.is_ready());
    }
}

//! Test helpers for xrtour-player integration tests
//!
//! Provides scripted media resources whose behaviour and call history are
//! shared through `Arc<Mutex<..>>` handles, plus a harness that spawns a
//! coordinator wired to them.

#![allow(dead_code)]

pub mod audio_generator;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use xrtour_common::config::PlayerConfig;
use xrtour_common::permission::{MemoryPermissionStore, PermissionStore};
use xrtour_player::events::{EventBus, MediaEvent, XrEvent};
use xrtour_player::media::{AudioResource, CameraRig, MediaError, PanoramaSurface, VideoSink};
use xrtour_player::orientation::{
    OrientationPermissionService, OrientationPrompt, PlatformCapabilities, StaticPrompt,
};
use xrtour_player::playback::{CoordinatorParts, PlayerCoordinator, PlayerHandle};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Let spawned tasks run without moving the clock
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Advance the (paused) clock, then let tasks catch up
pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    settle().await;
}

/// Drain every event currently buffered on a subscription
pub fn drain(rx: &mut tokio::sync::broadcast::Receiver<XrEvent>) -> Vec<XrEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ============================================================================
// Audio
// ============================================================================

/// Behaviour and call log of a [`MockAudio`]
#[derive(Debug)]
pub struct AudioScript {
    pub source: Option<String>,
    pub paused: bool,
    pub current_time: f64,
    pub muted: bool,
    pub released: bool,
    pub attaches: Vec<String>,
    pub play_calls: usize,
    /// Attach fails synchronously for these URLs
    pub failing_attach: HashSet<String>,
    /// These URLs report a load error right after attaching
    pub broken: HashSet<String>,
    /// play() fails with "no supported sources" for these URLs
    pub unsupported: HashSet<String>,
    /// The next play() is rejected with this error
    pub reject_next_play: Option<MediaError>,
}

impl Default for AudioScript {
    fn default() -> Self {
        Self {
            source: None,
            paused: true,
            current_time: 0.0,
            muted: false,
            released: false,
            attaches: Vec::new(),
            play_calls: 0,
            failing_attach: HashSet::new(),
            broken: HashSet::new(),
            unsupported: HashSet::new(),
            reject_next_play: None,
        }
    }
}

pub type AudioHandle = Arc<Mutex<AudioScript>>;

/// Scripted audio resource; emits media events like a real element
pub struct MockAudio {
    source: Option<String>,
    script: AudioHandle,
    events: mpsc::UnboundedSender<MediaEvent>,
}

impl MockAudio {
    pub fn new(script: AudioHandle, events: mpsc::UnboundedSender<MediaEvent>) -> Self {
        Self {
            source: None,
            script,
            events,
        }
    }

    fn emit(&self, event: MediaEvent) {
        let _ = self.events.send(event);
    }
}

impl AudioResource for MockAudio {
    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn attach(&mut self, url: &str) -> Result<(), MediaError> {
        let mut script = lock(&self.script);
        script.attaches.push(url.to_string());
        if script.failing_attach.contains(url) {
            return Err(MediaError::Load(format!("cannot attach {}", url)));
        }

        let was_playing = !script.paused;
        script.paused = true;
        script.current_time = 0.0;
        script.source = Some(url.to_string());
        let broken = script.broken.contains(url);
        drop(script);

        self.source = Some(url.to_string());
        if was_playing {
            self.emit(MediaEvent::Pause);
        }
        if broken {
            self.emit(MediaEvent::Error {
                source: url.to_string(),
                message: "decode failed".to_string(),
            });
        }
        Ok(())
    }

    fn play(&mut self) -> Result<(), MediaError> {
        let mut script = lock(&self.script);
        script.play_calls += 1;

        let Some(source) = self.source.clone() else {
            return Err(MediaError::UnsupportedSource("no source".to_string()));
        };
        if script.unsupported.contains(&source) {
            return Err(MediaError::UnsupportedSource(source));
        }
        if let Some(error) = script.reject_next_play.take() {
            return Err(error);
        }
        if script.paused {
            script.paused = false;
            drop(script);
            self.emit(MediaEvent::Play);
        }
        Ok(())
    }

    fn pause(&mut self) {
        let mut script = lock(&self.script);
        if !script.paused {
            script.paused = true;
            drop(script);
            self.emit(MediaEvent::Pause);
        }
    }

    fn is_paused(&self) -> bool {
        lock(&self.script).paused
    }

    fn current_time(&self) -> f64 {
        lock(&self.script).current_time
    }

    fn set_current_time(&mut self, seconds: f64) {
        lock(&self.script).current_time = seconds;
    }

    fn set_muted(&mut self, muted: bool) {
        lock(&self.script).muted = muted;
    }

    fn is_muted(&self) -> bool {
        lock(&self.script).muted
    }

    fn release(&mut self) {
        let mut script = lock(&self.script);
        script.released = true;
        script.source = None;
        self.source = None;
    }
}

// ============================================================================
// Video
// ============================================================================

#[derive(Debug)]
pub struct VideoScript {
    pub time: f64,
    pub paused: bool,
    pub seeks: Vec<f64>,
    pub play_calls: usize,
    pub pause_calls: usize,
}

impl Default for VideoScript {
    fn default() -> Self {
        Self {
            time: 0.0,
            paused: true,
            seeks: Vec::new(),
            play_calls: 0,
            pause_calls: 0,
        }
    }
}

/// Scripted video sink; clones share state
#[derive(Debug, Clone, Default)]
pub struct MockVideo {
    pub script: Arc<Mutex<VideoScript>>,
}

impl MockVideo {
    pub fn at(time: f64, paused: bool) -> Self {
        let video = Self::default();
        {
            let mut script = lock(&video.script);
            script.time = time;
            script.paused = paused;
        }
        video
    }

    pub fn time(&self) -> f64 {
        lock(&self.script).time
    }

    pub fn set_time(&self, time: f64) {
        lock(&self.script).time = time;
    }

    pub fn paused(&self) -> bool {
        lock(&self.script).paused
    }

    pub fn seeks(&self) -> Vec<f64> {
        lock(&self.script).seeks.clone()
    }
}

impl VideoSink for MockVideo {
    fn current_time(&self) -> f64 {
        self.time()
    }

    fn is_paused(&self) -> bool {
        self.paused()
    }

    fn play(&mut self) -> Result<(), MediaError> {
        let mut script = lock(&self.script);
        script.play_calls += 1;
        script.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        let mut script = lock(&self.script);
        script.pause_calls += 1;
        script.paused = true;
    }

    fn seek_to(&mut self, seconds: f64) {
        let mut script = lock(&self.script);
        script.time = seconds;
        script.seeks.push(seconds);
    }
}

// ============================================================================
// Panorama
// ============================================================================

#[derive(Debug, Default)]
pub struct MockCamera {
    pub resets: AtomicUsize,
}

impl MockCamera {
    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

impl CameraRig for MockCamera {
    fn reset_orientation(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub struct PanoramaScript {
    /// Surfaces report ready as soon as they load
    pub ready_on_load: bool,
    pub ready: bool,
    pub active: bool,
    pub motion_tracking: bool,
    pub loads: Vec<String>,
    pub released: bool,
}

pub type PanoramaHandle = Arc<Mutex<PanoramaScript>>;

pub struct MockPanorama {
    source: Option<String>,
    script: PanoramaHandle,
    video: MockVideo,
    camera: Arc<MockCamera>,
}

impl MockPanorama {
    pub fn new(ready_on_load: bool) -> Self {
        let script = PanoramaScript {
            ready_on_load,
            ..Default::default()
        };
        Self {
            source: None,
            script: Arc::new(Mutex::new(script)),
            video: MockVideo::default(),
            camera: Arc::new(MockCamera::default()),
        }
    }

    pub fn handle(&self) -> PanoramaHandle {
        Arc::clone(&self.script)
    }

    pub fn video(&self) -> MockVideo {
        self.video.clone()
    }

    pub fn camera_handle(&self) -> Arc<MockCamera> {
        Arc::clone(&self.camera)
    }
}

impl PanoramaSurface for MockPanorama {
    type Video = MockVideo;

    fn load(&mut self, video_src: &str) {
        let mut script = lock(&self.script);
        script.loads.push(video_src.to_string());
        if self.source.as_deref() != Some(video_src) {
            script.ready = script.ready_on_load;
        }
        self.source = Some(video_src.to_string());
    }

    fn loaded_source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn is_ready(&self) -> bool {
        lock(&self.script).ready
    }

    fn video_mut(&mut self) -> Option<&mut MockVideo> {
        if lock(&self.script).ready {
            Some(&mut self.video)
        } else {
            None
        }
    }

    fn camera(&self) -> Option<Arc<dyn CameraRig>> {
        if lock(&self.script).ready {
            let camera: Arc<dyn CameraRig> = self.camera.clone();
            Some(camera)
        } else {
            None
        }
    }

    fn set_active(&mut self, active: bool) {
        lock(&self.script).active = active;
    }

    fn set_motion_tracking(&mut self, enabled: bool) {
        lock(&self.script).motion_tracking = enabled;
    }

    fn release(&mut self) {
        let mut script = lock(&self.script);
        script.released = true;
        script.ready = false;
        self.source = None;
    }
}

// ============================================================================
// Coordinator harness
// ============================================================================

pub struct HarnessOptions {
    pub config: PlayerConfig,
    pub audio: AudioScript,
    /// Visible surface becomes ready as soon as it loads
    pub surface_ready_on_load: bool,
    pub platform: PlatformCapabilities,
    pub store: Arc<dyn PermissionStore>,
    pub prompt: Arc<dyn OrientationPrompt>,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            config: PlayerConfig::default(),
            audio: AudioScript::default(),
            surface_ready_on_load: true,
            platform: PlatformCapabilities {
                supports_orientation: true,
                requires_permission: false,
                is_ios: false,
            },
            store: Arc::new(MemoryPermissionStore::new()),
            prompt: Arc::new(StaticPrompt { grant: true }),
        }
    }
}

pub struct Harness {
    pub handle: PlayerHandle,
    pub audio: AudioHandle,
    pub surface: PanoramaHandle,
    pub preload: PanoramaHandle,
    pub video: MockVideo,
    pub camera: Arc<MockCamera>,
    pub events: tokio::sync::broadcast::Receiver<XrEvent>,
    pub task: JoinHandle<()>,
}

impl Harness {
    /// Send an intent and let the coordinator process it
    pub async fn send(&self, command: xrtour_player::Command) {
        self.handle
            .send(command)
            .await
            .expect("coordinator should be running");
        settle().await;
    }

    pub fn audio(&self) -> MutexGuard<'_, AudioScript> {
        lock(&self.audio)
    }

    pub fn surface(&self) -> MutexGuard<'_, PanoramaScript> {
        lock(&self.surface)
    }
}

/// Spawn a coordinator wired to scripted media
pub async fn spawn_coordinator(options: HarnessOptions) -> Harness {
    let audio_handle: AudioHandle = Arc::new(Mutex::new(options.audio));
    let (media_tx, media_rx) = mpsc::unbounded_channel();
    let audio = MockAudio::new(Arc::clone(&audio_handle), media_tx);

    let surface = MockPanorama::new(options.surface_ready_on_load);
    let preload = MockPanorama::new(true);
    let (surface_handle, preload_handle) = (surface.handle(), preload.handle());
    let video = surface.video();
    let camera = surface.camera_handle();

    let events = Arc::new(EventBus::new(options.config.server.event_capacity));
    let subscription = events.subscribe();

    let (coordinator, handle) = PlayerCoordinator::new(CoordinatorParts {
        audio,
        media_events: media_rx,
        surface,
        preload,
        permissions: OrientationPermissionService::new(options.store, options.platform),
        prompt: options.prompt,
        config: options.config,
        events,
    })
    .expect("coordinator should build");

    let task = tokio::spawn(coordinator.run());
    settle().await;

    Harness {
        handle,
        audio: audio_handle,
        surface: surface_handle,
        preload: preload_handle,
        video,
        camera,
        events: subscription,
        task,
    }
}

/// Config with a short, recognisable fallback list
pub fn config_with_sources(sources: &[&str]) -> PlayerConfig {
    let mut config = PlayerConfig::default();
    config.playback.fallback_sources = sources.iter().map(|s| s.to_string()).collect();
    config
}

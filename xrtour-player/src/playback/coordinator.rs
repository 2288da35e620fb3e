//! Playback coordinator task
//!
//! One tokio task owns the playback owner, the synchronizer and the scene
//! controller. It serialises:
//! - intents from visual surfaces (command channel)
//! - events from the audio resource (media event channel)
//! - permission prompt outcomes
//! - the synchronizer cadence and the progress cadence
//! - component deadlines (resume after swap, seek settle, loading ceiling)
//!
//! After every step a [`PlayerSnapshot`] is published into [`SharedState`].
//! When the task stops every timer and deadline goes with it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;
use xrtour_common::config::PlayerConfig;
use xrtour_common::OrientationPermission;

use super::fallback::FallbackSourceList;
use super::owner::PlaybackOwner;
use super::scene::SceneController;
use super::sync::{SyncTuning, TickOutcome, VideoSynchronizer};
use crate::error::{Error, Result};
use crate::events::{EventBus, MediaEvent, XrEvent};
use crate::media::{AudioResource, PanoramaSurface};
use crate::orientation::{OrientationPermissionService, OrientationPrompt};
use crate::state::{PlayerSnapshot, SharedState};

/// Buffered intents before senders wait
const COMMAND_CAPACITY: usize = 64;

/// Intents accepted by the coordinator
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Pause,
    TogglePlayPause,
    /// Seek to seconds
    Seek(f64),
    ToggleMute,
    SelectSource(String),
    SlideChanged(usize),
    EnterXr,
    ExitXr,
    Recenter,
    /// Permission outcome reported by a surface (true = granted)
    RecordPermission(bool),
    ClearPermission,
    Shutdown,
}

/// Collaborators and configuration for a coordinator
pub struct CoordinatorParts<A, P> {
    pub audio: A,
    /// Receiving end of the channel `audio` emits on
    pub media_events: mpsc::UnboundedReceiver<MediaEvent>,
    /// Visible panorama
    pub surface: P,
    /// Offscreen panorama that warms up the current slide
    pub preload: P,
    pub permissions: OrientationPermissionService,
    pub prompt: Arc<dyn OrientationPrompt>,
    pub config: PlayerConfig,
    pub events: Arc<EventBus>,
}

/// Cloneable handle for sending intents and reading state
#[derive(Clone)]
pub struct PlayerHandle {
    commands: mpsc::Sender<Command>,
    state: Arc<SharedState>,
}

impl PlayerHandle {
    /// Queue an intent; fails once the coordinator has stopped
    pub async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::CoordinatorStopped)
    }

    pub async fn snapshot(&self) -> PlayerSnapshot {
        self.state.get().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<XrEvent> {
        self.state.subscribe_events()
    }

    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }
}

pub struct PlayerCoordinator<A: AudioResource, P: PanoramaSurface> {
    owner: PlaybackOwner<A>,
    sync: VideoSynchronizer,
    scene: SceneController<P>,
    permissions: OrientationPermissionService,
    prompt: Arc<dyn OrientationPrompt>,
    permission_status: OrientationPermission,
    permission_task: Option<JoinHandle<()>>,
    permission_tx: mpsc::UnboundedSender<OrientationPermission>,
    permission_rx: mpsc::UnboundedReceiver<OrientationPermission>,
    commands: mpsc::Receiver<Command>,
    media_events: mpsc::UnboundedReceiver<MediaEvent>,
    sync_interval: Duration,
    progress_interval: Duration,
    state: Arc<SharedState>,
    events: Arc<EventBus>,
    session_id: Uuid,
}

impl<A: AudioResource, P: PanoramaSurface> PlayerCoordinator<A, P> {
    /// Build a coordinator and the handle that drives it
    ///
    /// The audio resource is attached to the preferred source immediately.
    /// Nothing runs until [`run`](Self::run) is awaited.
    pub fn new(parts: CoordinatorParts<A, P>) -> Result<(Self, PlayerHandle)> {
        let CoordinatorParts {
            audio,
            media_events,
            surface,
            preload,
            permissions,
            prompt,
            config,
            events,
        } = parts;

        config.validate()?;

        let now = Instant::now();
        let sources = FallbackSourceList::new(config.playback.fallback_sources.clone())?;
        let session_id = Uuid::new_v4();

        let owner = PlaybackOwner::new(
            audio,
            sources,
            config.playback.resume_delay(),
            Arc::clone(&events),
            now,
        );
        let sync = VideoSynchronizer::new(SyncTuning::from(&config.sync));
        let mut scene = SceneController::new(
            config.catalog.clone(),
            surface,
            preload,
            config.xr.loading_ceiling(),
            Arc::clone(&events),
        );

        let permission_status = permissions.check_status();
        scene.set_motion_tracking(permission_status.allows_motion_tracking());

        let state = Arc::new(SharedState::new(
            PlayerSnapshot::initial(session_id, owner.state().source_url.clone()),
            Arc::clone(&events),
        ));
        let (command_tx, commands) = mpsc::channel(COMMAND_CAPACITY);
        let (permission_tx, permission_rx) = mpsc::unbounded_channel();

        let coordinator = Self {
            owner,
            sync,
            scene,
            permissions,
            prompt,
            permission_status,
            permission_task: None,
            permission_tx,
            permission_rx,
            commands,
            media_events,
            sync_interval: config.sync.interval(),
            progress_interval: config.playback.progress_interval(),
            state: Arc::clone(&state),
            events,
            session_id,
        };
        let handle = PlayerHandle {
            commands: command_tx,
            state,
        };
        Ok((coordinator, handle))
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Process intents, media events and timers until shutdown
    pub async fn run(mut self) {
        info!("Playback coordinator started (session {})", self.session_id);

        let start = Instant::now();
        let mut sync_timer = interval_at(start + self.sync_interval, self.sync_interval);
        sync_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut progress_timer =
            interval_at(start + self.progress_interval, self.progress_interval);
        progress_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.scene.poll_surfaces();
        self.publish().await;

        loop {
            let deadline = self.next_deadline();

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command, Instant::now()),
                },
                Some(event) = self.media_events.recv() => {
                    self.handle_media_event(event, Instant::now());
                }
                Some(status) = self.permission_rx.recv() => {
                    self.permission_task = None;
                    self.apply_permission(status);
                }
                _ = sync_timer.tick() => self.sync_tick(Instant::now()),
                _ = progress_timer.tick() => self.owner.poll_resource(),
                _ = sleep_until_opt(deadline) => self.fire_due(Instant::now()),
            }

            self.scene.poll_surfaces();
            self.publish().await;
        }

        self.teardown();
        self.publish().await;
        info!("Playback coordinator stopped");
    }

    fn handle_command(&mut self, command: Command, now: Instant) {
        debug!("Command: {:?}", command);
        match command {
            Command::Play => self.owner.play(now),
            Command::Pause => self.owner.pause(now),
            Command::TogglePlayPause => self.owner.toggle_play_pause(now),
            Command::Seek(time) => {
                let applied = self.owner.seek(time);
                self.sync
                    .reconcile_seek(self.scene.video_mut(), applied, now);
            }
            Command::ToggleMute => self.owner.toggle_mute(),
            Command::SelectSource(url) => self.owner.set_source(&url, now),
            Command::SlideChanged(index) => self.scene.slide_changed(index),
            Command::EnterXr => self.enter_xr(now),
            Command::ExitXr => {
                self.scene.exit_xr();
            }
            Command::Recenter => {
                self.scene.recenter();
            }
            Command::RecordPermission(granted) => {
                let status = self.permissions.record(granted);
                self.apply_permission(status);
            }
            Command::ClearPermission => {
                self.permissions.clear();
                let status = self.permissions.check_status();
                self.apply_permission(status);
            }
            // Handled by the run loop
            Command::Shutdown => {}
        }
    }

    fn enter_xr(&mut self, now: Instant) {
        if !self.scene.enter_xr(now) {
            return;
        }

        // Picks up outcomes stored since the last check
        self.permission_status = self.permissions.check_status();
        self.scene
            .set_motion_tracking(self.permission_status.allows_motion_tracking());

        if self.permissions.requires_request(self.permission_status)
            && self.permission_task.is_none()
        {
            let request = self.permissions.request(self.prompt.as_ref());
            let tx = self.permission_tx.clone();
            self.permission_task = Some(tokio::spawn(async move {
                let status = request.await;
                // Receiver gone means the coordinator has shut down
                let _ = tx.send(status);
            }));
        }

        let audio = self.owner.audio_clock();
        self.sync
            .reconcile_seek(self.scene.video_mut(), audio.current_time, now);
        self.sync
            .mirror_play_state(self.scene.video_mut(), audio.is_playing);
    }

    fn handle_media_event(&mut self, event: MediaEvent, now: Instant) {
        let observed_time = match &event {
            MediaEvent::TimeUpdate { current_time, .. } => Some(*current_time),
            _ => None,
        };
        let play_state_event = matches!(
            event,
            MediaEvent::Play | MediaEvent::Pause | MediaEvent::Ended
        );

        self.owner.handle_event(event, now);

        if let Some(audio_time) = observed_time {
            self.sync
                .reconcile_seek(self.scene.video_mut(), audio_time, now);
        }
        if play_state_event {
            let is_playing = self.owner.state().is_playing;
            self.sync
                .mirror_play_state(self.scene.video_mut(), is_playing);
        }
    }

    fn sync_tick(&mut self, now: Instant) {
        let audio = self.owner.audio_clock();
        if let TickOutcome::Corrected(sample) = self.sync.tick(self.scene.video_mut(), audio, now) {
            self.events.emit_lossy(XrEvent::VideoResynced {
                video_time: sample.video_time,
                audio_time: sample.audio_time,
                drift: sample.drift,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    fn apply_permission(&mut self, status: OrientationPermission) {
        self.permission_status = status;
        self.scene.set_motion_tracking(status.allows_motion_tracking());
        self.events.emit_lossy(XrEvent::OrientationPermissionChanged {
            status,
            timestamp: chrono::Utc::now(),
        });
    }

    fn next_deadline(&self) -> Option<Instant> {
        [
            self.owner.next_deadline(),
            self.sync.next_deadline(),
            self.scene.next_deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    fn fire_due(&mut self, now: Instant) {
        self.owner.fire_due(now);
        self.sync.fire_due(now);
        self.scene.fire_due(now);
    }

    fn teardown(&mut self) {
        if let Some(task) = self.permission_task.take() {
            warn!("Abandoning pending orientation permission request");
            task.abort();
        }
        self.sync.reset();
        self.scene.teardown();
        self.owner.teardown();
    }

    /// Publish the current snapshot; the future borrows nothing from `self`
    fn publish(&self) -> impl Future<Output = ()> + Send + 'static {
        let snapshot = self.snapshot();
        let state = Arc::clone(&self.state);
        async move { state.set(snapshot).await }
    }

    fn snapshot(&self) -> PlayerSnapshot {
        let playback = self.owner.state();
        let mut snapshot = PlayerSnapshot::initial(self.session_id, String::new());
        snapshot.apply_playback(playback);
        snapshot.audio_name = self.scene.catalog().display_name(&playback.source_url);
        snapshot.mode = self.scene.mode();
        snapshot.current_slide = self.scene.current_slide();
        snapshot.active_content_id = self.scene.active_content().map(|c| c.id.clone());
        snapshot.preloaded_content_id = self.scene.preloaded_content_id().map(str::to_string);
        snapshot.preload_ready = self.scene.preload_ready();
        snapshot.loading_visible = self.scene.loading_visible();
        snapshot.orientation_permission = self.permission_status;
        snapshot.motion_tracking = self.scene.motion_tracking();
        snapshot
    }
}

/// Sleep until `deadline`, or forever when there is none
async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

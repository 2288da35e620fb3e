//! Playback State Owner
//!
//! Holds the one audio resource that lives for the whole session, whatever
//! visual mode is showing, and the [`PlaybackState`] observed from it.
//!
//! **Responsibilities:**
//! - Source swaps, with a cancellable resume-after-swap delay
//! - Play/pause (doubling as retry after terminal failure), mute, seek
//! - Translating resource events into state
//! - Routing every source failure through [`next_source`]
//!
//! The owner is driven by the coordinator task and never blocks: deadlines
//! are stored and fired by [`fire_due`](PlaybackOwner::fire_due).

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::fallback::{next_source, FallbackDecision, FallbackSourceList};
use super::state::PlaybackState;
use crate::events::{EventBus, MediaEvent, NoticeLevel, XrEvent};
use crate::media::{AudioResource, MediaError};

/// Read-only view of the audio clock for the synchronizer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioClock {
    pub current_time: f64,
    pub is_playing: bool,
}

/// Owner of the persistent audio resource
pub struct PlaybackOwner<A: AudioResource> {
    audio: A,
    sources: FallbackSourceList,
    state: PlaybackState,
    /// Pending resume after a source swap
    resume_at: Option<Instant>,
    resume_delay: Duration,
    events: Arc<EventBus>,
}

impl<A: AudioResource> PlaybackOwner<A> {
    /// Take ownership of `audio` and attach the preferred source
    pub fn new(
        audio: A,
        sources: FallbackSourceList,
        resume_delay: Duration,
        events: Arc<EventBus>,
        now: Instant,
    ) -> Self {
        let preferred = sources.preferred().to_string();
        let mut owner = Self {
            audio,
            sources,
            state: PlaybackState::new(preferred.clone()),
            resume_at: None,
            resume_delay,
            events,
        };

        info!("Attaching initial audio source {}", preferred);
        if let Err(e) = owner.reattach(&preferred, now) {
            warn!("Initial attach of {} failed: {}", preferred, e);
            owner.fall_back(now);
        }
        owner
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn sources(&self) -> &FallbackSourceList {
        &self.sources
    }

    /// Shared access to the resource, for reading only
    pub fn audio(&self) -> &A {
        &self.audio
    }

    /// Authoritative clock read straight from the resource
    pub fn audio_clock(&self) -> AudioClock {
        AudioClock {
            current_time: self.audio.current_time(),
            is_playing: !self.audio.is_paused(),
        }
    }

    /// Earliest pending deadline owned by this component
    pub fn next_deadline(&self) -> Option<Instant> {
        self.resume_at
    }

    /// Select a new audio source
    ///
    /// A URL from the fallback list moves the cascade to its position. If the
    /// URL differs from the attached one the resource is reattached and, when
    /// it was playing, resumed after the settle delay.
    pub fn set_source(&mut self, url: &str, now: Instant) {
        if let Some(index) = self.sources.position(url) {
            self.state.source_index = index;
        }
        self.state.source_url = url.to_string();

        if self.audio.source() == Some(url) {
            debug!("Source {} already attached", url);
            return;
        }

        info!("Switching audio source to {}", url);
        // A user selection starts a new cascade
        self.state.load_error = false;
        if let Err(e) = self.reattach(url, now) {
            warn!("Attach of {} failed: {}", url, e);
            self.fall_back(now);
        }
    }

    /// Play/pause control; in the failure state it retries from the first source
    ///
    /// The retry only re-attaches. It does not start playback by itself.
    pub fn toggle_play_pause(&mut self, now: Instant) {
        if self.state.load_error {
            let preferred = self.sources.preferred().to_string();
            info!("Retrying playback from first source {}", preferred);

            self.state.source_index = 0;
            self.state.source_url = preferred.clone();
            self.state.load_error = false;
            self.events.emit_lossy(XrEvent::PlaybackRetry {
                source_url: preferred.clone(),
                timestamp: chrono::Utc::now(),
            });

            if let Err(e) = self.reattach(&preferred, now) {
                warn!("Retry attach of {} failed: {}", preferred, e);
                self.fall_back(now);
            }
            return;
        }

        // A manual toggle supersedes any resume still pending from a swap
        self.resume_at = None;

        if self.state.is_playing {
            debug!("Pausing audio");
            self.audio.pause();
            return;
        }

        if self.audio.source().is_none() {
            let url = self.state.source_url.clone();
            if let Err(e) = self.reattach(&url, now) {
                warn!("Attach of {} failed: {}", url, e);
                self.fall_back(now);
                return;
            }
        }

        debug!("Starting audio");
        match self.audio.play() {
            Ok(()) => {}
            Err(e) if e.is_unsupported_source() => {
                warn!("Play failed with unsupported source: {}", e);
                self.fall_back(now);
            }
            Err(e) => self.fail_playback(&e),
        }
    }

    /// Start playback if stopped (or retry after terminal failure)
    pub fn play(&mut self, now: Instant) {
        if !self.state.is_playing || self.state.load_error {
            self.toggle_play_pause(now);
        }
    }

    /// Stop playback if playing
    pub fn pause(&mut self, now: Instant) {
        if self.state.is_playing && !self.state.load_error {
            self.toggle_play_pause(now);
        }
    }

    pub fn toggle_mute(&mut self) {
        let muted = !self.audio.is_muted();
        self.audio.set_muted(muted);
        self.state.is_muted = muted;
        self.events.emit_lossy(XrEvent::MuteChanged {
            muted,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Jump to `time`, clamped to `[0, duration]`
    ///
    /// A duration of 0 (unknown) imposes no upper bound. The state is updated
    /// immediately. Returns the position actually applied.
    pub fn seek(&mut self, time: f64) -> f64 {
        let mut target = if time.is_finite() { time.max(0.0) } else { 0.0 };
        if self.state.duration > 0.0 {
            target = target.min(self.state.duration);
        }

        debug!("Seeking audio to {:.2}s", target);
        self.audio.set_current_time(target);
        self.state.current_time = target;
        target
    }

    /// Apply an event observed on the resource
    pub fn handle_event(&mut self, event: MediaEvent, now: Instant) {
        match event {
            MediaEvent::Play => self.set_playing(true),
            MediaEvent::Pause => self.set_playing(false),
            MediaEvent::Ended => {
                info!("Audio ended: {}", self.state.source_url);
                self.set_playing(false);
                self.audio.set_current_time(0.0);
                self.state.current_time = 0.0;
                self.events.emit_lossy(XrEvent::PlaybackEnded {
                    source_url: self.state.source_url.clone(),
                    timestamp: chrono::Utc::now(),
                });
            }
            MediaEvent::TimeUpdate {
                current_time,
                duration,
            } => {
                self.state.current_time = current_time;
                self.state.duration = finite_or_zero(duration);
                self.events.emit_lossy(XrEvent::PlaybackProgress {
                    current_time,
                    duration: self.state.duration,
                    timestamp: chrono::Utc::now(),
                });
            }
            MediaEvent::LoadedMetadata { duration } => {
                debug!("Metadata loaded: {:.2}s", duration);
                self.state.duration = finite_or_zero(duration);
                self.state.load_error = false;
            }
            MediaEvent::Error { source, message } => {
                if self.state.load_error {
                    debug!("Ignoring error for {} after exhaustion", source);
                } else if source != self.state.source_url {
                    debug!("Ignoring stale error for {}: {}", source, message);
                } else {
                    warn!("Audio source {} failed: {}", source, message);
                    self.fall_back(now);
                }
            }
        }
    }

    /// Fire the resume-after-swap deadline if it is due
    pub fn fire_due(&mut self, now: Instant) {
        if !self.resume_at.is_some_and(|at| at <= now) {
            return;
        }
        self.resume_at = None;

        debug!("Resuming playback after source change");
        if let Err(e) = self.audio.play() {
            warn!("Error resuming playback after source change: {}", e);
            self.fall_back(now);
        }
    }

    /// Let the resource advance and report progress
    pub fn poll_resource(&mut self) {
        self.audio.poll();
    }

    /// Cancel pending work and release the resource
    pub fn teardown(&mut self) {
        self.resume_at = None;
        self.audio.pause();
        self.audio.release();
        self.state.is_playing = false;
        info!("Audio resource released");
    }

    /// Reattach the resource to `url`, arming a resume if it was playing
    ///
    /// A resume still pending from an earlier swap carries over to this one.
    fn reattach(&mut self, url: &str, now: Instant) -> Result<(), MediaError> {
        let was_playing = !self.audio.is_paused() || self.resume_at.is_some();
        self.resume_at = None;

        self.audio.attach(url)?;
        self.state.current_time = 0.0;
        self.state.duration = 0.0;
        self.events.emit_lossy(XrEvent::SourceChanged {
            source_url: url.to_string(),
            source_index: self.state.source_index,
            timestamp: chrono::Utc::now(),
        });

        if was_playing {
            self.resume_at = Some(now + self.resume_delay);
        }
        Ok(())
    }

    /// Move to the next fallback source, or fail terminally
    fn fall_back(&mut self, now: Instant) {
        loop {
            let (index, url) = match next_source(&self.sources, self.state.source_index) {
                FallbackDecision::Advance { index, url } => (index, url.to_string()),
                FallbackDecision::Exhausted => {
                    self.resume_at = None;
                    self.state.load_error = true;
                    error!(
                        "Could not load any audio source ({} attempted)",
                        self.sources.len()
                    );
                    self.events.emit_lossy(XrEvent::SourcesExhausted {
                        attempted: self.sources.len(),
                        timestamp: chrono::Utc::now(),
                    });
                    self.events.emit_lossy(XrEvent::notice(
                        NoticeLevel::Destructive,
                        "Audio Error",
                        "Could not load any audio sources. Please check your connection.",
                    ));
                    return;
                }
            };

            let failed_url = std::mem::replace(&mut self.state.source_url, url.clone());
            self.state.source_index = index;
            self.state.load_error = false;

            warn!("Trying alternative audio source {} ({})", index, url);
            self.events.emit_lossy(XrEvent::FallbackAdvanced {
                failed_url,
                source_url: url.clone(),
                source_index: index,
                timestamp: chrono::Utc::now(),
            });
            self.events.emit_lossy(XrEvent::notice(
                NoticeLevel::Info,
                "Trying alternative audio source",
                "The original audio file couldn't be loaded. Trying an alternative source.",
            ));

            match self.reattach(&url, now) {
                Ok(()) => return,
                Err(e) => warn!("Attach of {} failed: {}", url, e),
            }
        }
    }

    /// Play failed for a reason other than the source itself
    fn fail_playback(&mut self, error: &MediaError) {
        error!("Error playing audio: {}", error);
        self.state.load_error = true;
        self.events.emit_lossy(XrEvent::PlaybackError {
            message: error.to_string(),
            timestamp: chrono::Utc::now(),
        });
        self.events.emit_lossy(XrEvent::notice(
            NoticeLevel::Destructive,
            "Audio Error",
            error.to_string(),
        ));
    }

    fn set_playing(&mut self, is_playing: bool) {
        if self.state.is_playing == is_playing {
            return;
        }
        self.state.is_playing = is_playing;
        self.events.emit_lossy(XrEvent::PlaybackStateChanged {
            is_playing,
            current_time: self.state.current_time,
            timestamp: chrono::Utc::now(),
        });
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

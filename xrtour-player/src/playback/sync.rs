//! Video/audio synchronization
//!
//! Audio is the master clock. The synchronizer samples the video binding on
//! a fixed cadence, snaps it to the audio position when drift exceeds the
//! threshold, and mirrors the audio play state onto it. Seek jumps are
//! applied immediately outside the cadence and open a short settle window
//! during which ticks are suppressed.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};
use xrtour_common::config::SyncConfig;

use super::owner::AudioClock;
use crate::media::VideoSink;

/// Thresholds and windows for the synchronizer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncTuning {
    /// Drift (seconds) above which a tick snaps the video
    pub drift_threshold: f64,
    /// Audio/video gap (seconds) treated as a seek
    pub seek_jump_threshold: f64,
    /// Suppression window after a seek
    pub seek_settle: Duration,
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for SyncTuning {
    fn from(config: &SyncConfig) -> Self {
        Self {
            drift_threshold: config.drift_threshold_secs,
            seek_jump_threshold: config.seek_jump_threshold_secs,
            seek_settle: config.seek_settle(),
        }
    }
}

/// One drift measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncSample {
    pub video_time: f64,
    pub audio_time: f64,
    pub drift: f64,
}

impl SyncSample {
    pub fn measure(video_time: f64, audio_time: f64) -> Self {
        Self {
            video_time,
            audio_time,
            drift: (video_time - audio_time).abs(),
        }
    }
}

/// What a tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// No video binding; nothing to do
    NoVideo,
    /// Inside a seek settle window; tick suppressed
    Settling,
    /// Drift within threshold
    Aligned(SyncSample),
    /// Video was snapped to the audio position
    Corrected(SyncSample),
}

#[derive(Debug, Default)]
pub struct VideoSynchronizer {
    tuning: SyncTuning,
    /// End of the current seek settle window
    settle_until: Option<Instant>,
}

impl VideoSynchronizer {
    pub fn new(tuning: SyncTuning) -> Self {
        Self {
            tuning,
            settle_until: None,
        }
    }

    pub fn tuning(&self) -> &SyncTuning {
        &self.tuning
    }

    /// Whether a seek settle window is open
    pub fn is_seeking(&self) -> bool {
        self.settle_until.is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.settle_until
    }

    /// Close the settle window once it has elapsed
    pub fn fire_due(&mut self, now: Instant) {
        if self.settle_until.is_some_and(|until| until <= now) {
            debug!("Seek settle window closed");
            self.settle_until = None;
        }
    }

    /// Periodic drift check
    pub fn tick<V: VideoSink>(
        &mut self,
        video: Option<&mut V>,
        audio: AudioClock,
        now: Instant,
    ) -> TickOutcome {
        self.fire_due(now);

        let Some(video) = video else {
            return TickOutcome::NoVideo;
        };
        if self.is_seeking() {
            return TickOutcome::Settling;
        }

        let sample = SyncSample::measure(video.current_time(), audio.current_time);
        let outcome = if sample.drift > self.tuning.drift_threshold {
            debug!(
                "Video drift {:.3}s (video {:.3}, audio {:.3}), resyncing",
                sample.drift, sample.video_time, sample.audio_time
            );
            video.seek_to(audio.current_time);
            TickOutcome::Corrected(sample)
        } else {
            TickOutcome::Aligned(sample)
        };

        mirror(video, audio.is_playing);
        outcome
    }

    /// React to an observed audio position change
    ///
    /// Returns true when the gap was large enough to count as a seek.
    pub fn reconcile_seek<V: VideoSink>(
        &mut self,
        video: Option<&mut V>,
        audio_time: f64,
        now: Instant,
    ) -> bool {
        let Some(video) = video else {
            return false;
        };

        let gap = (video.current_time() - audio_time).abs();
        if gap <= self.tuning.seek_jump_threshold {
            return false;
        }

        debug!("Seek detected ({:.3}s gap), moving video to {:.3}", gap, audio_time);
        video.seek_to(audio_time);
        self.settle_until = Some(now + self.tuning.seek_settle);
        true
    }

    /// Align the video play state with the audio play state
    pub fn mirror_play_state<V: VideoSink>(&self, video: Option<&mut V>, audio_playing: bool) {
        if let Some(video) = video {
            mirror(video, audio_playing);
        }
    }

    /// Drop any pending settle window
    pub fn reset(&mut self) {
        self.settle_until = None;
    }
}

fn mirror<V: VideoSink>(video: &mut V, audio_playing: bool) {
    if audio_playing && video.is_paused() {
        if let Err(e) = video.play() {
            warn!("Failed to play video: {}", e);
        }
    } else if !audio_playing && !video.is_paused() {
        video.pause();
    }
}

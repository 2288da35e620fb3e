//! Playback coordination: owner, fallback, synchronizer and scene control

pub mod coordinator;
pub mod fallback;
pub mod owner;
pub mod scene;
pub mod state;
pub mod sync;

pub use coordinator::{Command, CoordinatorParts, PlayerCoordinator, PlayerHandle};
pub use fallback::{next_source, FallbackDecision, FallbackSourceList};
pub use owner::{AudioClock, PlaybackOwner};
pub use scene::SceneController;
pub use state::PlaybackState;
pub use sync::{SyncSample, SyncTuning, TickOutcome, VideoSynchronizer};

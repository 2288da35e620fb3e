//! Configuration loading and config file resolution
//!
//! Every field has a compiled default, so a missing config file is never
//! fatal. A config file that exists but does not parse or validate is an error.
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `XRTOUR_CONFIG` environment variable
//! 3. `<platform config dir>/xrtour/config.toml`
//! 4. Compiled defaults (fallback)

use crate::catalog::{ContentCatalog, DEFAULT_AUDIO_SRC};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "XRTOUR_CONFIG";

/// Audio sources tried in order when the preferred narration fails
pub fn default_fallback_sources() -> Vec<String> {
    vec![
        DEFAULT_AUDIO_SRC.to_string(),
        "https://assets.mixkit.co/music/preview/mixkit-tech-house-vibes-130.mp3".to_string(),
        "https://assets.mixkit.co/music/preview/mixkit-dreamy-ambient-piano-notification-225.mp3".to_string(),
        "https://assets.mixkit.co/music/preview/mixkit-guitar-loop-668.mp3".to_string(),
        "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-1.mp3".to_string(),
    ]
}

/// Complete player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PlayerConfig {
    pub server: ServerConfig,
    pub playback: PlaybackConfig,
    pub sync: SyncConfig,
    pub xr: XrConfig,
    pub orientation: OrientationConfig,
    pub catalog: ContentCatalog,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Broadcast buffer for the event bus
    pub event_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 5780,
            event_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Ordered candidate sources; the first is preferred
    pub fallback_sources: Vec<String>,
    /// Settle delay before resuming playback after a source swap
    pub resume_delay_ms: u64,
    /// How often the audio resource is polled for progress
    pub progress_interval_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            fallback_sources: default_fallback_sources(),
            resume_delay_ms: 300,
            progress_interval_ms: 250,
        }
    }
}

impl PlaybackConfig {
    pub fn resume_delay(&self) -> Duration {
        Duration::from_millis(self.resume_delay_ms)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

/// Video/audio synchronizer tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Drift check cadence
    pub interval_ms: u64,
    /// Drift above this is snapped away on the next tick
    pub drift_threshold_secs: f64,
    /// Observed position jumps above this are treated as seeks
    pub seek_jump_threshold_secs: f64,
    /// Drift correction is suppressed this long after a seek
    pub seek_settle_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            drift_threshold_secs: 0.3,
            seek_jump_threshold_secs: 0.5,
            seek_settle_ms: 300,
        }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn seek_settle(&self) -> Duration {
        Duration::from_millis(self.seek_settle_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XrConfig {
    /// Loading indicator is force-hidden after this long
    pub loading_ceiling_ms: u64,
}

impl Default for XrConfig {
    fn default() -> Self {
        Self {
            loading_ceiling_ms: 8000,
        }
    }
}

impl XrConfig {
    pub fn loading_ceiling(&self) -> Duration {
        Duration::from_millis(self.loading_ceiling_ms)
    }
}

/// Device-orientation platform description and persistence location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    /// Platform exposes orientation events at all
    pub supports_orientation: bool,
    /// Platform requires an explicit, gesture-initiated permission prompt
    pub requires_permission: bool,
    pub is_ios: bool,
    /// Outcome of the headless permission prompt
    pub headless_grant: bool,
    /// Persistent permission store; defaults to the platform data dir
    pub store_path: Option<PathBuf>,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            supports_orientation: true,
            requires_permission: false,
            is_ios: false,
            headless_grant: true,
            store_path: None,
        }
    }
}

impl OrientationConfig {
    pub fn resolved_store_path(&self) -> PathBuf {
        self.store_path.clone().unwrap_or_else(default_store_path)
    }
}

impl PlayerConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PlayerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Resolve the config file and load it, falling back to defaults
    ///
    /// A missing file logs a warning and yields the compiled defaults.
    pub fn load_or_default(cli_arg: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_arg) {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                Self::load(&path)
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using compiled defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                info!("No config file found, using compiled defaults");
                Ok(Self::default())
            }
        }
    }

    /// Reject settings the coordinator cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.playback.fallback_sources.is_empty() {
            return Err(Error::Config(
                "playback.fallback_sources must not be empty".to_string(),
            ));
        }
        if self
            .playback
            .fallback_sources
            .iter()
            .any(|s| s.trim().is_empty())
        {
            return Err(Error::Config(
                "playback.fallback_sources must not contain empty entries".to_string(),
            ));
        }
        if self.playback.progress_interval_ms == 0 {
            return Err(Error::Config(
                "playback.progress_interval_ms must be positive".to_string(),
            ));
        }
        if self.sync.interval_ms == 0 {
            return Err(Error::Config("sync.interval_ms must be positive".to_string()));
        }
        if !is_non_negative(self.sync.drift_threshold_secs) {
            return Err(Error::Config(
                "sync.drift_threshold_secs must be a non-negative number".to_string(),
            ));
        }
        if !is_non_negative(self.sync.seek_jump_threshold_secs) {
            return Err(Error::Config(
                "sync.seek_jump_threshold_secs must be a non-negative number".to_string(),
            ));
        }
        if self.catalog.is_empty() {
            return Err(Error::Config("catalog must contain at least one entry".to_string()));
        }
        Ok(())
    }
}

fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// Pick the config file to read, if any
///
/// CLI argument and environment variable are returned even when the file
/// does not exist, so the caller can warn about it. The platform default is
/// only returned when present.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path().filter(|p| p.exists())
}

/// `<platform config dir>/xrtour/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("xrtour").join("config.toml"))
}

/// Default location of the persistent orientation permission store
pub fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("xrtour"))
        .unwrap_or_else(|| PathBuf::from("./xrtour_data"))
        .join("orientation.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PlayerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sync.drift_threshold_secs, 0.3);
        assert_eq!(config.sync.seek_jump_threshold_secs, 0.5);
        assert_eq!(config.sync.seek_settle(), Duration::from_millis(300));
        assert_eq!(config.playback.resume_delay(), Duration::from_millis(300));
        assert_eq!(config.xr.loading_ceiling(), Duration::from_secs(8));
        assert_eq!(config.playback.fallback_sources.len(), 5);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PlayerConfig::from_toml_str(
            r#"
            [sync]
            drift_threshold_secs = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.sync.drift_threshold_secs, 0.5);
        assert_eq!(config.sync.interval_ms, 1000);
        assert_eq!(config.server.port, 5780);
        assert_eq!(config.catalog.len(), 3);
    }

    #[test]
    fn test_empty_fallback_list_rejected() {
        let result = PlayerConfig::from_toml_str(
            r#"
            [playback]
            fallback_sources = []
            "#,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let mut config = PlayerConfig::default();
        config.sync.drift_threshold_secs = -0.1;
        assert!(config.validate().is_err());
        config.sync.drift_threshold_secs = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_catalog_from_toml() {
        let config = PlayerConfig::from_toml_str(
            r#"
            [[catalog]]
            id = "pier"
            name = "Pier Walk"
            video_src = "pier.mp4"
            audio_src = "pier.mp3"
            scene_label = "Pier"
            "#,
        )
        .unwrap();
        assert_eq!(config.catalog.len(), 1);
        assert_eq!(config.catalog.current_content(0).unwrap().id, "pier");
        assert!(config.catalog.current_content(0).unwrap().description.is_none());
    }
}

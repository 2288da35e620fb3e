//! XR content catalog
//!
//! Static, ordered list of tour chapters. Each entry pairs a 360° video with the
//! narration audio recorded for it. The coordinator only reads from the catalog.

use serde::{Deserialize, Serialize};

/// Default 360° video for the first chapter
pub const DEFAULT_VIDEO_SRC: &str = "https://cmm-cloud-2.s3.us-west-1.amazonaws.com/WALKING+TOURS/2025-04-10-JAPANTOWN-XR/2025-04-21-CHINATOWN-XR-UPDATE/2025-04-21-CHINATOWN-XR-2b-low.mp4";

/// Default narration audio for the first chapter
pub const DEFAULT_AUDIO_SRC: &str = "https://cmm-cloud-2.s3.us-west-1.amazonaws.com/WALKING+TOURS/2025-03-15-CHINATOWN/2025-03-15-CHINATOWN-MP3S/2025-04-21-SHORTER-MP3-CHAPTERS/2025-04-21-Chapter+2+Look+Tin+Eli.mp3";

/// One chapter of the tour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XrContent {
    /// Stable identifier (e.g. "chinatown")
    pub id: String,
    /// Chapter name shown in the track-info marquee
    pub name: String,
    /// Panoramic video source
    pub video_src: String,
    /// Narration audio source
    pub audio_src: String,
    /// Label announced when entering XR
    pub scene_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Ordered catalog of tour chapters, indexed by slide position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentCatalog {
    entries: Vec<XrContent>,
}

impl ContentCatalog {
    pub fn new(entries: Vec<XrContent>) -> Self {
        Self { entries }
    }

    /// The three-chapter tour shipped with the player
    pub fn default_tour() -> Self {
        Self::new(vec![
            XrContent {
                id: "chinatown".to_string(),
                name: "Chinatown Tour".to_string(),
                video_src: DEFAULT_VIDEO_SRC.to_string(),
                audio_src: DEFAULT_AUDIO_SRC.to_string(),
                scene_label: "Chinatown Experience".to_string(),
                description: Some("A panoramic view of San Francisco's Chinatown".to_string()),
            },
            XrContent {
                id: "forest".to_string(),
                name: "Forest Exploration".to_string(),
                video_src: "https://cdn.aframe.io/videos/360/scene_portal_remix.mp4".to_string(),
                audio_src: "https://assets.mixkit.co/music/preview/mixkit-dreamy-ambient-piano-notification-225.mp3".to_string(),
                scene_label: "Forest Path".to_string(),
                description: Some("Immersive forest environment with natural sounds".to_string()),
            },
            XrContent {
                id: "space".to_string(),
                name: "Space Journey".to_string(),
                video_src: "https://cdn.aframe.io/videos/360/flying.mp4".to_string(),
                audio_src: "https://assets.mixkit.co/music/preview/mixkit-guitar-loop-668.mp3".to_string(),
                scene_label: "Space Experience".to_string(),
                description: Some("Experience flying through space with ambient soundtrack".to_string()),
            },
        ])
    }

    /// Descriptor bound to the given slide position, if the catalog has one
    pub fn current_content(&self, index: usize) -> Option<&XrContent> {
        self.entries.get(index)
    }

    /// First descriptor whose video matches `video_src`
    pub fn find_by_video_src(&self, video_src: &str) -> Option<&XrContent> {
        self.entries.iter().find(|c| c.video_src == video_src)
    }

    pub fn entries(&self) -> &[XrContent] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Human-readable name for an audio source
    ///
    /// Returns the chapter name when the source belongs to a catalog entry,
    /// otherwise a title-cased file stem ("my-track_name.mp3" → "My Track Name").
    pub fn display_name(&self, audio_src: &str) -> String {
        if let Some(content) = self.entries.iter().find(|c| c.audio_src == audio_src) {
            return content.name.clone();
        }

        let file_name = audio_src
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("Audio Player");
        let stem = match file_name.rfind('.') {
            Some(dot) if dot > 0 => &file_name[..dot],
            _ => file_name,
        };

        stem.replace(['_', '-'], " ")
            .split(' ')
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for ContentCatalog {
    fn default() -> Self {
        Self::default_tour()
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

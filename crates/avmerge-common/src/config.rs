//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON. Every section
//! defaults sensibly so an empty `{}` file (or no file at all) is valid and
//! reproduces the stock behavior: pair `mp3` with `mp4`/`webm` in the
//! current directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::media::{VideoContainer, DEFAULT_REENCODE_AUDIO_CODEC, MERGED_FILE_PREFIX};
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub media: MediaConfig,
    pub merge: MergeConfig,
    pub tools: ToolsConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None`, the file does not exist, or it fails to parse.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.media.video_extensions.is_empty() {
            warnings.push("media.video_extensions is empty; no pairs can be formed".into());
        }

        if self
            .media
            .video_extensions
            .iter()
            .any(|e| *e == self.media.audio_extension)
        {
            warnings.push(format!(
                "media.audio_extension '{}' is also listed in media.video_extensions",
                self.media.audio_extension
            ));
        }

        for ext in &self.media.video_extensions {
            if ext.starts_with('.') {
                warnings.push(format!(
                    "media.video_extensions entry '{ext}' should not start with a dot"
                ));
            } else if VideoContainer::from_extension(ext).is_none() {
                warnings.push(format!(
                    "media.video_extensions entry '{ext}' has no merge strategy; pairs using it will fail"
                ));
            }
        }

        if self.media.audio_extension.starts_with('.') {
            warnings.push(format!(
                "media.audio_extension '{}' should not start with a dot",
                self.media.audio_extension
            ));
        }

        if self.media.merged_prefix.is_empty() {
            warnings.push(
                "media.merged_prefix is empty; merged output will be picked up by later scans"
                    .into(),
            );
        }

        if self.merge.concurrency == Some(0) {
            warnings.push("merge.concurrency is 0; at least one task will still run".into());
        }

        if self.merge.audio_codec.trim().is_empty() {
            warnings.push("merge.audio_codec is empty".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// How stems are turned into audio/video pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairMode {
    /// The audio extension plus any one configured video extension.
    #[default]
    AudioPlusVideo,
    /// Exactly the audio extension and the first configured video extension,
    /// nothing else.
    Exact,
}

/// Which directory entries take part in a merge run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Extension (without dot) of the audio half of a pair.
    pub audio_extension: String,
    /// Extensions (without dot) of the video half, in order of preference.
    pub video_extensions: Vec<String>,
    /// Filename prefix written on merged output and skipped by discovery.
    pub merged_prefix: String,
    pub pair_mode: PairMode,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            audio_extension: "mp3".into(),
            video_extensions: vec!["mp4".into(), "webm".into()],
            merged_prefix: MERGED_FILE_PREFIX.into(),
            pair_mode: PairMode::default(),
        }
    }
}

impl MediaConfig {
    /// Whether `ext` is in the allow-list.
    pub fn is_media_extension(&self, ext: &str) -> bool {
        ext == self.audio_extension || self.video_extensions.iter().any(|v| v == ext)
    }
}

/// Merge run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Maximum simultaneous ffmpeg processes. `None` means half the logical
    /// cores, at least one.
    pub concurrency: Option<usize>,
    /// Audio codec for containers that cannot stream-copy the audio track.
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,
    /// Exit non-zero when any pair failed to merge.
    pub fail_on_task_error: bool,
}

fn default_audio_codec() -> String {
    DEFAULT_REENCODE_AUDIO_CODEC.into()
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            concurrency: None,
            audio_codec: default_audio_codec(),
            fail_on_task_error: false,
        }
    }
}

/// External tool settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    /// Kill a single ffmpeg invocation after this many seconds. Unset means
    /// no limit.
    pub timeout_secs: Option<u64>,
}

impl ToolsConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

//! Media vocabulary: extension helpers and the video containers the merge
//! action knows how to mux.

use std::path::Path;

/// Filename prefix marking output produced by a previous merge.
pub const MERGED_FILE_PREFIX: &str = "[MERGED]";

/// Default codec used when the target container cannot take the source
/// audio stream as-is.
pub const DEFAULT_REENCODE_AUDIO_CODEC: &str = "libvorbis";

/// Video container formats with a known merge strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoContainer {
    Mp4,
    Webm,
}

impl VideoContainer {
    /// Look up a container by file extension (without the dot).
    ///
    /// Matching is exact: `MP4` is not `mp4`, mirroring how stems are paired.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "mp4" => Some(Self::Mp4),
            "webm" => Some(Self::Webm),
            _ => None,
        }
    }

    /// Look up the container of a path.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// How an external audio track is combined with this container.
    pub fn merge_strategy(self) -> MergeStrategy {
        match self {
            Self::Mp4 => MergeStrategy::StreamCopy,
            // WebM only carries Vorbis/Opus audio, so MP3 has to be re-encoded.
            Self::Webm => MergeStrategy::CopyVideoReencodeAudio,
        }
    }
}

/// How video and audio streams are written into the merged file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Copy both streams without re-encoding.
    StreamCopy,
    /// Copy the video stream, re-encode the audio stream.
    CopyVideoReencodeAudio,
}

/// Extension of a path as UTF-8, without the leading dot.
pub fn extension_of(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

/// Filename with its extension removed.
///
/// `"song.live.mp3"` becomes `"song.live"`.
pub fn stem_of(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}

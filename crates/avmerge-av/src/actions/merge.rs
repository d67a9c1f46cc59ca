//! Mux a separate audio file into its video with ffmpeg, then remove both
//! sources.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use avmerge_common::{
    Error, MergeStrategy, TaskError, VideoContainer, DEFAULT_REENCODE_AUDIO_CODEC,
    MERGED_FILE_PREFIX,
};

use crate::command::ToolCommand;
use crate::tools::{ToolRegistry, FFMPEG};

/// Knobs for [`merge`].
#[derive(Debug, Clone)]
pub struct MergeSettings {
    /// Prefix placed (followed by a space) before the video filename.
    pub merged_prefix: String,
    /// Codec for containers that need the audio re-encoded.
    pub audio_codec: String,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            merged_prefix: MERGED_FILE_PREFIX.to_string(),
            audio_codec: DEFAULT_REENCODE_AUDIO_CODEC.to_string(),
        }
    }
}

/// Result of a successful merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The merged file.
    pub output: PathBuf,
}

/// Where the merged file for `video` is written: next to it, named
/// `"<prefix> <video filename>"`.
pub fn merged_output_path(video: &Path, prefix: &str) -> PathBuf {
    let file_name = video
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    video.with_file_name(format!("{prefix} {file_name}"))
}

/// Build the ffmpeg argument list for muxing `audio` into `video`.
///
/// Fails with [`Error::UnsupportedFormat`] when the video container has no
/// known strategy.
pub fn merge_args(
    video: &Path,
    audio: &Path,
    output: &Path,
    audio_codec: &str,
) -> Result<Vec<String>, Error> {
    let container = VideoContainer::from_path(video).ok_or_else(|| Error::unsupported(video))?;

    let mut args = vec![
        "-i".to_string(),
        video.to_string_lossy().into_owned(),
        "-i".to_string(),
        audio.to_string_lossy().into_owned(),
    ];
    match container.merge_strategy() {
        MergeStrategy::StreamCopy => {
            args.extend(["-c".to_string(), "copy".to_string()]);
        }
        MergeStrategy::CopyVideoReencodeAudio => {
            args.extend([
                "-c:v".to_string(),
                "copy".to_string(),
                "-c:a".to_string(),
                audio_codec.to_string(),
            ]);
        }
    }
    args.push(output.to_string_lossy().into_owned());
    Ok(args)
}

/// Merge `audio` into `video`, then delete the video and the audio, in that
/// order.
///
/// Returns at the first failure:
///
/// - unsupported container: nothing is spawned or deleted;
/// - ffmpeg failure: both sources are kept, the error carries ffmpeg's
///   stderr;
/// - cancellation or timeout: ffmpeg is killed, both sources are kept and
///   the partial output is removed so a later run can retry the pair;
/// - removal failure: the error names only the file that could not be
///   removed, and if that was the video the audio is left in place.
pub async fn merge(
    tools: &ToolRegistry,
    video: &Path,
    audio: &Path,
    settings: &MergeSettings,
    cancel: &CancellationToken,
) -> Result<MergeOutcome, TaskError> {
    let both = || [video.to_path_buf(), audio.to_path_buf()];

    let output = merged_output_path(video, &settings.merged_prefix);
    let args = merge_args(video, audio, &output, &settings.audio_codec)
        .map_err(|e| TaskError::new(both(), e))?;
    let ffmpeg = tools.require(FFMPEG).map_err(|e| TaskError::new(both(), e))?;

    tracing::info!("Merging \"{}\" and \"{}\"", video.display(), audio.display());

    let mut cmd = ToolCommand::new(ffmpeg.path.clone());
    cmd.args(args).timeout(ffmpeg.timeout).cancel(cancel.clone());
    if let Err(e) = cmd.execute().await {
        if e.is_interrupted() {
            discard_partial_output(&output).await;
        }
        return Err(TaskError::new(both(), e));
    }

    tracing::info!(
        "Merged \"{}\" and \"{}\" to \"{}\"",
        video.display(),
        audio.display(),
        output.display()
    );

    for path in [video, audio] {
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| TaskError::new([path.to_path_buf()], Error::io(path, e)))?;
        tracing::info!("Removed \"{}\"", path.display());
    }

    Ok(MergeOutcome { output })
}

/// Remove whatever a killed ffmpeg left at `output`.
async fn discard_partial_output(output: &Path) {
    match tokio::fs::remove_file(output).await {
        Ok(()) => tracing::debug!("Removed partial output \"{}\"", output.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            "Failed to remove partial output \"{}\": {e}",
            output.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_sits_next_to_video() {
        assert_eq!(
            merged_output_path(Path::new("/media/song.mp4"), "[MERGED]"),
            PathBuf::from("/media/[MERGED] song.mp4")
        );
        assert_eq!(
            merged_output_path(Path::new("song.webm"), "[MERGED]"),
            PathBuf::from("[MERGED] song.webm")
        );
    }

    #[test]
    fn mp4_copies_both_streams() {
        let args = merge_args(
            Path::new("song.mp4"),
            Path::new("song.mp3"),
            Path::new("[MERGED] song.mp4"),
            "libvorbis",
        )
        .unwrap();
        assert_eq!(
            args,
            ["-i", "song.mp4", "-i", "song.mp3", "-c", "copy", "[MERGED] song.mp4"]
        );
    }

    #[test]
    fn webm_reencodes_audio() {
        let args = merge_args(
            Path::new("clip.webm"),
            Path::new("clip.mp3"),
            Path::new("[MERGED] clip.webm"),
            "libopus",
        )
        .unwrap();
        assert_eq!(
            args,
            [
                "-i",
                "clip.webm",
                "-i",
                "clip.mp3",
                "-c:v",
                "copy",
                "-c:a",
                "libopus",
                "[MERGED] clip.webm"
            ]
        );
    }

    #[test]
    fn unknown_container_is_rejected() {
        let err = merge_args(
            Path::new("clip.mkv"),
            Path::new("clip.mp3"),
            Path::new("[MERGED] clip.mkv"),
            "libvorbis",
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { ref extension, .. } if extension == "mkv"));
    }

    #[tokio::test]
    async fn unknown_container_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mkv");
        let audio = dir.path().join("clip.mp3");
        std::fs::write(&video, b"v").unwrap();
        std::fs::write(&audio, b"a").unwrap();

        // A registry without ffmpeg: reaching the spawn step would produce
        // ToolNotFound instead of UnsupportedFormat.
        let err = merge(
            &ToolRegistry::default(),
            &video,
            &audio,
            &MergeSettings::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err.source, Error::UnsupportedFormat { .. }));
        assert_eq!(err.paths, vec![video.clone(), audio.clone()]);
        assert!(video.exists());
        assert!(audio.exists());
    }
}

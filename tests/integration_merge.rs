//! Merge and concat integration tests
//!
//! Drive the real actions and the merge processor against a fake ffmpeg.

#![cfg(unix)]

mod common;

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use avmerge::processor::merge_directory;
use avmerge_av::{actions, MergeSettings, ToolRegistry};
use avmerge_common::config::Config;
use avmerge_common::Error;
use common::{list, touch, Behavior, FakeFfmpeg};
use serial_test::serial;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

fn registry(fake: &FakeFfmpeg) -> ToolRegistry {
    ToolRegistry::with_ffmpeg(&fake.path, None)
}

#[tokio::test]
#[serial]
async fn test_webm_pair_reencodes_audio_and_removes_sources() {
    let fake = FakeFfmpeg::new(Behavior::Succeed);
    let dir = tempdir().unwrap();
    let video = touch(dir.path(), "clip.webm");
    let audio = touch(dir.path(), "clip.mp3");

    let outcome = actions::merge(
        &registry(&fake),
        &video,
        &audio,
        &MergeSettings::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let expected_output = dir.path().join("[MERGED] clip.webm");
    assert_eq!(outcome.output, expected_output);
    assert_eq!(
        fake.invocations(),
        vec![vec![
            "-i".to_string(),
            video.display().to_string(),
            "-i".to_string(),
            audio.display().to_string(),
            "-c:v".to_string(),
            "copy".to_string(),
            "-c:a".to_string(),
            "libvorbis".to_string(),
            expected_output.display().to_string(),
        ]]
    );
    assert_eq!(list(dir.path()), vec!["[MERGED] clip.webm"]);
}

#[tokio::test]
#[serial]
async fn test_mp4_pair_copies_streams() {
    let fake = FakeFfmpeg::new(Behavior::Succeed);
    let dir = tempdir().unwrap();
    let video = touch(dir.path(), "song.mp4");
    let audio = touch(dir.path(), "song.mp3");

    actions::merge(
        &registry(&fake),
        &video,
        &audio,
        &MergeSettings::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let calls = fake.invocations();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0][4..6], ["-c".to_string(), "copy".to_string()]);
    assert_eq!(list(dir.path()), vec!["[MERGED] song.mp4"]);
}

#[tokio::test]
#[serial]
async fn test_tool_failure_keeps_sources_and_reports_stderr() {
    let fake = FakeFfmpeg::new(Behavior::Fail);
    let dir = tempdir().unwrap();
    let video = touch(dir.path(), "song.mp4");
    let audio = touch(dir.path(), "song.mp3");

    let err = actions::merge(
        &registry(&fake),
        &video,
        &audio,
        &MergeSettings::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err.source, Error::Tool { .. }));
    assert!(err
        .to_string()
        .contains("Invalid data found when processing input"));
    assert_eq!(err.paths, vec![video.clone(), audio.clone()]);
    assert!(video.exists());
    assert!(audio.exists());
}

#[tokio::test]
#[serial]
async fn test_video_removal_failure_leaves_audio() {
    let fake = FakeFfmpeg::new(Behavior::Succeed);
    let dir = tempdir().unwrap();
    // A directory cannot be removed with remove_file.
    let video = dir.path().join("clip.mp4");
    fs::create_dir(&video).unwrap();
    let audio = touch(dir.path(), "clip.mp3");

    let err = actions::merge(
        &registry(&fake),
        &video,
        &audio,
        &MergeSettings::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err.source, Error::Io { .. }));
    assert_eq!(err.paths, vec![video.clone()]);
    assert!(video.exists());
    assert!(audio.exists());
}

#[tokio::test]
#[serial]
async fn test_cancelled_merge_leaves_only_sources() {
    let fake = FakeFfmpeg::new(Behavior::Hang);
    let dir = tempdir().unwrap();
    let video = touch(dir.path(), "song.mp4");
    let audio = touch(dir.path(), "song.mp3");

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let err = actions::merge(
        &registry(&fake),
        &video,
        &audio,
        &MergeSettings::default(),
        &cancel,
    )
    .await
    .unwrap_err();

    assert!(matches!(err.source, Error::Cancelled));
    assert_eq!(err.paths, vec![video, audio]);
    assert_eq!(list(dir.path()), vec!["song.mp3", "song.mp4"]);
}

#[tokio::test]
#[serial]
async fn test_timed_out_merge_leaves_only_sources() {
    let fake = FakeFfmpeg::new(Behavior::Hang);
    let dir = tempdir().unwrap();
    let video = touch(dir.path(), "clip.webm");
    let audio = touch(dir.path(), "clip.mp3");

    let tools = ToolRegistry::with_ffmpeg(&fake.path, Some(Duration::from_millis(300)));
    let err = actions::merge(
        &tools,
        &video,
        &audio,
        &MergeSettings::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err.source, Error::Timeout { .. }));
    assert_eq!(list(dir.path()), vec!["clip.mp3", "clip.webm"]);
}

#[tokio::test]
#[serial]
async fn test_unsupported_container_never_invokes_tool() {
    let fake = FakeFfmpeg::new(Behavior::Succeed);
    let dir = tempdir().unwrap();
    let video = touch(dir.path(), "clip.avi");
    let audio = touch(dir.path(), "clip.mp3");

    let err = actions::merge(
        &registry(&fake),
        &video,
        &audio,
        &MergeSettings::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err.source, Error::UnsupportedFormat { .. }));
    assert!(fake.invocations().is_empty());
    assert_eq!(list(dir.path()), vec!["clip.avi", "clip.mp3"]);
}

#[tokio::test]
#[serial]
async fn test_merge_directory_end_to_end() {
    let fake = FakeFfmpeg::new(Behavior::Succeed);
    let dir = tempdir().unwrap();
    touch(dir.path(), "song.mp3");
    touch(dir.path(), "song.mp4");
    touch(dir.path(), "other.mp4");

    let summary = merge_directory(
        dir.path(),
        &Config::default(),
        &registry(&fake),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.dispatched, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(list(dir.path()), vec!["[MERGED] song.mp4", "other.mp4"]);

    // A second run finds nothing new: merged output is skipped.
    let again = merge_directory(
        dir.path(),
        &Config::default(),
        &registry(&fake),
        CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(again.dispatched, 0);
    assert_eq!(fake.invocations().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_merge_directory_many_pairs_bounded() {
    let fake = FakeFfmpeg::new(Behavior::Succeed);
    let dir = tempdir().unwrap();
    for i in 0..12 {
        touch(dir.path(), &format!("track{i:02}.mp3"));
        touch(dir.path(), &format!("track{i:02}.mp4"));
    }

    let mut config = Config::default();
    config.merge.concurrency = Some(3);
    let summary = merge_directory(dir.path(), &config, &registry(&fake), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.dispatched, 12);
    assert_eq!(summary.succeeded, 12);
    assert!(summary.is_success());
    let names = list(dir.path());
    assert_eq!(names.len(), 12);
    assert!(names.iter().all(|n| n.starts_with("[MERGED] track")));
}

#[tokio::test]
#[serial]
async fn test_merge_directory_failures_do_not_abort_run() {
    let fake = FakeFfmpeg::new(Behavior::Fail);
    let dir = tempdir().unwrap();
    touch(dir.path(), "a.mp3");
    touch(dir.path(), "a.mp4");
    touch(dir.path(), "b.mp3");
    touch(dir.path(), "b.webm");

    let summary = merge_directory(
        dir.path(),
        &Config::default(),
        &registry(&fake),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.dispatched, 2);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.errors.len(), 2);
    assert_eq!(list(dir.path()), vec!["a.mp3", "a.mp4", "b.mp3", "b.webm"]);
}

#[tokio::test]
#[serial]
async fn test_concat_failure_cleans_up_manifest() {
    let fake = FakeFfmpeg::new(Behavior::CaptureManifest { code: 1 });
    let dir = tempdir().unwrap();
    let a = touch(dir.path(), "a.mp4");
    let b = touch(dir.path(), "b.mp4");

    let err = actions::concat(
        &registry(&fake),
        &[a, b],
        &dir.path().join("joined.mp4"),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Tool { .. }));

    let manifest = fake.captured_manifest_path().expect("tool was not invoked");
    assert!(!manifest.exists());
    assert!(!manifest.parent().unwrap().exists());
}

#[tokio::test]
#[serial]
async fn test_concat_manifest_preserves_order() {
    let fake = FakeFfmpeg::new(Behavior::CaptureManifest { code: 0 });
    let dir = tempdir().unwrap();
    let second = touch(dir.path(), "b.mp4");
    let first = touch(dir.path(), "a.mp4");
    let output = dir.path().join("joined.mp4");

    actions::concat(
        &registry(&fake),
        &[second.clone(), first.clone()],
        &output,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(
        fake.captured_manifest().unwrap(),
        format!(
            "file 'file:{}'\nfile 'file:{}'",
            second.display(),
            first.display()
        )
    );

    let calls = fake.invocations();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0][..4], ["-f", "concat", "-safe", "0"]);
    assert_eq!(calls[0][6], output.display().to_string());

    let manifest: PathBuf = fake.captured_manifest_path().unwrap();
    assert!(!manifest.exists());
}

#[tokio::test]
async fn test_concat_single_input_is_usage_error() {
    let err = actions::concat(
        &ToolRegistry::default(),
        &[PathBuf::from("only.mp4")],
        &PathBuf::from("out.mp4"),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Usage(_)));
}

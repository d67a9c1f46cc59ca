//! Shared helpers for integration tests.
//!
//! Provides [`FakeFfmpeg`], a shell script standing in for ffmpeg that logs
//! every invocation's arguments and then succeeds or fails on demand.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// How the fake tool behaves.
pub enum Behavior {
    /// Create the output file (last argument) and exit 0.
    Succeed,
    /// Print a diagnostic to stderr and exit 1.
    Fail,
    /// Start writing the output file (last argument), then hang until
    /// killed.
    Hang,
    /// Copy the concat manifest (6th argument) aside, then exit with `code`.
    CaptureManifest { code: i32 },
}

/// A fake `ffmpeg` executable living in its own temp directory.
pub struct FakeFfmpeg {
    dir: TempDir,
    pub path: PathBuf,
}

impl FakeFfmpeg {
    pub fn new(behavior: Behavior) -> Self {
        let dir = tempfile::tempdir().expect("failed to create fake tool dir");
        let log = dir.path().join("invocations.log");
        let captured = dir.path().join("manifest.txt");
        let manifest_path = dir.path().join("manifest-path.txt");

        let tail = match behavior {
            Behavior::Succeed => "for last; do :; done\n: > \"$last\"\nexit 0\n".to_string(),
            Behavior::Hang => "for last; do :; done\necho partial > \"$last\"\nexec sleep 30\n".to_string(),
            Behavior::Fail => {
                "echo 'Invalid data found when processing input' >&2\nexit 1\n".to_string()
            }
            Behavior::CaptureManifest { code } => format!(
                "printf '%s' \"$6\" > '{}'\ncp \"$6\" '{}'\nexit {code}\n",
                manifest_path.display(),
                captured.display()
            ),
        };
        let script = format!(
            "#!/bin/sh\nprintf '%s\\n' \"$@\" >> '{log}'\necho '--' >> '{log}'\n{tail}",
            log = log.display()
        );

        let path = dir.path().join("ffmpeg");
        fs::write(&path, script).expect("failed to write fake ffmpeg");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("failed to chmod fake ffmpeg");

        Self { dir, path }
    }

    /// Arguments of every invocation so far, one `Vec` per call.
    pub fn invocations(&self) -> Vec<Vec<String>> {
        let Ok(log) = fs::read_to_string(self.dir.path().join("invocations.log")) else {
            return Vec::new();
        };
        let mut calls = Vec::new();
        let mut current = Vec::new();
        for line in log.lines() {
            if line == "--" {
                calls.push(std::mem::take(&mut current));
            } else {
                current.push(line.to_string());
            }
        }
        calls
    }

    /// Contents of the manifest seen by the last `CaptureManifest` call.
    pub fn captured_manifest(&self) -> Option<String> {
        fs::read_to_string(self.dir.path().join("manifest.txt")).ok()
    }

    /// Path of the manifest passed to the last `CaptureManifest` call.
    pub fn captured_manifest_path(&self) -> Option<PathBuf> {
        fs::read_to_string(self.dir.path().join("manifest-path.txt"))
            .ok()
            .map(PathBuf::from)
    }
}

/// Create an empty file.
pub fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"").expect("failed to create fixture file");
    path
}

/// Sorted filenames in `dir`.
pub fn list(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("failed to list dir")
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

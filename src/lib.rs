//! avmerge - pair audio and video files by name and merge them with ffmpeg,
//! or concatenate videos.
//!
//! This library crate exposes the merge-mode engine for integration testing.

pub mod discovery;
pub mod processor;
pub mod scheduler;

//! # avmerge-av
//!
//! External tool management and ffmpeg actions for avmerge.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find ffmpeg from config or
//!   `PATH`.
//! - **Command execution** ([`ToolCommand`]) -- async builder with
//!   cancellation, optional timeout, and captured or inherited output.
//! - **Concat manifests** ([`ConcatManifest`]) -- temporary list file with
//!   guaranteed cleanup.
//! - **Action functions** ([`actions`]) -- audio/video merge and video
//!   concatenation.

pub mod actions;
pub mod command;
pub mod manifest;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::{OutputMode, ToolCommand, ToolOutput};
pub use manifest::ConcatManifest;
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};

// Action functions
pub use actions::{concat, merge, MergeOutcome, MergeSettings};

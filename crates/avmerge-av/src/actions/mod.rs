//! ffmpeg-backed actions.
//!
//! - [`merge()`] -- mux a separate audio file into its video and remove the
//!   sources.
//! - [`concat()`] -- join several videos through a temporary manifest.

pub mod concat;
pub mod merge;

pub use concat::concat;
pub use merge::{merge, MergeOutcome, MergeSettings};

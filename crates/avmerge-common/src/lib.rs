//! avmerge-common: shared error type, configuration, and media vocabulary.
//!
//! - **Errors**: [`Error`] covers every failure mode of a run; [`TaskError`]
//!   attaches the offending paths to a per-pair failure.
//! - **Configuration**: [`config::Config`] with defaults for every field.
//! - **Media**: extension handling and the container-to-strategy mapping
//!   used by the merge action.

pub mod config;
pub mod error;
pub mod media;

pub use error::{Error, Result, TaskError};
pub use media::*;

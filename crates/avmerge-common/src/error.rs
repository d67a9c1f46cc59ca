//! Unified error type for avmerge.
//!
//! Every crate funnels its failures into [`Error`]. Per-pair failures inside
//! the merge scheduler are wrapped in a [`TaskError`] so the offending paths
//! travel with the cause.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Unified error type covering all failure modes in avmerge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The program was invoked incorrectly.
    #[error("Usage error: {0}")]
    Usage(String),

    /// A filesystem operation failed.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        /// The path the operation was acting on.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The video container is not one the merge action knows how to handle.
    #[error("unrecognized file extension \"{extension}\" of file \"{}\"", path.display())]
    UnsupportedFormat {
        /// The offending video file.
        path: PathBuf,
        /// Its extension (may be empty).
        extension: String,
    },

    /// An external tool returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable description, including captured stderr if any.
        message: String,
    },

    /// A required external tool could not be located.
    #[error("{tool} not found; is it installed and in PATH?")]
    ToolNotFound {
        /// Name of the missing tool.
        tool: String,
    },

    /// An external tool ran past its configured time limit and was killed.
    #[error("Tool error [{tool}]: timed out after {}s", limit.as_secs_f64())]
    Timeout {
        /// Name of the tool that was killed.
        tool: String,
        /// The limit it exceeded.
        limit: Duration,
    },

    /// The run was cancelled while a subprocess was in flight.
    #[error("cancelled")]
    Cancelled,

    /// Removing a temporary resource failed.
    #[error("Cleanup error on {}: {source}", path.display())]
    Cleanup {
        /// The temporary path that could not be removed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Configuration failed validation.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Convenience constructor for [`Error::Io`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::ToolNotFound`].
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Error::ToolNotFound { tool: tool.into() }
    }

    /// Convenience constructor for [`Error::UnsupportedFormat`].
    pub fn unsupported(path: &Path) -> Self {
        Error::UnsupportedFormat {
            path: path.to_path_buf(),
            extension: path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }
}

impl Error {
    /// Whether a subprocess was killed before it could finish, leaving any
    /// output it had started writing incomplete.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Cancelled | Error::Timeout { .. })
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// A failure of a single scheduled task, with the file(s) it concerned.
#[derive(Debug)]
pub struct TaskError {
    /// The file paths the failing task was working on.
    pub paths: Vec<PathBuf>,
    /// What went wrong.
    pub source: Error,
}

impl TaskError {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>, source: Error) -> Self {
        Self {
            paths: paths.into_iter().collect(),
            source,
        }
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let paths = self
            .paths
            .iter()
            .map(|p| format!("\"{}\"", p.display()))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "[{paths}] {}", self.source)
    }
}

impl std::error::Error for TaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

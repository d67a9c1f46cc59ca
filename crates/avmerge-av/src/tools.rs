//! External tool detection.
//!
//! The [`ToolRegistry`] locates the external CLI tools avmerge shells out to
//! (currently only ffmpeg) and provides lookup methods for the actions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use avmerge_common::config::ToolsConfig;
use avmerge_common::{Error, Result};

/// Name of the transcoding tool.
pub const FFMPEG: &str = "ffmpeg";

/// Known tool names that the registry manages.
const KNOWN_TOOLS: &[&str] = &[FFMPEG];

/// A located tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Human-readable tool name (e.g. "ffmpeg").
    pub name: String,
    /// Resolved path to the executable.
    pub path: PathBuf,
    /// Maximum execution time of one invocation; `None` waits forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of `-version` output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Registry holding discovered tool configurations.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolConfig>,
}

impl ToolRegistry {
    /// Discover tools, preferring paths from config over `PATH`.
    ///
    /// A configured path is used directly when it exists; otherwise
    /// [`which::which`] searches `PATH`. Tools that are not found are omitted
    /// from the registry.
    pub fn discover(tools_config: &ToolsConfig) -> Self {
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let custom_path = match name {
                FFMPEG => tools_config.ffmpeg_path.as_deref(),
                _ => None,
            };

            let resolved = match custom_path {
                Some(p) if p.exists() => Some(p.to_path_buf()),
                Some(p) => {
                    tracing::warn!(
                        "Configured {name} path {} does not exist; searching PATH",
                        p.display()
                    );
                    which::which(name).ok()
                }
                None => which::which(name).ok(),
            };

            if let Some(path) = resolved {
                tracing::debug!("Found {name} at {}", path.display());
                tools.insert(
                    name.to_string(),
                    ToolConfig {
                        name: name.to_string(),
                        path,
                        timeout: tools_config.timeout(),
                    },
                );
            }
        }

        Self { tools }
    }

    /// Build a registry with `ffmpeg` at a fixed path, bypassing discovery.
    pub fn with_ffmpeg(path: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        let mut tools = HashMap::new();
        tools.insert(
            FFMPEG.to_string(),
            ToolConfig {
                name: FFMPEG.to_string(),
                path: path.into(),
                timeout,
            },
        );
        Self { tools }
    }

    /// Return the [`ToolConfig`] for the given tool, or
    /// [`Error::ToolNotFound`] if it was not found during discovery.
    pub fn require(&self, name: &str) -> Result<&ToolConfig> {
        self.tools
            .get(name)
            .ok_or_else(|| Error::tool_not_found(name))
    }

    /// Check all known tools and return availability information.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&name| match self.tools.get(name) {
                Some(cfg) => ToolInfo {
                    name: name.to_string(),
                    available: true,
                    version: detect_version(&cfg.path),
                    path: Some(cfg.path.clone()),
                },
                None => ToolInfo {
                    name: name.to_string(),
                    available: false,
                    version: None,
                    path: None,
                },
            })
            .collect()
    }
}

/// Run `<tool> -version` and return the first line of stdout.
fn detect_version(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg("-version")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}

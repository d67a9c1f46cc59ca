//! Builder for executing external tool commands with cancellation and
//! optional timeout support.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use avmerge_common::{Error, Result};

/// Where the child's stdout/stderr go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Capture both streams into memory; stderr is attached to the error on
    /// a non-zero exit.
    #[default]
    Capture,
    /// Stream both directly to this process's stdout/stderr.
    Inherit,
}

/// Output of a finished tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8); empty when inherited.
    pub stdout: String,
    /// Captured standard error (lossy UTF-8); empty when inherited.
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use avmerge_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> avmerge_common::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffmpeg"))
///     .arg("-i").arg("clip.mp4")
///     .arg("-i").arg("clip.mp3")
///     .args(["-c", "copy"])
///     .arg("[MERGED] clip.mp4")
///     .execute()
///     .await?;
/// println!("{}", output.stderr);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
    output: OutputMode,
    cancel: Option<CancellationToken>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: None,
            output: OutputMode::Capture,
            cancel: None,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time. `None` (the default) waits forever.
    pub fn timeout(&mut self, d: Option<Duration>) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Choose whether output is captured or inherited.
    pub fn output(&mut self, mode: OutputMode) -> &mut Self {
        self.output = mode;
        self
    }

    /// Kill the child when `token` is cancelled.
    pub fn cancel(&mut self, token: CancellationToken) -> &mut Self {
        self.cancel = Some(token);
        self
    }

    /// The arguments collected so far.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Execute the command and wait for it to exit.
    ///
    /// # Errors
    ///
    /// - [`Error::Tool`] if spawning fails or the process exits non-zero
    ///   (message includes captured stderr).
    /// - [`Error::Timeout`] if the timeout elapses first.
    /// - [`Error::Cancelled`] if the cancellation token fires first.
    ///
    /// In the last two cases the child is killed when its handle is dropped.
    pub async fn execute(&self) -> Result<ToolOutput> {
        let program_name = self.program_name();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdin(Stdio::null());
        cmd.kill_on_drop(true);

        match self.output {
            OutputMode::Capture => {
                cmd.stdout(Stdio::piped());
                cmd.stderr(Stdio::piped());
            }
            OutputMode::Inherit => {
                cmd.stdout(Stdio::inherit());
                cmd.stderr(Stdio::inherit());
            }
        }

        tracing::debug!("running {} {}", self.program.display(), self.args.join(" "));

        let child = cmd
            .spawn()
            .map_err(|e| Error::tool(&program_name, format!("failed to spawn: {e}")))?;

        let cancel = self.cancel.clone().unwrap_or_default();
        let wait = child.wait_with_output();
        let timeout = async {
            match self.timeout {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending::<()>().await,
            }
        };

        // Dropping `wait` on the losing branches drops the child, which
        // kills it because of `kill_on_drop`.
        let output = tokio::select! {
            res = wait => res.map_err(|e| {
                Error::tool(&program_name, format!("I/O error waiting for process: {e}"))
            })?,
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            _ = timeout => {
                return Err(Error::Timeout {
                    tool: program_name.clone(),
                    limit: self.timeout.unwrap_or_default(),
                });
            }
        };

        let tool_output = ToolOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !output.status.success() {
            let message = if tool_output.stderr.trim().is_empty() {
                format!("exited with status {}", output.status)
            } else {
                format!(
                    "exited with status {}: {}",
                    output.status,
                    tool_output.stderr.trim_end()
                )
            };
            return Err(Error::tool(program_name, message));
        }

        Ok(tool_output)
    }
}

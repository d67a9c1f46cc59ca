//! Join several videos end to end with the ffmpeg concat demuxer.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use avmerge_common::{Error, Result};

use crate::command::{OutputMode, ToolCommand};
use crate::manifest::ConcatManifest;
use crate::tools::{ToolRegistry, FFMPEG};

/// Minimum number of inputs a concat needs.
pub const MIN_CONCAT_INPUTS: usize = 2;

/// Reject input lists too short to concatenate.
pub fn check_inputs(inputs: &[PathBuf]) -> Result<()> {
    match inputs.len() {
        0 => Err(Error::Usage("no video files to concat provided".into())),
        n if n < MIN_CONCAT_INPUTS => {
            Err(Error::Usage("provide more than one video to concat".into()))
        }
        _ => Ok(()),
    }
}

/// ffmpeg arguments for a concat driven by `manifest`.
pub fn concat_args(manifest: &Path, output: &Path) -> Vec<String> {
    vec![
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        manifest.to_string_lossy().into_owned(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Concatenate `inputs`, in order, into `output`.
///
/// ffmpeg's stdout and stderr go straight to ours. The manifest and its
/// temporary directory are gone when this returns, whatever the outcome; a
/// failure to remove them is logged and does not fail the call.
///
/// # Errors
///
/// - [`Error::Usage`] for fewer than two inputs, before anything is created.
/// - [`Error::Io`] when the manifest cannot be written.
/// - [`Error::ToolNotFound`], [`Error::Tool`], [`Error::Timeout`] or
///   [`Error::Cancelled`] from the ffmpeg invocation.
pub async fn concat(
    tools: &ToolRegistry,
    inputs: &[PathBuf],
    output: &Path,
    cancel: &CancellationToken,
) -> Result<()> {
    check_inputs(inputs)?;
    let ffmpeg = tools.require(FFMPEG)?;

    // The demuxer resolves relative entries against the manifest's own
    // directory, which is a throwaway temp dir.
    let absolute = inputs
        .iter()
        .map(|p| std::path::absolute(p).map_err(|e| Error::io(p, e)))
        .collect::<Result<Vec<_>>>()?;

    let manifest = ConcatManifest::create(&absolute)?;

    tracing::info!(
        "Concatenating {} videos into \"{}\"",
        inputs.len(),
        output.display()
    );

    let mut cmd = ToolCommand::new(ffmpeg.path.clone());
    cmd.args(concat_args(manifest.path(), output))
        .output(OutputMode::Inherit)
        .timeout(ffmpeg.timeout)
        .cancel(cancel.clone());
    let result = cmd
        .execute()
        .await
        .map(|_| ())
        .map_err(|e| match e {
            Error::Tool { tool, message } => Error::Tool {
                tool,
                message: format!("failed to run concat command: {message}"),
            },
            other => other,
        });

    if let Err(e) = manifest.close() {
        tracing::warn!("{e}");
    }

    if result.is_ok() {
        tracing::info!("Concatenated into \"{}\"", output.display());
    }
    result
}

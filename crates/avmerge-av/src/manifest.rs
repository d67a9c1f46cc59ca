//! Temporary concat-demuxer manifest.
//!
//! A [`ConcatManifest`] owns a private temporary directory holding a single
//! list file that tells ffmpeg which inputs to join, in order. The directory
//! is removed when the manifest is closed or dropped.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use avmerge_common::{Error, Result};

const DIR_PREFIX: &str = "concat-files";
const FILE_PREFIX: &str = "video-file-list";

/// Temporary list file for `ffmpeg -f concat`.
///
/// # Example
///
/// ```no_run
/// use avmerge_av::ConcatManifest;
/// use std::path::PathBuf;
///
/// let inputs = [PathBuf::from("/videos/a.mp4"), PathBuf::from("/videos/b.mp4")];
/// let manifest = ConcatManifest::create(&inputs).unwrap();
/// // ... run ffmpeg with `-i manifest.path()` ...
/// manifest.close().unwrap();
/// ```
#[derive(Debug)]
pub struct ConcatManifest {
    temp_dir: TempDir,
    path: PathBuf,
}

impl ConcatManifest {
    /// Create the temporary directory and write one `file` directive per
    /// input, preserving order.
    ///
    /// On any failure the partially created directory is removed before the
    /// error is returned.
    pub fn create(inputs: &[PathBuf]) -> Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix(DIR_PREFIX)
            .tempdir()
            .map_err(|e| Error::io(std::env::temp_dir(), e))?;

        let mut file = tempfile::Builder::new()
            .prefix(FILE_PREFIX)
            .suffix(".txt")
            .tempfile_in(temp_dir.path())
            .map_err(|e| Error::io(temp_dir.path(), e))?;

        let contents = render(inputs);
        if let Err(e) = file.write_all(contents.as_bytes()).and_then(|()| file.flush()) {
            return Err(Error::io(file.path(), e));
        }

        let (_, path) = file
            .keep()
            .map_err(|e| Error::io(temp_dir.path(), e.error))?;

        tracing::debug!("wrote concat manifest {} ({} inputs)", path.display(), inputs.len());

        Ok(Self { temp_dir, path })
    }

    /// Path of the manifest file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the manifest.
    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Remove the manifest and its directory, reporting failures.
    ///
    /// Dropping the manifest also removes it, silently.
    pub fn close(self) -> Result<()> {
        let dir = self.temp_dir.path().to_path_buf();
        self.temp_dir
            .close()
            .map_err(|source| Error::Cleanup { path: dir, source })
    }
}

/// Render the manifest body: one `file 'file:<path>'` line per input.
///
/// Single quotes inside a path are closed, escaped, and reopened (`'\''`),
/// the quoting the concat demuxer understands.
pub fn render(inputs: &[PathBuf]) -> String {
    inputs
        .iter()
        .map(|p| {
            let quoted = p.to_string_lossy().replace('\'', r"'\''");
            format!("file 'file:{quoted}'")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

//! Directory discovery and audio/video pairing.
//!
//! [`discover`] groups the eligible files of one directory by stem;
//! [`resolve_pairs`] turns those groups into the [`ResolvedPair`]s a merge
//! run works on. Resolution builds a new collection and never edits the
//! discovery map.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use avmerge_common::config::{MediaConfig, PairMode};
use avmerge_common::{extension_of, stem_of, Error, Result};
use tracing::{debug, warn};

/// One eligible directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaEntry {
    pub stem: String,
    pub extension: String,
}

/// The distinct extensions seen for one stem.
pub type CandidateGroup = BTreeSet<String>;

/// Stem → extensions present, for one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    /// Directory the entries were read from.
    pub dir: PathBuf,
    pub groups: BTreeMap<String, CandidateGroup>,
}

impl Discovery {
    /// Record one entry. A repeated extension for the same stem is ignored.
    pub fn insert(&mut self, entry: MediaEntry) {
        self.groups
            .entry(entry.stem)
            .or_default()
            .insert(entry.extension);
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// An audio file and the video it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPair {
    pub stem: String,
    pub video: PathBuf,
    pub audio: PathBuf,
}

/// Classify a single path, returning `None` when it does not take part in
/// pairing.
pub fn media_entry(path: &Path, media: &MediaConfig) -> Option<MediaEntry> {
    let file_name = path.file_name()?.to_str()?;
    if file_name.starts_with(&media.merged_prefix) && !media.merged_prefix.is_empty() {
        return None;
    }
    let extension = extension_of(path)?;
    if !media.is_media_extension(extension) {
        return None;
    }
    let stem = stem_of(path)?;

    Some(MediaEntry {
        stem: stem.to_string(),
        extension: extension.to_string(),
    })
}

/// Scan `dir` (not recursively) and group eligible files by stem.
///
/// Skips directories, already-merged output, non-UTF-8 names, and
/// extensions outside the allow-list.
///
/// # Errors
///
/// [`Error::Io`] if the directory cannot be listed.
pub fn discover(dir: &Path, media: &MediaConfig) -> Result<Discovery> {
    let mut discovery = Discovery {
        dir: dir.to_path_buf(),
        ..Default::default()
    };

    let entries = std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();

        let is_dir = entry
            .file_type()
            .map(|t| t.is_dir())
            .map_err(|e| Error::io(&path, e))?;
        if is_dir {
            continue;
        }

        match media_entry(&path, media) {
            Some(media_entry) => discovery.insert(media_entry),
            None => debug!("skipping {:?}", path),
        }
    }

    debug!(
        "Discovered {} candidate stems in {}",
        discovery.len(),
        dir.display()
    );
    Ok(discovery)
}

/// Select the stems that form a complete pair under `media.pair_mode`.
pub fn resolve_pairs(discovery: &Discovery, media: &MediaConfig) -> Vec<ResolvedPair> {
    discovery
        .groups
        .iter()
        .filter_map(|(stem, exts)| {
            let video_ext = qualifying_video_extension(stem, exts, media)?;
            Some(ResolvedPair {
                stem: stem.clone(),
                video: discovery.dir.join(format!("{stem}.{video_ext}")),
                audio: discovery
                    .dir
                    .join(format!("{stem}.{}", media.audio_extension)),
            })
        })
        .collect()
}

fn qualifying_video_extension<'a>(
    stem: &str,
    exts: &CandidateGroup,
    media: &'a MediaConfig,
) -> Option<&'a str> {
    if !exts.contains(&media.audio_extension) || exts.len() < 2 {
        return None;
    }

    match media.pair_mode {
        PairMode::Exact => {
            let video_ext = media.video_extensions.first()?;
            (exts.len() == 2 && exts.contains(video_ext)).then_some(video_ext.as_str())
        }
        PairMode::AudioPlusVideo => {
            let mut present = media
                .video_extensions
                .iter()
                .filter(|v| **v != media.audio_extension && exts.contains(*v));
            let chosen = present.next()?;
            let ignored: Vec<&String> = present.collect();
            if !ignored.is_empty() {
                warn!(
                    "Stem \"{stem}\" has several videos; merging .{chosen}, leaving {:?}",
                    ignored
                );
            }
            Some(chosen.as_str())
        }
    }
}

//! Merge-mode orchestration: discover, resolve, schedule.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use avmerge_av::{actions, MergeSettings, ToolRegistry};
use avmerge_common::config::Config;
use tokio_util::sync::CancellationToken;

use crate::discovery::{discover, resolve_pairs};
use crate::scheduler::{default_concurrency, RunSummary, Scheduler};

/// Merge every complete audio/video pair found in `dir`.
///
/// Directory listing and a missing ffmpeg are fatal and returned as errors.
/// Per-pair failures are logged as they happen and returned in the summary;
/// deciding whether they fail the run is left to the caller.
pub async fn merge_directory(
    dir: &Path,
    config: &Config,
    tools: &ToolRegistry,
    cancel: CancellationToken,
) -> Result<RunSummary> {
    let discovery = discover(dir, &config.media)?;
    let pairs = resolve_pairs(&discovery, &config.media);

    if pairs.is_empty() {
        tracing::info!("No audio/video pairs to merge in {}", dir.display());
        return Ok(RunSummary::default());
    }

    // Fail once up front rather than once per pair.
    tools.require(avmerge_av::tools::FFMPEG)?;

    let limit = config
        .merge
        .concurrency
        .unwrap_or_else(default_concurrency);
    let scheduler = Scheduler::new(limit, cancel);
    tracing::info!(
        "Merging {} pairs with up to {} concurrent ffmpeg processes",
        pairs.len(),
        scheduler.limit()
    );

    let tools = Arc::new(tools.clone());
    let settings = Arc::new(MergeSettings {
        merged_prefix: config.media.merged_prefix.clone(),
        audio_codec: config.merge.audio_codec.clone(),
    });

    let summary = scheduler
        .run(pairs, |pair, cancel| {
            let tools = tools.clone();
            let settings = settings.clone();
            async move {
                actions::merge(&tools, &pair.video, &pair.audio, &settings, &cancel)
                    .await
                    .map(|_| ())
            }
        })
        .await;

    tracing::info!(
        "Merge finished: {} succeeded, {} failed, {} skipped",
        summary.succeeded,
        summary.failed(),
        summary.skipped
    );
    Ok(summary)
}

//! Single-track download execution
//!
//! One task covers a track end-to-end: the initial invocation, failure
//! classification, and the escalation ladder. The ladder is data — an
//! ordered list of [`RetryStep`]s planned from the classified failure — so
//! each strategy is independently testable and adding one never deepens the
//! control flow.

use std::path::PathBuf;
use std::sync::Arc;

use crate::classify::{self, FailureKind};
use crate::config::Config;
use crate::search::{self, ReplacementQuery};
use crate::types::{DownloadOutcome, VideoId};
use crate::ytdlp::{AudioFetcher, FetchRequest};

/// One resolved track queued for download
#[derive(Clone, Debug)]
pub(crate) struct TrackTask {
    /// URL handed to the extraction tool
    pub url: String,
    /// Identifier recorded in the dedup index on success
    pub id: VideoId,
    /// Title carried along for replacement search
    pub title: Option<String>,
}

/// Shared state each worker needs (cheap to clone, all Arc-wrapped)
#[derive(Clone)]
pub(crate) struct TaskContext {
    pub config: Arc<Config>,
    pub fetcher: Arc<dyn AudioFetcher>,
}

/// One rung of the escalation ladder
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum RetryStep {
    /// Re-invoke with a geographic-origin hint
    GeoHint(String),
    /// Search for a replacement source and re-invoke against it
    Replacement,
}

/// Plan the escalation ladder for a classified failure.
///
/// Region blocks get one rung per derived country hint; unavailable tracks
/// get a single replacement-search rung when the caller opted in; everything
/// else is terminal.
pub(crate) fn plan_retries(
    kind: FailureKind,
    diagnostic: &str,
    replace_unavailable: bool,
) -> Vec<RetryStep> {
    match kind {
        FailureKind::RegionBlocked => classify::region_hints(diagnostic)
            .into_iter()
            .map(RetryStep::GeoHint)
            .collect(),
        FailureKind::Unavailable if replace_unavailable => vec![RetryStep::Replacement],
        _ => Vec::new(),
    }
}

/// Build the baseline fetch request for a track URL.
///
/// The output template routes files into `artist/album/title [id].ext`
/// using the tool's own metadata; the embedded identifier is what makes the
/// library rescannable into a dedup index on the next run.
pub(crate) fn base_request(config: &Config, url: &str) -> FetchRequest {
    let template = config
        .output_dir()
        .join("%(artist|album_artist|uploader|channel)s")
        .join("%(album|playlist_title|uploader)s")
        .join("%(track|title)s [%(id)s].%(ext)s");
    let cookies = config
        .tools
        .cookies_file
        .clone()
        .filter(|path| path.is_file());

    FetchRequest {
        url: url.to_string(),
        output_template: template.to_string_lossy().into_owned(),
        audio_format: config.download.audio_format,
        audio_quality: Some(config.download.audio_quality.clone()),
        cookies,
        rate_limit: config.download.rate_limit.clone(),
        sleep: config.download.sleep_between.clone(),
        sponsorblock_remove: config.download.sponsorblock_remove.clone(),
        geo_hint: None,
        prefer_music_domain: config.download.prefer_music_domain,
        skip_download: config.download.dry_run,
    }
}

/// Finish a successful attempt: stat the materialized file for the ETA
/// byte counters (0 when unknown, e.g. dry run).
async fn success_outcome(
    url: String,
    video_id: Option<VideoId>,
    final_path: Option<PathBuf>,
) -> DownloadOutcome {
    let bytes = match &final_path {
        Some(path) => tokio::fs::metadata(path)
            .await
            .map(|meta| meta.len())
            .unwrap_or(0),
        None => 0,
    };
    DownloadOutcome {
        success: true,
        url_used: url,
        video_id,
        final_path,
        bytes,
        error_message: None,
    }
}

/// Run one track task end-to-end, including escalation and fallback.
///
/// Never returns an error: every failure mode collapses into a failed
/// [`DownloadOutcome`] attributed to the original URL, unless a fallback
/// succeeds — in which case the outcome carries the replacement identity.
pub(crate) async fn run_track_task(ctx: &TaskContext, task: TrackTask) -> DownloadOutcome {
    let request = base_request(&ctx.config, &task.url);

    let first = match ctx.fetcher.fetch(&request).await {
        Ok(output) => output,
        Err(e) => return DownloadOutcome::failure(&task.url, e.to_string()),
    };
    if first.ok() {
        return success_outcome(task.url, Some(task.id), first.file_path).await;
    }

    let diagnostic = first.diagnostic;
    let kind = classify::classify(&diagnostic);
    tracing::debug!(url = %task.url, kind = kind.label(), "initial attempt failed");

    for step in plan_retries(kind, &diagnostic, ctx.config.search.replace_unavailable) {
        match step {
            RetryStep::GeoHint(hint) => {
                tracing::info!(url = %task.url, %hint, "retrying with geographic hint");
                if let Ok(output) = ctx.fetcher.fetch(&request.with_geo_hint(&hint)).await {
                    if output.ok() {
                        return success_outcome(task.url, Some(task.id), output.file_path).await;
                    }
                }
            }
            RetryStep::Replacement => {
                let expected = ctx.fetcher.probe_duration(&task.url).await;
                let query = ReplacementQuery {
                    original_title: task.title.clone(),
                    failed_id: task.id.clone(),
                    expected_duration_secs: expected,
                    prefer_music_domain: ctx.config.download.prefer_music_domain,
                };
                let Some(replacement_url) = search::find_replacement(
                    ctx.fetcher.as_ref(),
                    query,
                    ctx.config.search.max_results,
                )
                .await
                else {
                    continue;
                };
                if replacement_url == task.url {
                    continue;
                }
                tracing::info!(url = %task.url, replacement = %replacement_url, "retrying with replacement source");
                if let Ok(output) = ctx.fetcher.fetch(&request.with_url(&replacement_url)).await {
                    if output.ok() {
                        let replacement_id = VideoId::from_url(&replacement_url);
                        return success_outcome(replacement_url, replacement_id, output.file_path)
                            .await;
                    }
                }
            }
        }
    }

    DownloadOutcome::failure(&task.url, format!("[{}] {}", kind.label(), diagnostic.trim()))
}

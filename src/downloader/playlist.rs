//! Per-playlist scheduling and outcome aggregation
//!
//! For one playlist: resolve tracks, partition against the shared dedup
//! index, dispatch the new work onto a bounded worker pool, and consume the
//! outcomes in completion order. The consuming loop is the only writer of
//! the dedup index, which is what serializes index mutations without a
//! concurrent map — combined with the pending-identifier set at task-list
//! construction, no identifier is ever submitted to two tasks in one run.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};

use super::TakeoutDownloader;
use super::task::{TaskContext, TrackTask, run_track_task};
use crate::library;
use crate::progress::{ProgressTracker, format_eta};
use crate::types::{Playlist, PlaylistSummary, VideoId};

impl TakeoutDownloader {
    /// Process one playlist to completion and return its summary.
    ///
    /// The worker pool is created and torn down here — it is per-playlist,
    /// not shared across playlists.
    pub(crate) async fn process_playlist(&mut self, playlist: &Playlist) -> PlaylistSummary {
        let config = Arc::clone(&self.config);
        tracing::info!(
            playlist = %playlist.name,
            tracks = playlist.tracks.len(),
            "processing playlist"
        );

        let mut summary = PlaylistSummary {
            name: playlist.name.clone(),
            ..PlaylistSummary::default()
        };

        // Partition single-threaded, before any dispatch: already-materialized
        // identifiers are skipped (keeping their path for the artifact), and a
        // pending set rejects duplicate submissions within the playlist.
        let mut pending: HashSet<VideoId> = HashSet::new();
        let mut tasks: Vec<TrackTask> = Vec::new();
        for track in &playlist.tracks {
            let Some(resolved) = track.resolve() else {
                tracing::warn!(
                    playlist = %playlist.name,
                    title = track.title.as_deref().unwrap_or("<untitled>"),
                    "dropping track with no resolvable identity"
                );
                continue;
            };
            if let Some(existing) = self.index.get(&resolved.id) {
                summary.skipped += 1;
                summary.files.push(existing.clone());
            } else if !pending.insert(resolved.id.clone()) {
                summary.skipped += 1;
                tracing::debug!(id = %resolved.id, "duplicate identifier within playlist");
            } else {
                tasks.push(TrackTask {
                    url: resolved.url,
                    id: resolved.id,
                    title: resolved.title,
                });
            }
        }

        let width = config.concurrency();
        let ctx = TaskContext {
            config: Arc::clone(&config),
            fetcher: Arc::clone(&self.fetcher),
        };
        let mut progress = ProgressTracker::new(tasks.len());
        tracing::info!(
            new = tasks.len(),
            skipped = summary.skipped,
            width,
            "dispatching download tasks"
        );

        let mut outcomes = stream::iter(tasks.into_iter().map(|task| {
            let ctx = ctx.clone();
            async move { run_track_task(&ctx, task).await }
        }))
        .buffer_unordered(width);

        // Outcomes arrive in completion order, not submission order; nothing
        // below may assume any particular interleaving.
        while let Some(outcome) = outcomes.next().await {
            progress.record(&outcome);
            if outcome.success {
                summary.downloaded += 1;
                if let (Some(id), Some(path)) = (&outcome.video_id, &outcome.final_path) {
                    if !self.index.record(id.clone(), path.clone()) {
                        tracing::warn!(id = %id, "identifier already indexed, keeping first path");
                    }
                    summary.files.push(path.clone());
                }
            } else {
                if let Some(message) = &outcome.error_message {
                    tracing::warn!(url = %outcome.url_used, error = %message, "track failed");
                }
                summary.failed += 1;
                summary.failed_urls.push(outcome.url_used.clone());
            }
            tracing::info!(
                playlist = %playlist.name,
                done = progress.processed(),
                total = progress.total(),
                failed = progress.failed(),
                eta = %format_eta(progress.eta()),
                "progress"
            );
        }

        if config.download.write_playlist_files && !summary.files.is_empty() {
            match library::write_playlist_file(config.output_dir(), &playlist.name, &summary.files)
            {
                Ok(path) => {
                    tracing::info!(path = %path.display(), "wrote playlist reference");
                }
                Err(e) => {
                    tracing::warn!(playlist = %playlist.name, error = %e, "failed to write playlist reference");
                }
            }
        }

        tracing::info!(
            playlist = %playlist.name,
            downloaded = summary.downloaded,
            failed = summary.failed,
            skipped = summary.skipped,
            "playlist complete"
        );
        summary
    }
}

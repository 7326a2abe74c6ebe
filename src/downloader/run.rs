//! Run coordination across playlists
//!
//! Seeds the dedup index from one library scan, processes playlists
//! sequentially, folds their summaries into run totals, and writes the
//! failure-report artifact. Only a missing input root is fatal; artifact
//! write errors are warnings and never affect the run's outcome.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::TakeoutDownloader;
use crate::error::{Error, Result};
use crate::library::LibraryIndex;
use crate::takeout;
use crate::types::PlaylistSummary;
use crate::ytdlp;

/// Filename of the failed-URL sidecar artifact, under the library root
const FAILURE_REPORT_FILE: &str = "failed-downloads.txt";

/// Aggregate totals for one full run
#[derive(Clone, Debug)]
pub struct RunReport {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Playlists processed
    pub playlists: usize,
    /// Tracks newly downloaded across all playlists
    pub downloaded: usize,
    /// Tracks that failed after all escalation
    pub failed: usize,
    /// Tracks skipped via the dedup index
    pub skipped: usize,
    /// Every URL that failed, in completion order
    pub failed_urls: Vec<String>,
}

impl RunReport {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            playlists: 0,
            downloaded: 0,
            failed: 0,
            skipped: 0,
            failed_urls: Vec::new(),
        }
    }

    fn fold(&mut self, summary: &PlaylistSummary) {
        self.playlists += 1;
        self.downloaded += summary.downloaded;
        self.failed += summary.failed;
        self.skipped += summary.skipped;
        self.failed_urls.extend(summary.failed_urls.iter().cloned());
    }

    /// Process exit status for this run: 0 on zero failures, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.failed == 0 { 0 } else { 1 }
    }
}

/// Write the failed-URL list, one URL per line
fn write_failure_report(library_root: &Path, failed_urls: &[String]) -> Result<PathBuf> {
    let path = library_root.join(FAILURE_REPORT_FILE);
    let mut content = String::new();
    for url in failed_urls {
        content.push_str(url);
        content.push('\n');
    }
    std::fs::write(&path, content)?;
    Ok(path)
}

impl TakeoutDownloader {
    /// Run the full download pass over every playlist under the input root.
    ///
    /// Errors only on a missing input root or when nothing is processable;
    /// per-track failures are aggregated into the returned report instead.
    pub async fn run(&mut self) -> Result<RunReport> {
        let config = std::sync::Arc::clone(&self.config);
        if !config.input_root.exists() {
            return Err(Error::InputRootMissing(config.input_root.clone()));
        }

        let output_dir = config.output_dir();
        tokio::fs::create_dir_all(output_dir).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "failed to create output directory '{}': {}",
                    output_dir.display(),
                    e
                ),
            ))
        })?;

        if let Some(cookies) = &config.tools.cookies_file {
            ytdlp::check_cookies_file(cookies);
        }

        self.index = LibraryIndex::scan(output_dir);
        tracing::info!(existing = self.index.len(), "seeded dedup index from library scan");

        let playlists =
            takeout::load_playlists(&config.input_root, config.download.strip_videos_suffix);
        let total_tracks: usize = playlists.iter().map(|p| p.tracks.len()).sum();
        if playlists.is_empty() || total_tracks == 0 {
            return Err(Error::NoPlaylists(config.input_root.clone()));
        }
        tracing::info!(
            playlists = playlists.len(),
            tracks = total_tracks,
            dry_run = config.download.dry_run,
            "starting run"
        );

        let mut report = RunReport::new();
        for playlist in &playlists {
            let summary = self.process_playlist(playlist).await;
            report.fold(&summary);
        }

        if !report.failed_urls.is_empty() {
            match write_failure_report(output_dir, &report.failed_urls) {
                Ok(path) => {
                    tracing::info!(
                        path = %path.display(),
                        failures = report.failed_urls.len(),
                        "wrote failure report"
                    );
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to write failure report");
                }
            }
        }

        let elapsed = (Utc::now() - report.started_at).num_seconds();
        tracing::info!(
            playlists = report.playlists,
            downloaded = report.downloaded,
            failed = report.failed,
            skipped = report.skipped,
            elapsed_secs = elapsed,
            "run complete"
        );
        Ok(report)
    }
}

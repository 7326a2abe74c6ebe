//! Core download orchestration split into focused submodules.
//!
//! The `TakeoutDownloader` struct and its methods are organized by scope:
//! - [`run`] - Run coordination across playlists (scan, totals, artifacts)
//! - [`playlist`] - Per-playlist scheduling and outcome aggregation
//! - [`task`] - Single-track execution with escalation and fallback

mod playlist;
mod run;
mod task;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::library::LibraryIndex;
use crate::ytdlp::{AudioFetcher, YtDlpFetcher};

pub use run::RunReport;

/// Top-level downloader instance
///
/// Owns the run-scoped state: the configuration, the extraction-tool
/// boundary, and the dedup index shared across every playlist in the run.
/// Playlists are processed sequentially; within a playlist, tasks run on a
/// bounded worker pool and their outcomes are folded back into this struct
/// by the single consuming loop, which is what serializes all dedup-index
/// mutations.
pub struct TakeoutDownloader {
    /// Configuration (shared with every spawned task)
    config: Arc<Config>,
    /// External tool boundary (trait object so tests can substitute a mock)
    fetcher: Arc<dyn AudioFetcher>,
    /// Run-scoped identifier → materialized-file index
    index: LibraryIndex,
}

impl TakeoutDownloader {
    /// Create a downloader resolving the real extraction tool from config.
    ///
    /// Fails when the configuration is invalid or the tool binary cannot be
    /// located.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let fetcher = YtDlpFetcher::from_config(&config)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    /// Create a downloader with an explicit fetcher implementation
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn AudioFetcher>) -> Self {
        Self {
            config: Arc::new(config),
            fetcher,
            index: LibraryIndex::new(),
        }
    }

    /// Number of identifiers currently in the dedup index
    pub fn indexed(&self) -> usize {
        self.index.len()
    }
}

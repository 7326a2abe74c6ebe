//! # takeout-dl
//!
//! Download orchestration for exported music playlists: turns a directory of
//! playlist JSON files into a library of audio files by driving an external
//! extraction tool, with global deduplication across playlists, bounded
//! parallelism, classified-failure escalation (geographic retry hints,
//! replacement search), and blended progress/ETA reporting.
//!
//! ## Design Philosophy
//!
//! - **Tolerant of partial failure** - a bad track never aborts a playlist
//!   or the run; failures are classified, escalated where a strategy exists,
//!   and otherwise aggregated into the final report
//! - **At most one download per identifier per run** - enforced at task
//!   construction, with the dedup index rebuilt from a library scan each run
//! - **The tool is the boundary** - command construction and output parsing
//!   live behind one trait, so the orchestration core runs against mocks
//!
//! ## Quick Start
//!
//! ```no_run
//! use takeout_dl::{Config, TakeoutDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.input_root = "./takeout".into();
//!     config.download.output_dir = "./library".into();
//!
//!     let mut downloader = TakeoutDownloader::new(config)?;
//!     let report = downloader.run().await?;
//!     std::process::exit(report.exit_code());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Failure classification and region-hint derivation
pub mod classify;
/// Configuration types
pub mod config;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Library scanning and playlist-reference artifacts
pub mod library;
/// Progress tracking and ETA estimation
pub mod progress;
/// Replacement search for unavailable tracks
pub mod search;
/// Playlist discovery and loading
pub mod takeout;
/// Core types
pub mod types;
/// External extraction-tool boundary
pub mod ytdlp;

// Re-export commonly used types
pub use config::{AudioFormat, Config, DownloadConfig, SearchConfig, ToolsConfig};
pub use downloader::{RunReport, TakeoutDownloader};
pub use error::{Error, Result, ToolError};
pub use library::LibraryIndex;
pub use types::{DownloadOutcome, Playlist, PlaylistSummary, Track, VideoId};
pub use ytdlp::{AudioFetcher, FetchOutput, FetchRequest, SearchHit, YtDlpFetcher};

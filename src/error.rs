//! Error types for takeout-dl
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (Config, Tool, playlist discovery)
//! - Contextual information (binary path, configuration key, input root)
//!
//! Track-level download failures are deliberately NOT errors: they are
//! aggregated into [`DownloadOutcome`](crate::types::DownloadOutcome) values
//! and surfaced in the run summary, so a single bad track never aborts a
//! playlist or the run.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for takeout-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for takeout-dl
///
/// Each variant includes contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "sleep_between")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// External extraction tool failed to run
    #[error("tool error: {0}")]
    Tool(#[from] ToolError),

    /// The input root containing playlist files does not exist
    #[error("input root not found: {}", .0.display())]
    InputRootMissing(PathBuf),

    /// No playlist files with usable tracks were found under the input root
    #[error("no playlists with tracks found under {}", .0.display())]
    NoPlaylists(PathBuf),
}

/// Errors launching or supervising the external extraction tool
///
/// These cover the tool process itself failing to run. A tool that runs and
/// exits nonzero is not a `ToolError` — its diagnostic text is classified and
/// fed into the retry ladder instead.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool binary could not be located
    #[error("extraction tool not found: {binary}")]
    NotFound {
        /// The binary name or path that was searched for
        binary: String,
    },

    /// The tool process could not be spawned
    #[error("failed to spawn {binary}: {message}")]
    Spawn {
        /// The binary that failed to spawn
        binary: String,
        /// The underlying OS error message
        message: String,
    },

    /// The tool process exceeded the configured timeout and was killed
    #[error("tool invocation timed out after {seconds}s")]
    TimedOut {
        /// The configured timeout in seconds
        seconds: u64,
    },
}

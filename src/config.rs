//! Configuration types for takeout-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Output format for extracted audio
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// AAC in an MP4 container (no transcode for most sources)
    #[default]
    M4a,
    /// MP3 (transcoded; quality setting applies)
    Mp3,
}

impl AudioFormat {
    /// The format name as passed to the extraction tool
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::M4a => "m4a",
            Self::Mp3 => "mp3",
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Download behavior configuration (output, concurrency, pacing)
///
/// Groups settings related to how tracks are fetched and stored.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Library output root (default: "./library")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Parallel download tasks per playlist (default: 2, minimum 1)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Output audio format
    #[serde(default)]
    pub audio_format: AudioFormat,

    /// Audio quality, forwarded for mp3 only (0 = best VBR, 9 = worst)
    #[serde(default = "default_audio_quality")]
    pub audio_quality: String,

    /// Rewrite track URLs to the music domain for better music metadata
    #[serde(default)]
    pub prefer_music_domain: bool,

    /// Write an ordered playlist-reference file per playlist
    #[serde(default)]
    pub write_playlist_files: bool,

    /// Bandwidth limit passed through per invocation (e.g. "1M")
    #[serde(default)]
    pub rate_limit: Option<String>,

    /// Inter-invocation sleep: "N" fixed seconds or "min,max" randomized
    #[serde(default)]
    pub sleep_between: Option<String>,

    /// Content-trim segment categories passed through to the tool
    #[serde(default)]
    pub sponsorblock_remove: Option<String>,

    /// Run the full control flow with the transfer itself skipped
    #[serde(default)]
    pub dry_run: bool,

    /// Strip a trailing "-videos" suffix from playlist names
    #[serde(default)]
    pub strip_videos_suffix: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            concurrency: default_concurrency(),
            audio_format: AudioFormat::default(),
            audio_quality: default_audio_quality(),
            prefer_music_domain: false,
            write_playlist_files: false,
            rate_limit: None,
            sleep_between: None,
            sponsorblock_remove: None,
            dry_run: false,
            strip_videos_suffix: false,
        }
    }
}

/// External tool configuration (binary location, credentials, supervision)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the extraction tool binary (auto-detected if None)
    #[serde(default)]
    pub tool_path: Option<PathBuf>,

    /// Whether to search PATH for the tool if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Path to a cookies file in Netscape format
    #[serde(default)]
    pub cookies_file: Option<PathBuf>,

    /// Kill a tool invocation after this many seconds (None = wait forever,
    /// matching the original behavior)
    #[serde(default)]
    pub tool_timeout_secs: Option<u64>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            tool_path: None,
            search_path: true,
            cookies_file: None,
            tool_timeout_secs: None,
        }
    }
}

/// Replacement search configuration
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Attempt replacement search for unavailable tracks (opt-in)
    #[serde(default)]
    pub replace_unavailable: bool,

    /// Maximum search results to consider per failed track (default: 10)
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            replace_unavailable: false,
            max_results: default_max_results(),
        }
    }
}

/// Main configuration for the download run
///
/// Fields are organized into logical sub-configs:
/// - [`download`](DownloadConfig) — output, concurrency, pacing
/// - [`tools`](ToolsConfig) — tool binary, credentials, supervision
/// - [`search`](SearchConfig) — replacement search policy
///
/// Sub-config fields are flattened for serialization so the on-disk format
/// stays un-nested.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Root directory scanned recursively for playlist JSON files
    #[serde(default = "default_input_root")]
    pub input_root: PathBuf,

    /// Download behavior settings
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// External tool settings
    #[serde(flatten)]
    pub tools: ToolsConfig,

    /// Replacement search settings
    #[serde(flatten)]
    pub search: SearchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_root: default_input_root(),
            download: DownloadConfig::default(),
            tools: ToolsConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Config {
    /// Library output root
    pub fn output_dir(&self) -> &PathBuf {
        &self.download.output_dir
    }

    /// Worker pool width, clamped to the minimum of 1
    pub fn concurrency(&self) -> usize {
        self.download.concurrency.max(1)
    }

    /// Validate settings that would otherwise surface as confusing tool
    /// errors mid-run.
    pub fn validate(&self) -> Result<()> {
        if let Some(spec) = &self.download.sleep_between {
            validate_sleep_spec(spec)?;
        }
        if self.download.audio_format == AudioFormat::Mp3
            && self.download.audio_quality.parse::<u8>().map_or(true, |q| q > 9)
        {
            return Err(Error::Config {
                message: format!(
                    "audio_quality must be 0-9 for mp3, got {:?}",
                    self.download.audio_quality
                ),
                key: Some("audio_quality".to_string()),
            });
        }
        Ok(())
    }
}

/// Check a sleep spec: "N" fixed or "min,max" randomized, seconds
fn validate_sleep_spec(spec: &str) -> Result<()> {
    let bad = |message: String| Error::Config {
        message,
        key: Some("sleep_between".to_string()),
    };
    let trimmed = spec.trim();
    if trimmed.is_empty() {
        return Ok(());
    }
    let parts: Vec<&str> = trimmed.split(',').collect();
    if parts.len() > 2 {
        return Err(bad(format!("sleep spec {spec:?} has more than two bounds")));
    }
    for part in parts {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if part.parse::<f64>().is_err() {
            return Err(bad(format!("sleep bound {part:?} is not a number")));
        }
    }
    Ok(())
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./library")
}

fn default_input_root() -> PathBuf {
    PathBuf::from(".")
}

const fn default_concurrency() -> usize {
    2
}

fn default_audio_quality() -> String {
    "0".to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_max_results() -> usize {
    10
}

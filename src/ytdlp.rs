//! External extraction-tool boundary
//!
//! The tool is treated as an opaque synchronous call: this module owns
//! command construction and result parsing, nothing else. Requests are typed
//! structs mapped to argument vectors by pure builder functions, so command
//! construction is unit-testable without ever spawning a process, and the
//! [`AudioFetcher`] trait is the seam the orchestration core mocks in tests.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::{AudioFormat, Config, ToolsConfig};
use crate::error::{Result, ToolError};
use crate::types::VideoId;

/// Binary name searched on PATH when no explicit tool path is configured
pub const DEFAULT_TOOL_BINARY: &str = "yt-dlp";

/// One fetch invocation, fully specified
///
/// Maps 1:1 onto an argument vector via [`build_download_args`].
#[derive(Clone, Debug, PartialEq)]
pub struct FetchRequest {
    /// Source URL
    pub url: String,
    /// Output path template handed to the tool
    pub output_template: String,
    /// Output audio format
    pub audio_format: AudioFormat,
    /// Audio quality, forwarded for mp3 only
    pub audio_quality: Option<String>,
    /// Cookies file, already verified to exist
    pub cookies: Option<PathBuf>,
    /// Bandwidth limit (e.g. "1M")
    pub rate_limit: Option<String>,
    /// Sleep spec: "N" fixed or "min,max" randomized
    pub sleep: Option<String>,
    /// Content-trim segment categories
    pub sponsorblock_remove: Option<String>,
    /// Geographic-origin hint for a region retry
    pub geo_hint: Option<String>,
    /// Rewrite the URL to the music domain
    pub prefer_music_domain: bool,
    /// Skip the actual transfer (dry run)
    pub skip_download: bool,
}

impl FetchRequest {
    /// The same request with a geographic-origin hint injected
    pub fn with_geo_hint(&self, hint: &str) -> Self {
        let mut request = self.clone();
        request.geo_hint = Some(hint.to_string());
        request
    }

    /// The same request aimed at a different URL
    pub fn with_url(&self, url: &str) -> Self {
        let mut request = self.clone();
        request.url = url.to_string();
        request
    }
}

/// Result of one fetch invocation
#[derive(Clone, Debug)]
pub struct FetchOutput {
    /// Tool exit status code
    pub status: i32,
    /// Materialized file path (the single trailing stdout line) on success
    pub file_path: Option<PathBuf>,
    /// Diagnostic text (stderr) for classification on failure
    pub diagnostic: String,
}

impl FetchOutput {
    /// Whether the invocation succeeded
    pub fn ok(&self) -> bool {
        self.status == 0
    }
}

/// One candidate from the tool's search mode
#[derive(Clone, Debug, PartialEq)]
pub struct SearchHit {
    /// Candidate identifier
    pub id: String,
    /// Candidate title
    pub title: String,
    /// Candidate duration in seconds, when reported
    pub duration_secs: Option<u64>,
    /// Whether the candidate carries a usable audio stream
    pub has_audio: bool,
}

/// Rewrite a track URL to the music domain, when its identifier is extractable
pub fn rewrite_to_music_domain(url: &str) -> String {
    match VideoId::from_url(url) {
        Some(id) => id.music_url(),
        None => url.to_string(),
    }
}

/// Append the sleep flags for a "N" or "min,max" spec
fn add_sleep_flags(args: &mut Vec<String>, spec: &str) {
    let spec = spec.trim();
    if spec.is_empty() {
        return;
    }
    match spec.split_once(',') {
        Some((lo, hi)) => {
            let (lo, hi) = (lo.trim(), hi.trim());
            if !lo.is_empty() && !hi.is_empty() {
                args.push("--min-sleep-interval".to_string());
                args.push(lo.to_string());
                args.push("--max-sleep-interval".to_string());
                args.push(hi.to_string());
            } else if !lo.is_empty() || !hi.is_empty() {
                args.push("--sleep-interval".to_string());
                args.push(if lo.is_empty() { hi } else { lo }.to_string());
            }
        }
        None => {
            args.push("--sleep-interval".to_string());
            args.push(spec.to_string());
        }
    }
}

/// Map a [`FetchRequest`] to the tool's argument vector.
///
/// Pure function: no filesystem access, no process execution.
pub fn build_download_args(request: &FetchRequest) -> Vec<String> {
    let url = if request.prefer_music_domain {
        rewrite_to_music_domain(&request.url)
    } else {
        request.url.clone()
    };

    let mut args: Vec<String> = [
        "--no-playlist",
        "-x",
        "--audio-format",
        request.audio_format.as_str(),
        "--embed-metadata",
        "--embed-thumbnail",
        "--add-metadata",
        "--no-abort-on-error",
        "--no-overwrites",
        "--print",
        "filename",
        "-o",
        &request.output_template,
    ]
    .into_iter()
    .map(str::to_string)
    .collect();

    if request.audio_format == AudioFormat::Mp3 {
        if let Some(quality) = &request.audio_quality {
            args.push("--audio-quality".to_string());
            args.push(quality.clone());
        }
    }

    if let Some(cookies) = &request.cookies {
        args.push("--cookies".to_string());
        args.push(cookies.to_string_lossy().into_owned());
    }

    if let Some(rate) = &request.rate_limit {
        args.push("--limit-rate".to_string());
        args.push(rate.clone());
    }

    if let Some(spec) = &request.sleep {
        add_sleep_flags(&mut args, spec);
    }

    if let Some(categories) = &request.sponsorblock_remove {
        args.push("--sponsorblock-remove".to_string());
        args.push(categories.clone());
    }

    if let Some(hint) = &request.geo_hint {
        args.push("--geo-bypass-country".to_string());
        args.push(hint.clone());
    }

    if request.skip_download {
        args.push("--skip-download".to_string());
    }

    args.push(url);
    args
}

/// Argument vector for the tool's search mode
pub fn build_search_args(query: &str, max_results: usize) -> Vec<String> {
    vec![
        "--dump-json".to_string(),
        "--ignore-errors".to_string(),
        "--no-warnings".to_string(),
        format!("ytsearch{max_results}:{query}"),
    ]
}

/// Argument vector for a metadata-only duration probe
pub fn build_probe_args(url: &str) -> Vec<String> {
    vec![
        "--dump-json".to_string(),
        "--no-warnings".to_string(),
        "--skip-download".to_string(),
        url.to_string(),
    ]
}

/// Parse one JSON line of search output into a [`SearchHit`]
fn parse_search_line(line: &str) -> Option<SearchHit> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    let id = value.get("id")?.as_str()?.to_string();
    let title = value
        .get("title")
        .and_then(|t| t.as_str())
        .unwrap_or_default()
        .to_string();
    let duration_secs = value
        .get("duration")
        .and_then(|d| d.as_f64())
        .map(|d| d.round() as u64);
    let has_audio = value
        .get("formats")
        .and_then(|f| f.as_array())
        .map(|formats| {
            formats.iter().any(|format| {
                format
                    .get("acodec")
                    .and_then(|a| a.as_str())
                    .is_some_and(|a| !a.is_empty() && a != "none")
            })
        })
        .unwrap_or(false);
    Some(SearchHit {
        id,
        title,
        duration_secs,
        has_audio,
    })
}

/// The boundary the orchestration core depends on
///
/// Implemented by [`YtDlpFetcher`] for real runs and by mock fetchers in
/// unit tests, so escalation and scheduling logic never needs a process to
/// be exercised.
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    /// Run one fetch invocation to completion
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchOutput>;

    /// Query the tool's search mode for up to `max_results` candidates
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;

    /// Best-effort metadata-only duration probe; all failures degrade to `None`
    async fn probe_duration(&self, url: &str) -> Option<u64>;
}

/// [`AudioFetcher`] implementation spawning the real extraction tool
pub struct YtDlpFetcher {
    binary: PathBuf,
    timeout: Option<Duration>,
}

impl YtDlpFetcher {
    /// Use an explicit tool binary
    pub fn new(binary: PathBuf) -> Self {
        Self {
            binary,
            timeout: None,
        }
    }

    /// Kill invocations that outlive `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve the tool from configuration: explicit path first, then a PATH
    /// search when enabled.
    pub fn resolve(tools: &ToolsConfig) -> Result<Self> {
        let binary = if let Some(path) = &tools.tool_path {
            path.clone()
        } else if tools.search_path {
            which::which(DEFAULT_TOOL_BINARY).map_err(|_| ToolError::NotFound {
                binary: DEFAULT_TOOL_BINARY.to_string(),
            })?
        } else {
            return Err(ToolError::NotFound {
                binary: DEFAULT_TOOL_BINARY.to_string(),
            }
            .into());
        };
        Ok(Self::new(binary).with_timeout(tools.tool_timeout_secs.map(Duration::from_secs)))
    }

    /// Resolve from the full run configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::resolve(&config.tools)
    }

    /// Spawn the tool and collect its output, honoring the optional timeout.
    ///
    /// The child is spawned with kill-on-drop so an expired timeout also
    /// terminates the process instead of leaking it.
    async fn run(&self, args: &[String]) -> Result<std::process::Output> {
        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true);

        let spawn_error = |e: std::io::Error| -> crate::error::Error {
            if e.kind() == std::io::ErrorKind::NotFound {
                ToolError::NotFound {
                    binary: self.binary.to_string_lossy().into_owned(),
                }
                .into()
            } else {
                ToolError::Spawn {
                    binary: self.binary.to_string_lossy().into_owned(),
                    message: e.to_string(),
                }
                .into()
            }
        };

        match self.timeout {
            None => command.output().await.map_err(spawn_error),
            Some(limit) => match tokio::time::timeout(limit, command.output()).await {
                Ok(result) => result.map_err(spawn_error),
                Err(_) => Err(ToolError::TimedOut {
                    seconds: limit.as_secs(),
                }
                .into()),
            },
        }
    }
}

#[async_trait]
impl AudioFetcher for YtDlpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchOutput> {
        let args = build_download_args(request);
        tracing::debug!(url = %request.url, geo_hint = ?request.geo_hint, "invoking extraction tool");
        let output = self.run(&args).await?;

        let status = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let diagnostic = String::from_utf8_lossy(&output.stderr).trim().to_string();

        let file_path = if status == 0 {
            stdout
                .lines()
                .rev()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(PathBuf::from)
        } else {
            None
        };

        Ok(FetchOutput {
            status,
            file_path,
            diagnostic,
        })
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let args = build_search_args(query, max_results);
        tracing::debug!(%query, max_results, "searching for replacement candidates");
        let output = self.run(&args).await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().filter_map(parse_search_line).collect())
    }

    async fn probe_duration(&self, url: &str) -> Option<u64> {
        let args = build_probe_args(url);
        let output = match self.run(&args).await {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!(%url, error = %e, "duration probe failed");
                return None;
            }
        };
        if !output.status.success() {
            return None;
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout.lines().find(|line| !line.trim().is_empty())?;
        let value: serde_json::Value = serde_json::from_str(line).ok()?;
        value
            .get("duration")
            .and_then(|d| d.as_f64())
            .map(|d| d.round() as u64)
    }
}

/// Log warnings when a configured cookies file does not look usable.
///
/// Heuristic and non-fatal: the run proceeds either way.
pub fn check_cookies_file(path: &Path) {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cookies file is unreadable");
            return;
        }
    };
    if content.trim().is_empty() {
        tracing::warn!(path = %path.display(), "cookies file is empty");
        return;
    }
    let looks_netscape = content.starts_with("# Netscape HTTP Cookie File")
        || content
            .lines()
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .any(|line| line.split('\t').count() >= 6);
    if !looks_netscape {
        tracing::warn!(
            path = %path.display(),
            "cookies file does not look like Netscape format; the tool may reject it"
        );
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> FetchRequest {
        FetchRequest {
            url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
            output_template: "/library/%(title)s [%(id)s].%(ext)s".to_string(),
            audio_format: AudioFormat::M4a,
            audio_quality: Some("0".to_string()),
            cookies: None,
            rate_limit: None,
            sleep: None,
            sponsorblock_remove: None,
            geo_hint: None,
            prefer_music_domain: false,
            skip_download: false,
        }
    }

    #[test]
    fn base_args_end_with_url() {
        let args = build_download_args(&request());
        assert_eq!(args[0], "--no-playlist");
        assert!(args.contains(&"--no-overwrites".to_string()));
        assert_eq!(args.last().unwrap(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[test]
    fn quality_only_forwarded_for_mp3() {
        let mut req = request();
        assert!(!build_download_args(&req).contains(&"--audio-quality".to_string()));
        req.audio_format = AudioFormat::Mp3;
        let args = build_download_args(&req);
        let pos = args.iter().position(|a| a == "--audio-quality").unwrap();
        assert_eq!(args[pos + 1], "0");
    }

    #[test]
    fn fixed_sleep_flag() {
        let mut req = request();
        req.sleep = Some("5".to_string());
        let args = build_download_args(&req);
        let pos = args.iter().position(|a| a == "--sleep-interval").unwrap();
        assert_eq!(args[pos + 1], "5");
    }

    #[test]
    fn ranged_sleep_flags() {
        let mut req = request();
        req.sleep = Some("2,8".to_string());
        let args = build_download_args(&req);
        let lo = args.iter().position(|a| a == "--min-sleep-interval").unwrap();
        let hi = args.iter().position(|a| a == "--max-sleep-interval").unwrap();
        assert_eq!(args[lo + 1], "2");
        assert_eq!(args[hi + 1], "8");
    }

    #[test]
    fn half_open_sleep_range_degrades_to_fixed() {
        let mut req = request();
        req.sleep = Some("3,".to_string());
        let args = build_download_args(&req);
        let pos = args.iter().position(|a| a == "--sleep-interval").unwrap();
        assert_eq!(args[pos + 1], "3");
        assert!(!args.contains(&"--min-sleep-interval".to_string()));
    }

    #[test]
    fn geo_hint_flag() {
        let req = request().with_geo_hint("DE");
        let args = build_download_args(&req);
        let pos = args.iter().position(|a| a == "--geo-bypass-country").unwrap();
        assert_eq!(args[pos + 1], "DE");
    }

    #[test]
    fn dry_run_skips_download() {
        let mut req = request();
        req.skip_download = true;
        assert!(build_download_args(&req).contains(&"--skip-download".to_string()));
    }

    #[test]
    fn music_domain_rewrite() {
        let mut req = request();
        req.prefer_music_domain = true;
        let args = build_download_args(&req);
        assert_eq!(
            args.last().unwrap(),
            "https://music.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }

    #[test]
    fn music_rewrite_leaves_unparseable_urls_alone() {
        assert_eq!(
            rewrite_to_music_domain("not a url"),
            "not a url".to_string()
        );
    }

    #[test]
    fn search_args_embed_query() {
        let args = build_search_args("never gonna give", 7);
        assert_eq!(args.last().unwrap(), "ytsearch7:never gonna give");
    }

    #[test]
    fn parses_search_line() {
        let line = r#"{"id":"abcdefghijk","title":"A Song","duration":212.4,"formats":[{"acodec":"none"},{"acodec":"opus"}]}"#;
        let hit = parse_search_line(line).unwrap();
        assert_eq!(hit.id, "abcdefghijk");
        assert_eq!(hit.duration_secs, Some(212));
        assert!(hit.has_audio);
    }

    #[test]
    fn search_line_without_audio_formats() {
        let line = r#"{"id":"abcdefghijk","title":"A Song","duration":100,"formats":[{"acodec":"none"}]}"#;
        assert!(!parse_search_line(line).unwrap().has_audio);
        let bare = r#"{"id":"abcdefghijk","title":"A Song"}"#;
        assert!(!parse_search_line(bare).unwrap().has_audio);
    }

    #[test]
    fn garbage_search_lines_are_skipped() {
        assert!(parse_search_line("[download] Downloading item 1 of 5").is_none());
    }
}

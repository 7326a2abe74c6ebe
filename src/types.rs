//! Core types for takeout-dl

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Pattern matching a bare 11-character video identifier
static VIDEO_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap_or_else(|e| panic!("invalid id regex: {e}"))
});

/// Loose pattern locating an identifier embedded anywhere in a URL string
static EMBEDDED_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9_-]{11}").unwrap_or_else(|e| panic!("invalid embedded id regex: {e}"))
});

/// Hosts recognized as sources of track URLs
const KNOWN_HOSTS: &[&str] = &["youtube.com", "www.youtube.com", "music.youtube.com", "youtu.be"];

/// Unique 11-character identifier for a source video/track
///
/// Construction always validates the `[A-Za-z0-9_-]{11}` shape, so holding a
/// `VideoId` means holding a well-formed identifier. The identifier is the
/// dedup key for the whole run.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Parse a bare identifier token. Returns `None` unless it is exactly
    /// 11 characters of the identifier alphabet.
    pub fn new(token: &str) -> Option<Self> {
        if VIDEO_ID_RE.is_match(token) {
            Some(Self(token.to_string()))
        } else {
            None
        }
    }

    /// Extract the identifier embedded in a track URL.
    ///
    /// Recognized URLs (`youtube.com`, `music.youtube.com`, `youtu.be`) are
    /// checked structurally first: the `v` query parameter, then the last
    /// path segment (short-link form). As a fallback for odd-but-valid URL
    /// shapes, the first 11-character identifier run anywhere in the string
    /// is used.
    pub fn from_url(url: &str) -> Option<Self> {
        if let Ok(parsed) = Url::parse(url) {
            let host = parsed.host_str().unwrap_or("").to_ascii_lowercase();
            if !KNOWN_HOSTS.contains(&host.as_str()) {
                return None;
            }
            if let Some((_, v)) = parsed.query_pairs().find(|(k, _)| k == "v") {
                if let Some(id) = Self::new(&v) {
                    return Some(id);
                }
            }
            if let Some(segment) = parsed.path_segments().and_then(|mut s| s.next_back()) {
                if let Some(id) = Self::new(segment) {
                    return Some(id);
                }
            }
            return EMBEDDED_ID_RE
                .find(url)
                .and_then(|m| Self::new(m.as_str()));
        }
        None
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch URL on the standard domain
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }

    /// Canonical watch URL on the music domain
    pub fn music_url(&self) -> String {
        format!("https://music.youtube.com/watch?v={}", self.0)
    }

    /// Canonical watch URL honoring the caller's domain preference
    pub fn canonical_url(&self, prefer_music: bool) -> String {
        if prefer_music {
            self.music_url()
        } else {
            self.watch_url()
        }
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a track record originated
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackSource {
    /// Native takeout playlist export
    Takeout,
    /// Converted from a CSV playlist export
    Csv,
    /// Produced by a library exporter
    Export,
    /// Any tag this version does not know
    #[serde(other)]
    Unknown,
}

/// One track entry as loaded from a playlist file
///
/// `url` and `video_id` are both optional in the input; a track is usable
/// only if at least one of them resolves (see [`Track::resolve`]).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Track {
    /// Track title as exported, if any
    #[serde(default)]
    pub title: Option<String>,
    /// Source URL as exported, if any
    #[serde(default)]
    pub url: Option<String>,
    /// Bare identifier as exported, if any
    #[serde(default, rename = "videoId")]
    pub video_id: Option<String>,
    /// Origin tag of the record
    #[serde(default)]
    pub source: Option<TrackSource>,
}

/// A track resolved to the `(url, identifier)` pair the executor needs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedTrack {
    /// URL to hand to the extraction tool
    pub url: String,
    /// Identifier used as the dedup key
    pub id: VideoId,
    /// Title carried along for replacement search
    pub title: Option<String>,
}

impl Track {
    /// Resolve this track to a `(url, identifier)` pair.
    ///
    /// The identifier comes from the explicit `videoId` field when valid,
    /// otherwise it is extracted from the URL; the URL is taken verbatim when
    /// present, otherwise constructed canonically from the identifier.
    /// Returns `None` when neither side can be established — such tracks are
    /// dropped by the scheduler.
    ///
    /// Resolution is idempotent: resolving a track built from the returned
    /// pair yields the same pair.
    pub fn resolve(&self) -> Option<ResolvedTrack> {
        let id = self
            .video_id
            .as_deref()
            .and_then(VideoId::new)
            .or_else(|| self.url.as_deref().and_then(VideoId::from_url))?;
        let url = match &self.url {
            Some(u) => u.clone(),
            None => id.watch_url(),
        };
        Some(ResolvedTrack {
            url,
            id,
            title: self.title.clone(),
        })
    }
}

/// One playlist: a name plus its ordered tracks
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Playlist {
    /// Playlist name (normalized, used for the reference artifact)
    pub name: String,
    /// Tracks in export order
    pub tracks: Vec<Track>,
}

/// Final result of one download task, after all escalation and fallback
///
/// Consumed by the scheduler in completion order to update the dedup index
/// and the run counters.
#[derive(Clone, Debug)]
pub struct DownloadOutcome {
    /// Whether the task ultimately materialized a file
    pub success: bool,
    /// The URL that produced the outcome — the original URL for failures,
    /// the replacement URL when fallback search succeeded
    pub url_used: String,
    /// Identifier to record in the dedup index (the replacement's identifier
    /// when fallback search succeeded)
    pub video_id: Option<VideoId>,
    /// Path of the materialized file on success
    pub final_path: Option<PathBuf>,
    /// Size of the materialized file, 0 when unknown (dry run)
    pub bytes: u64,
    /// Classified diagnostic text on failure
    pub error_message: Option<String>,
}

impl DownloadOutcome {
    /// Build a failure outcome attributed to `url`
    pub fn failure(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            url_used: url.into(),
            video_id: None,
            final_path: None,
            bytes: 0,
            error_message: Some(message.into()),
        }
    }
}

/// Per-playlist processing summary
#[derive(Clone, Debug, Default)]
pub struct PlaylistSummary {
    /// Playlist name
    pub name: String,
    /// Tracks newly downloaded in this run
    pub downloaded: usize,
    /// Tracks that failed after all escalation
    pub failed: usize,
    /// Tracks skipped because their identifier was already materialized
    pub skipped: usize,
    /// URLs of the failed tracks, for the failure report
    pub failed_urls: Vec<String>,
    /// All files belonging to this playlist (existing and new)
    pub files: Vec<PathBuf>,
}

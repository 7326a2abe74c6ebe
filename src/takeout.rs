//! Takeout playlist discovery and loading
//!
//! Playlist files are JSON records of the form
//! `{"type": "playlist", "name": ..., "tracks": [...]}`. A file that fails
//! to parse or has the wrong type is rejected as a whole — logged and
//! skipped, never partially salvaged — and the run continues with the rest.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use walkdir::WalkDir;

use crate::types::{Playlist, Track};

/// On-disk playlist record
#[derive(Debug, Deserialize)]
struct PlaylistFile {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: Option<String>,
    tracks: Vec<Track>,
}

/// Recursively find every `.json` file under `root`, sorted for a
/// deterministic processing order. Unreadable directory entries are skipped.
pub fn find_playlist_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        })
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// Load one playlist file, or `None` when it is not a valid playlist record.
pub fn load_playlist(path: &Path, strip_videos_suffix: bool) -> Option<Playlist> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read playlist file");
            return None;
        }
    };
    let parsed: PlaylistFile = match serde_json::from_str(&content) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "not a valid playlist file");
            return None;
        }
    };
    if parsed.kind != "playlist" {
        tracing::warn!(path = %path.display(), kind = %parsed.kind, "skipping non-playlist record");
        return None;
    }

    let fallback = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "playlist".to_string());
    let raw_name = parsed
        .name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(fallback);
    let name = normalize_name(&raw_name, strip_videos_suffix);

    Some(Playlist {
        name,
        tracks: parsed.tracks,
    })
}

/// Load every playlist under `root`, skipping invalid files and playlists
/// without tracks.
pub fn load_playlists(root: &Path, strip_videos_suffix: bool) -> Vec<Playlist> {
    let files = find_playlist_files(root);
    tracing::debug!(count = files.len(), root = %root.display(), "found playlist candidates");
    files
        .iter()
        .filter_map(|path| load_playlist(path, strip_videos_suffix))
        .filter(|playlist| {
            if playlist.tracks.is_empty() {
                tracing::info!(playlist = %playlist.name, "playlist has no tracks, skipping");
                false
            } else {
                true
            }
        })
        .collect()
}

/// Strip the exporter's "-videos" suffix from a playlist name when requested
fn normalize_name(name: &str, strip_videos_suffix: bool) -> String {
    const SUFFIX: &str = "-videos";
    if strip_videos_suffix
        && name.len() >= SUFFIX.len()
        && name.is_char_boundary(name.len() - SUFFIX.len())
        && name[name.len() - SUFFIX.len()..].eq_ignore_ascii_case(SUFFIX)
    {
        return name[..name.len() - SUFFIX.len()].trim().to_string();
    }
    name.to_string()
}

//! Library scanning and playlist-reference artifacts
//!
//! The output library encodes each file's source identifier in its filename
//! (`Title [VIDEOID].ext`). Scanning the library once at run start rebuilds
//! the dedup index from nothing — no state is persisted between runs.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use walkdir::WalkDir;

use crate::error::Result;
use crate::types::VideoId;

/// Subdirectory of the library root holding playlist-reference files
const PLAYLIST_DIR: &str = "_playlists";

/// Identifier inside a bracket pair immediately before the file extension
static FILE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([A-Za-z0-9_-]{11})\]\.[^.]+$")
        .unwrap_or_else(|e| panic!("invalid filename id regex: {e}"))
});

/// Extract the embedded identifier from a library filename
pub fn extract_file_video_id(file_name: &str) -> Option<VideoId> {
    FILE_ID_RE
        .captures(file_name)
        .and_then(|captures| captures.get(1))
        .and_then(|m| VideoId::new(m.as_str()))
}

/// Run-scoped mapping from identifier to its already-materialized file
///
/// Built once from a scan and then mutated only through [`record`](Self::record),
/// which keeps the first path per identifier — the index never holds two
/// different paths for one identifier within a run.
#[derive(Debug, Default)]
pub struct LibraryIndex {
    entries: HashMap<VideoId, PathBuf>,
}

impl LibraryIndex {
    /// Empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index by scanning `root` recursively.
    ///
    /// Unreadable entries are skipped; duplicate identifiers on disk are not
    /// an error, the first path seen wins.
    pub fn scan(root: &Path) -> Self {
        let mut index = Self::new();
        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(id) = extract_file_video_id(&entry.file_name().to_string_lossy()) else {
                continue;
            };
            index.entries.entry(id).or_insert_with(|| entry.into_path());
        }
        index
    }

    /// Path for an identifier, when already materialized
    pub fn get(&self, id: &VideoId) -> Option<&PathBuf> {
        self.entries.get(id)
    }

    /// Whether an identifier is already materialized
    pub fn contains(&self, id: &VideoId) -> bool {
        self.entries.contains_key(id)
    }

    /// Record a newly materialized file.
    ///
    /// Returns `false` without overwriting when the identifier is already
    /// present — the scheduler guarantees one task per identifier per run,
    /// so a collision here is a bug worth surfacing to the caller.
    pub fn record(&mut self, id: VideoId, path: PathBuf) -> bool {
        match self.entries.entry(id) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(path);
                true
            }
        }
    }

    /// Number of indexed identifiers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Replace filesystem-hostile characters in a playlist name
pub fn sanitize_playlist_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect()
}

/// Write the ordered playlist-reference file for one playlist.
///
/// Format: a fixed `#EXTM3U` marker line, then one library-root-relative
/// path per line, forward-slash separated, ordered by case-insensitive
/// filename. Returns the artifact path.
pub fn write_playlist_file(
    library_root: &Path,
    playlist_name: &str,
    files: &[PathBuf],
) -> Result<PathBuf> {
    let playlist_dir = library_root.join(PLAYLIST_DIR);
    std::fs::create_dir_all(&playlist_dir)?;

    let mut ordered: Vec<&PathBuf> = files.iter().collect();
    ordered.sort_by_key(|path| {
        path.file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    });

    let artifact = playlist_dir.join(format!("{}.m3u8", sanitize_playlist_name(playlist_name)));
    let mut out = std::fs::File::create(&artifact)?;
    writeln!(out, "#EXTM3U")?;
    for path in ordered {
        let relative = path.strip_prefix(library_root).unwrap_or(path);
        writeln!(out, "{}", relative.to_string_lossy().replace('\\', "/"))?;
    }
    Ok(artifact)
}

//! Replacement search for unavailable tracks
//!
//! Heuristic best-effort matcher: queries the tool's search mode with the
//! failed track's normalized title, filters out unusable candidates, and
//! ranks the survivors by token-set similarity. False positives (wrong song
//! with overlapping title and duration) are possible and accepted; a miss
//! simply leaves the track failed.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::VideoId;
use crate::ytdlp::{AudioFetcher, SearchHit};

/// Candidates shorter than this are never considered (jingles, shorts)
pub const MIN_CANDIDATE_DURATION_SECS: u64 = 40;

/// Accepted deviation from a known expected duration
pub const DURATION_TOLERANCE: f64 = 0.25;

/// Share of ASCII letters among alphabetic characters for a title to count
/// as Latin-script-dominant
const LATIN_DOMINANCE_THRESHOLD: f64 = 0.70;

/// Title tokens that carry no identity on their own
const FILLER_TOKENS: &[&str] = &[
    "official", "video", "audio", "lyric", "lyrics", "music", "mv", "hd", "hq", "full", "track",
    "title", "untitled", "unknown",
];

static BRACKETED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[[^\]]*\]|\([^)]*\)")
        .unwrap_or_else(|e| panic!("invalid bracket regex: {e}"))
});

/// What the caller knows about the track being replaced
#[derive(Clone, Debug)]
pub struct ReplacementQuery {
    /// Title of the failed track, when known
    pub original_title: Option<String>,
    /// Identifier of the failed track; never returned as a candidate
    pub failed_id: VideoId,
    /// Duration hint from the metadata probe, when available
    pub expected_duration_secs: Option<u64>,
    /// Domain preference for the returned candidate URL
    pub prefer_music_domain: bool,
}

/// Strip bracketed/parenthetical segments and collapse whitespace
pub fn normalize_title(title: &str) -> String {
    let stripped = BRACKETED_RE.replace_all(title, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase alphanumeric token set
fn tokenize(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Token-set (Jaccard) similarity of two titles
fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// Whether at least 70% of a title's alphabetic characters are basic Latin
fn latin_dominant(text: &str) -> bool {
    let mut alphabetic = 0usize;
    let mut ascii = 0usize;
    for c in text.chars() {
        if c.is_alphabetic() {
            alphabetic += 1;
            if c.is_ascii_alphabetic() {
                ascii += 1;
            }
        }
    }
    alphabetic > 0 && (ascii as f64 / alphabetic as f64) >= LATIN_DOMINANCE_THRESHOLD
}

/// Whether a candidate title reads as a generic placeholder
fn looks_placeholder(title: &str) -> bool {
    let tokens = tokenize(&normalize_title(title));
    tokens.is_empty() || tokens.iter().all(|t| FILLER_TOKENS.contains(&t.as_str()))
}

/// Build the search query: normalized title, or the failed identifier when
/// no title is known
pub fn build_query(original_title: Option<&str>, failed_id: &VideoId) -> String {
    match original_title.map(normalize_title) {
        Some(normalized) if !normalized.is_empty() => normalized,
        _ => failed_id.as_str().to_string(),
    }
}

/// Whether a candidate duration is within tolerance of the expected one
fn duration_acceptable(candidate_secs: u64, expected_secs: u64) -> bool {
    let expected = expected_secs as f64;
    let lo = expected * (1.0 - DURATION_TOLERANCE);
    let hi = expected * (1.0 + DURATION_TOLERANCE);
    let candidate = candidate_secs as f64;
    candidate >= lo && candidate <= hi
}

/// Filter and rank candidates, returning the best surviving hit.
///
/// Filters, in order: the failed identifier itself, malformed identifiers,
/// candidates without a usable audio stream, candidates under the duration
/// floor, candidates outside ±25% of a known expected duration, and — when
/// the original title is Latin-dominant — candidates whose title is not
/// similarly Latin-dominant or reads as a placeholder.
pub fn select_candidate(hits: Vec<SearchHit>, query: &ReplacementQuery) -> Option<SearchHit> {
    let original_normalized = query
        .original_title
        .as_deref()
        .map(normalize_title)
        .unwrap_or_default();
    let original_tokens = tokenize(&original_normalized);
    let require_latin = !original_normalized.is_empty() && latin_dominant(&original_normalized);

    let mut survivors: Vec<(f64, SearchHit)> = hits
        .into_iter()
        .filter(|hit| VideoId::new(&hit.id).is_some_and(|id| id != query.failed_id))
        .filter(|hit| hit.has_audio)
        .filter(|hit| {
            hit.duration_secs
                .is_some_and(|d| d >= MIN_CANDIDATE_DURATION_SECS)
        })
        .filter(|hit| match (query.expected_duration_secs, hit.duration_secs) {
            (Some(expected), Some(candidate)) => duration_acceptable(candidate, expected),
            _ => true,
        })
        .filter(|hit| {
            if !require_latin {
                return true;
            }
            latin_dominant(&hit.title) && !looks_placeholder(&hit.title)
        })
        .map(|hit| {
            let score = jaccard(&original_tokens, &tokenize(&normalize_title(&hit.title)));
            (score, hit)
        })
        .collect();

    survivors.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    survivors.into_iter().next().map(|(_, hit)| hit)
}

/// Search for a replacement and return its canonical URL, or `None` when
/// nothing usable is found. Search errors are swallowed: a failed search is
/// the same as an empty one.
pub async fn find_replacement(
    fetcher: &dyn AudioFetcher,
    query: ReplacementQuery,
    max_results: usize,
) -> Option<String> {
    let text = build_query(query.original_title.as_deref(), &query.failed_id);
    let hits = match fetcher.search(&text, max_results).await {
        Ok(hits) => hits,
        Err(e) => {
            tracing::debug!(query = %text, error = %e, "replacement search failed");
            return None;
        }
    };
    let prefer_music = query.prefer_music_domain;
    let chosen = select_candidate(hits, &query)?;
    let id = VideoId::new(&chosen.id)?;
    tracing::info!(
        replacement = %id,
        title = %chosen.title,
        "found replacement candidate"
    );
    Some(id.canonical_url(prefer_music))
}

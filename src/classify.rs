//! Failure classification for extraction-tool diagnostics
//!
//! Maps the tool's stderr text onto a closed set of failure categories and
//! derives geographic retry hints from region-restriction diagnostics. The
//! category is never persisted — it only selects the retry strategy for the
//! failed task.

/// Maximum number of geographic hints tried per region-blocked track
pub const MAX_REGION_HINTS: usize = 5;

/// Closed set of failure categories derived from diagnostic text
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// A sign-in / age gate blocks anonymous access
    AgeRestricted,
    /// Requires a paid subscription
    PremiumOnly,
    /// Not playable from the current region
    RegionBlocked,
    /// Removed, private, or otherwise gone
    Unavailable,
    /// Anything the rules above did not match
    Other,
}

impl FailureKind {
    /// Short label used in log lines and failure messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::AgeRestricted => "age-restricted",
            Self::PremiumOnly => "premium-only",
            Self::RegionBlocked => "region-blocked",
            Self::Unavailable => "unavailable",
            Self::Other => "other",
        }
    }
}

/// Classify diagnostic text into a [`FailureKind`].
///
/// Rules are checked in order with case-insensitive substring matches. The
/// region check runs before the generic unavailability check: region
/// diagnostics usually also contain "not available", so the order is what
/// keeps them out of the generic bucket.
pub fn classify(diagnostic: &str) -> FailureKind {
    let text = diagnostic.to_lowercase();
    if text.contains("sign in to confirm your age") || text.contains("age-restricted") {
        return FailureKind::AgeRestricted;
    }
    if text.contains("premium members") || text.contains("music premium") {
        return FailureKind::PremiumOnly;
    }
    if text.contains("has not made this video available") || text.contains("available in") {
        return FailureKind::RegionBlocked;
    }
    if text.contains("video unavailable")
        || text.contains("is not available")
        || text.contains("no longer available")
        || text.contains("has been removed")
    {
        return FailureKind::Unavailable;
    }
    FailureKind::Other
}

/// Extract the country names listed after the "available in" marker.
///
/// Handles both the parenthesized form
/// (`... available in your country (DE, FR)`) and the prose form
/// (`This video is available in Germany, France.`).
fn available_countries(diagnostic: &str) -> Vec<String> {
    const MARKER: &str = "available in";
    let lower = diagnostic.to_lowercase();
    let Some(pos) = lower.find(MARKER) else {
        return Vec::new();
    };
    // Lowercasing can shift byte offsets for non-ASCII text; fall back to the
    // lowercased copy when the found offset does not map back cleanly.
    let after = pos + MARKER.len();
    let tail = if lower.len() == diagnostic.len() && diagnostic.is_char_boundary(after) {
        &diagnostic[after..]
    } else {
        &lower[after..]
    };

    // Prefer a parenthesized list; otherwise read prose up to the sentence end.
    let list = if let Some(open) = tail.find('(') {
        let inner = &tail[open + 1..];
        match inner.find(')') {
            Some(close) => &inner[..close],
            None => inner,
        }
    } else {
        let end = tail.find(['.', '\n']).unwrap_or(tail.len());
        tail[..end].trim_start_matches(|c: char| c.is_whitespace())
    };

    list.split([',', ';'])
        .flat_map(|chunk| chunk.split(" and "))
        .map(|name| {
            name.trim()
                .trim_start_matches("your country")
                .trim_matches(|c: char| !c.is_alphanumeric() && !c.is_whitespace())
                .trim()
        })
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Derive a 2–3 letter geographic hint from one country name.
///
/// A single short token is uppercased as-is ("DE" → "DE"); a single longer
/// token contributes its first two letters ("Germany" → "GE"); a multi-word
/// name contributes the initials of its first two words ("United States" →
/// "US"). Names that do not reduce to 2–3 ASCII letters yield nothing.
pub fn country_hint(name: &str) -> Option<String> {
    let words: Vec<&str> = name.split_whitespace().collect();
    let hint = match words.as_slice() {
        [] => return None,
        [only] => {
            if only.chars().count() <= 3 {
                only.to_uppercase()
            } else {
                only.chars().take(2).collect::<String>().to_uppercase()
            }
        }
        [first, second, ..] => {
            let mut initials = String::new();
            initials.extend(first.chars().take(1));
            initials.extend(second.chars().take(1));
            initials.to_uppercase()
        }
    };
    let len = hint.chars().count();
    if (2..=3).contains(&len) && hint.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(hint)
    } else {
        None
    }
}

/// Derive the ordered, deduplicated hint ladder from a region diagnostic,
/// capped at [`MAX_REGION_HINTS`].
pub fn region_hints(diagnostic: &str) -> Vec<String> {
    let mut hints = Vec::new();
    for name in available_countries(diagnostic) {
        match country_hint(&name) {
            Some(hint) => {
                if !hints.contains(&hint) {
                    hints.push(hint);
                }
            }
            None => {
                tracing::debug!(country = %name, "skipping unusable region hint");
            }
        }
        if hints.len() >= MAX_REGION_HINTS {
            break;
        }
    }
    hints
}

//! Small helpers for timestamps, text, and hashing.

use chrono::Utc;
use sha2::{Digest, Sha256};

/// Returns the current UTC time as an ISO 8601 string.
///
/// Format: `YYYY-MM-DDTHH:MM:SS.ffffff+00:00`.
///
/// # Examples
///
/// ```
/// use teamflow::utils::iso_timestamp;
///
/// let ts = iso_timestamp();
/// assert!(ts.contains('T'));
/// assert!(ts.ends_with("+00:00"));
/// ```
#[must_use]
pub fn iso_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Compact timestamp suitable for directory names (`20250101_120000`).
#[must_use]
pub fn compact_timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Truncates `text` to at most `max_chars` characters, appending `...`
/// when anything was cut.
///
/// Counts characters, not bytes, so multi-byte text is never split.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Hex-encoded SHA-256 of the input.
#[must_use]
pub fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Number of whitespace-separated words.
#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

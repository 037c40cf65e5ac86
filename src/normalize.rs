//! Canonical word form used for comparison and persistence.
//!
//! Words are runs of Unicode word characters (alphanumerics, marks and
//! connector punctuation such as `_`). Everything else is a separator.

use once_cell::sync::Lazy;
use regex::Regex;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").expect("valid regex"));

/// Collapse text into single-space-separated words.
///
/// Leading and trailing whitespace is trimmed, every run of non-word
/// characters becomes one space, and separators at either end are dropped
/// so that the result is a fixed point: `normalize(normalize(t)) == normalize(t)`.
pub fn normalize(text: &str) -> String {
    NON_WORD
        .split(text.trim())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split normalized text into its words.
pub fn words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Number of whitespace-delimited words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

//! Pure text stages: sentence trimming, markup stripping, tokenization.
//!
//! All functions here are total. Malformed markup degrades into leftover text
//! rather than an error.

use once_cell::sync::Lazy;
use regex::Regex;

// A back-reference (`</\1>`) is not available in `regex`; one alternation per tag
// name yields the same leftmost match.
static SCRIPT_STYLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script.*?>.*?</script>|<style.*?>.*?</style>").expect("static regex")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<.*?>").expect("static regex"));
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));
static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[\w'-]+\b").expect("static regex"));

/// Trim a generated continuation to its last complete sentence.
///
/// Leading/trailing whitespace is removed first. If the text has a `.`, everything after
/// the last one is dropped (the trailing fragment may be cut mid-sentence). A text that
/// already ends with `.` comes back unchanged.
pub fn trim_to_last_sentence(text: &str) -> String {
    let t = text.trim();
    let segments: Vec<&str> = t.split('.').collect();
    if segments.len() > 1 {
        let mut out = segments[..segments.len() - 1].join(".");
        out.push('.');
        out
    } else {
        t.to_string()
    }
}

/// Strip `<script>`/`<style>` blocks and all remaining tags, then collapse whitespace.
pub fn cleanse(html: &str) -> String {
    let without_blocks = SCRIPT_STYLE_RE.replace_all(html, "");
    let without_tags = TAG_RE.replace_all(&without_blocks, "");
    WS_RE.replace_all(&without_tags, " ").trim().to_string()
}

/// Lowercase `text` and split it into word tokens, duplicates kept, in order.
///
/// A token is a maximal run of word characters, apostrophes, and hyphens that starts and
/// ends on a word boundary, so `"'quoted'"` yields `quoted` and `"don't"` stays whole.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    WORD_RE
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

//! Caption and hashtag text signals

use aho_corasick::{AhoCorasick, MatchKind};
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::warn;

/// Call-to-action phrases, matched case-insensitively anywhere in the caption
pub const CTA_PHRASES: &[&str] = &[
    "follow",
    "like",
    "comment",
    "share",
    "tag",
    "save",
    "link in bio",
    "click",
    "dm",
    "subscribe",
    "turn on notifications",
    "check out",
    "watch till end",
    "wait for it",
    "don't miss",
];

/// Hashtags that signal an attempt at algorithmic discovery
pub const DISCOVERY_TAGS: &[&str] = &[
    "fyp",
    "foryou",
    "foryoupage",
    "viral",
    "trending",
    "blowthisup",
    "xyzbca",
    "explore",
    "featured",
    "viralvideo",
];

const PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':', '\'', '"'];

fn cta_matcher() -> Option<&'static AhoCorasick> {
    static MATCHER: OnceLock<Option<AhoCorasick>> = OnceLock::new();
    MATCHER
        .get_or_init(|| {
            AhoCorasick::builder()
                .ascii_case_insensitive(true)
                .match_kind(MatchKind::Standard)
                .build(CTA_PHRASES)
                .map_err(|e| warn!("Failed to build call-to-action matcher: {}", e))
                .ok()
        })
        .as_ref()
}

/// Number of distinct call-to-action phrases contained in `text`.
///
/// Phrases match inside longer words, so "likes" counts as "like".
pub fn cta_strength(text: &str) -> usize {
    let Some(matcher) = cta_matcher() else {
        let lowered = text.to_lowercase();
        return CTA_PHRASES
            .iter()
            .filter(|phrase| lowered.contains(*phrase))
            .count();
    };

    let distinct: HashSet<usize> = matcher
        .find_overlapping_iter(text)
        .map(|m| m.pattern().as_usize())
        .collect();
    distinct.len()
}

/// Non-ASCII characters that are not letters
pub fn is_emoji(c: char) -> bool {
    (c as u32) > 127 && !c.is_alphabetic()
}

/// Count of emoji-like characters
pub fn emoji_count(text: &str) -> usize {
    text.chars().filter(|c| is_emoji(*c)).count()
}

/// Uppercase letters over all letters, 0.0 without letters
pub fn capitalization_ratio(text: &str) -> f64 {
    let (upper, letters) = text
        .chars()
        .filter(|c| c.is_alphabetic())
        .fold((0usize, 0usize), |(upper, letters), c| {
            (upper + usize::from(c.is_uppercase()), letters + 1)
        });

    if letters == 0 {
        0.0
    } else {
        upper as f64 / letters as f64
    }
}

/// Punctuation characters over all characters, 0.0 for empty text
pub fn punctuation_density(text: &str) -> f64 {
    let (punct, total) = text.chars().fold((0usize, 0usize), |(punct, total), c| {
        (punct + usize::from(PUNCTUATION.contains(&c)), total + 1)
    });

    if total == 0 {
        0.0
    } else {
        punct as f64 / total as f64
    }
}

/// Lowercased tag with a leading `#` removed
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().trim_start_matches('#').to_lowercase()
}

/// Whether a tag is one of the discovery tags
pub fn is_discovery_tag(tag: &str) -> bool {
    let normalized = normalize_tag(tag);
    DISCOVERY_TAGS.contains(&normalized.as_str())
}

/// Unique normalized tags over `count + 1`, 0.0 without tags
pub fn hashtag_diversity(tags: &[String]) -> f64 {
    if tags.is_empty() {
        return 0.0;
    }
    let unique: HashSet<String> = tags.iter().map(|t| normalize_tag(t)).collect();
    unique.len() as f64 / (tags.len() as f64 + 1.0)
}

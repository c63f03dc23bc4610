//! Content filtering for chat messages
//!
//! Strips HTML and masks configured bad words in place. Masking is
//! deterministic: every character of a matched word becomes `*`.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// Words masked when a room has the bad-word filter enabled
static DEFAULT_BAD_WORDS: Lazy<Vec<String>> = Lazy::new(|| {
    ["spam", "scam", "badword1", "badword2"]
        .into_iter()
        .map(String::from)
        .collect()
});

#[derive(Clone)]
pub struct ContentFilter {
    patterns: Vec<Regex>,
    strip_html: bool,
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_words(DEFAULT_BAD_WORDS.clone())
    }

    /// Build a filter over a custom word list. Invalid or empty words are
    /// skipped rather than failing construction.
    #[must_use]
    pub fn with_words(words: Vec<String>) -> Self {
        let patterns = words
            .iter()
            .filter(|w| !w.trim().is_empty())
            .filter_map(|w| {
                RegexBuilder::new(&format!(r"\b{}\b", regex::escape(w.trim())))
                    .case_insensitive(true)
                    .build()
                    .ok()
            })
            .collect();

        Self {
            patterns,
            strip_html: true,
        }
    }

    /// Sanitize a chat message: strip HTML, then mask bad words.
    #[must_use]
    pub fn mask(&self, content: &str) -> String {
        let mut out = if self.strip_html {
            strip_all_html(content)
        } else {
            content.to_string()
        };

        for pattern in &self.patterns {
            out = pattern
                .replace_all(&out, |caps: &regex::Captures<'_>| {
                    "*".repeat(caps[0].chars().count())
                })
                .into_owned();
        }

        out
    }
}

/// Remove every HTML tag, keeping the text content
fn strip_all_html(content: &str) -> String {
    ammonia::Builder::empty()
        .clean(content)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks_whole_words() {
        let filter = ContentFilter::new();
        assert_eq!(filter.mask("this is spam here"), "this is **** here");
        assert_eq!(filter.mask("SPAM!"), "****!");
    }

    #[test]
    fn test_does_not_mask_substrings() {
        let filter = ContentFilter::new();
        // "spammer" contains "spam" but is not the whole word
        assert_eq!(filter.mask("spammer"), "spammer");
    }

    #[test]
    fn test_strips_html() {
        let filter = ContentFilter::new();
        let out = filter.mask("<script>alert(1)</script>hello");
        assert!(!out.contains("<script>"));
        assert!(out.contains("hello"));
    }

    #[test]
    fn test_custom_word_list() {
        let filter = ContentFilter::with_words(vec!["ban".to_string()]);
        assert_eq!(filter.mask("ban this"), "*** this");
        assert_eq!(filter.mask("this is spam"), "this is spam");
    }

    #[test]
    fn test_clean_content_unchanged() {
        let filter = ContentFilter::new();
        assert_eq!(filter.mask("hello world"), "hello world");
    }
}

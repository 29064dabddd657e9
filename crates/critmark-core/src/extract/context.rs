//! Sentence-trimmed context windows around an anchor.

use crate::settings::ExtractSettings;
use crate::util::{head_chars, tail_chars, window_after, window_before};
use once_cell::sync::Lazy;
use regex::Regex;

/// Sentence punctuation, whitespace, then an uppercase letter.
static SENTENCE_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]\s+\p{Lu}").unwrap());

/// Text before `at`, starting at the sentence boundary nearest the anchor.
pub fn context_before(full_text: &str, at: usize, settings: &ExtractSettings) -> String {
    let window = window_before(full_text, at, settings.context_window);
    match SENTENCE_BOUNDARY.find_iter(window).last() {
        Some(m) => {
            let upper_len = window[..m.end()]
                .chars()
                .next_back()
                .map(char::len_utf8)
                .unwrap_or(0);
            window[m.end() - upper_len..].trim().to_string()
        }
        None => tail_chars(window, settings.context_fallback).trim().to_string(),
    }
}

/// Text after `at`, ending with the first sentence that closes inside the window.
pub fn context_after(full_text: &str, at: usize, settings: &ExtractSettings) -> String {
    let window = window_after(full_text, at, settings.context_window);
    match SENTENCE_BOUNDARY.find_iter(window).find(|m| m.start() > 0) {
        Some(m) => window[..m.start() + 1].trim().to_string(),
        None => head_chars(window, settings.context_fallback).trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn before_starts_at_last_sentence_boundary() {
        let text = "First sentence here. Second one runs on. Third starts the anchor";
        let at = text.find("anchor").unwrap();
        let before = context_before(text, at, &ExtractSettings::default());
        assert_eq!(before, "Third starts the");
    }

    #[test]
    fn after_ends_at_first_sentence_boundary() {
        let text = "anchor ends the clause. Another sentence follows.";
        let after = context_after(text, 6, &ExtractSettings::default());
        assert_eq!(after, "ends the clause.");
    }

    #[test]
    fn falls_back_to_fixed_width_without_boundary() {
        let text = "x".repeat(200);
        let settings = ExtractSettings::default();
        assert_eq!(context_before(&text, 200, &settings).len(), 80);
        assert_eq!(context_after(&text, 0, &settings).len(), 80);
    }

    #[test]
    fn lowercase_after_period_is_not_a_boundary() {
        let text = "see e.g. the appendix for the anchor";
        let at = text.find("anchor").unwrap();
        let before = context_before(text, at, &ExtractSettings::default());
        assert_eq!(before, "see e.g. the appendix for the");
    }
}

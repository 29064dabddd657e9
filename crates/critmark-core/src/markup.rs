//! The annotation grammar.
//!
//! Output text marks reviewer changes with five constructs:
//!
//! | construct    | form                 |
//! |--------------|----------------------|
//! | insertion    | `{++text++}`         |
//! | deletion     | `{--text--}`         |
//! | substitution | `{~~old~>new~~}`     |
//! | comment      | `{>>author: text<<}` |
//! | marked span  | `[span]{marked}`     |
//!
//! This module builds those constructs, strips them (optionally keeping an
//! origin map), translates the external converter's track-change spans into
//! them, and handles the source-side markdown prefixes the paragraph engine
//! must keep out of word diffs.

use crate::util::MappedText;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;

pub const INS_OPEN: &str = "{++";
pub const INS_CLOSE: &str = "++}";
pub const DEL_OPEN: &str = "{--";
pub const DEL_CLOSE: &str = "--}";
pub const SUB_OPEN: &str = "{~~";
pub const SUB_SEP: &str = "~>";
pub const SUB_CLOSE: &str = "~~}";
pub const COMMENT_OPEN: &str = "{>>";
pub const COMMENT_CLOSE: &str = "<<}";
pub const MARKED_SUFFIX: &str = "]{marked}";

static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{>>.*?<<\}").unwrap());
static DELIMITER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\+\+|\+\+\}|\{--|--\}|\{~~|~>|~~\}").unwrap());
static MARKED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\[\]]*)\]\{marked\}").unwrap());
static INSERTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{\+\+(.*?)\+\+\}").unwrap());
static DELETION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{--(.*?)--\}").unwrap());
static SUBSTITUTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{~~(.*?)~>(.*?)~~\}").unwrap());

static CONVERTER_SPAN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\[((?:[^\[\]]|\[[^\[\]]*\])*)\]\{\.(insertion|deletion|comment-start|comment-end|paragraph-insertion|paragraph-deletion)[^}]*\}",
    )
    .unwrap()
});

static PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:#{1,6}[ \t]+|(?:>[ \t]?)+|[ \t]*(?:[-*+]|\d+[.)])[ \t]+)").unwrap()
});
static HEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#{1,6}[ \t]+").unwrap());

static LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\[\]]*)\]\([^)]*\)").unwrap());
static SPAN_ATTR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\[\]]*)\]\{[^}]*\}").unwrap());
static STRONG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\*\*|__)([^\s*_](?:.*?[^\s*_])?)(\*\*|__)").unwrap());
static EMPHASIS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^\w*])[*_]([^\s*_](?:[^*_]*[^\s*_])?)[*_]").unwrap());
static CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]*)`").unwrap());

pub fn insertion(text: &str) -> String {
    format!("{INS_OPEN}{text}{INS_CLOSE}")
}

pub fn deletion(text: &str) -> String {
    format!("{DEL_OPEN}{text}{DEL_CLOSE}")
}

pub fn substitution(old: &str, new: &str) -> String {
    format!("{SUB_OPEN}{old}{SUB_SEP}{new}{SUB_CLOSE}")
}

/// Comment marker. Newlines are flattened and a literal closing delimiter
/// inside the text is broken up so the marker stays well formed.
pub fn comment(author: &str, text: &str) -> String {
    let body = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(COMMENT_CLOSE, "<< }");
    if author.trim().is_empty() {
        format!("{COMMENT_OPEN}{body}{COMMENT_CLOSE}")
    } else {
        format!("{COMMENT_OPEN}{}: {body}{COMMENT_CLOSE}", author.trim())
    }
}

pub fn marked(span: &str) -> String {
    format!("[{span}{MARKED_SUFFIX}")
}

/// Whether `s` contains any annotation delimiter.
pub fn contains_markup(s: &str) -> bool {
    DELIMITER_RE.is_match(s) || s.contains(COMMENT_OPEN) || s.contains(MARKED_SUFFIX)
}

/// Byte ranges of `text` that carry annotation syntax rather than content:
/// delimiters, whole comments, and the brackets of marked spans. Sorted and
/// non-overlapping.
pub fn annotation_ranges(text: &str) -> Vec<Range<usize>> {
    let mut ranges: Vec<Range<usize>> = COMMENT_RE.find_iter(text).map(|m| m.range()).collect();
    ranges.extend(DELIMITER_RE.find_iter(text).map(|m| m.range()));
    for caps in MARKED_RE.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        ranges.push(whole.start()..inner.start());
        ranges.push(inner.end()..whole.end());
    }
    ranges.sort_by_key(|r| (r.start, r.end));

    let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }
    merged
}

/// View of `text` without annotation syntax, mapped back to `text`.
pub fn strip_annotations_mapped(text: &str) -> MappedText {
    MappedText::new(text).without(&annotation_ranges(text))
}

/// `text` without annotation syntax. Deleted and inserted text both remain.
pub fn strip_annotations(text: &str) -> String {
    strip_annotations_mapped(text).as_str().to_string()
}

/// Text with every change accepted: insertions kept, deletions dropped,
/// substitutions resolved to the new side. Comments and span marks go.
pub fn accept_changes(text: &str) -> String {
    let text = COMMENT_RE.replace_all(text, "");
    let text = SUBSTITUTION_RE.replace_all(&text, "$2");
    let text = DELETION_RE.replace_all(&text, "");
    let text = INSERTION_RE.replace_all(&text, "$1");
    MARKED_RE.replace_all(&text, "$1").into_owned()
}

/// Text with every change rejected: the inverse of [`accept_changes`].
pub fn reject_changes(text: &str) -> String {
    let text = COMMENT_RE.replace_all(text, "");
    let text = SUBSTITUTION_RE.replace_all(&text, "$1");
    let text = INSERTION_RE.replace_all(&text, "");
    let text = DELETION_RE.replace_all(&text, "$1");
    MARKED_RE.replace_all(&text, "$1").into_owned()
}

/// Translate the converter's track-change spans into the annotation grammar.
/// Comment range spans are dropped; comments come from the extractor.
pub fn translate_converter_markup(text: &str) -> String {
    let mut current = text.to_string();
    // Nested spans resolve innermost first; bounded by the nesting depth.
    for _ in 0..8 {
        let next = CONVERTER_SPAN_RE
            .replace_all(&current, |caps: &regex::Captures| {
                let inner = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                match caps.get(2).map(|m| m.as_str()) {
                    Some("insertion") if !inner.is_empty() => insertion(inner),
                    Some("deletion") if !inner.is_empty() => deletion(inner),
                    _ => String::new(),
                }
            })
            .into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Split a paragraph into its structural prefix (heading, blockquote or list
/// marker) and body.
pub fn split_structural_prefix(paragraph: &str) -> (&str, &str) {
    match PREFIX_RE.find(paragraph) {
        Some(m) => paragraph.split_at(m.end()),
        None => ("", paragraph),
    }
}

pub fn is_heading(paragraph: &str) -> bool {
    HEADING_RE.is_match(paragraph.trim_start_matches('\n'))
}

/// Heading text without its `#` marker, or `None` for non-headings.
pub fn heading_text(paragraph: &str) -> Option<&str> {
    HEADING_RE
        .find(paragraph)
        .map(|m| paragraph[m.end()..].trim())
}

/// Inline source markup removed: links and attributed spans keep their text,
/// emphasis and code markers go. Protected placeholders are untouched.
pub fn strip_source_markup(body: &str) -> String {
    let text = LINK_RE.replace_all(body, "$1");
    let text = SPAN_ATTR_RE.replace_all(&text, "$1");
    let text = STRONG_RE.replace_all(&text, "$2");
    let text = EMPHASIS_RE.replace_all(&text, "$1$2");
    let text = CODE_RE.replace_all(&text, "$1");
    text.into_owned()
}

/// Number of each annotation construct in a text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationCounts {
    pub insertions: usize,
    pub deletions: usize,
    pub substitutions: usize,
    pub comments: usize,
    pub marked: usize,
}

impl AnnotationCounts {
    pub fn of(text: &str) -> Self {
        Self {
            insertions: text.matches(INS_OPEN).count(),
            deletions: text.matches(DEL_OPEN).count(),
            substitutions: text.matches(SUB_OPEN).count(),
            comments: text.matches(COMMENT_OPEN).count(),
            marked: text.matches(MARKED_SUFFIX).count(),
        }
    }

    pub fn total_changes(&self) -> usize {
        self.insertions + self.deletions + self.substitutions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builders_produce_grammar() {
        assert_eq!(insertion("new"), "{++new++}");
        assert_eq!(deletion("old"), "{--old--}");
        assert_eq!(substitution("a", "b"), "{~~a~>b~~}");
        assert_eq!(comment("Ana", "Check\nthis"), "{>>Ana: Check this<<}");
        assert_eq!(comment("", "note"), "{>>note<<}");
        assert_eq!(marked("span"), "[span]{marked}");
    }

    #[test]
    fn comment_text_cannot_close_early() {
        let c = comment("A", "x <<} y");
        assert_eq!(c.matches(COMMENT_CLOSE).count(), 1);
    }

    #[test]
    fn strip_keeps_both_sides_of_changes() {
        let text = "The {--quick--}{++slow++} fox {~~ran~>walked~~} by{>>Ana: hm<<} [the]{marked} river.";
        assert_eq!(
            strip_annotations(text),
            "The quickslow fox ranwalked by the river."
        );
    }

    #[test]
    fn stripped_view_maps_back() {
        let text = "a {++big++} dog";
        let view = strip_annotations_mapped(text);
        let hit = view.find_all("a big dog").remove(0);
        assert_eq!(&text[hit], text);
    }

    #[test]
    fn contains_markup_detects_each_construct() {
        assert!(contains_markup("x {++y++}"));
        assert!(contains_markup("x {>>c<<}"));
        assert!(contains_markup("[y]{marked}"));
        assert!(!contains_markup("plain - text ~ here"));
    }

    #[test]
    fn accept_and_reject_views() {
        let text = "The {--quick--}{++slow++} fox {~~ran~>walked~~} home{>>Ana: hm<<}.";
        assert_eq!(accept_changes(text), "The slow fox walked home.");
        assert_eq!(reject_changes(text), "The quick fox ran home.");
    }

    #[test]
    fn converter_spans_translate() {
        let text = r#"Keep [new words]{.insertion author="Ana" date="2024-01-01"} and [old]{.deletion author="Ana"} here."#;
        assert_eq!(
            translate_converter_markup(text),
            "Keep {++new words++} and {--old--} here."
        );
    }

    #[test]
    fn converter_comment_spans_are_dropped() {
        let text = r#"A [Looks odd]{.comment-start id="0" author="Ana"}claim[]{.comment-end id="0"} here."#;
        assert_eq!(translate_converter_markup(text), "A claim here.");
    }

    #[test]
    fn converter_span_with_nested_link() {
        let text = r#"[see [docs](http://x)]{.insertion author="A"}"#;
        assert_eq!(translate_converter_markup(text), "{++see [docs](http://x)++}");
    }

    #[test]
    fn structural_prefixes_split() {
        assert_eq!(split_structural_prefix("## Methods"), ("## ", "Methods"));
        assert_eq!(split_structural_prefix("- item one"), ("- ", "item one"));
        assert_eq!(split_structural_prefix("12. step"), ("12. ", "step"));
        assert_eq!(split_structural_prefix("> quoted"), ("> ", "quoted"));
        assert_eq!(split_structural_prefix("Plain text"), ("", "Plain text"));
        assert_eq!(split_structural_prefix("#hashtag"), ("", "#hashtag"));
    }

    #[test]
    fn headings_are_detected() {
        assert!(is_heading("# Results"));
        assert_eq!(heading_text("### Deep dive "), Some("Deep dive"));
        assert!(!is_heading("Results #1"));
    }

    #[test]
    fn source_markup_is_stripped() {
        assert_eq!(
            strip_source_markup("A **bold** and *soft* [link](http://x) with `code` and [span]{.smallcaps}."),
            "A bold and soft link with code and span."
        );
        assert_eq!(strip_source_markup("snake_case_name stays"), "snake_case_name stays");
    }

    #[test]
    fn counts_each_construct() {
        let counts = AnnotationCounts::of("{++a++} {--b--} {~~c~>d~~} {>>e<<} [f]{marked}");
        assert_eq!(
            counts,
            AnnotationCounts { insertions: 1, deletions: 1, substitutions: 1, comments: 1, marked: 1 }
        );
        assert_eq!(counts.total_changes(), 3);
    }
}

//! Fuzzy anchor location.
//!
//! Rendered anchors rarely appear verbatim in the buffer they are placed
//! into: case, line wrapping and interleaved change markup all differ. The
//! locator tries an ordered cascade of strategies, each a pure function over
//! a prepared [`Haystack`], and stops at the first one that finds anything.
//! Every hit is reported as a byte range of the original buffer.

use crate::markup::{strip_annotations, strip_annotations_mapped};
use crate::settings::LocateSettings;
use crate::types::PlacementStrategy;
use crate::util::{fold_case, head_chars, normalize_whitespace, tail_chars, MappedText};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;

static TOKEN_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s,.\-–—]+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    Direct,
    Whitespace,
    Stripped,
    Truncated,
    Context,
    Token,
}

impl From<MatchStrategy> for PlacementStrategy {
    fn from(strategy: MatchStrategy) -> Self {
        match strategy {
            MatchStrategy::Direct => PlacementStrategy::Direct,
            MatchStrategy::Whitespace => PlacementStrategy::Whitespace,
            MatchStrategy::Stripped => PlacementStrategy::Stripped,
            MatchStrategy::Truncated => PlacementStrategy::Truncated,
            MatchStrategy::Context => PlacementStrategy::Context,
            MatchStrategy::Token => PlacementStrategy::Token,
        }
    }
}

/// What the cascade found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    /// Byte ranges of the buffer. Context hits are empty ranges.
    pub matches: Vec<Range<usize>>,
    /// The anchor variant that matched.
    pub resolved_anchor: String,
    pub strategy: MatchStrategy,
}

/// Anchor plus the context recorded around it.
#[derive(Debug, Clone, Copy)]
pub struct Query<'q> {
    pub anchor: &'q str,
    pub before: &'q str,
    pub after: &'q str,
}

type Strategy = fn(&Haystack<'_>, &Query<'_>, &LocateSettings) -> Option<(Vec<Range<usize>>, String)>;

static CASCADE: [(MatchStrategy, Strategy); 6] = [
    (MatchStrategy::Direct, direct),
    (MatchStrategy::Whitespace, whitespace),
    (MatchStrategy::Stripped, stripped),
    (MatchStrategy::Truncated, truncated),
    (MatchStrategy::Context, context),
    (MatchStrategy::Token, token),
];

/// A buffer with the derived views the strategies search.
pub struct Haystack<'a> {
    text: &'a str,
    folded: MappedText,
    collapsed: MappedText,
    stripped: MappedText,
}

impl<'a> Haystack<'a> {
    pub fn new(text: &'a str) -> Self {
        let folded = MappedText::new(text).fold();
        let collapsed = folded.collapse_whitespace();
        let stripped = strip_annotations_mapped(text).fold().collapse_whitespace();
        Self {
            text,
            folded,
            collapsed,
            stripped,
        }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Run the cascade. An empty anchor goes straight to context.
    pub fn locate(&self, query: &Query<'_>, settings: &LocateSettings) -> Option<Located> {
        if query.anchor.trim().is_empty() {
            self.run(&CASCADE[4..5], query, settings)
        } else {
            self.run(&CASCADE, query, settings)
        }
    }

    /// Only the strategies that match the anchor text itself: direct,
    /// whitespace-normalized and markup-stripped.
    pub fn find_literal(&self, anchor: &str, settings: &LocateSettings) -> Option<Located> {
        if anchor.trim().is_empty() {
            return None;
        }
        let query = Query {
            anchor,
            before: "",
            after: "",
        };
        self.run(&CASCADE[..3], &query, settings)
    }

    fn run(
        &self,
        cascade: &[(MatchStrategy, Strategy)],
        query: &Query<'_>,
        settings: &LocateSettings,
    ) -> Option<Located> {
        cascade.iter().find_map(|&(strategy, run)| {
            run(self, query, settings)
                .filter(|(matches, _)| !matches.is_empty())
                .map(|(matches, resolved_anchor)| {
                    log::trace!("{:?} matched {} time(s)", strategy, matches.len());
                    Located {
                        matches,
                        resolved_anchor,
                        strategy,
                    }
                })
        })
    }
}

/// Convenience wrapper for a single lookup.
pub fn locate(text: &str, query: &Query<'_>, settings: &LocateSettings) -> Option<Located> {
    Haystack::new(text).locate(query, settings)
}

fn hits(view: &MappedText, needle: &str, resolved: &str) -> Option<(Vec<Range<usize>>, String)> {
    let matches = view.find_all(needle);
    (!matches.is_empty()).then(|| (matches, resolved.to_string()))
}

fn direct(h: &Haystack<'_>, q: &Query<'_>, _: &LocateSettings) -> Option<(Vec<Range<usize>>, String)> {
    hits(&h.folded, &fold_case(q.anchor), q.anchor)
}

fn whitespace(h: &Haystack<'_>, q: &Query<'_>, _: &LocateSettings) -> Option<(Vec<Range<usize>>, String)> {
    let anchor = normalize_whitespace(q.anchor);
    hits(&h.collapsed, &fold_case(&anchor), &anchor)
}

fn stripped(h: &Haystack<'_>, q: &Query<'_>, _: &LocateSettings) -> Option<(Vec<Range<usize>>, String)> {
    let anchor = normalize_whitespace(&strip_annotations(q.anchor));
    hits(&h.stripped, &fold_case(&anchor), &anchor)
}

/// Leading word prefixes of decreasing length, skipping those too short to
/// be distinctive. Each prefix is tried against the raw buffer, then the
/// stripped one.
fn truncated(h: &Haystack<'_>, q: &Query<'_>, s: &LocateSettings) -> Option<(Vec<Range<usize>>, String)> {
    let anchor = strip_annotations(q.anchor);
    let words: Vec<&str> = anchor.split_whitespace().collect();
    s.truncation_word_counts
        .iter()
        .filter(|&&n| words.len() > n)
        .map(|&n| words[..n].join(" "))
        .filter(|prefix| prefix.chars().count() >= s.truncation_min_chars)
        .find_map(|prefix| {
            let needle = fold_case(&prefix);
            hits(&h.collapsed, &needle, &prefix).or_else(|| hits(&h.stripped, &needle, &prefix))
        })
}

fn probe(context: &str) -> String {
    fold_case(&normalize_whitespace(&strip_annotations(context)))
}

/// Triangulate a point between the recorded `before` and `after` context.
fn context(h: &Haystack<'_>, q: &Query<'_>, s: &LocateSettings) -> Option<(Vec<Range<usize>>, String)> {
    let before = probe(q.before);
    let after = probe(q.after);
    let resolved = q.anchor.trim().to_string();

    if !before.is_empty() && !after.is_empty() {
        let before_probe = tail_chars(&before, s.context_probe_chars);
        let after_probe = head_chars(&after, s.context_probe_chars);
        let after_hits = h.stripped.find_all(after_probe);
        let mut points: Vec<Range<usize>> = Vec::new();
        for b in h.stripped.find_all(before_probe) {
            let paired = after_hits
                .iter()
                .any(|a| a.start >= b.end && a.start - b.end < s.context_max_gap);
            if paired && !points.iter().any(|p| p.start == b.end) {
                points.push(b.end..b.end);
            }
        }
        if !points.is_empty() {
            return Some((points, resolved));
        }
    }

    if !before.is_empty() {
        let points: Vec<Range<usize>> = h
            .stripped
            .find_all(tail_chars(&before, s.single_context_probe_chars))
            .into_iter()
            .map(|b| b.end..b.end)
            .collect();
        if !points.is_empty() {
            return Some((points, resolved));
        }
    }

    if !after.is_empty() {
        let points: Vec<Range<usize>> = h
            .stripped
            .find_all(head_chars(&after, s.single_context_probe_chars))
            .into_iter()
            .map(|a| a.start..a.start)
            .collect();
        if !points.is_empty() {
            return Some((points, resolved));
        }
    }
    None
}

/// First sufficiently long token that is rare but present.
fn token(h: &Haystack<'_>, q: &Query<'_>, s: &LocateSettings) -> Option<(Vec<Range<usize>>, String)> {
    let anchor = strip_annotations(q.anchor);
    TOKEN_SPLIT
        .split(&anchor)
        .filter(|t| t.chars().count() >= s.token_min_chars)
        .find_map(|t| {
            let matches = h.folded.find_all(&fold_case(t));
            (!matches.is_empty() && matches.len() < s.token_max_occurrences)
                .then(|| (matches, t.to_string()))
        })
}

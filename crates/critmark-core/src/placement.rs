//! Comment placement.
//!
//! Positions are chosen for every comment first, against the unmodified
//! buffer, and the markers are then inserted in descending offset order so
//! no insertion shifts an offset that is still pending.

use crate::locate::{Haystack, Located, MatchStrategy, Query};
use crate::markup;
use crate::settings::{PlacementSettings, ReconcileSettings};
use crate::types::{AnchorRecord, CommentRecord, PlacedComment, PlacementStrategy};
use crate::util::{ceil_char_boundary, floor_char_boundary, fold_case, head_chars, normalize_whitespace, tail_chars, words};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::ops::Range;

/// Plain-text span of one section within the rendered document, in the same
/// coordinates as [`AnchorRecord::document_position`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionBounds {
    pub start: usize,
    pub length: usize,
}

impl SectionBounds {
    pub fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }

    pub fn contains(&self, position: usize) -> bool {
        position >= self.start && position < self.start + self.length
    }

    /// Relative position of a document offset within the section, in [0, 1].
    pub fn proportion(&self, position: usize) -> f64 {
        if self.length == 0 {
            return 0.0;
        }
        let relative = position.saturating_sub(self.start) as f64;
        (relative / self.length as f64).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlacementOutcome {
    pub text: String,
    pub placed: Vec<PlacedComment>,
    /// Ids of comments that could not be positioned.
    pub unmatched: Vec<String>,
    /// Comments resolved between equally good or already used candidates.
    pub ambiguous: usize,
}

/// A marker to insert at `position`, optionally wrapping `position..span_end`
/// as a marked span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    pub position: usize,
    pub span_end: Option<usize>,
    pub marker: String,
}

/// Apply insertions from the highest offset down. Ties are applied in reverse
/// input order so markers at one offset keep their input order. A span that
/// reaches an already-applied insertion, or that holds markup, becomes a
/// point insertion. Returns the text and whether each span was kept.
pub fn apply_insertions(buffer: &str, insertions: &[Insertion]) -> (String, Vec<bool>) {
    let mut order: Vec<usize> = (0..insertions.len()).collect();
    order.sort_by(|&a, &b| {
        insertions[b]
            .position
            .cmp(&insertions[a].position)
            .then(b.cmp(&a))
    });

    let mut text = buffer.to_string();
    let mut marked = vec![false; insertions.len()];
    let mut lowest_applied = usize::MAX;

    for index in order {
        let insertion = &insertions[index];
        let position = floor_char_boundary(&text, insertion.position.min(buffer.len()));
        let span = insertion
            .span_end
            .map(|end| ceil_char_boundary(buffer, end.min(buffer.len())))
            .filter(|&end| end > position && end <= lowest_applied)
            .map(|end| &buffer[position..end])
            .filter(|span| markable(span));

        match span {
            Some(span) => {
                let end = position + span.len();
                let replacement = format!("{}{}", insertion.marker, markup::marked(span));
                text.replace_range(position..end, &replacement);
                marked[index] = true;
            }
            None => text.insert_str(position, &insertion.marker),
        }
        lowest_applied = lowest_applied.min(position);
    }
    (text, marked)
}

fn markable(span: &str) -> bool {
    !span.trim().is_empty()
        && !markup::contains_markup(span)
        && !span.contains(['[', ']'])
        && !span.contains("\n\n")
}

struct Choice {
    range: Range<usize>,
    strategy: PlacementStrategy,
    mark: bool,
}

/// Offset of the closest word start within `window` characters of `target`.
fn snap_to_word_boundary(buffer: &str, target: usize, window: usize) -> usize {
    let target = floor_char_boundary(buffer, target);
    let lo = floor_char_boundary(buffer, target.saturating_sub(window));
    let hi = ceil_char_boundary(buffer, target + window);
    let is_word_start = |i: usize| {
        i == 0
            || i == buffer.len()
            || buffer[..i]
                .chars()
                .next_back()
                .is_some_and(char::is_whitespace)
    };
    buffer[lo..hi]
        .char_indices()
        .map(|(i, _)| lo + i)
        .chain(std::iter::once(hi))
        .filter(|&i| is_word_start(i))
        .min_by_key(|&i| i.abs_diff(target))
        .unwrap_or(target)
}

struct Placer<'a> {
    buffer: &'a str,
    haystack: Haystack<'a>,
    settings: &'a ReconcileSettings,
    used: HashSet<usize>,
    ambiguous: usize,
}

impl<'a> Placer<'a> {
    fn placement(&self) -> &PlacementSettings {
        &self.settings.placement
    }

    /// Section interpolation, preferring the literal anchor when it lies near
    /// the interpolated offset.
    fn interpolate(&self, anchor: &AnchorRecord, bounds: &SectionBounds) -> Choice {
        let len = self.buffer.len();
        let raw_target = (bounds.proportion(anchor.document_position) * len as f64).floor() as usize;
        let target = snap_to_word_boundary(self.buffer, raw_target.min(len), self.placement().snap_window);

        let window = self.placement().anchor_search_window;
        let lo = floor_char_boundary(self.buffer, target.saturating_sub(window));
        let hi = ceil_char_boundary(self.buffer, target + window);
        let nearby = Haystack::new(&self.buffer[lo..hi]);
        let closest = nearby
            .find_literal(&anchor.anchor_text, &self.settings.locate)
            .and_then(|found| {
                found
                    .matches
                    .into_iter()
                    .min_by_key(|m| (lo + m.start).abs_diff(target))
            });

        match closest {
            Some(m) => Choice {
                range: lo + m.start..lo + m.end,
                strategy: PlacementStrategy::InterpolatedAnchor,
                mark: true,
            },
            None => Choice {
                range: target..target,
                strategy: PlacementStrategy::Interpolated,
                mark: false,
            },
        }
    }

    fn score(&self, candidate: &Range<usize>, anchor: &AnchorRecord) -> i32 {
        let s = self.placement();
        let before_window = fold_case(&normalize_whitespace(crate::util::window_before(
            self.buffer,
            candidate.start,
            s.scoring_window,
        )));
        let after_window = fold_case(&normalize_whitespace(crate::util::window_after(
            self.buffer,
            candidate.end,
            s.scoring_window,
        )));

        let mut score = 0;
        for (context, window, from_end) in [
            (&anchor.before, &before_window, true),
            (&anchor.after, &after_window, false),
        ] {
            let keywords: HashSet<String> = words(context)
                .filter(|w| w.chars().count() > s.keyword_min_chars)
                .map(|w| fold_case(&w))
                .collect();
            score += s.keyword_weight
                * keywords.iter().filter(|k| window.contains(k.as_str())).count() as i32;

            let context = fold_case(&normalize_whitespace(context));
            let verbatim = if from_end {
                tail_chars(&context, s.verbatim_context_chars)
            } else {
                head_chars(&context, s.verbatim_context_chars)
            };
            if !verbatim.is_empty() && window.contains(verbatim) {
                score += s.verbatim_context_bonus;
            }
        }
        score
    }

    /// Pick among several hits: best score over unused offsets, earliest on
    /// ties; when all are used, the best of them again.
    fn disambiguate(&mut self, matches: &[Range<usize>], anchor: &AnchorRecord) -> Range<usize> {
        let scored: Vec<(i32, &Range<usize>)> =
            matches.iter().map(|m| (self.score(m, anchor), m)).collect();
        let unused: Vec<&(i32, &Range<usize>)> = scored
            .iter()
            .filter(|(_, m)| !self.used.contains(&m.start))
            .collect();

        let reused = unused.is_empty();
        let pool: Vec<&(i32, &Range<usize>)> = if reused {
            scored.iter().collect()
        } else {
            unused
        };
        let best = pool.iter().map(|(score, _)| *score).max().unwrap_or(0);
        let winners: Vec<&Range<usize>> = pool
            .iter()
            .filter(|(score, _)| *score == best)
            .map(|(_, m)| *m)
            .collect();
        if reused || winners.len() > 1 {
            self.ambiguous += 1;
        }
        let chosen = winners
            .into_iter()
            .min_by_key(|m| m.start)
            .cloned()
            .unwrap_or_else(|| matches[0].clone());
        log::debug!(
            "{} candidates, chose offset {} (score {})",
            matches.len(),
            chosen.start,
            best
        );
        chosen
    }

    fn by_locator(&mut self, anchor: &AnchorRecord) -> Option<Choice> {
        let query = Query {
            anchor: &anchor.anchor_text,
            before: &anchor.before,
            after: &anchor.after,
        };
        let Located {
            matches, strategy, ..
        } = self.haystack.locate(&query, &self.settings.locate)?;

        let range = if matches.len() == 1 {
            matches[0].clone()
        } else {
            self.disambiguate(&matches, anchor)
        };
        self.used.insert(range.start);

        let mark = matches!(
            strategy,
            MatchStrategy::Direct
                | MatchStrategy::Whitespace
                | MatchStrategy::Stripped
                | MatchStrategy::Truncated
        );
        Some(Choice {
            range,
            strategy: strategy.into(),
            mark,
        })
    }
}

fn author_for<'c>(comment: &'c CommentRecord, settings: &'c ReconcileSettings) -> &'c str {
    if comment.author.trim().is_empty() {
        settings.fallback_author.as_deref().unwrap_or("")
    } else {
        &comment.author
    }
}

/// Position every comment in `buffer` and insert its marker. Comments without
/// an anchor record, or whose anchor cannot be found, are reported in
/// `unmatched`.
pub fn place_comments(
    buffer: &str,
    comments: &[CommentRecord],
    anchors: &HashMap<String, AnchorRecord>,
    section: Option<&SectionBounds>,
    settings: &ReconcileSettings,
) -> PlacementOutcome {
    let mut placer = Placer {
        buffer,
        haystack: Haystack::new(buffer),
        settings,
        used: HashSet::new(),
        ambiguous: 0,
    };
    let mut outcome = PlacementOutcome::default();
    let mut insertions = Vec::new();

    for comment in comments {
        let Some(anchor) = anchors.get(&comment.id) else {
            log::warn!("comment {} has no anchor; dropping it", comment.id);
            outcome.unmatched.push(comment.id.clone());
            continue;
        };
        let choice = match section {
            Some(bounds) => Some(placer.interpolate(anchor, bounds)),
            None => placer.by_locator(anchor),
        };
        let Some(choice) = choice else {
            log::debug!("comment {}: anchor {:?} not found", comment.id, anchor.anchor_text);
            outcome.unmatched.push(comment.id.clone());
            continue;
        };

        let span_end = (choice.mark && !choice.range.is_empty()).then_some(choice.range.end);
        insertions.push(Insertion {
            position: choice.range.start,
            span_end,
            marker: markup::comment(author_for(comment, settings), &comment.text),
        });
        outcome.placed.push(PlacedComment {
            comment_id: comment.id.clone(),
            position: choice.range.start,
            anchor_text: None,
            anchor_end: span_end,
            strategy: choice.strategy,
        });
    }

    let (text, marked) = apply_insertions(buffer, &insertions);
    for (placed, kept) in outcome.placed.iter_mut().zip(marked) {
        match (kept, placed.anchor_end) {
            (true, Some(end)) => placed.anchor_text = Some(buffer[placed.position..end].to_string()),
            _ => placed.anchor_end = None,
        }
    }
    outcome.text = text;
    outcome.ambiguous = placer.ambiguous;

    if !outcome.unmatched.is_empty() {
        log::warn!("{} comment(s) could not be placed", outcome.unmatched.len());
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn comment(id: &str, text: &str) -> CommentRecord {
        CommentRecord {
            id: id.into(),
            author: "Ana".into(),
            date: String::new(),
            text: text.into(),
        }
    }

    fn anchor(text: &str, before: &str, after: &str, position: usize) -> AnchorRecord {
        AnchorRecord {
            anchor_text: text.into(),
            before: before.into(),
            after: after.into(),
            document_position: position,
            document_length: text.len(),
            is_empty: text.is_empty(),
        }
    }

    #[test]
    fn unique_anchor_is_marked() {
        let buffer = "The pump failed twice.";
        let anchors = HashMap::from([("1".to_string(), anchor("failed twice", "The pump", ".", 0))]);
        let outcome = place_comments(
            buffer,
            &[comment("1", "Why?")],
            &anchors,
            None,
            &ReconcileSettings::default(),
        );
        assert_eq!(outcome.text, "The pump {>>Ana: Why?<<}[failed twice]{marked}.");
        assert_eq!(outcome.placed[0].strategy, PlacementStrategy::Direct);
        assert_eq!(outcome.placed[0].anchor_text.as_deref(), Some("failed twice"));
    }

    /// Calibration point: keyword weight 2, verbatim bonus 5.
    #[test]
    fn duplicate_anchor_uses_context_then_first_come() {
        let buffer = "aaaa bbbb target one two three four five six seven target zebra crossing. \
                      More filler words here target end.";
        let starts: Vec<usize> = buffer.match_indices("target").map(|(i, _)| i).collect();
        assert_eq!(starts.len(), 3);

        let record = anchor("target", "one two three four five six seven", "zebra crossing.", 0);
        let anchors = HashMap::from([
            ("1".to_string(), record.clone()),
            ("2".to_string(), record),
        ]);
        let outcome = place_comments(
            buffer,
            &[comment("1", "first"), comment("2", "second")],
            &anchors,
            None,
            &ReconcileSettings::default(),
        );
        assert_eq!(outcome.placed[0].position, starts[1]);
        assert_ne!(outcome.placed[1].position, starts[1]);
        assert_eq!(outcome.placed[1].position, starts[2]);
    }

    #[test]
    fn reuses_best_candidate_when_all_are_used() {
        let buffer = "x target y target z";
        let record = anchor("target", "", "", 0);
        let anchors = HashMap::from([
            ("1".to_string(), record.clone()),
            ("2".to_string(), record.clone()),
            ("3".to_string(), record),
        ]);
        let outcome = place_comments(
            buffer,
            &[comment("1", "a"), comment("2", "b"), comment("3", "c")],
            &anchors,
            None,
            &ReconcileSettings::default(),
        );
        let positions: Vec<usize> = outcome.placed.iter().map(|p| p.position).collect();
        assert_eq!(positions, vec![2, 11, 2]);
        assert_eq!(outcome.ambiguous, 2);
        assert_eq!(
            outcome.text,
            "x {>>Ana: a<<}{>>Ana: c<<}[target]{marked} y {>>Ana: b<<}[target]{marked} z"
        );
    }

    #[test]
    fn descending_application_preserves_prefix() {
        let buffer = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMN";
        assert_eq!(buffer.len(), 50);
        let insertions: Vec<Insertion> = [5, 20, 40]
            .iter()
            .map(|&p| Insertion {
                position: p,
                span_end: None,
                marker: format!("<{p}>"),
            })
            .collect();
        let (text, _) = apply_insertions(buffer, &insertions);
        assert!(text.starts_with("01234<5>"));
        assert_eq!(
            text,
            "01234<5>56789abcdefghij<20>klmnopqrstuvwxyzABCD<40>EFGHIJKLMN"
        );
    }

    #[test]
    fn overlapping_span_is_downgraded() {
        let buffer = "alpha beta gamma";
        let insertions = vec![
            Insertion { position: 0, span_end: Some(10), marker: "<a>".into() },
            Insertion { position: 6, span_end: Some(16), marker: "<b>".into() },
        ];
        let (text, marked) = apply_insertions(buffer, &insertions);
        assert_eq!(marked, vec![false, true]);
        assert_eq!(text, "<a>alpha <b>[beta gamma]{marked}");
    }

    #[test]
    fn unknown_anchor_is_unmatched() {
        let outcome = place_comments(
            "nothing relevant here",
            &[comment("1", "x"), comment("2", "y")],
            &HashMap::from([("1".to_string(), anchor("zzzzzz", "", "", 0))]),
            None,
            &ReconcileSettings::default(),
        );
        assert_eq!(outcome.unmatched, vec!["1".to_string(), "2".to_string()]);
        assert_eq!(outcome.text, "nothing relevant here");
    }

    #[test]
    fn point_comment_lands_between_contexts() {
        let buffer = "The pumps ran overnight and the tank drained.";
        let anchors = HashMap::from([(
            "1".to_string(),
            anchor("", "The pumps ran overnight", "and the tank drained.", 0),
        )]);
        let outcome = place_comments(
            buffer,
            &[comment("1", "check")],
            &anchors,
            None,
            &ReconcileSettings::default(),
        );
        assert_eq!(outcome.placed[0].strategy, PlacementStrategy::Context);
        assert_eq!(
            outcome.text,
            "The pumps ran overnight{>>Ana: check<<} and the tank drained."
        );
    }

    #[test]
    fn interpolation_prefers_nearby_anchor() {
        let buffer = "word ".repeat(40) + "needle " + &"word ".repeat(40);
        let bounds = SectionBounds::new(1000, 100);
        let anchors = HashMap::from([("1".to_string(), anchor("needle", "", "", 1050))]);
        let outcome = place_comments(
            &buffer,
            &[comment("1", "n")],
            &anchors,
            Some(&bounds),
            &ReconcileSettings::default(),
        );
        assert_eq!(outcome.placed[0].strategy, PlacementStrategy::InterpolatedAnchor);
        assert_eq!(outcome.placed[0].position, 200);
    }

    #[test]
    fn interpolation_wins_over_distant_anchor() {
        let buffer = "needle ".to_string() + &"word ".repeat(120);
        let bounds = SectionBounds::new(0, 100);
        let anchors = HashMap::from([("1".to_string(), anchor("needle", "", "", 50))]);
        let outcome = place_comments(
            &buffer,
            &[comment("1", "n")],
            &anchors,
            Some(&bounds),
            &ReconcileSettings::default(),
        );
        // Target 303 snaps to 302; the anchor at 0 is outside the 200 window.
        assert_eq!(outcome.placed[0].strategy, PlacementStrategy::Interpolated);
        assert_eq!(outcome.placed[0].position, 302);
        assert!(outcome.text.starts_with("needle word"));
        assert!(!outcome.text.contains("{marked}"));
        assert_eq!(&outcome.text[302..], "{>>Ana: n<<}".to_string() + &buffer[302..]);
    }

    #[test]
    fn interpolation_without_anchor_snaps_to_word_start() {
        let buffer = "abcdefghij klmnopqrst";
        let bounds = SectionBounds::new(0, 10);
        let anchors = HashMap::from([("1".to_string(), anchor("", "", "", 5))]);
        let outcome = place_comments(
            buffer,
            &[comment("1", "n")],
            &anchors,
            Some(&bounds),
            &ReconcileSettings::default(),
        );
        assert_eq!(outcome.placed[0].strategy, PlacementStrategy::Interpolated);
        assert_eq!(outcome.placed[0].position, 11);
    }
}

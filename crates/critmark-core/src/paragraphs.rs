//! Paragraph reconciliation.
//!
//! Source paragraphs are walked in order. Each one looks for its rendered
//! counterpart among the next few unconsumed rendered paragraphs, by
//! bag-of-words similarity. Paired paragraphs are word-diffed into the
//! annotation grammar; unpaired source paragraphs become deletions (headings
//! are kept); unpaired rendered paragraphs become insertions.

use crate::markup::{
    self, accept_changes, contains_markup, heading_text, is_heading, reject_changes,
    split_structural_prefix, strip_source_markup,
};
use crate::settings::ParagraphSettings;
use crate::types::{ParagraphAlignment, Verdict};
use crate::util::{diff_words, fold_case, head_chars, normalize_whitespace, words, DiffType};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;

static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n(?:[ \t]*\r?\n)+").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParagraphReconciliation {
    pub text: String,
    pub alignments: Vec<ParagraphAlignment>,
}

impl ParagraphReconciliation {
    pub fn count(&self, verdict: Verdict) -> usize {
        self.alignments.iter().filter(|a| a.verdict == verdict).count()
    }
}

/// Non-empty blank-line separated paragraphs, trimmed of surrounding newlines.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    BLANK_LINES
        .split(text)
        .map(|p| p.trim_matches(|c| c == '\n' || c == '\r'))
        .filter(|p| !p.trim().is_empty())
        .collect()
}

/// Share of the rendered words found in the source vocabulary, over the
/// larger of the vocabulary size and the rendered word count.
pub fn similarity(source: &str, rendered: &str) -> f64 {
    let vocabulary: HashSet<String> = words(source).collect();
    let rendered: Vec<String> = words(rendered).collect();
    let denominator = vocabulary.len().max(rendered.len());
    if denominator == 0 {
        return 0.0;
    }
    let present = rendered.iter().filter(|w| vocabulary.contains(*w)).count();
    present as f64 / denominator as f64
}

/// Word diff rendered in the annotation grammar. A deletion next to an
/// insertion becomes one substitution.
pub fn render_word_diff(old: &str, new: &str) -> String {
    let diff = diff_words(old, new);
    let mut pieces: Vec<String> = Vec::with_capacity(diff.len());
    let mut i = 0;
    while i < diff.len() {
        let current = &diff[i];
        let next = diff.get(i + 1);
        let piece = match (current.diff_type, next.map(|n| n.diff_type)) {
            (DiffType::Delete, Some(DiffType::Insert)) => {
                i += 1;
                markup::substitution(&current.value, &diff[i].value)
            }
            (DiffType::Insert, Some(DiffType::Delete)) => {
                i += 1;
                markup::substitution(&diff[i].value, &current.value)
            }
            (DiffType::Delete, _) => markup::deletion(&current.value),
            (DiffType::Insert, _) => markup::insertion(&current.value),
            (DiffType::Equal, _) => current.value.clone(),
        };
        pieces.push(piece);
        i += 1;
    }
    pieces.join(" ")
}

fn source_words(paragraph: &str) -> String {
    let (_, body) = split_structural_prefix(paragraph);
    strip_source_markup(body)
}

fn rendered_words(paragraph: &str) -> String {
    let (_, body) = split_structural_prefix(paragraph);
    accept_changes(body)
}

fn rejected_words(paragraph: &str) -> String {
    let (_, body) = split_structural_prefix(paragraph);
    reject_changes(body)
}

struct Engine<'a> {
    rendered: Vec<&'a str>,
    consumed: Vec<bool>,
    settings: &'a ParagraphSettings,
    output: Vec<String>,
    alignments: Vec<ParagraphAlignment>,
}

impl<'a> Engine<'a> {
    fn window(&self) -> Vec<usize> {
        (0..self.rendered.len())
            .filter(|&i| !self.consumed[i])
            .take(self.settings.lookahead)
            .collect()
    }

    fn find_counterpart(&self, paragraph: &str) -> Option<usize> {
        let window = self.window();
        let source = source_words(paragraph);

        let mut best: Option<(usize, f64)> = None;
        for &r in &window {
            // A reviewer deletion leaves nothing in the accept view.
            let score = similarity(&source, &rendered_words(self.rendered[r]))
                .max(similarity(&source, &rejected_words(self.rendered[r])));
            if score > self.settings.similarity_threshold
                && best.map_or(true, |(_, s)| score > s)
            {
                best = Some((r, score));
            }
        }
        if let Some((r, score)) = best {
            log::trace!("paragraph paired with rendered {} ({:.2})", r, score);
            return Some(r);
        }

        let heading = heading_text(paragraph)?;
        let probe = fold_case(head_chars(heading, self.settings.heading_rescue_chars).trim());
        let next = *window.first()?;
        (!probe.is_empty() && fold_case(self.rendered[next]).contains(&probe)).then_some(next)
    }

    fn emit_inserted(&mut self, r: usize) {
        self.consumed[r] = true;
        let text = accept_changes(self.rendered[r]);
        if text.trim().is_empty() {
            log::debug!("rendered paragraph {} has no accepted text, skipped", r);
            return;
        }
        self.output.push(markup::insertion(text.trim()));
        self.alignments.push(ParagraphAlignment {
            source_index: None,
            rendered_index: Some(r),
            verdict: Verdict::Inserted,
        });
    }

    fn emit_paired(&mut self, s: usize, paragraph: &str, r: usize) {
        // Rendered paragraphs passed over on the way are insertions here.
        for skipped in 0..r {
            if !self.consumed[skipped] {
                self.emit_inserted(skipped);
            }
        }
        self.consumed[r] = true;

        let (prefix, body) = split_structural_prefix(paragraph);
        let (_, rendered_body) = split_structural_prefix(self.rendered[r]);
        let canonical = normalize_whitespace(&strip_source_markup(body));
        let accepted = normalize_whitespace(&accept_changes(rendered_body));

        let (text, verdict) = if canonical == accepted {
            (paragraph.to_string(), Verdict::Unchanged)
        } else if contains_markup(rendered_body)
            && normalize_whitespace(&reject_changes(rendered_body)) == canonical
        {
            // The rendered side already carries exactly the reviewer's changes.
            let verdict = if accepted.is_empty() {
                Verdict::Deleted
            } else {
                Verdict::Modified
            };
            (format!("{prefix}{}", rendered_body.trim()), verdict)
        } else {
            (
                format!("{prefix}{}", render_word_diff(&canonical, &accepted)),
                Verdict::Modified,
            )
        };
        self.output.push(text);
        self.alignments.push(ParagraphAlignment {
            source_index: Some(s),
            rendered_index: Some(r),
            verdict,
        });
    }

    fn emit_unpaired(&mut self, s: usize, paragraph: &str) {
        let (text, verdict) = if is_heading(paragraph) {
            (paragraph.to_string(), Verdict::Unchanged)
        } else {
            (markup::deletion(paragraph), Verdict::Deleted)
        };
        self.output.push(text);
        self.alignments.push(ParagraphAlignment {
            source_index: Some(s),
            rendered_index: None,
            verdict,
        });
    }
}

/// Reconcile source text against rendered text, paragraph by paragraph.
pub fn reconcile_paragraphs(
    source: &str,
    rendered: &str,
    settings: &ParagraphSettings,
) -> ParagraphReconciliation {
    let rendered = split_paragraphs(rendered);
    let mut engine = Engine {
        consumed: vec![false; rendered.len()],
        rendered,
        settings,
        output: Vec::new(),
        alignments: Vec::new(),
    };

    for (s, paragraph) in split_paragraphs(source).into_iter().enumerate() {
        match engine.find_counterpart(paragraph) {
            Some(r) => engine.emit_paired(s, paragraph, r),
            None => engine.emit_unpaired(s, paragraph),
        }
    }
    for r in 0..engine.rendered.len() {
        if !engine.consumed[r] {
            engine.emit_inserted(r);
        }
    }

    let result = ParagraphReconciliation {
        text: engine.output.join("\n\n"),
        alignments: engine.alignments,
    };
    log::debug!(
        "paragraphs: {} unchanged, {} modified, {} deleted, {} inserted",
        result.count(Verdict::Unchanged),
        result.count(Verdict::Modified),
        result.count(Verdict::Deleted),
        result.count(Verdict::Inserted)
    );
    result
}

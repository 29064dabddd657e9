//! Cross-side pairing of placeholder tokens.
//!
//! A rendered token paired with a source token is renamed to the source
//! placeholder and dropped from the rendered layer stack, so the source
//! original is what gets restored. Unpaired rendered tokens keep their own
//! placeholder and original.

use super::images::image_score;
use super::{PlaceholderToken, ProtectKind, ProtectedText};
use crate::registry::FigureRegistry;
use crate::settings::ImageMatchSettings;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PairingReport {
    pub paired: usize,
    pub unpaired_rendered: usize,
    pub unpaired_source: usize,
}

/// Pairs as (rendered index, source index).
type Pairs = Vec<(usize, usize)>;

fn pair_positionally(rendered: &[PlaceholderToken], source: &[PlaceholderToken]) -> Pairs {
    (0..rendered.len().min(source.len())).map(|i| (i, i)).collect()
}

/// Each rendered token takes the first unused source token with the same
/// whitespace-normalized original.
fn pair_by_equality(
    rendered: &[PlaceholderToken],
    source: &[PlaceholderToken],
    used: &mut [bool],
    eligible: impl Fn(&PlaceholderToken) -> bool,
) -> Pairs {
    let source_norm: Vec<String> = source.iter().map(PlaceholderToken::normalized).collect();
    let mut pairs = Vec::new();
    for (r, token) in rendered.iter().enumerate() {
        let wanted = token.normalized();
        let hit = source_norm
            .iter()
            .enumerate()
            .find(|&(s, norm)| !used[s] && *norm == wanted && eligible(&source[s]));
        if let Some((s, _)) = hit {
            used[s] = true;
            pairs.push((r, s));
        }
    }
    pairs
}

fn pair_images(
    rendered: &[PlaceholderToken],
    source: &[PlaceholderToken],
    registry: Option<&FigureRegistry>,
    restored_labels: &mut HashSet<String>,
    settings: &ImageMatchSettings,
) -> Pairs {
    let label_of = |t: &PlaceholderToken| t.image.as_ref().and_then(|m| m.label.clone());
    let mut used_source = vec![false; source.len()];

    let mut pairs = {
        let labels: &HashSet<String> = &*restored_labels;
        pair_by_equality(rendered, source, &mut used_source, |t| {
            label_of(t).map_or(true, |l| !labels.contains(&l))
        })
    };
    let mut used_rendered = vec![false; rendered.len()];
    for &(r, _) in &pairs {
        used_rendered[r] = true;
    }

    // Greedy in rendered order: each image takes its best unused candidate.
    for (r, rt) in rendered.iter().enumerate() {
        let Some(rendered_meta) = rt.image.as_ref().filter(|_| !used_rendered[r]) else {
            continue;
        };
        let mut best: Option<(u32, usize)> = None;
        for (s, st) in source.iter().enumerate() {
            let Some(source_meta) = st.image.as_ref().filter(|_| !used_source[s]) else {
                continue;
            };
            if source_meta
                .label
                .as_ref()
                .is_some_and(|l| restored_labels.contains(l))
            {
                continue;
            }
            let score = image_score(rendered_meta, source_meta, registry, settings);
            if score >= settings.min_score && best.map_or(true, |(b, _)| score > b) {
                best = Some((score, s));
            }
        }
        if let Some((score, s)) = best {
            log::debug!(
                "image {} paired with {} (score {})",
                rendered[r].placeholder.escape_unicode(),
                source[s].placeholder.escape_unicode(),
                score
            );
            used_rendered[r] = true;
            used_source[s] = true;
            pairs.push((r, s));
        }
    }

    for &(_, s) in &pairs {
        if let Some(label) = label_of(&source[s]) {
            restored_labels.insert(label);
        }
    }
    pairs
}

/// Rename `from` to `to` in the rendered text and inside every rendered
/// original, where a later layer may have captured it.
fn rename(rendered: &mut ProtectedText, from: &str, to: &str) {
    rendered.text = rendered.text.replace(from, to);
    for layer in &mut rendered.layers {
        for token in &mut layer.tokens {
            if token.original.contains(from) {
                token.original = token.original.replace(from, to);
            }
        }
    }
}

/// Pair every rendered token with a source counterpart where one exists.
/// Source image labels already in `restored_labels` are not eligible, and
/// labels paired here are added to it.
pub fn pair_tokens(
    source: &ProtectedText,
    rendered: &mut ProtectedText,
    registry: Option<&FigureRegistry>,
    restored_labels: &mut HashSet<String>,
    settings: &ImageMatchSettings,
) -> PairingReport {
    let mut report = PairingReport::default();

    for kind in ProtectKind::PIPELINE {
        let source_tokens: &[PlaceholderToken] =
            source.layer(kind).map(|l| l.tokens.as_slice()).unwrap_or(&[]);
        let rendered_tokens: Vec<PlaceholderToken> = rendered
            .layer(kind)
            .map(|l| l.tokens.clone())
            .unwrap_or_default();

        let pairs = match kind {
            ProtectKind::Table => pair_positionally(&rendered_tokens, source_tokens),
            ProtectKind::Image => pair_images(
                &rendered_tokens,
                source_tokens,
                registry,
                restored_labels,
                settings,
            ),
            _ => {
                let mut used = vec![false; source_tokens.len()];
                pair_by_equality(&rendered_tokens, source_tokens, &mut used, |_| true)
            }
        };

        for &(r, s) in &pairs {
            rename(
                rendered,
                &rendered_tokens[r].placeholder,
                &source_tokens[s].placeholder,
            );
        }
        let paired: HashSet<usize> = pairs.iter().map(|&(r, _)| r).collect();
        if let Some(layer) = rendered.layers.iter_mut().find(|l| l.kind == kind) {
            let mut index = 0;
            layer.tokens.retain(|_| {
                let keep = !paired.contains(&index);
                index += 1;
                keep
            });
        }

        report.paired += pairs.len();
        report.unpaired_rendered += rendered_tokens.len() - pairs.len();
        report.unpaired_source += source_tokens.len() - pairs.len();
    }

    log::debug!(
        "pairing: {} paired, {} rendered-only, {} source-only",
        report.paired,
        report.unpaired_rendered,
        report.unpaired_source
    );
    report
}

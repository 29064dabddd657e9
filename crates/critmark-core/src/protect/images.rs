//! Image syntax, image metadata and the weighted score used to pair a
//! rendered image with its source counterpart.

use crate::registry::FigureRegistry;
use crate::settings::ImageMatchSettings;
use crate::util::{fold_case, head_chars, normalize_whitespace};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// `![caption](path "title"){attributes}`; the caption may hold one level of
/// nested brackets.
pub static IMAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"!\[((?:[^\[\]]|\[[^\[\]]*\])*)\]\(\s*<?([^)\s>]+)>?(?:\s+"([^"]*)")?\s*\)(\{[^}]*\})?"#,
    )
    .unwrap()
});

static LABEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#([A-Za-z]+:[^\s}]+)").unwrap());

static CAPTION_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:fig(?:ure)?|table|tbl)\.?\s*([a-z]?\d+)\b").unwrap());

static NUMBER_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:fig(?:ure)?|table|tbl)\.?\s*[a-z]?\d+\s*[:.\-–—]?\s*").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMeta {
    pub caption: String,
    pub path: String,
    pub title: Option<String>,
    /// Cross-reference label from the attribute block, e.g. `fig:overview`.
    pub label: Option<String>,
}

impl ImageMeta {
    /// Metadata of the first image in `s`.
    pub fn parse(s: &str) -> Option<Self> {
        let caps = IMAGE_RE.captures(s)?;
        let label = caps
            .get(4)
            .and_then(|attrs| LABEL_RE.captures(attrs.as_str()))
            .map(|l| l[1].to_string());
        Some(Self {
            caption: normalize_whitespace(&caps[1]),
            path: caps[2].to_string(),
            title: caps.get(3).map(|t| t.as_str().to_string()),
            label,
        })
    }

    /// Number token of a "Figure N" / "Table S2" caption.
    pub fn caption_number(&self) -> Option<String> {
        CAPTION_NUMBER_RE
            .captures(&self.caption)
            .map(|c| c[1].to_string())
    }

    /// Caption without a leading "Figure N:" numbering.
    pub fn bare_caption(&self) -> &str {
        match NUMBER_PREFIX_RE.find(&self.caption) {
            Some(m) => &self.caption[m.end()..],
            None => &self.caption,
        }
    }

    pub fn file_stem(&self) -> Option<String> {
        Path::new(&self.path)
            .file_stem()
            .and_then(|s| s.to_str())
            .map(fold_case)
    }
}

fn caption_words(caption: &str) -> HashSet<String> {
    crate::util::words(caption).filter(|w| w.chars().count() > 3).collect()
}

/// Weighted similarity between a rendered and a source image. Each signal
/// contributes its weight at most once.
pub fn image_score(
    rendered: &ImageMeta,
    source: &ImageMeta,
    registry: Option<&FigureRegistry>,
    settings: &ImageMatchSettings,
) -> u32 {
    let mut score = 0;

    if let (Some(a), Some(b)) = (&rendered.label, &source.label) {
        if a == b {
            score += settings.label_weight;
        }
    }

    if let (Some(registry), Some(label), Some(number)) =
        (registry, &source.label, rendered.caption_number())
    {
        if registry
            .number_for_label(label)
            .is_some_and(|n| n.eq_ignore_ascii_case(&number))
        {
            score += settings.registry_number_weight;
        }
    }

    let rendered_caption = fold_case(&normalize_whitespace(rendered.bare_caption()));
    let source_caption = fold_case(&normalize_whitespace(source.bare_caption()));
    if !rendered_caption.is_empty()
        && head_chars(&rendered_caption, settings.caption_prefix_chars)
            == head_chars(&source_caption, settings.caption_prefix_chars)
    {
        score += settings.caption_prefix_weight;
    }

    let a = caption_words(&rendered_caption);
    let b = caption_words(&source_caption);
    let smaller = a.len().min(b.len());
    if smaller > 0 && a.intersection(&b).count() * 2 >= smaller {
        score += settings.caption_overlap_weight;
    }

    if let (Some(a), Some(b)) = (rendered.file_stem(), source.file_stem()) {
        if a == b {
            score += settings.filename_weight;
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_caption_path_title_and_label() {
        let meta = ImageMeta::parse(
            r#"![Flow of [data] through the system](figs/flow.png "Flow"){#fig:flow width=80%}"#,
        )
        .unwrap();
        assert_eq!(meta.caption, "Flow of [data] through the system");
        assert_eq!(meta.path, "figs/flow.png");
        assert_eq!(meta.title.as_deref(), Some("Flow"));
        assert_eq!(meta.label.as_deref(), Some("fig:flow"));
        assert_eq!(meta.file_stem().as_deref(), Some("flow"));
    }

    #[test]
    fn caption_numbering_is_split_off() {
        let meta = ImageMeta::parse("![Figure 3: Overall design](media/image2.png)").unwrap();
        assert_eq!(meta.caption_number().as_deref(), Some("3"));
        assert_eq!(meta.bare_caption(), "Overall design");
        assert_eq!(meta.label, None);
    }

    #[test]
    fn caption_prefix_and_overlap_clear_the_threshold() {
        let settings = ImageMatchSettings::default();
        let rendered = ImageMeta::parse("![Figure 1: Sampling sites along the river](media/image1.png)").unwrap();
        let source = ImageMeta::parse("![Sampling sites along the river](figs/sites.pdf){#fig:sites}").unwrap();
        let score = image_score(&rendered, &source, None, &settings);
        assert_eq!(score, settings.caption_prefix_weight + settings.caption_overlap_weight);
        assert!(score >= settings.min_score);
    }

    #[test]
    fn supplementary_number_resolves_through_the_registry() {
        let settings = ImageMatchSettings::default();
        let registry = FigureRegistry::from_json(
            r#"{"version": 1, "created": "2024-01-01T00:00:00Z", "figures": [
                {"caption": "Extra sites", "path": "figs/extra.png", "label": "fig:extra", "type": "fig", "number": "S1"}
            ]}"#,
        )
        .unwrap();
        let rendered = ImageMeta::parse("![Figure S1: Extra](media/image3.png)").unwrap();
        let source = ImageMeta::parse("![Other caption](figs/x.png){#fig:extra}").unwrap();
        assert_eq!(rendered.caption_number().as_deref(), Some("S1"));
        assert_eq!(rendered.bare_caption(), "Extra");
        let score = image_score(&rendered, &source, Some(&registry), &settings);
        assert_eq!(score, settings.registry_number_weight);
    }

    #[test]
    fn filename_alone_is_below_threshold() {
        let settings = ImageMatchSettings::default();
        let rendered = ImageMeta::parse("![](img/plot.png)").unwrap();
        let source = ImageMeta::parse("![Totally different words](plot.pdf)").unwrap();
        let score = image_score(&rendered, &source, None, &settings);
        assert_eq!(score, settings.filename_weight);
        assert!(score < settings.min_score);
    }
}

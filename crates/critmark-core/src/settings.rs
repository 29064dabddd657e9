//! Tunable constants for every stage of a reconciliation run.
//!
//! The scoring weights and thresholds are empirical calibration points rather
//! than derived values; they live here so callers can adjust them from a
//! settings file without touching the algorithms.

use crate::error::{CritmarkError, Result};
use serde::{Deserialize, Serialize};

/// Entity extraction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractSettings {
    /// Characters of plain text considered on each side of an anchor when
    /// building `before`/`after` context.
    pub context_window: usize,
    /// Characters kept when no sentence boundary falls inside the window.
    pub context_fallback: usize,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            context_window: 150,
            context_fallback: 80,
        }
    }
}

/// Anchor locator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocateSettings {
    /// Word counts tried by progressive truncation, longest first.
    pub truncation_word_counts: Vec<usize>,
    /// Truncated anchors shorter than this many characters are not tried.
    pub truncation_min_chars: usize,
    /// Characters of `before`/`after` used as probes when triangulating.
    pub context_probe_chars: usize,
    /// Shorter probe used when only one side of the context is usable.
    pub single_context_probe_chars: usize,
    /// Largest gap between the `before` and `after` probes.
    pub context_max_gap: usize,
    /// Shortest token accepted by the token-split fallback.
    pub token_min_chars: usize,
    /// Tokens with this many occurrences or more are too common to use.
    pub token_max_occurrences: usize,
}

impl Default for LocateSettings {
    fn default() -> Self {
        Self {
            truncation_word_counts: vec![6, 5, 4, 3],
            truncation_min_chars: 15,
            context_probe_chars: 30,
            single_context_probe_chars: 20,
            context_max_gap: 500,
            token_min_chars: 4,
            token_max_occurrences: 5,
        }
    }
}

/// Comment placement settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementSettings {
    /// Characters searched on each side of an interpolated offset for a word boundary.
    pub snap_window: usize,
    /// Characters searched on each side of an interpolated offset for the literal anchor.
    pub anchor_search_window: usize,
    /// Characters of buffer on each side of a candidate compared with its context.
    pub scoring_window: usize,
    /// Context keywords must be longer than this many characters.
    pub keyword_min_chars: usize,
    /// Score per context keyword found near a candidate.
    pub keyword_weight: i32,
    /// Bonus when the trailing/leading context appears verbatim near a candidate.
    pub verbatim_context_bonus: i32,
    /// Characters of context compared verbatim for the bonus.
    pub verbatim_context_chars: usize,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            snap_window: 50,
            anchor_search_window: 200,
            scoring_window: 200,
            keyword_min_chars: 3,
            keyword_weight: 2,
            verbatim_context_bonus: 5,
            verbatim_context_chars: 30,
        }
    }
}

/// Paragraph reconciliation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParagraphSettings {
    /// Unconsumed rendered paragraphs considered for each source paragraph.
    pub lookahead: usize,
    /// A pairing must score strictly above this similarity.
    pub similarity_threshold: f64,
    /// Heading characters that must appear in the next rendered paragraph
    /// for a heading to be paired without a similarity match.
    pub heading_rescue_chars: usize,
}

impl Default for ParagraphSettings {
    fn default() -> Self {
        Self {
            lookahead: 3,
            similarity_threshold: 0.3,
            heading_rescue_chars: 20,
        }
    }
}

/// Weights for pairing rendered images with source images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageMatchSettings {
    pub label_weight: u32,
    pub registry_number_weight: u32,
    pub caption_prefix_weight: u32,
    pub caption_overlap_weight: u32,
    pub filename_weight: u32,
    /// Pairings scoring below this are rejected.
    pub min_score: u32,
    /// Characters compared for caption-prefix equality.
    pub caption_prefix_chars: usize,
}

impl Default for ImageMatchSettings {
    fn default() -> Self {
        Self {
            label_weight: 100,
            registry_number_weight: 80,
            caption_prefix_weight: 50,
            caption_overlap_weight: 30,
            filename_weight: 20,
            min_score: 40,
            caption_prefix_chars: 30,
        }
    }
}

/// Settings for a full reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileSettings {
    pub extract: ExtractSettings,
    pub locate: LocateSettings,
    pub placement: PlacementSettings,
    pub paragraphs: ParagraphSettings,
    pub images: ImageMatchSettings,
    /// Author shown for comments that carry none.
    pub fallback_author: Option<String>,
}

impl ReconcileSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings JSON; omitted fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self =
            serde_json::from_str(json).map_err(|e| CritmarkError::Settings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CritmarkError::Settings(e.to_string()))
    }

    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.paragraphs.similarity_threshold = threshold;
        self
    }

    pub fn with_fallback_author(mut self, author: impl Into<String>) -> Self {
        self.fallback_author = Some(author.into());
        self
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.paragraphs.similarity_threshold) {
            return Err(CritmarkError::Settings(format!(
                "paragraphs.similarity_threshold must be within 0..=1, got {}",
                self.paragraphs.similarity_threshold
            )));
        }
        if self.paragraphs.lookahead == 0 {
            return Err(CritmarkError::Settings(
                "paragraphs.lookahead must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_calibration_points() {
        let settings = ReconcileSettings::default();
        assert_eq!(settings.paragraphs.similarity_threshold, 0.3);
        assert_eq!(settings.placement.verbatim_context_bonus, 5);
        assert_eq!(settings.placement.keyword_weight, 2);
        assert_eq!(settings.images.min_score, 40);
        assert_eq!(settings.locate.truncation_word_counts, vec![6, 5, 4, 3]);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let settings =
            ReconcileSettings::from_json(r#"{ "paragraphs": { "lookahead": 5 } }"#).unwrap();
        assert_eq!(settings.paragraphs.lookahead, 5);
        assert_eq!(settings.paragraphs.similarity_threshold, 0.3);
        assert_eq!(settings.locate, LocateSettings::default());
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let err = ReconcileSettings::from_json(r#"{ "paragraphs": { "similarity_threshold": 2.0 } }"#)
            .unwrap_err();
        assert!(err.to_string().contains("similarity_threshold"));
    }

    #[test]
    fn json_roundtrip() {
        let settings = ReconcileSettings::default().with_fallback_author("Reviewer");
        let parsed = ReconcileSettings::from_json(&settings.to_json().unwrap()).unwrap();
        assert_eq!(parsed, settings);
    }
}

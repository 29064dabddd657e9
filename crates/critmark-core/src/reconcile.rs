//! Import orchestration.
//!
//! One run takes the canonical source, the converter's plain text of the
//! reviewed document and the extraction of that document, and returns the
//! annotated source:
//!
//! 1. converter change spans are translated to the annotation grammar;
//! 2. both texts are protected with a shared [`Protector`];
//! 3. rendered placeholders are paired with their source counterparts;
//! 4. paragraphs are reconciled over the protected texts;
//! 5. placeholders are restored, source originals first;
//! 6. comments are placed into the restored text.

use crate::error::Result;
use crate::extract::{extract, Extraction};
use crate::markup::{translate_converter_markup, AnnotationCounts};
use crate::package::OoxmlPackage;
use crate::paragraphs::reconcile_paragraphs;
use crate::placement::{place_comments, SectionBounds};
use crate::protect::{contains_placeholder, pair_tokens, restore, PairingReport, Protector};
use crate::registry::FigureRegistry;
use crate::settings::ReconcileSettings;
use crate::types::{AnchorRecord, CommentRecord, ParagraphAlignment, PlacedComment, Verdict};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// State carried across the section runs of one document.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    /// Source image labels already restored by an earlier section.
    pub restored_labels: HashSet<String>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub text: String,
    pub alignments: Vec<ParagraphAlignment>,
    pub placed: Vec<PlacedComment>,
    pub unmatched: Vec<String>,
    pub ambiguous: usize,
    pub pairing: PairingReport,
    pub counts: AnnotationCounts,
    pub warnings: Vec<String>,
}

impl ImportReport {
    pub fn paragraphs_with(&self, verdict: Verdict) -> usize {
        self.alignments.iter().filter(|a| a.verdict == verdict).count()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

pub struct Reconciler {
    settings: ReconcileSettings,
    registry: Option<FigureRegistry>,
}

impl Reconciler {
    pub fn new(settings: ReconcileSettings) -> Self {
        Self {
            settings,
            registry: None,
        }
    }

    pub fn with_registry(mut self, registry: FigureRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn settings(&self) -> &ReconcileSettings {
        &self.settings
    }

    /// Reconcile a whole document.
    pub fn import(&self, source: &str, rendered: &str, extraction: &Extraction) -> ImportReport {
        let mut state = RunState::new();
        self.run(
            source,
            rendered,
            &extraction.comments,
            &extraction.anchors,
            None,
            &mut state,
        )
    }

    /// Extract `package` and reconcile against it.
    pub fn import_package(
        &self,
        source: &str,
        rendered: &str,
        package: &OoxmlPackage,
    ) -> Result<ImportReport> {
        let extraction = extract(package, &self.settings.extract)?;
        Ok(self.import(source, rendered, &extraction))
    }

    /// Reconcile one section. Only comments anchored inside `bounds` are
    /// placed, by interpolation within the section.
    pub fn import_section(
        &self,
        source: &str,
        rendered: &str,
        extraction: &Extraction,
        bounds: &SectionBounds,
        state: &mut RunState,
    ) -> ImportReport {
        let comments: Vec<CommentRecord> = extraction
            .comments
            .iter()
            .filter(|c| {
                extraction
                    .anchor(&c.id)
                    .is_some_and(|a| bounds.contains(a.document_position))
            })
            .cloned()
            .collect();
        self.run(
            source,
            rendered,
            &comments,
            &extraction.anchors,
            Some(bounds),
            state,
        )
    }

    fn run(
        &self,
        source: &str,
        rendered: &str,
        comments: &[CommentRecord],
        anchors: &HashMap<String, AnchorRecord>,
        section: Option<&SectionBounds>,
        state: &mut RunState,
    ) -> ImportReport {
        let rendered = translate_converter_markup(rendered);

        let mut protector = Protector::new();
        let protected_source = protector.protect(source);
        let mut protected_rendered = protector.protect(&rendered);
        let pairing = pair_tokens(
            &protected_source,
            &mut protected_rendered,
            self.registry.as_ref(),
            &mut state.restored_labels,
            &self.settings.images,
        );

        let paragraphs = reconcile_paragraphs(
            &protected_source.text,
            &protected_rendered.text,
            &self.settings.paragraphs,
        );
        let layers = protected_source.merged_layers(&protected_rendered);
        let restored = restore(paragraphs.text, &layers);

        let mut warnings = Vec::new();
        if contains_placeholder(&restored) {
            log::warn!("placeholders left in the reconciled text");
            warnings.push("unrestored placeholders remain in the output".to_string());
        }
        if pairing.unpaired_source > 0 {
            warnings.push(format!(
                "{} protected source element(s) had no rendered counterpart",
                pairing.unpaired_source
            ));
        }

        let placement = place_comments(&restored, comments, anchors, section, &self.settings);
        for id in &placement.unmatched {
            warnings.push(format!("comment {id} could not be placed"));
        }

        ImportReport {
            counts: AnnotationCounts::of(&placement.text),
            text: placement.text,
            alignments: paragraphs.alignments,
            placed: placement.placed,
            unmatched: placement.unmatched,
            ambiguous: placement.ambiguous,
            pairing,
            warnings,
        }
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(ReconcileSettings::default())
    }
}

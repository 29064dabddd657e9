//! Placeholder protection for structural elements.
//!
//! Tables, images, cross-reference anchors, cross-references, math and
//! citations must survive word-level diffing intact. Before comparison each
//! element is swapped for an opaque token delimited by two private-use
//! characters; after comparison the tokens are swapped back, splitting any
//! change wrapper that swallowed one (see [`restore`]).
//!
//! Both sides of a comparison share one [`Protector`] so token numbers never
//! collide. Rendered tokens are then renamed to their source counterparts
//! (see [`pairing`]) so an unchanged element compares equal.

pub mod images;
pub mod pairing;
pub mod restore;

pub use images::{image_score, ImageMeta};
pub use pairing::{pair_tokens, PairingReport};
pub use restore::{restore, restore_layer};

use crate::util::normalize_whitespace;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const PLACEHOLDER_OPEN: char = '\u{E000}';
pub const PLACEHOLDER_CLOSE: char = '\u{E001}';

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("\u{E000}[A-Z]+[0-9]+\u{E001}").unwrap());

/// Two or more consecutive lines starting with a pipe.
static TABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*\|.*(?:\n[ \t]*\|.*)+").unwrap());
static ANCHOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{#(?:fig|tbl|sec|eq):[^}\s]+[^}]*\}").unwrap());
static CROSSREF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\B@(?:fig|tbl|sec|eq):[A-Za-z0-9_-]+").unwrap());
static MATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\$\$.+?\$\$|\$[^\s$](?:[^$\n]*[^\s$])?\$").unwrap()
});
static CITATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\[\]]*@[A-Za-z0-9_][^\[\]]*\]").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtectKind {
    Table,
    Image,
    Anchor,
    CrossRef,
    Math,
    Citation,
}

impl ProtectKind {
    /// Protection order. A later element can enclose an earlier placeholder
    /// (a citation around a cross-reference), so restoration runs in reverse.
    pub const PIPELINE: [ProtectKind; 6] = [
        ProtectKind::Table,
        ProtectKind::Image,
        ProtectKind::Anchor,
        ProtectKind::CrossRef,
        ProtectKind::Math,
        ProtectKind::Citation,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            ProtectKind::Table => "TABLE",
            ProtectKind::Image => "IMAGE",
            ProtectKind::Anchor => "ANCHOR",
            ProtectKind::CrossRef => "CROSSREF",
            ProtectKind::Math => "MATH",
            ProtectKind::Citation => "CITATION",
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            ProtectKind::Table => &TABLE_RE,
            ProtectKind::Image => &images::IMAGE_RE,
            ProtectKind::Anchor => &ANCHOR_RE,
            ProtectKind::CrossRef => &CROSSREF_RE,
            ProtectKind::Math => &MATH_RE,
            ProtectKind::Citation => &CITATION_RE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderToken {
    pub placeholder: String,
    pub original: String,
    pub kind: ProtectKind,
    /// Parsed image fields, for image tokens.
    pub image: Option<ImageMeta>,
}

impl PlaceholderToken {
    /// Original text with whitespace collapsed, used for equality pairing.
    pub fn normalized(&self) -> String {
        normalize_whitespace(&self.original)
    }
}

/// Tokens produced by one protection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionLayer {
    pub kind: ProtectKind,
    pub tokens: Vec<PlaceholderToken>,
}

/// Protected text plus the layer stack needed to restore it, in protection
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedText {
    pub text: String,
    pub layers: Vec<ProtectionLayer>,
}

impl ProtectedText {
    pub fn layer(&self, kind: ProtectKind) -> Option<&ProtectionLayer> {
        self.layers.iter().find(|l| l.kind == kind)
    }

    pub fn token_count(&self) -> usize {
        self.layers.iter().map(|l| l.tokens.len()).sum()
    }

    /// Restore every element, consuming the layer stack.
    pub fn restore(self) -> String {
        restore(self.text, &self.layers)
    }

    /// Restore this side's elements into text derived from it, such as a diff
    /// that wrapped placeholders in change markup.
    pub fn restore_diffed(&self, diffed: &str) -> String {
        restore(diffed.to_string(), &self.layers)
    }

    /// Layer stack for restoring text that mixes both sides: every token of
    /// `self`, then any `other` token not already present, kind by kind.
    pub fn merged_layers(&self, other: &ProtectedText) -> Vec<ProtectionLayer> {
        ProtectKind::PIPELINE
            .iter()
            .map(|&kind| {
                let mut tokens: Vec<PlaceholderToken> = self
                    .layer(kind)
                    .map(|l| l.tokens.clone())
                    .unwrap_or_default();
                if let Some(extra) = other.layer(kind) {
                    for token in &extra.tokens {
                        if !tokens.iter().any(|t| t.placeholder == token.placeholder) {
                            tokens.push(token.clone());
                        }
                    }
                }
                ProtectionLayer { kind, tokens }
            })
            .collect()
    }
}

/// Issues placeholder tokens from a counter shared by every text it protects.
#[derive(Debug, Default)]
pub struct Protector {
    counter: usize,
}

impl Protector {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_placeholder(&mut self, kind: ProtectKind) -> String {
        let placeholder = format!(
            "{PLACEHOLDER_OPEN}{}{}{PLACEHOLDER_CLOSE}",
            kind.tag(),
            self.counter
        );
        self.counter += 1;
        placeholder
    }

    /// Replace every element of one kind.
    pub fn protect_kind(&mut self, text: &str, kind: ProtectKind) -> (String, ProtectionLayer) {
        let mut out = String::with_capacity(text.len());
        let mut tokens = Vec::new();
        let mut last = 0;
        for m in kind.pattern().find_iter(text) {
            out.push_str(&text[last..m.start()]);
            let placeholder = self.next_placeholder(kind);
            out.push_str(&placeholder);
            tokens.push(PlaceholderToken {
                placeholder,
                original: m.as_str().to_string(),
                kind,
                image: match kind {
                    ProtectKind::Image => ImageMeta::parse(m.as_str()),
                    _ => None,
                },
            });
            last = m.end();
        }
        out.push_str(&text[last..]);
        (out, ProtectionLayer { kind, tokens })
    }

    /// Run the whole protection pipeline.
    pub fn protect(&mut self, text: &str) -> ProtectedText {
        let mut current = text.to_string();
        let mut layers = Vec::with_capacity(ProtectKind::PIPELINE.len());
        for kind in ProtectKind::PIPELINE {
            let (next, layer) = self.protect_kind(&current, kind);
            current = next;
            layers.push(layer);
        }
        ProtectedText {
            text: current,
            layers,
        }
    }
}

pub fn is_placeholder(s: &str) -> bool {
    PLACEHOLDER_RE
        .find(s)
        .map(|m| m.start() == 0 && m.end() == s.len())
        .unwrap_or(false)
}

pub fn contains_placeholder(s: &str) -> bool {
    s.contains(PLACEHOLDER_OPEN)
}

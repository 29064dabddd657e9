//! Figure and table registry: labels, captions and the numbers the rendered
//! document shows for them.
//!
//! The registry is built from the source text before rendering and persisted
//! as JSON, so a later import can translate "Figure 3" in a rendered caption
//! back to `fig:results`.

use crate::error::{CritmarkError, Result};
use crate::protect::images::IMAGE_RE;
use crate::protect::ImageMeta;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const REGISTRY_VERSION: u32 = 1;

/// `Table: caption {#tbl:label}` or `: caption {#tbl:label}`.
static TABLE_CAPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(?:Table)?:[ \t]+(.+?)[ \t]*\{#(tbl:[^\s}]+)[^}]*\}[ \t]*$").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FigureKind {
    Fig,
    Tbl,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FigureEntry {
    pub caption: String,
    pub path: String,
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub kind: FigureKind,
    /// Display number as the rendered document shows it, e.g. `"3"` or `"S1"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureRegistry {
    pub version: u32,
    pub created: DateTime<Utc>,
    pub figures: Vec<FigureEntry>,
}

impl FigureRegistry {
    pub fn new() -> Self {
        Self {
            version: REGISTRY_VERSION,
            created: Utc::now(),
            figures: Vec::new(),
        }
    }

    /// Scan source text for labelled images and captioned tables. Labelled
    /// entries are numbered per kind in order of appearance; unlabelled images
    /// are recorded without a number.
    pub fn from_source(source: &str) -> Self {
        let mut located: Vec<(usize, FigureEntry)> = Vec::new();

        for m in IMAGE_RE.find_iter(source) {
            if let Some(meta) = ImageMeta::parse(m.as_str()) {
                located.push((
                    m.start(),
                    FigureEntry {
                        caption: meta.caption,
                        path: meta.path,
                        label: meta.label,
                        kind: FigureKind::Fig,
                        number: None,
                    },
                ));
            }
        }
        for caps in TABLE_CAPTION_RE.captures_iter(source) {
            let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
            located.push((
                start,
                FigureEntry {
                    caption: caps[1].to_string(),
                    path: String::new(),
                    label: Some(caps[2].to_string()),
                    kind: FigureKind::Tbl,
                    number: None,
                },
            ));
        }
        located.sort_by_key(|(start, _)| *start);

        let mut registry = Self::new();
        let (mut figs, mut tbls) = (0u32, 0u32);
        for (_, mut entry) in located {
            if entry.label.is_some() {
                let counter = match entry.kind {
                    FigureKind::Fig => &mut figs,
                    FigureKind::Tbl => &mut tbls,
                };
                *counter += 1;
                entry.number = Some(counter.to_string());
            }
            registry.figures.push(entry);
        }
        log::debug!("registry: {} entries", registry.figures.len());
        registry
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let registry: Self =
            serde_json::from_str(json).map_err(|e| CritmarkError::Registry(e.to_string()))?;
        if registry.version > REGISTRY_VERSION {
            return Err(CritmarkError::Registry(format!(
                "unsupported registry version {}",
                registry.version
            )));
        }
        Ok(registry)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CritmarkError::Registry(e.to_string()))
    }

    pub fn by_label(&self, label: &str) -> Option<&FigureEntry> {
        self.figures
            .iter()
            .find(|f| f.label.as_deref() == Some(label))
    }

    pub fn by_number(&self, kind: FigureKind, number: &str) -> Option<&FigureEntry> {
        self.figures.iter().find(|f| {
            f.kind == kind
                && f.number
                    .as_deref()
                    .is_some_and(|n| n.eq_ignore_ascii_case(number))
        })
    }

    pub fn number_for_label(&self, label: &str) -> Option<&str> {
        self.by_label(label).and_then(|f| f.number.as_deref())
    }

    pub fn len(&self) -> usize {
        self.figures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.figures.is_empty()
    }
}

impl Default for FigureRegistry {
    fn default() -> Self {
        Self::new()
    }
}

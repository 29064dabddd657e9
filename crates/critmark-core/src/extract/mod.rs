//! Entity extraction from a rendered word-processing package: plain text,
//! comment anchors with context, comment bodies and tables.

pub mod comments;
pub mod context;
pub mod tables;
pub mod text_map;

pub use tables::ExtractedTable;
pub use text_map::{TextMap, TextNode, TextNodeKind};

use crate::error::Result;
use crate::package::{OoxmlPackage, COMMENTS_PART, DOCUMENT_PART};
use crate::settings::ExtractSettings;
use crate::types::{AnchorRecord, CommentRecord};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Everything read from one rendered document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Extraction {
    pub full_text: String,
    pub anchors: HashMap<String, AnchorRecord>,
    pub comments: Vec<CommentRecord>,
    pub tables: Vec<ExtractedTable>,
}

impl Extraction {
    pub fn comment(&self, id: &str) -> Option<&CommentRecord> {
        self.comments.iter().find(|c| c.id == id)
    }

    pub fn anchor(&self, id: &str) -> Option<&AnchorRecord> {
        self.anchors.get(id)
    }

    /// Comments that have a recorded anchor, in comment order.
    pub fn anchored_comments(&self) -> impl Iterator<Item = (&CommentRecord, &AnchorRecord)> {
        self.comments
            .iter()
            .filter_map(|c| self.anchors.get(&c.id).map(|a| (c, a)))
    }
}

pub fn extract(package: &OoxmlPackage, settings: &ExtractSettings) -> Result<Extraction> {
    let mut extraction = Extraction::default();

    match package.get_xml_part(DOCUMENT_PART)? {
        Some(doc) => {
            let map = TextMap::build(&doc);
            extraction.anchors = comments::read_anchors(&doc, &map, settings);
            extraction.tables = tables::read_tables(&doc);
            extraction.full_text = map.into_full_text();
        }
        None => log::warn!("{}: missing {}", package.name(), DOCUMENT_PART),
    }

    match package.get_xml_part(COMMENTS_PART)? {
        Some(doc) => extraction.comments = comments::read_comments(&doc),
        None => log::warn!("{}: missing {}", package.name(), COMMENTS_PART),
    }

    log::debug!(
        "{}: {} comments, {} anchors, {} tables, {} chars of text",
        package.name(),
        extraction.comments.len(),
        extraction.anchors.len(),
        extraction.tables.len(),
        extraction.full_text.len()
    );
    Ok(extraction)
}

pub fn extract_bytes(bytes: &[u8], name: &str, settings: &ExtractSettings) -> Result<Extraction> {
    extract(&OoxmlPackage::open(bytes, name)?, settings)
}

pub fn extract_path(path: &Path, settings: &ExtractSettings) -> Result<Extraction> {
    extract(&OoxmlPackage::open_path(path)?, settings)
}

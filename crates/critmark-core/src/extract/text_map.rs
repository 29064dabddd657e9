//! Ordered text-bearing nodes of a document part and the mapping from
//! raw-markup offsets to plain-text offsets.

use crate::xml::{XmlDocument, W};
use indextree::NodeId;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextNodeKind {
    /// `w:t` run text.
    Text,
    /// `w:delText`: tracked deletion. Contributes nothing to the plain text
    /// but still counts as anchor text.
    Deleted,
    Tab,
    Break,
    /// Synthetic newline emitted after each paragraph's content.
    ParagraphEnd,
}

#[derive(Debug, Clone)]
pub struct TextNode {
    pub kind: TextNodeKind,
    /// Byte range in the raw markup.
    pub raw: Range<usize>,
    pub text: String,
    /// Offset of this node's contribution in the plain text.
    pub plain_start: usize,
}

impl TextNode {
    pub fn is_visible(&self) -> bool {
        self.kind != TextNodeKind::Deleted
    }

    pub fn plain_len(&self) -> usize {
        if self.is_visible() {
            self.text.len()
        } else {
            0
        }
    }
}

/// Text nodes in storage order plus the plain text they concatenate to.
#[derive(Debug, Clone, Default)]
pub struct TextMap {
    nodes: Vec<TextNode>,
    full_text: String,
}

impl TextMap {
    pub fn build(doc: &XmlDocument) -> Self {
        let mut map = Self::default();
        if let Some(root) = doc.root() {
            map.walk(doc, root);
        }
        map
    }

    fn push(&mut self, kind: TextNodeKind, raw: Range<usize>, text: String) {
        let node = TextNode {
            kind,
            raw,
            text,
            plain_start: self.full_text.len(),
        };
        if node.is_visible() {
            self.full_text.push_str(&node.text);
        }
        self.nodes.push(node);
    }

    fn walk(&mut self, doc: &XmlDocument, node: NodeId) {
        let Some(name) = doc.get(node).and_then(|d| d.name()) else {
            return;
        };
        if name.namespace.as_deref() != Some(W::NS) {
            for child in doc.children(node) {
                self.walk(doc, child);
            }
            return;
        }

        let in_run = || {
            doc.ancestors(node)
                .next()
                .map(|parent| doc.is_named(parent, &W::r()))
                .unwrap_or(false)
        };

        match name.local_name.as_str() {
            "t" => self.push(TextNodeKind::Text, doc.span(node), doc.text_content(node)),
            "delText" => self.push(TextNodeKind::Deleted, doc.span(node), doc.text_content(node)),
            // Tab stops in paragraph properties are also `w:tab`; only run
            // content produces text.
            "tab" if in_run() => self.push(TextNodeKind::Tab, doc.span(node), "\t".to_string()),
            "br" | "cr" if in_run() => {
                self.push(TextNodeKind::Break, doc.span(node), "\n".to_string())
            }
            "p" => {
                for child in doc.children(node) {
                    self.walk(doc, child);
                }
                let end = doc.span(node).end;
                self.push(TextNodeKind::ParagraphEnd, end..end, "\n".to_string());
            }
            _ => {
                for child in doc.children(node) {
                    self.walk(doc, child);
                }
            }
        }
    }

    pub fn nodes(&self) -> &[TextNode] {
        &self.nodes
    }

    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn into_full_text(self) -> String {
        self.full_text
    }

    /// Plain-text offset for a raw-markup offset: the start of the node that
    /// contains it, or of the next node when it falls between nodes. Offsets
    /// before every node map to 0, offsets after every node to the end.
    pub fn plain_offset(&self, raw: usize) -> usize {
        let idx = self.nodes.partition_point(|n| n.raw.end <= raw);
        match self.nodes.get(idx) {
            Some(node) => node.plain_start,
            None => self.full_text.len(),
        }
    }

    /// Visible and deleted text of every node lying inside `raw`, in
    /// document order.
    pub fn harvest(&self, raw: Range<usize>) -> String {
        let first = self.nodes.partition_point(|n| n.raw.start < raw.start);
        self.nodes[first..]
            .iter()
            .take_while(|n| n.raw.end <= raw.end)
            .map(|n| n.text.as_str())
            .collect()
    }
}

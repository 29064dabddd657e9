use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a reviewer comment was attached in the rendered document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRecord {
    /// Text covered by the comment range, deleted text included.
    pub anchor_text: String,
    /// Plain text preceding the anchor, trimmed to a sentence boundary.
    pub before: String,
    /// Plain text following the anchor, trimmed to a sentence boundary.
    pub after: String,
    /// Plain-text byte offset of the range start. Set for point comments too.
    pub document_position: usize,
    /// Plain-text byte length of the range.
    pub document_length: usize,
    /// Point comment (or a range that covers no text).
    pub is_empty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: String,
    pub author: String,
    pub date: String,
    pub text: String,
}

/// How a comment's final position was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlacementStrategy {
    /// Section interpolation with the literal anchor found nearby.
    InterpolatedAnchor,
    /// Section interpolation alone.
    Interpolated,
    Direct,
    Whitespace,
    Stripped,
    Truncated,
    Context,
    Token,
}

impl fmt::Display for PlacementStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlacementStrategy::InterpolatedAnchor => "interpolated-anchor",
            PlacementStrategy::Interpolated => "interpolated",
            PlacementStrategy::Direct => "direct",
            PlacementStrategy::Whitespace => "whitespace",
            PlacementStrategy::Stripped => "stripped",
            PlacementStrategy::Truncated => "truncated",
            PlacementStrategy::Context => "context",
            PlacementStrategy::Token => "token",
        };
        f.write_str(name)
    }
}

/// A comment with its final offset in the output buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedComment {
    pub comment_id: String,
    pub position: usize,
    /// The marked span, when the anchor was resolved.
    pub anchor_text: Option<String>,
    pub anchor_end: Option<usize>,
    pub strategy: PlacementStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Unchanged,
    Modified,
    Deleted,
    Inserted,
}

/// Outcome for one source paragraph (or one leftover rendered paragraph).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphAlignment {
    /// `None` for rendered paragraphs with no source counterpart.
    pub source_index: Option<usize>,
    pub rendered_index: Option<usize>,
    pub verdict: Verdict,
}

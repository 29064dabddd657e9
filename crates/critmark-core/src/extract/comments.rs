//! Comment bodies (`word/comments.xml`) and comment anchor ranges
//! (`commentRangeStart`/`commentRangeEnd` in the main document).

use super::context::{context_after, context_before};
use super::text_map::TextMap;
use crate::settings::ExtractSettings;
use crate::types::{AnchorRecord, CommentRecord};
use crate::xml::{XmlDocument, W};
use std::collections::HashMap;

/// Read every `w:comment` in document order.
pub fn read_comments(doc: &XmlDocument) -> Vec<CommentRecord> {
    let Some(root) = doc.root() else {
        return Vec::new();
    };
    let comment_name = W::comment();
    let paragraph = W::p();

    doc.descendants(root)
        .filter(|&id| doc.is_named(id, &comment_name))
        .map(|id| {
            let attr = |name| doc.attribute(id, &name).unwrap_or_default().to_string();
            let paragraphs: Vec<String> = doc
                .descendants_named(id, &paragraph)
                .map(|p| doc.text_content(p))
                .collect();
            let text = if paragraphs.is_empty() {
                doc.text_content(id)
            } else {
                paragraphs.join("\n")
            };
            CommentRecord {
                id: attr(W::id()),
                author: attr(W::author()),
                date: attr(W::date()),
                text: text.trim().to_string(),
            }
        })
        .collect()
}

/// Raw offsets of the first start and first end marker for each comment id,
/// with ids listed in the order their start markers appear.
fn marker_offsets(doc: &XmlDocument) -> (Vec<(String, usize)>, HashMap<String, usize>) {
    let mut starts: Vec<(String, usize)> = Vec::new();
    let mut ends: HashMap<String, usize> = HashMap::new();
    let Some(root) = doc.root() else {
        return (starts, ends);
    };
    let id_name = W::id();

    let start_name = W::commentRangeStart();
    for node in doc.descendants(root).filter(|&n| doc.is_named(n, &start_name)) {
        let Some(id) = doc.attribute(node, &id_name) else {
            continue;
        };
        if !starts.iter().any(|(seen, _)| seen == id) {
            starts.push((id.to_string(), doc.span(node).start));
        }
    }

    let end_name = W::commentRangeEnd();
    for node in doc.descendants(root).filter(|&n| doc.is_named(n, &end_name)) {
        if let Some(id) = doc.attribute(node, &id_name) {
            ends.entry(id.to_string()).or_insert(doc.span(node).start);
        }
    }

    (starts, ends)
}

/// Anchor records keyed by comment id.
pub fn read_anchors(
    doc: &XmlDocument,
    map: &TextMap,
    settings: &ExtractSettings,
) -> HashMap<String, AnchorRecord> {
    let (starts, ends) = marker_offsets(doc);
    let full_text = map.full_text();
    let mut anchors = HashMap::with_capacity(starts.len());

    for (id, start_raw) in starts {
        let Some(&end_raw) = ends.get(&id) else {
            log::warn!("comment {} has a range start but no range end; skipping", id);
            continue;
        };

        let start = map.plain_offset(start_raw);
        let (end, anchor_text) = if end_raw <= start_raw {
            (start, String::new())
        } else {
            let end = map.plain_offset(end_raw).max(start);
            (end, map.harvest(start_raw..end_raw).trim().to_string())
        };

        anchors.insert(
            id,
            AnchorRecord {
                is_empty: anchor_text.is_empty(),
                anchor_text,
                before: context_before(full_text, start, settings),
                after: context_after(full_text, end, settings),
                document_position: start,
                document_length: end - start,
            },
        );
    }

    for id in ends.keys() {
        if !anchors.contains_key(id) {
            log::debug!("comment {} has a range end but no range start", id);
        }
    }

    anchors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parser::parse;
    use pretty_assertions::assert_eq;

    const NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

    fn body(inner: &str) -> XmlDocument {
        parse(&format!(r#"<w:document {NS}><w:body>{inner}</w:body></w:document>"#)).unwrap()
    }

    #[test]
    fn reads_comment_bodies() {
        let doc = parse(&format!(
            r#"<w:comments {NS}><w:comment w:id="0" w:author="Ana" w:date="2024-05-01T10:00:00Z"><w:p><w:r><w:t>First line</w:t></w:r></w:p><w:p><w:r><w:t>second &amp; last</w:t></w:r></w:p></w:comment></w:comments>"#
        ))
        .unwrap();
        let comments = read_comments(&doc);
        assert_eq!(
            comments,
            vec![CommentRecord {
                id: "0".into(),
                author: "Ana".into(),
                date: "2024-05-01T10:00:00Z".into(),
                text: "First line\nsecond & last".into(),
            }]
        );
    }

    #[test]
    fn ranged_comment_records_anchor_and_context() {
        let doc = body(
            r#"<w:p><w:r><w:t xml:space="preserve">We measured the </w:t></w:r><w:commentRangeStart w:id="3"/><w:r><w:t>flow rate</w:t></w:r><w:commentRangeEnd w:id="3"/><w:r><w:t xml:space="preserve"> twice.</w:t></w:r></w:p>"#,
        );
        let map = TextMap::build(&doc);
        let anchors = read_anchors(&doc, &map, &ExtractSettings::default());
        let record = &anchors["3"];

        assert_eq!(record.anchor_text, "flow rate");
        assert_eq!(record.before, "We measured the");
        assert_eq!(record.after, "twice.");
        assert_eq!(record.document_position, 16);
        assert_eq!(record.document_length, 9);
        assert!(!record.is_empty);
    }

    #[test]
    fn end_before_start_is_a_point_comment() {
        let doc = body(
            r#"<w:p><w:r><w:t>Alpha</w:t></w:r><w:commentRangeEnd w:id="1"/><w:r><w:t>Beta</w:t></w:r><w:commentRangeStart w:id="1"/></w:p>"#,
        );
        let map = TextMap::build(&doc);
        let anchors = read_anchors(&doc, &map, &ExtractSettings::default());
        let record = &anchors["1"];
        assert!(record.is_empty);
        assert_eq!(record.anchor_text, "");
        assert_eq!(record.document_position, 9);
        assert_eq!(record.document_length, 0);
    }

    #[test]
    fn missing_end_is_skipped_and_duplicates_keep_first() {
        let doc = body(
            r#"<w:p><w:commentRangeStart w:id="7"/><w:r><w:t>one</w:t></w:r><w:commentRangeStart w:id="8"/><w:r><w:t>two</w:t></w:r><w:commentRangeEnd w:id="8"/><w:r><w:t>three</w:t></w:r><w:commentRangeEnd w:id="8"/></w:p>"#,
        );
        let map = TextMap::build(&doc);
        let anchors = read_anchors(&doc, &map, &ExtractSettings::default());
        assert!(!anchors.contains_key("7"));
        assert_eq!(anchors["8"].anchor_text, "two");
    }
}

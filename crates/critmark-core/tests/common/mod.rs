//! In-memory reviewed documents for integration tests.

#![allow(dead_code)]

use critmark_core::package::{OoxmlPackage, COMMENTS_PART, DOCUMENT_PART};

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

pub fn run(text: &str) -> String {
    format!(r#"<w:r><w:t xml:space="preserve">{text}</w:t></w:r>"#)
}

pub fn deleted(text: &str) -> String {
    format!(r#"<w:del w:id="90" w:author="Ana"><w:r><w:delText>{text}</w:delText></w:r></w:del>"#)
}

pub fn start(id: &str) -> String {
    format!(r#"<w:commentRangeStart w:id="{id}"/>"#)
}

pub fn end(id: &str) -> String {
    format!(r#"<w:commentRangeEnd w:id="{id}"/><w:r><w:commentReference w:id="{id}"/></w:r>"#)
}

pub fn paragraph(content: &[String]) -> String {
    format!("<w:p>{}</w:p>", content.concat())
}

pub fn document(paragraphs: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W_NS}"><w:body>{}</w:body></w:document>"#,
        paragraphs.concat()
    )
}

/// `(id, author, text)` triples.
pub fn comments(entries: &[(&str, &str, &str)]) -> String {
    let body: String = entries
        .iter()
        .map(|(id, author, text)| {
            format!(
                r#"<w:comment w:id="{id}" w:author="{author}" w:date="2024-05-01T10:00:00Z"><w:p><w:r><w:t>{text}</w:t></w:r></w:p></w:comment>"#
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:comments xmlns:w="{W_NS}">{body}</w:comments>"#
    )
}

pub fn docx(document_xml: &str, comments_xml: Option<&str>) -> OoxmlPackage {
    let mut entries = vec![(DOCUMENT_PART, document_xml)];
    if let Some(xml) = comments_xml {
        entries.push((COMMENTS_PART, xml));
    }
    OoxmlPackage::from_parts("review.docx", &entries)
        .unwrap_or_else(|e| panic!("failed to build test package: {}", e))
}

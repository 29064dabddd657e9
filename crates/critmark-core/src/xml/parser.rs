use super::arena::XmlDocument;
use super::node::XmlNodeData;
use super::xname::{XAttribute, XName};
use crate::error::{CritmarkError, Result};

pub fn parse(xml: &str) -> Result<XmlDocument> {
    parse_part(xml, "input")
}

/// Parse `xml`, naming `part` in any error. Every node keeps the byte range it
/// occupies in `xml`.
pub fn parse_part(xml: &str, part: &str) -> Result<XmlDocument> {
    let doc = roxmltree::Document::parse_with_options(
        xml,
        roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        },
    )
    .map_err(|e| CritmarkError::XmlParse {
        message: e.to_string(),
        location: format!("{} line {}", part, e.pos().row),
    })?;

    let mut xml_doc = XmlDocument::new();

    if doc.root_element().parent().is_some() {
        build_tree(doc.root_element(), &mut xml_doc, None);
    }

    Ok(xml_doc)
}

fn build_tree(node: roxmltree::Node, doc: &mut XmlDocument, parent: Option<indextree::NodeId>) {
    let node_data = match node.node_type() {
        roxmltree::NodeType::Element => {
            let name = XName::new(
                node.tag_name().namespace().unwrap_or(""),
                node.tag_name().name(),
            );

            let attributes: Vec<XAttribute> = node
                .attributes()
                .map(|attr| {
                    XAttribute::new(
                        XName::new(attr.namespace().unwrap_or(""), attr.name()),
                        attr.value(),
                    )
                })
                .collect();

            XmlNodeData::Element { name, attributes }
        }
        roxmltree::NodeType::Text => match node.text() {
            Some(text) => XmlNodeData::Text(text.to_string()),
            None => return,
        },
        _ => return,
    };

    let span = node.range();
    let new_id = match parent {
        Some(parent_id) => doc.add_child(parent_id, node_data, span),
        None => doc.add_root(node_data, span),
    };

    for child in node.children() {
        build_tree(child, doc, Some(new_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::namespaces::W;

    #[test]
    fn parse_records_source_spans() {
        let xml = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>Hello</w:t></w:r></w:p></w:body></w:document>"#;
        let doc = parse(xml).unwrap();
        let root = doc.root().unwrap();

        let t = doc.descendants_named(root, &W::t()).next().unwrap();
        let span = doc.span(t);
        assert_eq!(&xml[span], "<w:t>Hello</w:t>");
        assert_eq!(doc.text_content(t), "Hello");
    }

    #[test]
    fn parse_decodes_entities() {
        let doc = parse("<root>Fish &amp; chips &lt;3</root>").unwrap();
        let root = doc.root().unwrap();
        assert_eq!(doc.text_content(root), "Fish & chips <3");
    }

    #[test]
    fn parse_error_names_the_part() {
        let err = parse_part("<root><open></root>", "word/document.xml").unwrap_err();
        assert!(err.to_string().contains("word/document.xml"));
    }
}

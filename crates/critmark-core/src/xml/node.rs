use super::xname::{XAttribute, XName};
use std::ops::Range;

#[derive(Clone, Debug)]
pub enum XmlNodeData {
    Element {
        name: XName,
        attributes: Vec<XAttribute>,
    },
    Text(String),
}

impl XmlNodeData {
    pub fn element(name: XName) -> Self {
        Self::Element {
            name,
            attributes: Vec::new(),
        }
    }

    pub fn text(content: &str) -> Self {
        Self::Text(content.to_string())
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Self::Element { .. })
    }

    pub fn name(&self) -> Option<&XName> {
        match self {
            Self::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn attributes(&self) -> Option<&[XAttribute]> {
        match self {
            Self::Element { attributes, .. } => Some(attributes),
            _ => None,
        }
    }

    /// Value of the attribute `{namespace}local`, if present.
    pub fn attribute(&self, namespace: &str, local_name: &str) -> Option<&str> {
        self.attributes()?
            .iter()
            .find(|a| a.name.is(namespace, local_name))
            .map(|a| a.value.as_str())
    }

    pub fn text_content(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Arena payload: node data plus the byte range the node occupies in the
/// source markup it was parsed from.
#[derive(Clone, Debug)]
pub struct XmlNode {
    pub data: XmlNodeData,
    pub span: Range<usize>,
}

impl XmlNode {
    pub fn new(data: XmlNodeData, span: Range<usize>) -> Self {
        Self { data, span }
    }
}

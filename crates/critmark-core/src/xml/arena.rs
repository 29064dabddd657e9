use super::node::{XmlNode, XmlNodeData};
use super::xname::XName;
use indextree::{Arena, NodeId};
use std::ops::Range;

#[derive(Debug)]
pub struct XmlDocument {
    arena: Arena<XmlNode>,
    root: Option<NodeId>,
}

impl XmlDocument {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&XmlNodeData> {
        self.arena.get(id).map(|node| &node.get().data)
    }

    /// Byte range of the node in the markup it was parsed from.
    pub fn span(&self, id: NodeId) -> Range<usize> {
        self.arena
            .get(id)
            .map(|node| node.get().span.clone())
            .unwrap_or(0..0)
    }

    pub fn add_root(&mut self, data: XmlNodeData, span: Range<usize>) -> NodeId {
        let id = self.arena.new_node(XmlNode::new(data, span));
        self.root = Some(id);
        id
    }

    pub fn add_child(&mut self, parent: NodeId, data: XmlNodeData, span: Range<usize>) -> NodeId {
        let child = self.arena.new_node(XmlNode::new(data, span));
        parent.append(child, &mut self.arena);
        child
    }

    pub fn children(&self, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        parent.children(&self.arena)
    }

    /// Pre-order traversal, `node` included; this is document storage order.
    pub fn descendants(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        node.descendants(&self.arena)
    }

    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        node.ancestors(&self.arena).skip(1)
    }

    pub fn is_named(&self, node: NodeId, name: &XName) -> bool {
        self.get(node)
            .and_then(|data| data.name())
            .map(|n| n == name)
            .unwrap_or(false)
    }

    pub fn elements_by_name<'a>(
        &'a self,
        parent: NodeId,
        name: &'a XName,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(parent)
            .filter(move |&child_id| self.is_named(child_id, name))
    }

    pub fn first_child_named(&self, parent: NodeId, name: &XName) -> Option<NodeId> {
        self.elements_by_name(parent, name).next()
    }

    /// All descendants (excluding `node`) with the given name, in document order.
    pub fn descendants_named<'a>(
        &'a self,
        node: NodeId,
        name: &'a XName,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.descendants(node)
            .skip(1)
            .filter(move |&id| self.is_named(id, name))
    }

    pub fn attribute(&self, node: NodeId, name: &XName) -> Option<&str> {
        let namespace = name.namespace.as_deref().unwrap_or("");
        self.get(node)?.attribute(namespace, &name.local_name)
    }

    /// Concatenated text of every text node below `node`.
    pub fn text_content(&self, node: NodeId) -> String {
        self.descendants(node)
            .filter_map(|id| self.get(id).and_then(|d| d.text_content()))
            .collect()
    }
}

impl Default for XmlDocument {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::xname::XAttribute;

    #[test]
    fn children_keep_insertion_order() {
        let mut doc = XmlDocument::new();
        let root_id = doc.add_root(XmlNodeData::element(XName::local("root")), 0..30);

        let first = doc.add_child(root_id, XmlNodeData::element(XName::local("a")), 6..10);
        let second = doc.add_child(root_id, XmlNodeData::element(XName::local("b")), 10..14);

        let children: Vec<_> = doc.children(root_id).collect();
        assert_eq!(children, vec![first, second]);
        assert_eq!(doc.span(second), 10..14);
    }

    #[test]
    fn text_content_concatenates_descendants() {
        let mut doc = XmlDocument::new();
        let root = doc.add_root(XmlNodeData::element(XName::local("p")), 0..0);
        let run = doc.add_child(root, XmlNodeData::element(XName::local("r")), 0..0);
        doc.add_child(run, XmlNodeData::text("Hello, "), 0..0);
        doc.add_child(root, XmlNodeData::text("world"), 0..0);

        assert_eq!(doc.text_content(root), "Hello, world");
    }

    #[test]
    fn attribute_reads_qualified_name() {
        let mut doc = XmlDocument::new();
        let name = XName::new("urn:w", "id");
        let root = doc.add_root(
            XmlNodeData::Element {
                name: XName::local("root"),
                attributes: vec![XAttribute::new(name.clone(), "3")],
            },
            0..0,
        );
        assert_eq!(doc.attribute(root, &name), Some("3"));
        assert_eq!(doc.attribute(root, &XName::local("id")), None);
    }
}

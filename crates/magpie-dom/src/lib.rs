//! DOM snapshot tree for selector generation.
//!
//! Selector strategies need to answer structural questions about the
//! document an element came from: ancestors, sibling positions, text
//! content, and whether a candidate selector resolves to exactly one node.
//! This crate provides the arena-based tree those queries run against,
//! following the tree model of the [DOM Living Standard](https://dom.spec.whatwg.org/).
//!
//! # Design
//!
//! Nodes live in a contiguous vector and refer to each other by [`NodeId`]
//! index, giving O(1) traversal in every direction without borrow gymnastics.
//! The tree is immutable once built: it is either constructed node by node
//! (tests, embedders) or deserialized from the extractor's snapshot JSON via
//! [`DomTree::from_snapshot`].

use std::collections::BTreeMap;

use serde::Deserialize;

/// Error type for snapshot loading.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The snapshot is not valid JSON or has the wrong shape.
    #[error("failed to parse DOM snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A type-safe index into the DOM tree.
///
/// [§ 4.4 Interface Node](https://dom.spec.whatwg.org/#interface-node)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The document node is always at index 0.
    pub const ROOT: Self = Self(0);
}

/// Element-specific data.
///
/// Tag names are stored lowercased (HTML element names compare
/// case-insensitively, and selector candidates are emitted lowercase).
/// Attributes use a `BTreeMap` so iteration order, and therefore generated
/// selector candidates, are deterministic.
#[derive(Debug, Clone, Default)]
pub struct ElementData {
    /// Lowercased local name.
    pub tag_name: String,
    /// Attribute list, name to value.
    pub attrs: BTreeMap<String, String>,
}

impl ElementData {
    /// Create element data, lowercasing the tag name.
    pub fn new(tag_name: &str, attrs: BTreeMap<String, String>) -> Self {
        Self { tag_name: tag_name.to_ascii_lowercase(), attrs }
    }

    /// The element's `id` attribute value, if present and non-empty.
    pub fn id(&self) -> Option<&str> {
        self.attrs.get("id").map(String::as_str).filter(|id| !id.is_empty())
    }

    /// An attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Class names from the `class` attribute, in attribute order.
    ///
    /// [§ 3.2.6 Global attributes](https://html.spec.whatwg.org/multipage/dom.html#global-attributes)
    /// "a set of space-separated tokens"
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attrs.get("class").map(String::as_str).unwrap_or("").split_whitespace()
    }

    /// True if the element carries `class_name` as one of its class tokens.
    pub fn has_class(&self, class_name: &str) -> bool {
        self.classes().any(|c| c == class_name)
    }
}

/// [§ 4.4 Interface Node](https://dom.spec.whatwg.org/#interface-node)
/// "Each node has an associated node type"
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The document root.
    Document,
    /// An element node.
    Element(ElementData),
    /// A text node.
    Text(String),
    /// A comment node (ignored by all queries, kept for fidelity).
    Comment(String),
}

/// A node in the arena, with index-based relationships.
#[derive(Debug, Clone)]
pub struct Node {
    /// The node's type and payload.
    pub kind: NodeKind,
    /// Parent node, or `None` for the document.
    pub parent: Option<NodeId>,
    /// Children in document order.
    pub children: Vec<NodeId>,
}

/// Arena-based DOM tree with O(1) node access and traversal.
///
/// [§ 4.2.4 Tree order](https://dom.spec.whatwg.org/#concept-tree-order)
/// Node allocation order is document order: the extractor serializes the
/// snapshot depth-first, and [`DomTree::from_snapshot`] preserves that, so
/// `NodeId` ordering doubles as the document-order index.
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl DomTree {
    /// Create a tree containing only the document node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node { kind: NodeKind::Document, parent: None, children: Vec::new() }],
        }
    }

    /// The document root id.
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by id.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Number of nodes in the tree (document node included).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the tree has no nodes at all (never the case after `new`).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate a detached node and return its id.
    pub fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { kind, parent: None, children: Vec::new() });
        id
    }

    /// [§ 4.2.2 Append](https://dom.spec.whatwg.org/#concept-node-append)
    ///
    /// Attach `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Convenience for building trees in code: allocate an element and
    /// append it to `parent` in one step.
    pub fn append_element(
        &mut self,
        parent: NodeId,
        tag_name: &str,
        attrs: &[(&str, &str)],
    ) -> NodeId {
        let attrs =
            attrs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect::<BTreeMap<_, _>>();
        let id = self.alloc(NodeKind::Element(ElementData::new(tag_name, attrs)));
        self.append_child(parent, id);
        id
    }

    /// Allocate a text node and append it to `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.alloc(NodeKind::Text(text.to_owned()));
        self.append_child(parent, id);
        id
    }

    /// Parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Children of a node, in document order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], |n| n.children.as_slice())
    }

    /// Element data if this node is an element.
    pub fn as_element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(|n| match &n.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        })
    }

    /// The element's lowercased tag name, if this node is an element.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.as_element(id).map(|e| e.tag_name.as_str())
    }

    /// [§ 4.2.5 Ancestor](https://dom.spec.whatwg.org/#concept-tree-ancestor)
    ///
    /// Ancestors of a node, nearest first (parent, grandparent, ..., root).
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut current = self.parent(id);
        std::iter::from_fn(move || {
            let next = current?;
            current = self.parent(next);
            Some(next)
        })
    }

    /// Descendants of a node in document order (pre-order), excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants { tree: self, stack: self.children(id).iter().rev().copied().collect() }
    }

    /// All element nodes in document order.
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.descendants(NodeId::ROOT)
            .filter(|&id| matches!(self.get(id).map(|n| &n.kind), Some(NodeKind::Element(_))))
    }

    /// The document element (in practice, `<html>`).
    ///
    /// [§ 3.1.1 The document element](https://html.spec.whatwg.org/multipage/dom.html#the-html-element-2)
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(NodeId::ROOT)
            .iter()
            .find(|&&id| self.as_element(id).is_some())
            .copied()
    }

    /// Element children of a node, in document order.
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).iter().filter(|&&c| self.as_element(c).is_some()).copied().collect()
    }

    /// 1-based position of an element among its parent's element children.
    ///
    /// This is the index `:nth-child()` and XPath child positions count;
    /// text and comment siblings do not participate.
    pub fn position_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.element_children(parent).iter().position(|&c| c == id).map(|i| i + 1)
    }

    /// 1-based position of an element among same-tag element siblings.
    ///
    /// This is the index `:nth-of-type()` and XPath `tag[N]` steps count.
    pub fn same_tag_position(&self, id: NodeId) -> Option<usize> {
        let tag = self.tag_name(id)?;
        let parent = self.parent(id)?;
        let mut position = 0;
        for &child in self.children(parent) {
            if self.tag_name(child) == Some(tag) {
                position += 1;
                if child == id {
                    return Some(position);
                }
            }
        }
        None
    }

    /// Number of same-tag element siblings (the element itself included).
    pub fn same_tag_sibling_count(&self, id: NodeId) -> usize {
        let Some(tag) = self.tag_name(id) else { return 0 };
        let Some(parent) = self.parent(id) else { return 1 };
        self.children(parent).iter().filter(|&&c| self.tag_name(c) == Some(tag)).count()
    }

    /// Element siblings that precede `id` under the same parent.
    pub fn preceding_element_siblings(&self, id: NodeId) -> Vec<NodeId> {
        let Some(parent) = self.parent(id) else { return Vec::new() };
        let mut preceding = Vec::new();
        for &child in self.children(parent) {
            if child == id {
                break;
            }
            if self.as_element(child).is_some() {
                preceding.push(child);
            }
        }
        preceding
    }

    /// Element siblings that follow `id` under the same parent.
    pub fn following_element_siblings(&self, id: NodeId) -> Vec<NodeId> {
        let Some(parent) = self.parent(id) else { return Vec::new() };
        let mut seen_self = false;
        let mut following = Vec::new();
        for &child in self.children(parent) {
            if child == id {
                seen_self = true;
            } else if seen_self && self.as_element(child).is_some() {
                following.push(child);
            }
        }
        following
    }

    /// Visible text of a subtree: all descendant text nodes concatenated,
    /// with whitespace runs collapsed to single spaces and the ends trimmed.
    ///
    /// This matches the extractor's `textContent` trimming, so text-based
    /// selector strategies see the same string the descriptors carry.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        if let Some(Node { kind: NodeKind::Text(text), .. }) = self.get(id) {
            parts.push(text.as_str());
        }
        for descendant in self.descendants(id) {
            if let Some(Node { kind: NodeKind::Text(text), .. }) = self.get(descendant) {
                parts.push(text.as_str());
            }
        }
        parts.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Direct text of an element: only its own text-node children, collapsed
    /// and trimmed. This is what XPath `text()` predicates test.
    pub fn own_text(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        for &child in self.children(id) {
            if let Some(Node { kind: NodeKind::Text(text), .. }) = self.get(child) {
                parts.push(text.as_str());
            }
        }
        parts.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Build a tree from the extractor's snapshot format.
    pub fn from_snapshot(snapshot: &DomSnapshot) -> Self {
        let mut tree = Self::new();
        let root = tree.root();
        build_node(&mut tree, root, &snapshot.root);
        tree
    }

    /// Parse a snapshot JSON string into a tree.
    pub fn from_snapshot_json(text: &str) -> Result<Self, SnapshotError> {
        let snapshot: DomSnapshot = serde_json::from_str(text)?;
        Ok(Self::from_snapshot(&snapshot))
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Document-order (pre-order) iterator over a subtree.
pub struct Descendants<'tree> {
    tree: &'tree DomTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        // Children pushed in reverse so they pop left-to-right.
        self.stack.extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}

/// The extractor's DOM snapshot interchange format.
///
/// A nested node tree, camelCase keys, emitted alongside the element report
/// so selector generation can re-run offline.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomSnapshot {
    /// The document element subtree.
    pub root: SnapshotNode,
}

/// One node of the snapshot tree.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotNode {
    /// Element tag name (empty for text nodes).
    pub tag_name: String,
    /// Element attributes.
    pub attributes: BTreeMap<String, String>,
    /// Text payload for text nodes.
    pub text: Option<String>,
    /// Child nodes in document order.
    pub children: Vec<SnapshotNode>,
}

fn build_node(tree: &mut DomTree, parent: NodeId, snapshot: &SnapshotNode) {
    let id = if let Some(text) = &snapshot.text {
        tree.alloc(NodeKind::Text(text.clone()))
    } else {
        tree.alloc(NodeKind::Element(ElementData::new(&snapshot.tag_name, snapshot.attributes.clone())))
    };
    tree.append_child(parent, id);
    for child in &snapshot.children {
        build_node(tree, id, child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `<html><body><div id="a"><p>Hi</p><p>There</p></div><span/></body></html>`
    fn sample_tree() -> (DomTree, NodeId, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let html = tree.append_element(NodeId::ROOT, "html", &[]);
        let body = tree.append_element(html, "body", &[]);
        let div = tree.append_element(body, "div", &[("id", "a")]);
        let p1 = tree.append_element(div, "p", &[]);
        tree.append_text(p1, "Hi");
        let p2 = tree.append_element(div, "p", &[]);
        tree.append_text(p2, "There");
        tree.append_element(body, "span", &[]);
        (tree, div, p1, p2)
    }

    #[test]
    fn positions_count_elements_only() {
        let (mut tree, div, p1, p2) = sample_tree();
        // Interleave a text node before p2's position check.
        tree.append_text(div, "trailing");
        assert_eq!(tree.position_in_parent(p1), Some(1));
        assert_eq!(tree.position_in_parent(p2), Some(2));
        assert_eq!(tree.same_tag_position(p2), Some(2));
        assert_eq!(tree.same_tag_sibling_count(p1), 2);
        assert_eq!(tree.position_in_parent(div), Some(1));
    }

    #[test]
    fn text_content_collapses_whitespace() {
        let mut tree = DomTree::new();
        let html = tree.append_element(NodeId::ROOT, "html", &[]);
        let div = tree.append_element(html, "div", &[]);
        tree.append_text(div, "  Hello\n  ");
        let b = tree.append_element(div, "b", &[]);
        tree.append_text(b, "world ");
        assert_eq!(tree.text_content(div), "Hello world");
        assert_eq!(tree.own_text(div), "Hello");
    }

    #[test]
    fn ancestors_walk_to_root() {
        let (tree, _, p1, _) = sample_tree();
        let tags: Vec<_> = tree.ancestors(p1).filter_map(|a| tree.tag_name(a).map(str::to_owned)).collect();
        assert_eq!(tags, vec!["div", "body", "html"]);
    }

    #[test]
    fn snapshot_round_trip() {
        let json = r#"{
            "root": {
                "tagName": "html",
                "children": [
                    {
                        "tagName": "body",
                        "children": [
                            { "tagName": "h1", "children": [ { "text": "Title" } ] },
                            { "tagName": "p", "attributes": { "class": "intro" } }
                        ]
                    }
                ]
            }
        }"#;
        let tree = DomTree::from_snapshot_json(json).unwrap();
        let elements: Vec<_> =
            tree.elements().filter_map(|id| tree.tag_name(id).map(str::to_owned)).collect();
        assert_eq!(elements, vec!["html", "body", "h1", "p"]);
        let h1 = tree.elements().find(|&id| tree.tag_name(id) == Some("h1")).unwrap();
        assert_eq!(tree.text_content(h1), "Title");
        let p = tree.elements().find(|&id| tree.tag_name(id) == Some("p")).unwrap();
        assert!(tree.as_element(p).unwrap().has_class("intro"));
    }

    #[test]
    fn sibling_queries() {
        let (tree, div, p1, p2) = sample_tree();
        assert_eq!(tree.preceding_element_siblings(p2), vec![p1]);
        assert_eq!(tree.following_element_siblings(p1), vec![p2]);
        assert!(tree.preceding_element_siblings(div).is_empty());
    }
}

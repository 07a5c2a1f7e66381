//! # Document Tree
//!
//! A minimal, arena-backed document tree: just enough of the DOM for text
//! anchoring. Every node is either an element or a text leaf; the
//! anchoring code pattern-matches on [`NodeKind`] instead of branching on a
//! runtime node-type tag.
//!
//! ```text
//! #document
//! └── html
//!     └── body
//!         ├── p            Element { tag, attributes, children }
//!         │   └── "Hello"  Text(content)
//!         └── "\n"         Text(content)
//! ```
//!
//! Nodes live in a `Vec` and are addressed by [`NodeId`]. Detaching a node
//! does not free its slot, so ids handed out earlier never dangle; they may
//! simply refer to nodes that are no longer reachable from the root.
//!
//! ## Module Structure
//!
//! - **`lexer`**: logos tokenizer for HTML source
//! - **`parser`**: forgiving tree builder on top of the lexer
//! - **`html`**: serialization back to HTML

pub mod html;
pub mod lexer;
pub mod parser;

/// Tag name of the synthetic root element. Never part of a structural path.
pub const DOCUMENT_TAG: &str = "#document";

/// Identifier of a node inside one [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Raw arena index, stable for the lifetime of the document.
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// Lowercase tag name
    pub tag: String,
    /// Attributes in source order
    pub attributes: Vec<(String, String)>,
    pub children: Vec<NodeId>,
}

impl ElementData {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    kind: NodeKind,
}

/// An owned document tree.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document holding only the synthetic root.
    pub fn new() -> Self {
        let root = Node {
            parent: None,
            kind: NodeKind::Element(ElementData {
                tag: DOCUMENT_TAG.to_string(),
                attributes: Vec::new(),
                children: Vec::new(),
            }),
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The `<body>` element, or the root when the document has none.
    pub fn body(&self) -> NodeId {
        self.descendants(self.root)
            .find(|&id| self.tag_name(id) == Some("body"))
            .unwrap_or(self.root)
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|node| &node.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.kind(id)? {
            NodeKind::Element(data) => Some(data),
            NodeKind::Text(_) => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Text(content) => Some(content),
            NodeKind::Element(_) => None,
        }
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.text(id).is_some()
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|data| data.tag.as_str())
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attribute(name)
    }

    /// Children of an element; empty for text nodes and unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.element(id)
            .map(|data| data.children.as_slice())
            .unwrap_or(&[])
    }

    /// Position of `id` among its parent's children.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&child| child == id)
    }

    /// Nearest element at or above `id`: the node itself for elements, the
    /// parent for text leaves.
    pub fn nearest_element(&self, id: NodeId) -> Option<NodeId> {
        match self.kind(id)? {
            NodeKind::Element(_) => Some(id),
            NodeKind::Text(_) => self.parent(id),
        }
    }

    /// Iterates over `ancestor` and everything below it in depth-first
    /// pre-order.
    pub fn descendants(&self, ancestor: NodeId) -> Descendants<'_> {
        let stack = if self.nodes.get(ancestor.0).is_some() {
            vec![ancestor]
        } else {
            Vec::new()
        };
        Descendants { doc: self, stack }
    }

    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Topmost ancestor of `id`: the root for attached nodes, the top of
    /// the detached subtree otherwise.
    pub fn tree_root(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// True when the node is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.is_ancestor_of(self.root, id)
    }

    /// First attached element whose `id` attribute equals `value`.
    pub fn get_element_by_id(&self, value: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .find(|&id| self.attribute(id, "id") == Some(value))
    }

    /// Concatenated text of every text leaf under `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .filter_map(|node| self.text(node))
            .collect()
    }

    // ============ Mutation ============

    pub fn create_element(&mut self, tag: &str, attributes: Vec<(String, String)>) -> NodeId {
        self.push(NodeKind::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            attributes,
            children: Vec::new(),
        }))
    }

    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(content.into()))
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    ///
    /// Returns false (and changes nothing) when `parent` is not an element
    /// or when the move would create a cycle.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let len = self.children(parent).len();
        self.insert_child(parent, len, child)
    }

    /// Insert `child` at `index` among `parent`'s children (clamped to the
    /// child count), detaching it from its previous parent first.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> bool {
        if self.element(parent).is_none()
            || self.nodes.get(child.0).is_none()
            || self.is_ancestor_of(child, parent)
        {
            return false;
        }
        self.detach(child);
        let Some(NodeKind::Element(data)) = self.nodes.get_mut(parent.0).map(|n| &mut n.kind) else {
            return false;
        };
        let index = index.min(data.children.len());
        data.children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
        true
    }

    /// Remove `id` from its parent. The node and its subtree stay valid.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(NodeKind::Element(data)) = self.nodes.get_mut(parent.0).map(|n| &mut n.kind) {
            data.children.retain(|&child| child != id);
        }
        self.nodes[id.0].parent = None;
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) -> bool {
        let Some(NodeKind::Element(data)) = self.nodes.get_mut(id.0).map(|n| &mut n.kind) else {
            return false;
        };
        let value = value.into();
        match data.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => data.attributes.push((name.to_string(), value)),
        }
        true
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        let Some(NodeKind::Element(data)) = self.nodes.get_mut(id.0).map(|n| &mut n.kind) else {
            return None;
        };
        let index = data.attributes.iter().position(|(key, _)| key == name)?;
        Some(data.attributes.remove(index).1)
    }

    pub fn set_text(&mut self, id: NodeId, content: impl Into<String>) -> bool {
        match self.nodes.get_mut(id.0).map(|n| &mut n.kind) {
            Some(NodeKind::Text(existing)) => {
                *existing = content.into();
                true
            }
            _ => false,
        }
    }

    /// Split a text node at byte offset `at`, like `Text.splitText`.
    ///
    /// The node keeps `[..at]`; a new sibling inserted right after it
    /// receives `[at..]` and is returned. `at` must be a char boundary within
    /// the text.
    pub fn split_text(&mut self, id: NodeId, at: usize) -> Option<NodeId> {
        let content = self.text(id)?;
        if !content.is_char_boundary(at) {
            return None;
        }
        let tail = content[at..].to_string();
        let head = content[..at].to_string();
        let parent = self.parent(id);
        let index = self.index_in_parent(id);
        self.set_text(id, head);
        let new_node = self.create_text(tail);
        if let (Some(parent), Some(index)) = (parent, index) {
            self.insert_child(parent, index + 1, new_node);
        }
        Some(new_node)
    }

    /// Shallow copy of an element (tag and attributes, no children).
    pub fn clone_element_shell(&mut self, id: NodeId) -> Option<NodeId> {
        let data = self.element(id)?;
        let tag = data.tag.clone();
        let attributes = data.attributes.clone();
        Some(self.create_element(&tag, attributes))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { parent: None, kind });
        id
    }
}

/// Pre-order traversal without recursion, so deeply nested pages cannot
/// overflow the stack.
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(id).iter().rev().copied());
        Some(id)
    }
}

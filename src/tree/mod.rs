//! Arena-based element tree for TEI documents.
//!
//! All nodes live in one contiguous vector and link to each other by index.
//! Text follows the element/tail model: an element owns the text before its
//! first child, and every node owns the "tail" text that follows it inside
//! its parent. Moving a node therefore moves its tail with it.
//!
//! Detached nodes stay allocated but are unreachable from the root.

mod parse;
mod serialize;

pub use parse::parse_document;
pub use serialize::{to_bytes, write_file};

/// TEI namespace URI used for all content elements.
pub const TEI_NS: &str = "http://www.tei-c.org/ns/1.0";

/// Reserved XML namespace (`xml:lang`, `xml:id`, ...).
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Unique identifier for a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

/// Namespace-qualified name of an element or attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub ns: Option<String>,
    pub local: String,
}

impl QName {
    pub fn new(ns: Option<&str>, local: impl Into<String>) -> Self {
        Self {
            ns: ns.filter(|ns| !ns.is_empty()).map(str::to_string),
            local: local.into(),
        }
    }

    /// A name in the TEI namespace.
    pub fn tei(local: impl Into<String>) -> Self {
        Self::new(Some(TEI_NS), local)
    }

    /// A name in the reserved XML namespace.
    pub fn xml(local: impl Into<String>) -> Self {
        Self::new(Some(XML_NS), local)
    }

    /// A name with no namespace (plain attributes).
    pub fn plain(local: impl Into<String>) -> Self {
        Self::new(None, local)
    }

    pub fn matches(&self, ns: Option<&str>, local: &str) -> bool {
        self.local == local && self.ns.as_deref() == ns
    }
}

/// Attribute with a qualified name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

impl Attribute {
    pub fn new(name: QName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

/// Element payload.
#[derive(Debug, Clone)]
pub struct Element {
    pub name: QName,
    /// Attributes in source order.
    pub attrs: Vec<Attribute>,
    /// Namespace declarations (`prefix`, `uri`) written on this element.
    pub namespaces: Vec<(Option<String>, String)>,
    /// Text before the first child.
    pub text: Option<String>,
}

impl Element {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            attrs: Vec::new(),
            namespaces: Vec::new(),
            text: None,
        }
    }

    pub fn with_attr(mut self, name: QName, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn attr(&self, ns: Option<&str>, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.matches(ns, local))
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attr(&mut self, name: QName, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.attrs.push(Attribute::new(name, value)),
        }
    }

    pub fn remove_attr(&mut self, ns: Option<&str>, local: &str) -> Option<String> {
        let pos = self.attrs.iter().position(|a| a.name.matches(ns, local))?;
        Some(self.attrs.remove(pos).value)
    }
}

/// Node type in the arena.
#[derive(Debug, Clone)]
pub enum NodeData {
    Element(Element),
    Comment(String),
    ProcessingInstruction(String),
}

/// Markup outside the root element, kept in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Misc {
    Comment(String),
    ProcessingInstruction(String),
    /// Contents of a `<!DOCTYPE ...>` declaration.
    DocType(String),
}

/// A node in the arena.
#[derive(Debug)]
pub struct Node {
    pub data: NodeData,
    /// Text following this node, up to its next sibling.
    pub tail: Option<String>,
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            tail: None,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
        }
    }
}

/// A parsed XML document: the element tree plus everything outside the root.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    pub prolog: Vec<Misc>,
    pub epilog: Vec<Misc>,
}

impl Document {
    /// Create a document whose root is `root`.
    pub fn new(root: Element) -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            prolog: Vec::new(),
            epilog: Vec::new(),
        };
        doc.root = doc.alloc(NodeData::Element(root));
        doc
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize)
    }

    /// Number of allocated nodes, including detached ones.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // ------------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------------

    pub fn create_element(&mut self, element: Element) -> NodeId {
        self.alloc(NodeData::Element(element))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Comment(text.into()))
    }

    pub fn create_processing_instruction(&mut self, content: impl Into<String>) -> NodeId {
        self.alloc(NodeData::ProcessingInstruction(content.into()))
    }

    // ------------------------------------------------------------------------
    // Element accessors
    // ------------------------------------------------------------------------

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.node(id).and_then(|n| match &n.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        self.node_mut(id).and_then(|n| match &mut n.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn name(&self, id: NodeId) -> Option<&QName> {
        self.element(id).map(|el| &el.name)
    }

    /// Check if node is an element named `local` in namespace `ns`.
    pub fn is_named(&self, id: NodeId, ns: Option<&str>, local: &str) -> bool {
        self.name(id).is_some_and(|name| name.matches(ns, local))
    }

    /// Check if node is the TEI element `local`.
    pub fn is_tei(&self, id: NodeId, local: &str) -> bool {
        self.is_named(id, Some(TEI_NS), local)
    }

    /// Rename an element in place, keeping its namespace.
    pub fn rename(&mut self, id: NodeId, local: &str) {
        if let Some(el) = self.element_mut(id) {
            el.name.local = local.to_string();
        }
    }

    /// Get an un-namespaced attribute.
    pub fn get_attr(&self, id: NodeId, local: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(None, local))
    }

    pub fn attr_ns(&self, id: NodeId, ns: &str, local: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(Some(ns), local))
    }

    /// The `xml:lang` attribute.
    pub fn xml_lang(&self, id: NodeId) -> Option<&str> {
        self.attr_ns(id, XML_NS, "lang")
    }

    pub fn set_attr(&mut self, id: NodeId, name: QName, value: impl Into<String>) {
        if let Some(el) = self.element_mut(id) {
            el.set_attr(name, value);
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, ns: Option<&str>, local: &str) -> Option<String> {
        self.element_mut(id).and_then(|el| el.remove_attr(ns, local))
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.element(id).and_then(|el| el.text.as_deref())
    }

    pub fn set_text(&mut self, id: NodeId, text: Option<String>) {
        if let Some(el) = self.element_mut(id) {
            el.text = text;
        }
    }

    pub fn tail(&self, id: NodeId) -> Option<&str> {
        self.node(id).and_then(|n| n.tail.as_deref())
    }

    pub fn set_tail(&mut self, id: NodeId, tail: Option<String>) {
        if let Some(node) = self.node_mut(id) {
            node.tail = tail;
        }
    }

    pub fn take_tail(&mut self, id: NodeId) -> Option<String> {
        self.node_mut(id).and_then(|n| n.tail.take())
    }

    // ------------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.next_sibling)
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.prev_sibling)
    }

    /// Iterate over children of a node.
    pub fn children(&self, parent: NodeId) -> Siblings<'_> {
        Siblings {
            doc: self,
            current: self.node(parent).and_then(|n| n.first_child),
        }
    }

    /// Iterate over the siblings after a node, in document order.
    pub fn following_siblings(&self, id: NodeId) -> Siblings<'_> {
        Siblings {
            doc: self,
            current: self.next_sibling(id),
        }
    }

    /// Iterate over all descendants of a node in document order (excluding the node).
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            scope: id,
            current: self.node(id).and_then(|n| n.first_child),
        }
    }

    /// Collect every element in the document (root included) matching a predicate.
    ///
    /// The result is a snapshot, so callers can mutate the tree while walking it.
    pub fn find_all<F>(&self, predicate: F) -> Vec<NodeId>
    where
        F: Fn(&Document, NodeId) -> bool,
    {
        std::iter::once(self.root)
            .chain(self.descendants(self.root))
            .filter(|&id| self.element(id).is_some() && predicate(self, id))
            .collect()
    }

    /// Snapshot of every TEI element named `local`, in document order.
    pub fn find_tei(&self, local: &str) -> Vec<NodeId> {
        self.find_all(|doc, id| doc.is_tei(id, local))
    }

    // ------------------------------------------------------------------------
    // Tree surgery
    // ------------------------------------------------------------------------

    /// Unlink a node (and its subtree and tail) from its parent.
    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = match self.node(id) {
            Some(n) => (n.parent, n.prev_sibling, n.next_sibling),
            None => return,
        };

        match prev {
            Some(prev) => {
                if let Some(p) = self.node_mut(prev) {
                    p.next_sibling = next;
                }
            }
            None => {
                if let Some(par) = parent.and_then(|p| self.node_mut(p)) {
                    par.first_child = next;
                }
            }
        }

        match next {
            Some(next) => {
                if let Some(n) = self.node_mut(next) {
                    n.prev_sibling = prev;
                }
            }
            None => {
                if let Some(par) = parent.and_then(|p| self.node_mut(p)) {
                    par.last_child = prev;
                }
            }
        }

        if let Some(node) = self.node_mut(id) {
            node.parent = None;
            node.prev_sibling = None;
            node.next_sibling = None;
        }
    }

    /// Append a child to a parent node, moving it from wherever it was.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);

        let last_child = self.node(parent).and_then(|n| n.last_child);

        if let Some(child_node) = self.node_mut(child) {
            child_node.parent = Some(parent);
            child_node.prev_sibling = last_child;
        }

        if let Some(last) = last_child.and_then(|l| self.node_mut(l)) {
            last.next_sibling = Some(child);
        }

        if let Some(parent_node) = self.node_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = Some(child);
            }
            parent_node.last_child = Some(child);
        }
    }

    /// Insert a node immediately before `sibling`, moving it from wherever it was.
    pub fn insert_before(&mut self, sibling: NodeId, new_node: NodeId) {
        if sibling == new_node {
            return;
        }
        self.detach(new_node);

        let Some(parent) = self.parent(sibling) else {
            return;
        };
        let prev = self.prev_sibling(sibling);

        if let Some(new) = self.node_mut(new_node) {
            new.parent = Some(parent);
            new.prev_sibling = prev;
            new.next_sibling = Some(sibling);
        }

        if let Some(sib) = self.node_mut(sibling) {
            sib.prev_sibling = Some(new_node);
        }

        match prev {
            Some(prev) => {
                if let Some(p) = self.node_mut(prev) {
                    p.next_sibling = Some(new_node);
                }
            }
            None => {
                if let Some(par) = self.node_mut(parent) {
                    par.first_child = Some(new_node);
                }
            }
        }
    }

    /// Insert a node immediately after `sibling`, moving it from wherever it was.
    pub fn insert_after(&mut self, sibling: NodeId, new_node: NodeId) {
        if sibling == new_node {
            return;
        }
        match self.next_sibling(sibling) {
            Some(next) if next != new_node => self.insert_before(next, new_node),
            Some(_) => {}
            None => {
                if let Some(parent) = self.parent(sibling) {
                    self.append(parent, new_node);
                }
            }
        }
    }

    /// Put `new_node` where `old` is and discard `old`.
    ///
    /// The replacement takes over the old node's position and tail text; any
    /// tail the replacement already had is overwritten.
    pub fn replace(&mut self, old: NodeId, new_node: NodeId) {
        if old == new_node {
            return;
        }
        let tail = self.take_tail(old);

        if self.parent(old).is_none() {
            if old == self.root {
                self.detach(new_node);
                self.root = new_node;
            }
            return;
        }

        self.insert_before(old, new_node);
        self.set_tail(new_node, tail);
        self.detach(old);
    }

    /// Remove a wrapper element, splicing its children into its place.
    ///
    /// The wrapper's text and tail stay in the text stream at the same
    /// positions, so the parent's character content is unchanged.
    pub fn unwrap(&mut self, id: NodeId) {
        if self.parent(id).is_none() {
            return;
        }

        let text = self.element_mut(id).and_then(|el| el.text.take());
        self.push_text_before(id, text);

        let children: Vec<NodeId> = self.children(id).collect();
        for child in children {
            self.insert_before(id, child);
        }

        let tail = self.take_tail(id);
        self.push_text_before(id, tail);
        self.detach(id);
    }

    /// Hand a node's tail to whatever precedes it, so the node can be moved
    /// or removed without taking that text along.
    pub fn lift_tail(&mut self, id: NodeId) {
        if self.parent(id).is_none() {
            return;
        }
        let tail = self.take_tail(id);
        self.push_text_before(id, tail);
    }

    /// Append text to whatever precedes `id` in the text stream: the previous
    /// sibling's tail, or the parent's leading text.
    fn push_text_before(&mut self, id: NodeId, text: Option<String>) {
        let Some(text) = text.filter(|t| !t.is_empty()) else {
            return;
        };

        let slot = match self.prev_sibling(id) {
            Some(prev) => self.node_mut(prev).map(|n| &mut n.tail),
            None => {
                let parent = self.parent(id);
                parent
                    .and_then(|p| self.element_mut(p))
                    .map(|el| &mut el.text)
            }
        };

        if let Some(slot) = slot {
            slot.get_or_insert_with(String::new).push_str(&text);
        }
    }
}

/// Iterator over a run of siblings.
pub struct Siblings<'a> {
    doc: &'a Document,
    current: Option<NodeId>,
}

impl Iterator for Siblings<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.doc.next_sibling(id);
        Some(id)
    }
}

/// Pre-order iterator over a subtree.
pub struct Descendants<'a> {
    doc: &'a Document,
    scope: NodeId,
    current: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;

        let node = self.doc.node(id)?;
        self.current = match node.first_child {
            Some(child) => Some(child),
            None => {
                // Climb until a node with a next sibling, stopping at the scope root
                let mut cursor = id;
                loop {
                    if cursor == self.scope {
                        break None;
                    }
                    if let Some(next) = self.doc.next_sibling(cursor) {
                        break Some(next);
                    }
                    match self.doc.parent(cursor) {
                        Some(parent) => cursor = parent,
                        None => break None,
                    }
                }
            }
        };

        Some(id)
    }
}

//! Node structures for XML tree representation.
//!
//! Input documents are represented as trees of reference-counted nodes.
//! The differ only ever reads these trees; nothing in the crate mutates
//! caller-owned input after parsing.

pub mod namespace;
mod xml_content;

pub use namespace::{bindings_in_scope, is_xmlns_attr, split_qname, PrefixMapping};
pub use xml_content::{XmlContent, XmlElement, XmlText};

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// A reference-counted pointer to a node.
pub type NodeRef = Rc<RefCell<NodeInner>>;

/// A node in the parse tree: XML content plus 0 or more children.
#[derive(Debug)]
pub struct NodeInner {
    /// Child nodes.
    children: Vec<NodeRef>,
    /// XML content of this node. `None` for synthetic container nodes.
    content: Option<XmlContent>,
    /// Weak reference to parent node.
    parent: Weak<RefCell<NodeInner>>,
}

impl NodeInner {
    /// Creates a new node with the given content.
    pub fn new(content: Option<XmlContent>) -> Self {
        NodeInner {
            children: Vec::new(),
            content,
            parent: Weak::new(),
        }
    }

    /// Returns the content of this node.
    pub fn content(&self) -> Option<&XmlContent> {
        self.content.as_ref()
    }

    /// Returns the number of children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Returns the children as a slice.
    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    /// Returns a weak reference to the parent.
    pub fn parent(&self) -> &Weak<RefCell<NodeInner>> {
        &self.parent
    }

    /// Returns true if this node is an element.
    pub fn is_element(&self) -> bool {
        matches!(self.content, Some(XmlContent::Element(_)))
    }

    /// Returns true if this node is text.
    pub fn is_text(&self) -> bool {
        matches!(self.content, Some(XmlContent::Text(_)))
    }

    /// Adds a child node. Must be called on the NodeRef wrapper.
    pub fn add_child_to_ref(parent_ref: &NodeRef, child_ref: NodeRef) {
        child_ref.borrow_mut().parent = Rc::downgrade(parent_ref);
        parent_ref.borrow_mut().children.push(child_ref);
    }
}

/// Creates a new node wrapped in a NodeRef.
pub fn new_node(content: Option<XmlContent>) -> NodeRef {
    Rc::new(RefCell::new(NodeInner::new(content)))
}

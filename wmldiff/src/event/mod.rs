//! Event representation of XML content.
//!
//! The fine differ operates on ordered sequences of structural events
//! rather than on trees. Each atom owns one recorded [`EventSequence`];
//! changed runs are concatenated into composite sequences before diffing.

mod recorder;

pub use recorder::DomRecorder;

use std::collections::BTreeMap;

use md5::{Digest, Md5};

use crate::error::{Error, Result};
use crate::node::{new_node, NodeInner, NodeRef, PrefixMapping, XmlContent, XmlElement, XmlText};

/// One structural or content event of an XML subtree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiffEvent {
    /// Start of an element.
    OpenElement {
        /// Qualified element name.
        qname: String,
        /// Attributes, excluding namespace declarations.
        attributes: BTreeMap<String, String>,
        /// Namespace declarations written on this element.
        namespace_decls: BTreeMap<String, String>,
    },
    /// A run of character content.
    Text(String),
    /// End of an element.
    CloseElement {
        /// Qualified element name, matching the open event.
        qname: String,
    },
}

impl DiffEvent {
    /// Feeds a canonical encoding of this event into a hasher.
    fn encode_into(&self, hasher: &mut Md5) {
        fn put(hasher: &mut Md5, s: &str) {
            hasher.update((s.len() as u32).to_le_bytes());
            hasher.update(s.as_bytes());
        }
        match self {
            DiffEvent::OpenElement {
                qname,
                attributes,
                namespace_decls,
            } => {
                hasher.update([0x01]);
                put(hasher, qname);
                for (name, value) in attributes {
                    put(hasher, name);
                    put(hasher, value);
                }
                hasher.update([0x02]);
                for (prefix, uri) in namespace_decls {
                    put(hasher, prefix);
                    put(hasher, uri);
                }
            }
            DiffEvent::Text(text) => {
                hasher.update([0x03]);
                put(hasher, text);
            }
            DiffEvent::CloseElement { qname } => {
                hasher.update([0x04]);
                put(hasher, qname);
            }
        }
    }
}

/// An ordered record of events for one or more subtrees, together with
/// the namespace-prefix bindings in scope for that content.
#[derive(Debug, Clone, Default)]
pub struct EventSequence {
    events: Vec<DiffEvent>,
    prefix_mapping: PrefixMapping,
}

impl EventSequence {
    /// Creates an empty sequence.
    pub fn new() -> Self {
        EventSequence::default()
    }

    /// Appends an event.
    pub fn push(&mut self, event: DiffEvent) {
        self.events.push(event);
    }

    /// Returns the events in order.
    pub fn events(&self) -> &[DiffEvent] {
        &self.events
    }

    /// Returns the number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if the sequence holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the in-scope prefix bindings for this content.
    pub fn prefix_mapping(&self) -> &PrefixMapping {
        &self.prefix_mapping
    }

    /// Returns a mutable reference to the prefix bindings.
    pub fn prefix_mapping_mut(&mut self) -> &mut PrefixMapping {
        &mut self.prefix_mapping
    }

    /// Appends another sequence's events and unions its prefix bindings.
    ///
    /// This is how composite sequences for changed runs are built.
    pub fn add_sequence(&mut self, other: &EventSequence) {
        self.events.extend_from_slice(&other.events);
        self.prefix_mapping.merge(&other.prefix_mapping);
    }

    /// Returns a stable content-derived identity for this sequence.
    ///
    /// Two sequences hash equal iff their event lists are identical;
    /// prefix bindings are scope context and do not participate.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = Md5::new();
        for event in &self.events {
            event.encode_into(&mut hasher);
        }
        truncate_digest(hasher)
    }

    /// Rebuilds the node forest this sequence was recorded from.
    ///
    /// Sequences produced by the recorder are always balanced; an
    /// unbalanced sequence is incomparable input.
    pub fn to_forest(&self) -> Result<Vec<NodeRef>> {
        let container = new_node(None);
        let mut stack: Vec<NodeRef> = vec![container.clone()];

        for event in &self.events {
            match event {
                DiffEvent::OpenElement {
                    qname,
                    attributes,
                    namespace_decls,
                } => {
                    let node = new_node(Some(XmlContent::Element(
                        XmlElement::with_namespace_decls(
                            qname.clone(),
                            attributes.clone(),
                            namespace_decls.clone(),
                        ),
                    )));
                    if let Some(parent) = stack.last() {
                        NodeInner::add_child_to_ref(parent, node.clone());
                    }
                    stack.push(node);
                }
                DiffEvent::Text(text) => {
                    let node = new_node(Some(XmlContent::Text(XmlText::new(text))));
                    if let Some(parent) = stack.last() {
                        NodeInner::add_child_to_ref(parent, node);
                    }
                }
                DiffEvent::CloseElement { qname } => {
                    if stack.len() <= 1 {
                        return Err(Error::Comparison(format!(
                            "unbalanced close event for <{}>",
                            qname
                        )));
                    }
                    stack.pop();
                }
            }
        }

        if stack.len() != 1 {
            return Err(Error::Comparison(
                "event sequence ends inside an open element".to_string(),
            ));
        }

        let children = container.borrow().children().to_vec();
        Ok(children)
    }
}

/// Returns a stable content-derived identity for a whole subtree.
///
/// Equals the [`EventSequence::content_hash`] of the subtree's recorded
/// events, so tree-level and sequence-level identities agree.
pub fn subtree_hash(node: &NodeRef) -> u64 {
    let mut hasher = Md5::new();
    hash_node(node, &mut hasher);
    truncate_digest(hasher)
}

/// First eight digest bytes as a little-endian integer.
fn truncate_digest(hasher: Md5) -> u64 {
    let digest: [u8; 16] = hasher.finalize().into();
    let mut id = [0u8; 8];
    id.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(id)
}

fn hash_node(node: &NodeRef, hasher: &mut Md5) {
    let borrowed = node.borrow();
    match borrowed.content() {
        Some(XmlContent::Element(e)) => {
            DiffEvent::OpenElement {
                qname: e.qname().to_string(),
                attributes: e.attributes().clone(),
                namespace_decls: e.namespace_decls().clone(),
            }
            .encode_into(hasher);
            for child in borrowed.children() {
                hash_node(child, hasher);
            }
            DiffEvent::CloseElement {
                qname: e.qname().to_string(),
            }
            .encode_into(hasher);
        }
        Some(XmlContent::Text(t)) => {
            DiffEvent::Text(t.text().to_string()).encode_into(hasher);
        }
        None => {
            for child in borrowed.children() {
                hash_node(child, hasher);
            }
        }
    }
}

//! Namespace handling for XML elements.

use rustc_hash::FxHashMap;

use super::{NodeRef, XmlContent};

/// A set of in-scope namespace-prefix bindings (prefix -> URI).
///
/// Bindings recorded with an atom must be redeclared when its content is
/// emitted outside its original context, otherwise the emitted tags are
/// unqualified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixMapping {
    bindings: FxHashMap<String, String>,
}

impl PrefixMapping {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        PrefixMapping {
            bindings: FxHashMap::default(),
        }
    }

    /// Binds a prefix to a URI, replacing any previous binding.
    pub fn bind(&mut self, prefix: &str, uri: &str) {
        self.bindings.insert(prefix.to_string(), uri.to_string());
    }

    /// Binds a prefix only if it is not already bound.
    ///
    /// Used when walking outward from an element: inner declarations
    /// shadow outer ones.
    pub fn bind_if_absent(&mut self, prefix: &str, uri: &str) {
        self.bindings
            .entry(prefix.to_string())
            .or_insert_with(|| uri.to_string());
    }

    /// Resolves a prefix to its URI.
    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }

    /// Merges another mapping into this one. Existing bindings win.
    pub fn merge(&mut self, other: &PrefixMapping) {
        for (prefix, uri) in &other.bindings {
            self.bind_if_absent(prefix, uri);
        }
    }

    /// Returns the bindings sorted by prefix, for deterministic output.
    pub fn iter_sorted(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .bindings
            .iter()
            .map(|(p, u)| (p.as_str(), u.as_str()))
            .collect();
        pairs.sort();
        pairs
    }

    /// Returns true if no prefixes are bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Returns the number of bound prefixes.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }
}

/// Splits a qualified name into prefix and local name.
///
/// Returns (Some(prefix), local) for "prefix:local"
/// Returns (None, name) for "name" without prefix
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    if let Some(pos) = qname.find(':') {
        (Some(&qname[..pos]), &qname[pos + 1..])
    } else {
        (None, qname)
    }
}

/// Checks if an attribute name is a namespace declaration.
pub fn is_xmlns_attr(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:")
}

/// Computes the in-scope prefix bindings for a node.
///
/// Walks from the node to the root collecting namespace declarations,
/// with declarations on inner elements shadowing outer ones. The input
/// tree is never modified; callers that need the context attached to a
/// detached subtree fold the result into its recorded sequence instead.
pub fn bindings_in_scope(node: &NodeRef) -> PrefixMapping {
    let mut mapping = PrefixMapping::new();
    let mut current = Some(node.clone());

    while let Some(n) = current {
        let borrowed = n.borrow();
        if let Some(XmlContent::Element(e)) = borrowed.content() {
            for (prefix, uri) in e.namespace_decls() {
                mapping.bind_if_absent(prefix, uri);
            }
        }
        let parent = borrowed.parent().upgrade();
        drop(borrowed);
        current = parent;
    }

    mapping
}
